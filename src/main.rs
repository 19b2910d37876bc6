#[tokio::main]
async fn main() {
    if let Err(e) = buysmart_lib::run().await {
        tracing::error!("{e}");
        eprintln!("buysmart: {e}");
        std::process::exit(1);
    }
}
