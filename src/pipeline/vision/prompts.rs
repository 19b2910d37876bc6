//! System prompts for the two vision calls.

use crate::models::BackendKind;

pub const DESCRIBE_SYSTEM: &str = "\
You identify consumer products from photos. Describe the product in the image, \
focusing on its appearance and the distinctive features that set it apart. From \
those features, suggest at most 3 likely brands. Then write one search query, \
ideally containing a product name and the likely brands, suitable for a \
marketplace search and a web search. Answer with a JSON object with the keys \
\"brands\" (array of strings), \"description\" (string) and \"query\" (string).";

pub const ARBITRATE_SYSTEM: &str = "\
You compare product photos. The first image is the reference product. Each \
following image is a gallery grid of numbered tiles; tile 0 in every grid is the \
reference itself and the other tiles are search results. For each grid, pick the \
tile number whose product matches the reference most closely. Use 0 when no \
result tile shows the same product. Answer with a JSON object holding exactly one \
integer per grid, using the keys given by the user.";

/// User-turn text for arbitration: names each grid's key in image order.
pub fn arbitration_instructions(order: &[BackendKind]) -> String {
    let mut text = String::from("Grids follow the reference image in this order:\n");
    for (i, kind) in order.iter().enumerate() {
        text.push_str(&format!(
            "{}. \"{}\": {}\n",
            i + 1,
            kind.label(),
            kind.gallery_title()
        ));
    }
    text.push_str("Reply like {");
    let example: Vec<String> = order
        .iter()
        .map(|kind| format!("\"{}\": <tile number>", kind.label()))
        .collect();
    text.push_str(&example.join(", "));
    text.push('}');
    text
}

/// User-turn text for the description step when the user supplied a hint.
pub fn description_hint(user_description: &str) -> String {
    format!("The user describes the product as: {user_description}")
}
