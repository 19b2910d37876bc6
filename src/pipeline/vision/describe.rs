//! Description step: reference image in, product search query out.

use serde::{Deserialize, Serialize};

use super::prompts::{description_hint, DESCRIBE_SYSTEM};
use super::{json_payload, VisionClient, VisionError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductDescription {
    #[serde(default, alias = "potential_brands")]
    pub brands: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "search_query")]
    pub query: String,
}

/// Ask the vision model what the product is. Only `query` drives the
/// searches; the rest is logged.
pub async fn describe_product(
    client: &dyn VisionClient,
    image_url: &str,
    user_description: Option<&str>,
) -> Result<ProductDescription, VisionError> {
    let hint = user_description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(description_hint);
    let urls = [image_url.to_string()];

    let content = client.chat_json(DESCRIBE_SYSTEM, hint.as_deref(), &urls).await?;
    let parsed: ProductDescription = serde_json::from_str(json_payload(&content))
        .map_err(|e| VisionError::ResponseParsing(format!("description: {e}")))?;

    tracing::info!(
        query = %parsed.query,
        brands = ?parsed.brands,
        "Product described"
    );
    Ok(parsed)
}
