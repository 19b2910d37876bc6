//! Marketplace scraper payload.
//!
//! Listings live at `results[0].content.results.results`, split into
//! `organic` (required) and `amazons_choices` (optional). Both lists are
//! concatenated organic first. Only listings with `url_image` are kept.

use serde_json::Value;

use super::{rank_field, str_field, NormalizeError};
use crate::models::GalleryItem;

const ORGANIC_KEY: &str = "organic";
const CHOICES_KEY: &str = "amazons_choices";

pub fn extract(json: &Value) -> Result<Vec<GalleryItem>, NormalizeError> {
    let listings = listings_root(json)?;

    let organic = listings
        .get(ORGANIC_KEY)
        .ok_or_else(|| NormalizeError::MissingKey(ORGANIC_KEY.to_string()))?
        .as_array()
        .ok_or_else(|| NormalizeError::NotAList(ORGANIC_KEY.to_string()))?;

    let choices: &[Value] = listings
        .get(CHOICES_KEY)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let items = organic
        .iter()
        .chain(choices.iter())
        .filter_map(|listing| {
            let image = str_field(listing, "url_image")?;
            Some((listing, image))
        })
        .enumerate()
        .map(|(position, (listing, thumbnail_url))| GalleryItem {
            position,
            thumbnail_url,
            title: str_field(listing, "title"),
            detail_link: str_field(listing, "url"),
            price: price_field(listing),
            currency: str_field(listing, "currency"),
            native_rank: rank_field(listing, "pos"),
        })
        .collect();

    Ok(items)
}

/// Walk `results[0].content.results.results`, naming the first missing step.
fn listings_root(json: &Value) -> Result<&Value, NormalizeError> {
    let first = json
        .get("results")
        .ok_or_else(|| NormalizeError::MissingKey("results".into()))?
        .as_array()
        .ok_or_else(|| NormalizeError::NotAList("results".into()))?
        .first()
        .ok_or_else(|| NormalizeError::MissingKey("results[0]".into()))?;

    ["content", "results", "results"]
        .iter()
        .try_fold(first, |node, key| {
            node.get(*key)
                .ok_or_else(|| NormalizeError::MissingKey((*key).to_string()))
        })
}

/// Prices arrive as numbers, or occasionally as strings like "$24.99".
fn price_field(listing: &Value) -> Option<f64> {
    match listing.get("price")? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .trim()
            .trim_start_matches(|c: char| !c.is_ascii_digit())
            .replace(',', "")
            .parse()
            .ok(),
        _ => None,
    }
}
