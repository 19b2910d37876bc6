//! Search-API engines (web, reverse image, lens).
//!
//! All three share one shape: a top-level key holding an ordered list of
//! result objects, each optionally carrying `thumbnail`, `title`, `link`,
//! `position`.

use serde_json::Value;

use super::{rank_field, str_field, NormalizeError};
use crate::models::GalleryItem;

pub const WEB_RESULTS_KEY: &str = "organic_results";
pub const REVERSE_IMAGE_RESULTS_KEY: &str = "image_results";
pub const LENS_RESULTS_KEY: &str = "visual_matches";

const THUMBNAIL_KEY: &str = "thumbnail";

/// Extract thumbnail-bearing results under `results_key`, in backend order.
pub fn extract(json: &Value, results_key: &str) -> Result<Vec<GalleryItem>, NormalizeError> {
    let results = json
        .get(results_key)
        .ok_or_else(|| NormalizeError::MissingKey(results_key.to_string()))?
        .as_array()
        .ok_or_else(|| NormalizeError::NotAList(results_key.to_string()))?;

    let items = results
        .iter()
        .filter_map(|result| {
            let thumbnail = str_field(result, THUMBNAIL_KEY)?;
            Some((result, thumbnail))
        })
        .enumerate()
        .map(|(position, (result, thumbnail_url))| GalleryItem {
            position,
            thumbnail_url,
            title: str_field(result, "title"),
            detail_link: str_field(result, "link"),
            price: None,
            currency: None,
            native_rank: rank_field(result, "position"),
        })
        .collect();

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn skips_results_without_thumbnail_and_renumbers() {
        let payload = json!({
            "image_results": [
                {"position": 1, "title": "No thumb", "link": "https://a.example"},
                {"position": 2, "title": "Kettle", "link": "https://b.example", "thumbnail": "https://t/b.jpg"},
                {"position": 3, "title": "Empty thumb", "thumbnail": ""},
                {"position": 4, "title": "Pot", "link": "https://c.example", "thumbnail": "https://t/c.jpg"}
            ]
        });
        let items = extract(&payload, REVERSE_IMAGE_RESULTS_KEY).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].position, 0);
        assert_eq!(items[0].title.as_deref(), Some("Kettle"));
        assert_eq!(items[0].native_rank, Some(2));
        assert_eq!(items[1].position, 1);
        assert_eq!(items[1].detail_link.as_deref(), Some("https://c.example"));
        assert!(items.iter().all(|i| i.price.is_none()));
    }

    #[test]
    fn results_key_must_be_a_list() {
        let payload = json!({"visual_matches": {"oops": true}});
        assert_eq!(
            extract(&payload, LENS_RESULTS_KEY),
            Err(NormalizeError::NotAList("visual_matches".into()))
        );
    }

    #[test]
    fn empty_list_is_not_an_error() {
        let payload = json!({"organic_results": []});
        assert!(extract(&payload, WEB_RESULTS_KEY).unwrap().is_empty());
    }

    #[test]
    fn api_error_body_reports_missing_key() {
        let payload = json!({"error": "Invalid API key"});
        assert_eq!(
            extract(&payload, WEB_RESULTS_KEY),
            Err(NormalizeError::MissingKey("organic_results".into()))
        );
    }
}
