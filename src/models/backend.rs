use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the four search engines a product photo is fanned out to.
///
/// Declaration order is the arbitration order: grids are handed to the
/// arbitration model as marketplace, web, reverse image, then lens. Maps keyed
/// by `BackendKind` are `BTreeMap`s so iteration follows the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Marketplace,
    Web,
    ReverseImage,
    #[serde(rename = "lens")]
    VisualLens,
}

/// What a backend is queried with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryContract {
    /// Free-text product query from the description step.
    Text,
    /// The hosted reference image URL.
    Image,
}

impl BackendKind {
    /// All backends, in arbitration order.
    pub const ALL: [BackendKind; 4] = [
        BackendKind::Marketplace,
        BackendKind::Web,
        BackendKind::ReverseImage,
        BackendKind::VisualLens,
    ];

    /// Output label, also the key the arbitration model answers with.
    pub fn label(self) -> &'static str {
        match self {
            BackendKind::Marketplace => "marketplace",
            BackendKind::Web => "web",
            BackendKind::ReverseImage => "reverse_image",
            BackendKind::VisualLens => "lens",
        }
    }

    pub fn contract(self) -> QueryContract {
        match self {
            BackendKind::Marketplace | BackendKind::Web => QueryContract::Text,
            BackendKind::ReverseImage | BackendKind::VisualLens => QueryContract::Image,
        }
    }

    /// Other names the arbitration model has been seen to use for a gallery.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            BackendKind::Marketplace => &["amz", "amazon"],
            BackendKind::Web => &["gs", "google_search", "google"],
            BackendKind::ReverseImage => &["gis", "google_image_search", "reverse"],
            BackendKind::VisualLens => &["google_lens", "visual_lens"],
        }
    }

    /// Human-readable gallery name used in the arbitration prompt.
    pub fn gallery_title(self) -> &'static str {
        match self {
            BackendKind::Marketplace => "marketplace listings",
            BackendKind::Web => "web search results",
            BackendKind::ReverseImage => "reverse image search results",
            BackendKind::VisualLens => "visual lens matches",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Payload returned by one backend for one query, kept for the whole request.
#[derive(Debug, Clone, PartialEq)]
pub enum RawBackendResponse {
    /// Already-parsed JSON document (search API engines).
    Json(serde_json::Value),
    /// Undecoded body (the marketplace scraper returns JSON as text).
    Text(String),
}

impl RawBackendResponse {
    /// View the payload as a JSON tree, parsing text bodies on demand.
    pub fn to_json(&self) -> Result<std::borrow::Cow<'_, serde_json::Value>, serde_json::Error> {
        match self {
            RawBackendResponse::Json(value) => Ok(std::borrow::Cow::Borrowed(value)),
            RawBackendResponse::Text(body) => {
                serde_json::from_str(body).map(std::borrow::Cow::Owned)
            }
        }
    }

    pub fn len_hint(&self) -> usize {
        match self {
            RawBackendResponse::Json(_) => 0,
            RawBackendResponse::Text(body) => body.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arbitration_order_is_declaration_order() {
        let mut sorted = BackendKind::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, BackendKind::ALL.to_vec());
        assert_eq!(BackendKind::ALL[0], BackendKind::Marketplace);
        assert_eq!(BackendKind::ALL[3], BackendKind::VisualLens);
    }

    #[test]
    fn labels_match_serde_names() {
        for kind in BackendKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.label()));
        }
    }

    #[test]
    fn text_and_image_contracts() {
        assert_eq!(BackendKind::Marketplace.contract(), QueryContract::Text);
        assert_eq!(BackendKind::Web.contract(), QueryContract::Text);
        assert_eq!(BackendKind::ReverseImage.contract(), QueryContract::Image);
        assert_eq!(BackendKind::VisualLens.contract(), QueryContract::Image);
    }

    #[test]
    fn text_payload_parses_on_demand() {
        let raw = RawBackendResponse::Text(r#"{"a": 1}"#.into());
        assert_eq!(raw.to_json().unwrap()["a"], 1);

        let broken = RawBackendResponse::Text("<html>".into());
        assert!(broken.to_json().is_err());
    }

    #[test]
    fn backend_kind_works_as_json_map_key() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(BackendKind::VisualLens, 5);
        map.insert(BackendKind::Web, 3);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"web":3,"lens":5}"#);
    }
}
