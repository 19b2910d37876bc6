//! Detail-page link construction per backend.

use url::Url;

use crate::models::BackendKind;

pub const DEFAULT_MARKETPLACE_ORIGIN: &str = "https://www.amazon.com";

/// Absolute link for a result. The marketplace returns paths relative to
/// its origin; search engines already return absolute URLs.
pub fn build_link(backend: BackendKind, detail_link: Option<&str>, marketplace_origin: &Url) -> Option<String> {
    let link = detail_link?.trim();
    if link.is_empty() {
        return None;
    }
    match backend {
        BackendKind::Marketplace => match Url::parse(link) {
            Ok(absolute) => Some(absolute.to_string()),
            Err(_) => marketplace_origin.join(link).ok().map(|u| u.to_string()),
        },
        BackendKind::Web | BackendKind::ReverseImage | BackendKind::VisualLens => Some(link.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse(DEFAULT_MARKETPLACE_ORIGIN).unwrap()
    }

    #[test]
    fn marketplace_paths_join_origin() {
        assert_eq!(
            build_link(BackendKind::Marketplace, Some("/dp/B07PGL2ZSL?ref=sr_1"), &origin()).as_deref(),
            Some("https://www.amazon.com/dp/B07PGL2ZSL?ref=sr_1")
        );
        assert_eq!(
            build_link(BackendKind::Marketplace, Some("dp/B0"), &origin()).as_deref(),
            Some("https://www.amazon.com/dp/B0")
        );
    }

    #[test]
    fn absolute_marketplace_link_is_kept() {
        assert_eq!(
            build_link(BackendKind::Marketplace, Some("https://smile.amazon.com/dp/X"), &origin()).as_deref(),
            Some("https://smile.amazon.com/dp/X")
        );
    }

    #[test]
    fn search_engine_links_pass_through() {
        assert_eq!(
            build_link(BackendKind::VisualLens, Some("https://shop.example/p/1"), &origin()).as_deref(),
            Some("https://shop.example/p/1")
        );
        assert_eq!(build_link(BackendKind::Web, None, &origin()), None);
        assert_eq!(build_link(BackendKind::Web, Some("  "), &origin()), None);
    }
}
