//! Reading the arbitration model's answer.
//!
//! Expected shape is one integer per grid keyed by backend label. Older
//! engine names are accepted as aliases. When no known key appears but the
//! object holds exactly one integer per grid, values are read in grid order.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::BackendKind;
use crate::pipeline::vision::json_payload;

#[derive(Debug, Error, PartialEq)]
pub enum ArbitrationParseError {
    #[error("arbitration reply is not JSON: {0}")]
    NotJson(String),

    #[error("arbitration reply is not a JSON object")]
    NotAnObject,

    #[error("arbitration reply names no known gallery")]
    NoKnownKeys,
}

/// Chosen slide per backend in `order`. `None` means the answer omitted the
/// backend or gave a non-integer.
pub type MatchIndices = BTreeMap<BackendKind, Option<i64>>;

pub fn parse_arbitration(raw: &str, order: &[BackendKind]) -> Result<MatchIndices, ArbitrationParseError> {
    let value: Value = serde_json::from_str(json_payload(raw))
        .map_err(|e| ArbitrationParseError::NotJson(e.to_string()))?;
    let object = value.as_object().ok_or(ArbitrationParseError::NotAnObject)?;

    let keyed: MatchIndices = order
        .iter()
        .map(|kind| (*kind, find_key(object, *kind)))
        .filter_map(|(kind, found)| found.map(|v| (kind, v.as_i64())))
        .collect();

    if !keyed.is_empty() {
        return Ok(order.iter().map(|kind| (*kind, keyed.get(kind).copied().flatten())).collect());
    }

    positional(object, order).ok_or(ArbitrationParseError::NoKnownKeys)
}

fn find_key<'a>(object: &'a Map<String, Value>, kind: BackendKind) -> Option<&'a Value> {
    let names: Vec<&str> = std::iter::once(kind.label()).chain(kind.aliases().iter().copied()).collect();
    object
        .iter()
        .find(|(key, _)| {
            let key = key.trim().to_ascii_lowercase();
            names.iter().any(|name| *name == key)
        })
        .map(|(_, value)| value)
}

/// Unkeyed answers like `{"gallery_1": 3, "gallery_2": 0, ...}`. Relies on
/// object key order being the model's order.
fn positional(object: &Map<String, Value>, order: &[BackendKind]) -> Option<MatchIndices> {
    if object.len() != order.len() {
        return None;
    }
    let values: Vec<i64> = object.values().map(Value::as_i64).collect::<Option<_>>()?;
    Some(order.iter().copied().zip(values.into_iter().map(Some)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [BackendKind; 4] = BackendKind::ALL;

    #[test]
    fn reads_labelled_answer() {
        let parsed = parse_arbitration(r#"{"marketplace": 0, "web": 3, "reverse_image": 0, "lens": 5}"#, &ALL).unwrap();
        assert_eq!(parsed[&BackendKind::Marketplace], Some(0));
        assert_eq!(parsed[&BackendKind::Web], Some(3));
        assert_eq!(parsed[&BackendKind::ReverseImage], Some(0));
        assert_eq!(parsed[&BackendKind::VisualLens], Some(5));
    }

    #[test]
    fn accepts_engine_aliases_case_insensitively() {
        let parsed = parse_arbitration(r#"{"AMZ": 2, "gs": 1, "google_image_search": 4, "google_lens": 7}"#, &ALL).unwrap();
        assert_eq!(parsed[&BackendKind::Marketplace], Some(2));
        assert_eq!(parsed[&BackendKind::Web], Some(1));
        assert_eq!(parsed[&BackendKind::ReverseImage], Some(4));
        assert_eq!(parsed[&BackendKind::VisualLens], Some(7));
    }

    #[test]
    fn missing_and_non_integer_values_are_none() {
        let parsed = parse_arbitration(r#"{"web": "3", "lens": 2.5, "marketplace": 1}"#, &ALL).unwrap();
        assert_eq!(parsed.len(), 4);
        assert_eq!(parsed[&BackendKind::Marketplace], Some(1));
        assert_eq!(parsed[&BackendKind::Web], None);
        assert_eq!(parsed[&BackendKind::ReverseImage], None);
        assert_eq!(parsed[&BackendKind::VisualLens], None);
    }

    #[test]
    fn unkeyed_integers_are_positional() {
        let parsed = parse_arbitration(r#"{"gallery_1": 4, "gallery_2": 0, "gallery_3": 2, "gallery_4": 9}"#, &ALL).unwrap();
        assert_eq!(parsed[&BackendKind::Marketplace], Some(4));
        assert_eq!(parsed[&BackendKind::VisualLens], Some(9));
    }

    #[test]
    fn fenced_reply_is_unwrapped() {
        let parsed = parse_arbitration("```json\n{\"web\": 1}\n```", &[BackendKind::Web]).unwrap();
        assert_eq!(parsed[&BackendKind::Web], Some(1));
    }

    #[test]
    fn only_requested_backends_are_reported() {
        let order = [BackendKind::Web, BackendKind::VisualLens];
        let parsed = parse_arbitration(r#"{"marketplace": 3, "web": 2, "lens": 1}"#, &order).unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(!parsed.contains_key(&BackendKind::Marketplace));
    }

    #[test]
    fn malformed_replies_are_errors() {
        assert!(matches!(parse_arbitration("the second one", &ALL), Err(ArbitrationParseError::NotJson(_))));
        assert_eq!(parse_arbitration("[1, 2, 3, 4]", &ALL), Err(ArbitrationParseError::NotAnObject));
        assert_eq!(parse_arbitration(r#"{"best": 2}"#, &ALL), Err(ArbitrationParseError::NoKnownKeys));
        assert_eq!(
            parse_arbitration(r#"{"a": 1, "b": 2, "c": "x", "d": 4}"#, &ALL),
            Err(ArbitrationParseError::NoKnownKeys)
        );
    }
}
