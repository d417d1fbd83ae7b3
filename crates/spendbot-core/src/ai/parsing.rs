//! JSON parsing helpers for classifier responses
//!
//! Models often wrap the JSON payload in prose or code fences, so the
//! outermost `{...}` span is extracted before deserializing.

use crate::error::{Error, Result};

use super::types::ClassifiedIntent;

/// Parse a classifier response into an intent
///
/// Returns `Ok(None)` for an object that carries neither a type nor an amount
/// (the model declining to classify).
pub fn parse_intent(response: &str) -> Result<Option<ClassifiedIntent>> {
    let json_str = extract_json(response)?;
    let intent: ClassifiedIntent = serde_json::from_str(json_str).map_err(|e| {
        Error::InvalidData(format!(
            "Invalid JSON from classifier: {} | Raw: {}",
            e,
            truncate(json_str)
        ))
    })?;

    let declined = intent.amount.as_ref().map_or(true, |a| a.is_null())
        && intent
            .kind
            .as_deref()
            .map_or(true, |k| k.trim().is_empty() || k.eq_ignore_ascii_case("unknown"));
    if declined {
        return Ok(None);
    }
    Ok(Some(intent))
}

fn extract_json(response: &str) -> Result<&str> {
    let response = response.trim();
    match (response.find('{'), response.rfind('}')) {
        (Some(s), Some(e)) if s < e => Ok(&response[s..=e]),
        _ => Err(Error::InvalidData(format!(
            "No JSON found in classifier response | Raw: {}",
            truncate(response)
        ))),
    }
}

fn truncate(s: &str) -> String {
    match s.char_indices().nth(200) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
