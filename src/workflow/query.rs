//! Strict query-string parsing for the callback endpoint.

use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("query parameter {0:?} is not of the form key=value")]
    MalformedPair(String),

    #[error("query parameter {0:?} has invalid percent-encoding")]
    BadEncoding(String),
}

/// Parse `a=1&b=2` into a map. A leading `?` is ignored and empty segments
/// are skipped; when a key repeats, the first value wins.
pub fn parse_query(raw: &str) -> Result<HashMap<String, String>, QueryError> {
    let raw = raw.strip_prefix('?').unwrap_or(raw);
    let mut params = HashMap::new();

    for pair in raw.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .filter(|(k, _)| !k.is_empty())
            .ok_or_else(|| QueryError::MalformedPair(pair.to_string()))?;

        let key = decode(key).ok_or_else(|| QueryError::BadEncoding(pair.to_string()))?;
        let value = decode(value).ok_or_else(|| QueryError::BadEncoding(pair.to_string()))?;
        params.entry(key).or_insert(value);
    }

    Ok(params)
}

fn decode(component: &str) -> Option<String> {
    let bytes = component.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escape = bytes.get(i + 1..i + 3)?;
            if !escape.iter().all(u8::is_ascii_hexdigit) {
                return None;
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let plus_decoded = component.replace('+', " ");
    urlencoding::decode(&plus_decoded)
        .ok()
        .map(|s| s.into_owned())
}
