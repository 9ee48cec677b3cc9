//! Serialization contract for transaction tags.
//!
//! Tags are an ordered sequence of strings stored in a single text column.
//! The stored form is versioned:
//!
//! - `v1:["a","b"]`: current format, a JSON array behind a version prefix.
//! - `["a","b"]` or an empty string: legacy rows written before versioning.
//!
//! Order is preserved and duplicates are kept; the caller owns the sequence.

use crate::{EngineError, ResultEngine};

const V1_PREFIX: &str = "v1:";
const MAX_TAGS: usize = 32;
const MAX_TAG_CHARS: usize = 64;

/// Trim and validate user supplied tags.
pub(crate) fn normalize_tags(tags: Vec<String>) -> ResultEngine<Vec<String>> {
    if tags.len() > MAX_TAGS {
        return Err(EngineError::invalid(
            "tags",
            format!("at most {MAX_TAGS} tags are allowed"),
        ));
    }
    tags.into_iter()
        .map(|tag| {
            let trimmed = tag.trim();
            if trimmed.is_empty() {
                return Err(EngineError::invalid("tags", "tag must not be empty"));
            }
            if trimmed.chars().count() > MAX_TAG_CHARS {
                return Err(EngineError::invalid(
                    "tags",
                    format!("tag longer than {MAX_TAG_CHARS} characters"),
                ));
            }
            Ok(trimmed.to_string())
        })
        .collect()
}

pub(crate) fn encode_tags(tags: &[String]) -> ResultEngine<String> {
    let json = serde_json::to_string(tags)
        .map_err(|err| EngineError::invalid("tags", format!("cannot encode tags: {err}")))?;
    Ok(format!("{V1_PREFIX}{json}"))
}

pub(crate) fn decode_tags(raw: &str) -> ResultEngine<Vec<String>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    let json = raw.strip_prefix(V1_PREFIX).unwrap_or(raw);
    serde_json::from_str::<Vec<String>>(json)
        .map_err(|err| EngineError::invalid("tags", format!("unreadable stored tags: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_form_is_versioned() {
        let tags = vec!["groceries".to_string(), "weekly".to_string()];
        let encoded = encode_tags(&tags).unwrap();
        assert_eq!(encoded, r#"v1:["groceries","weekly"]"#);
        assert_eq!(decode_tags(&encoded).unwrap(), tags);
    }

    #[test]
    fn legacy_rows_still_decode() {
        assert_eq!(decode_tags("").unwrap(), Vec::<String>::new());
        assert_eq!(
            decode_tags(r#"["b","a","b"]"#).unwrap(),
            vec!["b".to_string(), "a".to_string(), "b".to_string()]
        );
        assert!(decode_tags("v1:not json").is_err());
    }

    #[test]
    fn normalize_trims_and_rejects_blank() {
        assert_eq!(
            normalize_tags(vec![" trip ".to_string(), "x".to_string()]).unwrap(),
            vec!["trip".to_string(), "x".to_string()]
        );
        assert!(normalize_tags(vec!["  ".to_string()]).is_err());
        assert!(normalize_tags(vec!["t".repeat(65)]).is_err());
        assert!(normalize_tags(vec!["t".to_string(); 33]).is_err());
    }
}
