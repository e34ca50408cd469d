//! Versioned references: a field that is either inline data or a pointer to
//! another document.

use serde_json::Value;

use crate::validate::{Document, ValidationError};

/// A parsed versioned reference.
///
/// In JSON a reference is a bare string (a URL), an object with a string
/// `url` and an optional `version`, or a value that already has the shape
/// of `T`. Parsing happens once, before resolution, so the resolver only
/// ever matches on this enum.
#[derive(Debug, Clone, PartialEq)]
pub enum VersionedRef<T> {
    Inline(T),
    Remote { url: String, version: Option<String> },
}

impl<T: Document> VersionedRef<T> {
    pub fn parse(value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::String(url) => Ok(Self::Remote { url, version: None }),
            Value::Object(ref map) if map.get("url").is_some_and(Value::is_string) => {
                let url = map
                    .get("url")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let version = match map.get("version") {
                    None | Some(Value::Null) => None,
                    Some(Value::String(s)) => Some(s.clone()),
                    Some(Value::Number(n)) => Some(n.to_string()),
                    Some(other) => {
                        return Err(ValidationError::new(format!(
                            "reference to {url} has an invalid version: {other}"
                        )));
                    }
                };
                Ok(Self::Remote { url, version })
            }
            other => T::from_json(other)
                .map(Self::Inline)
                .map_err(|e| ValidationError::new(format!("Invalid value for schema: {}", e.message))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Core, Release};
    use serde_json::json;

    #[test]
    fn bare_string_is_a_remote_reference() {
        let r = VersionedRef::<Core>::parse(json!("cores/nes.json")).unwrap();
        assert_eq!(
            r,
            VersionedRef::Remote {
                url: "cores/nes.json".into(),
                version: None
            }
        );
    }

    #[test]
    fn url_and_version_object() {
        let r = VersionedRef::<Core>::parse(json!({ "url": "nes.json", "version": "1.2" })).unwrap();
        assert_eq!(
            r,
            VersionedRef::Remote {
                url: "nes.json".into(),
                version: Some("1.2".into())
            }
        );

        let numeric = VersionedRef::<Core>::parse(json!({ "url": "nes.json", "version": 4 })).unwrap();
        assert!(matches!(numeric, VersionedRef::Remote { version: Some(v), .. } if v == "4"));
    }

    #[test]
    fn inline_value_matching_schema() {
        let r = VersionedRef::<Vec<Release>>::parse(json!([{ "files": [], "version": "1.0" }]))
            .unwrap();
        match r {
            VersionedRef::Inline(releases) => assert_eq!(releases.len(), 1),
            other => panic!("expected inline, got {other:?}"),
        }
    }

    #[test]
    fn non_conforming_value_is_a_validation_error() {
        assert!(VersionedRef::<Core>::parse(json!(42)).is_err());
        assert!(VersionedRef::<Core>::parse(json!({ "name": "no unique name" })).is_err());
    }
}
