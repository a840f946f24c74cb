//! YAML text <-> structured value conversion.
//!
//! Only one format is supported. The codec is bound to a file path so that the
//! extension check happens before any backend I/O, and so errors can name the
//! file they belong to.

use std::path::Path;

use serde_yaml_ng::{Mapping, Value};
use tracing::warn;

use crate::error::{Result, ShelfError};

/// The one recognised file extension.
pub const YAML_EXTENSION: &str = "yaml";

/// Encoder/decoder for a single collection file.
#[derive(Debug, Clone)]
pub struct Codec {
    path: String,
}

impl Codec {
    /// Bind a codec to `path`, failing if its extension isn't supported.
    pub fn for_path(path: &str) -> Result<Self> {
        let extension = Path::new(path).extension().and_then(|ext| ext.to_str());
        if extension != Some(YAML_EXTENSION) {
            return Err(ShelfError::UnsupportedFormat {
                path: path.to_string(),
            });
        }

        Ok(Self {
            path: path.to_string(),
        })
    }

    /// The file path this codec was created for.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Parse a text blob. Empty files decode to `Null`.
    pub fn decode(&self, text: &str) -> Result<Value> {
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_yaml_ng::from_str(text).map_err(|source| ShelfError::Decode {
            path: self.path.clone(),
            source,
        })
    }

    /// Serialize a value to block-style YAML.
    ///
    /// Children of the root sequence or mapping that can't be serialized are
    /// dropped instead of failing the whole file. A root that still can't be
    /// serialized is an error.
    pub fn encode(&self, value: &Value) -> Result<String> {
        let pruned = match value {
            Value::Sequence(items) => Value::Sequence(
                items
                    .iter()
                    .filter(|item| self.keep(item))
                    .cloned()
                    .collect(),
            ),
            Value::Mapping(map) => Value::Mapping(
                map.iter()
                    .filter(|(key, item)| {
                        let mut entry = Mapping::new();
                        entry.insert((*key).clone(), (*item).clone());
                        self.keep(&Value::Mapping(entry))
                    })
                    .map(|(key, item)| (key.clone(), item.clone()))
                    .collect(),
            ),
            other => other.clone(),
        };

        serde_yaml_ng::to_string(&pruned).map_err(|source| ShelfError::Encode {
            path: self.path.clone(),
            source,
        })
    }

    fn keep(&self, value: &Value) -> bool {
        match serde_yaml_ng::to_string(value) {
            Ok(_) => true,
            Err(e) => {
                warn!("Dropping unserializable value from {}: {}", self.path, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> Codec {
        Codec::for_path("views.yaml").unwrap()
    }

    #[test]
    fn test_rejects_other_extensions() {
        for path in ["foo.ini", "foo.json", "foo.yml", "foo", "yaml"] {
            let err = Codec::for_path(path).unwrap_err();
            assert!(
                matches!(err, ShelfError::UnsupportedFormat { .. }),
                "{path} should be rejected"
            );
        }
    }

    #[test]
    fn test_accepts_nested_yaml_paths() {
        let codec = Codec::for_path("data/pokedex.yaml").unwrap();
        assert_eq!(codec.path(), "data/pokedex.yaml");
    }

    #[test]
    fn test_decode_sequence_of_mappings() {
        let value = codec()
            .decode("- key: special\n  title: Special\n  data: []\n- key: global\n")
            .unwrap();

        let items = value.as_sequence().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["key"], Value::from("special"));
        assert_eq!(items[0]["data"], Value::Sequence(vec![]));
        assert_eq!(items[1]["key"], Value::from("global"));
    }

    #[test]
    fn test_decode_empty_is_null() {
        assert_eq!(codec().decode("").unwrap(), Value::Null);
        assert_eq!(codec().decode("  \n").unwrap(), Value::Null);
    }

    #[test]
    fn test_decode_invalid_yaml() {
        let err = codec().decode("key: [unclosed").unwrap_err();
        assert!(matches!(err, ShelfError::Decode { .. }));
    }

    #[test]
    fn test_round_trip_preserves_fragments() {
        let text = "- Title: Foo\n  Height: 2\n  Weight: 8.5\n  Caught: false\n  Tags:\n  - a\n  - b\n- Title: Bar\n  National Pokedex number: 4\n";
        let codec = codec();
        let value = codec.decode(text).unwrap();
        let encoded = codec.encode(&value).unwrap();
        assert_eq!(codec.decode(&encoded).unwrap(), value);
    }

    #[test]
    fn test_encode_is_block_style() {
        let codec = codec();
        let value = codec.decode("[{name: Title, type: Text}]").unwrap();
        let encoded = codec.encode(&value).unwrap();
        assert_eq!(encoded, "- name: Title\n  type: Text\n");
    }

    #[test]
    fn test_encode_drops_unserializable_mapping_entries() {
        let mut complex = Mapping::new();
        complex.insert(Value::from("a"), Value::from(1u64));
        let mut root = Mapping::new();
        root.insert(Value::Mapping(complex), Value::from("complex key"));
        root.insert(Value::from("ok"), Value::from(1u64));

        assert_eq!(codec().encode(&Value::Mapping(root)).unwrap(), "ok: 1\n");
    }

    #[test]
    fn test_encode_drops_unserializable_sequence_items() {
        let mut complex = Mapping::new();
        complex.insert(Value::from("a"), Value::from(1u64));
        let mut bad = Mapping::new();
        bad.insert(Value::Mapping(complex), Value::from("complex key"));
        let mut good = Mapping::new();
        good.insert(Value::from("key"), Value::from("kept"));

        let value = Value::Sequence(vec![Value::Mapping(bad), Value::Mapping(good)]);
        assert_eq!(codec().encode(&value).unwrap(), "- key: kept\n");
    }
}
