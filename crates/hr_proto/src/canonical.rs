//! Canonical JSON
//!
//! Keys sorted lexicographically, no insignificant whitespace, UTF-8,
//! numbers in shortest round-trip form. Achieved by re-serializing through
//! `serde_json::Value`: its object representation is an ordered map keyed
//! by string, and compact output is the serializer default. Struct field
//! order therefore never influences the signed bytes.

use serde::Serialize;

use crate::error::ApiError;

/// Serialize `value` to its canonical JSON string.
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String, ApiError> {
    let tree = serde_json::to_value(value).map_err(|_| ApiError::InvalidEncoding)?;
    serde_json::to_string(&tree).map_err(|_| ApiError::InvalidEncoding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Scrambled {
        zebra: u32,
        apple: &'static str,
        mango: bool,
    }

    #[test]
    fn keys_are_sorted_regardless_of_field_order() {
        let json = to_canonical_json(&Scrambled {
            zebra: 1,
            apple: "a",
            mango: true,
        })
        .unwrap();
        assert_eq!(json, r#"{"apple":"a","mango":true,"zebra":1}"#);
    }

    #[test]
    fn no_insignificant_whitespace() {
        let json = to_canonical_json(&serde_json::json!({"b": [1, 2], "a": {"c": null}})).unwrap();
        assert_eq!(json, r#"{"a":{"c":null},"b":[1,2]}"#);
    }

    #[test]
    fn nested_objects_sort_recursively() {
        let json =
            to_canonical_json(&serde_json::json!({"outer": {"z": 1, "a": 2}, "alpha": 0}))
                .unwrap();
        assert_eq!(json, r#"{"alpha":0,"outer":{"a":2,"z":1}}"#);
    }

    #[test]
    fn identical_logical_values_share_bytes() {
        #[derive(Serialize)]
        struct Other {
            mango: bool,
            apple: &'static str,
            zebra: u32,
        }
        let a = to_canonical_json(&Scrambled {
            zebra: 7,
            apple: "x",
            mango: false,
        })
        .unwrap();
        let b = to_canonical_json(&Other {
            mango: false,
            apple: "x",
            zebra: 7,
        })
        .unwrap();
        assert_eq!(a, b);
    }
}
