//! Decoding of structured (hash) permission records.
//!
//! A structured record is a hash holding at least a `data` field (the
//! decision payload) and a `version` field. Decoding never fails by error;
//! it yields a [`HashShape`] and the caller decides what each shape means.

use std::string::FromUtf8Error;

/// Hash field holding the decision payload.
pub const DATA_FIELD: &str = "data";
/// Hash field holding the record version.
pub const VERSION_FIELD: &str = "version";

/// A decoded structured record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRecord {
    pub data: String,
    /// Required to be present, otherwise unused by decision logic.
    pub version: String,
}

/// Outcome of decoding the field set returned by a hash read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashShape {
    /// Both required fields were present.
    Decoded(RemoteRecord),
    /// The hash read succeeded but returned no fields.
    Empty,
    /// Fields were returned but a required one was missing.
    Malformed {
        /// Name of the first required field that was not found.
        missing: &'static str,
    },
}

/// Decode hash field/value pairs.
///
/// Fields may arrive in any order and unknown fields are ignored. If a field
/// appears more than once the last occurrence wins.
pub fn decode_hash(fields: &[(String, String)]) -> HashShape {
    if fields.is_empty() {
        return HashShape::Empty;
    }

    let mut data = None;
    let mut version = None;
    for (field, value) in fields {
        match field.as_str() {
            DATA_FIELD => data = Some(value),
            VERSION_FIELD => version = Some(value),
            _ => {}
        }
    }

    match (data, version) {
        (Some(data), Some(version)) => HashShape::Decoded(RemoteRecord {
            data: data.clone(),
            version: version.clone(),
        }),
        (None, _) => HashShape::Malformed {
            missing: DATA_FIELD,
        },
        (Some(_), None) => HashShape::Malformed {
            missing: VERSION_FIELD,
        },
    }
}

/// Pair up a flat `[field, value, field, value, ...]` reply.
///
/// A trailing field without a value is dropped. Fails if any field or value
/// is not valid UTF-8.
pub fn pair_fields(flat: Vec<Vec<u8>>) -> Result<Vec<(String, String)>, FromUtf8Error> {
    let mut pairs = Vec::with_capacity(flat.len() / 2);
    let mut iter = flat.into_iter();
    while let (Some(field), Some(value)) = (iter.next(), iter.next()) {
        pairs.push((String::from_utf8(field)?, String::from_utf8(value)?));
    }
    Ok(pairs)
}
