//! Composite resource identifiers
//!
//! Some resources are addressed by several keys at once (instance + account +
//! host, cluster + topic, ...). They are persisted as one opaque string with
//! the parts joined by a reserved delimiter, `#` unless configured otherwise.
//!
//! ```rust
//! use convergent_domain::CompositeIdCodec;
//!
//! let codec = CompositeIdCodec::default();
//! let id = codec.encode(&["ins-1", "admin", "%"]).unwrap();
//! assert_eq!(id, "ins-1#admin#%");
//! assert_eq!(codec.decode(&id, 3).unwrap(), vec!["ins-1", "admin", "%"]);
//! assert!(codec.decode(&id, 2).is_err());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::FIELD_DELIMITER;
use crate::errors::{ConvergeError, Result};

/// Encoder/decoder for delimited composite identifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeIdCodec {
    delimiter: String,
}

impl Default for CompositeIdCodec {
    fn default() -> Self {
        Self { delimiter: FIELD_DELIMITER.to_string() }
    }
}

impl CompositeIdCodec {
    /// Codec with a custom delimiter
    pub fn new(delimiter: impl Into<String>) -> Result<Self> {
        let delimiter = delimiter.into();
        if delimiter.is_empty() {
            return Err(ConvergeError::Config("composite id delimiter must not be empty".into()));
        }
        Ok(Self { delimiter })
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Join `parts` with the delimiter
    ///
    /// Fails if there are no parts, or if any part contains the delimiter,
    /// since such an id could not be decoded back to the same parts. Empty
    /// parts are kept as-is.
    pub fn encode<S: AsRef<str>>(&self, parts: &[S]) -> Result<String> {
        if parts.is_empty() {
            return Err(ConvergeError::malformed("", "no parts to encode"));
        }

        for (index, part) in parts.iter().enumerate() {
            let part = part.as_ref();
            if part.contains(&self.delimiter) {
                return Err(ConvergeError::malformed(
                    self.join_lossy(parts),
                    format!("part {index} ('{part}') contains the delimiter '{}'", self.delimiter),
                ));
            }
        }

        Ok(self.join_lossy(parts))
    }

    /// Split `id` and check it has exactly `arity` parts
    pub fn decode(&self, id: &str, arity: usize) -> Result<Vec<String>> {
        let parts: Vec<String> = id.split(self.delimiter.as_str()).map(str::to_string).collect();

        if parts.len() != arity {
            return Err(ConvergeError::malformed(
                id,
                format!("expected {arity} parts separated by '{}', found {}", self.delimiter, parts.len()),
            ));
        }

        Ok(parts)
    }

    fn join_lossy<S: AsRef<str>>(&self, parts: &[S]) -> String {
        parts.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(&self.delimiter)
    }
}

/// A decoded composite identifier using the default delimiter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CompositeId {
    parts: Vec<String>,
}

impl CompositeId {
    /// Build from parts, validating them
    pub fn new<S: AsRef<str>>(parts: &[S]) -> Result<Self> {
        CompositeIdCodec::default().encode(parts)?;
        Ok(Self { parts: parts.iter().map(|p| p.as_ref().to_string()).collect() })
    }

    /// Parse an id that must have exactly `arity` parts
    pub fn parse(id: &str, arity: usize) -> Result<Self> {
        Ok(Self { parts: CompositeIdCodec::default().decode(id, arity)? })
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    pub fn arity(&self) -> usize {
        self.parts.len()
    }

    /// Part at `index`, if present
    pub fn part(&self, index: usize) -> Option<&str> {
        self.parts.get(index).map(String::as_str)
    }
}

impl fmt::Display for CompositeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parts.join(FIELD_DELIMITER))
    }
}

impl TryFrom<String> for CompositeId {
    type Error = ConvergeError;

    fn try_from(value: String) -> Result<Self> {
        let arity = value.split(FIELD_DELIMITER).count();
        Self::parse(&value, arity)
    }
}

impl From<CompositeId> for String {
    fn from(value: CompositeId) -> Self {
        value.to_string()
    }
}
