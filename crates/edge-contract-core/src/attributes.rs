// crates/edge-contract-core/src/attributes.rs
// ============================================================================
// Module: Typed Attribute Access
// Description: Path-based typed getters over planned or live JSON state.
// Purpose: Fail explicitly on missing attributes and type mismatches.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! Plan `after` states and live describe documents are heterogeneous JSON
//! trees. [`Attributes`] wraps one tree together with the address it belongs
//! to and exposes getters such as [`Attributes::get_str`] and
//! [`Attributes::get_bool`]. A path like `allow[0].ports` addresses nested
//! objects and arrays; every failure names the owning address and the full
//! path so contract messages are actionable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Attribute lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
    /// The path expression is malformed.
    #[error("invalid attribute path {path}: {reason}")]
    InvalidPath {
        /// Path text.
        path: String,
        /// Parse failure reason.
        reason: String,
    },
    /// No value exists at the path.
    #[error("{address}: attribute {path} is not set")]
    Missing {
        /// Owning resource address.
        address: String,
        /// Requested path.
        path: String,
    },
    /// A node along the path has the wrong JSON type to step through.
    #[error("{address}: attribute {path} cannot be resolved: {at} is {actual}, expected {expected}")]
    PathMismatch {
        /// Owning resource address.
        address: String,
        /// Requested path.
        path: String,
        /// Path prefix naming the blocking node.
        at: String,
        /// JSON type the next segment needs.
        expected: &'static str,
        /// Actual JSON type of the blocking node.
        actual: &'static str,
    },
    /// The value exists but has a different JSON type.
    #[error("{address}: attribute {path} is {actual}, expected {expected}")]
    TypeMismatch {
        /// Owning resource address.
        address: String,
        /// Requested path.
        path: String,
        /// Expected JSON type.
        expected: &'static str,
        /// Actual JSON type.
        actual: &'static str,
    },
}

// ============================================================================
// SECTION: Paths
// ============================================================================

/// One step of an attribute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Object key.
    Key(String),
    /// Array index.
    Index(usize),
}

/// Parsed attribute path such as `allow[0].ports`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePath {
    /// Original text.
    raw: String,
    /// Parsed segments.
    segments: Vec<PathSegment>,
}

impl AttributePath {
    /// Parses a dotted path with optional `[n]` array indexes.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::InvalidPath`] for empty keys, unterminated
    /// brackets, or non-numeric indexes.
    pub fn parse(raw: &str) -> Result<Self, AttributeError> {
        let invalid = |reason: &str| AttributeError::InvalidPath {
            path: raw.to_string(),
            reason: reason.to_string(),
        };
        if raw.trim().is_empty() {
            return Err(invalid("path is empty"));
        }
        let mut segments = Vec::new();
        for part in raw.split('.') {
            let (key, mut rest) = part.find('[').map_or((part, ""), |open| part.split_at(open));
            if key.is_empty() {
                if rest.is_empty() || segments.is_empty() {
                    return Err(invalid("empty key segment"));
                }
            } else {
                segments.push(PathSegment::Key(key.to_string()));
            }
            while !rest.is_empty() {
                let Some(body) = rest.strip_prefix('[') else {
                    return Err(invalid("unexpected text after index"));
                };
                let Some(close) = body.find(']') else {
                    return Err(invalid("unterminated index"));
                };
                let index =
                    body[..close].parse::<usize>().map_err(|_| invalid("index is not a number"))?;
                segments.push(PathSegment::Index(index));
                rest = &body[close + 1..];
            }
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Returns the parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Resolves the path against a JSON tree.
    ///
    /// A missing key, an index past the end, or a `null` node along the way
    /// yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeMismatch`] when a node along the path is neither
    /// `null` nor the object or array the next segment needs.
    pub fn resolve<'a>(&self, root: &'a Value) -> Result<Option<&'a Value>, ShapeMismatch> {
        let mut current = root;
        let mut at = String::new();
        for segment in &self.segments {
            let next = match (segment, current) {
                (_, Value::Null) => return Ok(None),
                (PathSegment::Key(key), Value::Object(fields)) => fields.get(key),
                (PathSegment::Index(index), Value::Array(items)) => items.get(*index),
                (PathSegment::Key(_), other) => return Err(ShapeMismatch::new(&at, "object", other)),
                (PathSegment::Index(_), other) => return Err(ShapeMismatch::new(&at, "array", other)),
            };
            let Some(next) = next else {
                return Ok(None);
            };
            match segment {
                PathSegment::Key(key) if at.is_empty() => at.push_str(key),
                PathSegment::Key(key) => {
                    at.push('.');
                    at.push_str(key);
                }
                PathSegment::Index(index) => at.push_str(&format!("[{index}]")),
            }
            current = next;
        }
        Ok(Some(current))
    }
}

/// A node along an attribute path that cannot be stepped through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeMismatch {
    /// Path prefix naming the node; empty for the root.
    pub at: String,
    /// JSON type the next segment needs.
    pub expected: &'static str,
    /// Actual JSON type of the node.
    pub actual: &'static str,
}

impl ShapeMismatch {
    /// Records a mismatch at `at`.
    fn new(at: &str, expected: &'static str, actual: &Value) -> Self {
        Self {
            at: if at.is_empty() { "<root>".to_string() } else { at.to_string() },
            expected,
            actual: json_type_name(actual),
        }
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

// ============================================================================
// SECTION: Accessor
// ============================================================================

/// Typed, read-only accessor over one JSON attribute tree.
#[derive(Debug, Clone, Copy)]
pub struct Attributes<'a> {
    /// Address used in error messages.
    address: &'a str,
    /// Attribute tree.
    root: &'a Value,
}

impl<'a> Attributes<'a> {
    /// Wraps a JSON tree owned by `address`.
    #[must_use]
    pub const fn new(address: &'a str, root: &'a Value) -> Self {
        Self {
            address,
            root,
        }
    }

    /// Returns the owning address.
    #[must_use]
    pub const fn address(&self) -> &'a str {
        self.address
    }

    /// Returns the raw tree.
    #[must_use]
    pub const fn root(&self) -> &'a Value {
        self.root
    }

    /// Returns the value at `path`, or `None` when it is absent.
    ///
    /// JSON `null` is returned as a present value.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::InvalidPath`] when the path is malformed and
    /// [`AttributeError::PathMismatch`] when the path steps through a node of
    /// the wrong type.
    pub fn find(&self, path: &str) -> Result<Option<&'a Value>, AttributeError> {
        AttributePath::parse(path)?.resolve(self.root).map_err(|mismatch| AttributeError::PathMismatch {
            address: self.address.to_string(),
            path: path.to_string(),
            at: mismatch.at,
            expected: mismatch.expected,
            actual: mismatch.actual,
        })
    }

    /// Returns the value at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::Missing`] when no value exists and
    /// [`AttributeError::PathMismatch`] when the path cannot be followed.
    pub fn get(&self, path: &str) -> Result<&'a Value, AttributeError> {
        self.find(path)?.ok_or_else(|| AttributeError::Missing {
            address: self.address.to_string(),
            path: path.to_string(),
        })
    }

    /// Returns a string attribute.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError`] when missing or not a string.
    pub fn get_str(&self, path: &str) -> Result<&'a str, AttributeError> {
        let value = self.get(path)?;
        value.as_str().ok_or_else(|| self.mismatch(path, "string", value))
    }

    /// Returns a boolean attribute.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError`] when missing or not a boolean.
    pub fn get_bool(&self, path: &str) -> Result<bool, AttributeError> {
        let value = self.get(path)?;
        value.as_bool().ok_or_else(|| self.mismatch(path, "boolean", value))
    }

    /// Returns a signed integer attribute.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError`] when missing or not an integer.
    pub fn get_i64(&self, path: &str) -> Result<i64, AttributeError> {
        let value = self.get(path)?;
        value.as_i64().ok_or_else(|| self.mismatch(path, "integer", value))
    }

    /// Returns an array attribute.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError`] when missing or not an array.
    pub fn get_array(&self, path: &str) -> Result<&'a [Value], AttributeError> {
        let value = self.get(path)?;
        value.as_array().map(Vec::as_slice).ok_or_else(|| self.mismatch(path, "array", value))
    }

    /// Returns an object attribute.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError`] when missing or not an object.
    pub fn get_object(&self, path: &str) -> Result<&'a Map<String, Value>, AttributeError> {
        let value = self.get(path)?;
        value.as_object().ok_or_else(|| self.mismatch(path, "object", value))
    }

    /// Returns an array of strings.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError`] when missing, not an array, or when any
    /// element is not a string.
    pub fn get_string_list(&self, path: &str) -> Result<Vec<&'a str>, AttributeError> {
        let items = self.get_array(path)?;
        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let Some(text) = item.as_str() else {
                return Err(self.mismatch(&format!("{path}[{index}]"), "string", item));
            };
            out.push(text);
        }
        Ok(out)
    }

    /// Builds a type mismatch error for `path`.
    fn mismatch(&self, path: &str, expected: &'static str, actual: &Value) -> AttributeError {
        AttributeError::TypeMismatch {
            address: self.address.to_string(),
            path: path.to_string(),
            expected,
            actual: json_type_name(actual),
        }
    }
}

/// Returns the JSON type name of a value.
#[must_use]
pub const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
