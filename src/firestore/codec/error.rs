use crate::firestore::models::FieldType;
use std::fmt::Display;
use thiserror::Error;

/// Errors raised while turning wire fields into a model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The wire tag does not match the declared type of the target field.
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: FieldType,
    },
    #[error("invalid integer value '{0}'")]
    InvalidInteger(String),
    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),
    #[error("invalid reference '{0}'")]
    InvalidReference(String),
    #[error("invalid bytes value: {0}")]
    InvalidBytes(String),
    /// The error occurred below a field or array element.
    #[error("at `{path}`: {source}")]
    AtPath {
        path: String,
        #[source]
        source: Box<DecodeError>,
    },
    #[error("{0}")]
    Message(String),
}

impl DecodeError {
    pub(crate) fn mismatch(expected: &'static str, found: FieldType) -> Self {
        DecodeError::TypeMismatch { expected, found }
    }

    /// Prefixes the error location with a map key.
    pub(crate) fn in_field(self, key: &str) -> Self {
        match self {
            DecodeError::AtPath { path, source } => {
                let path = if path.starts_with('[') {
                    format!("{}{}", key, path)
                } else {
                    format!("{}.{}", key, path)
                };
                DecodeError::AtPath { path, source }
            }
            other => DecodeError::AtPath {
                path: key.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Prefixes the error location with an array index.
    pub(crate) fn in_element(self, index: usize) -> Self {
        match self {
            DecodeError::AtPath { path, source } => {
                let path = if path.starts_with('[') {
                    format!("[{}]{}", index, path)
                } else {
                    format!("[{}].{}", index, path)
                };
                DecodeError::AtPath { path, source }
            }
            other => DecodeError::AtPath {
                path: format!("[{}]", index),
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, without location.
    pub fn root_cause(&self) -> &DecodeError {
        match self {
            DecodeError::AtPath { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// The field path the error occurred at, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            DecodeError::AtPath { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl serde::de::Error for DecodeError {
    fn custom<T: Display>(msg: T) -> Self {
        DecodeError::Message(msg.to_string())
    }
}

/// Errors raised while turning a model into wire fields.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    #[error("documents must serialize to a map, got {0}")]
    NotAMap(FieldType),
    #[error("map keys must be strings, got {0}")]
    InvalidKey(FieldType),
    #[error("integer {0} does not fit into a 64-bit signed integer")]
    IntegerOverflow(String),
    #[error("{0}")]
    Message(String),
}

impl serde::ser::Error for EncodeError {
    fn custom<T: Display>(msg: T) -> Self {
        EncodeError::Message(msg.to_string())
    }
}
