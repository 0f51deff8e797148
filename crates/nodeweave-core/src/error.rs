use std::fmt;

use thiserror::Error;

use crate::value::PropertyType;

/// Errors raised while defining schemas or validating properties against them.
///
/// None of these require a database round-trip: they are raised before any
/// query is sent.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Invalid schema definition for {label}: {reason}")]
    InvalidDefinition { label: String, reason: String },

    #[error("{label} failed validation: {}", format_violations(.violations))]
    Validation {
        label: String,
        violations: Vec<Violation>,
    },

    #[error("Relationship alias {alias} is already registered on {label}")]
    DuplicateAlias { label: String, alias: String },

    #[error("Relationship alias {alias} is not registered on {label}")]
    UnresolvedRelationship { label: String, alias: String },

    #[error("Unknown schema: {label}")]
    UnknownSchema { label: String },

    #[error("Unknown property {property} on {label}")]
    UnknownProperty { label: String, property: String },

    #[error("Unknown validator {validator} referenced by {label}.{property}")]
    UnknownValidator {
        label: String,
        property: String,
        validator: String,
    },
}

impl SchemaError {
    /// The violations carried by a `Validation` error, empty for every other variant.
    pub fn violations(&self) -> &[Violation] {
        match self {
            SchemaError::Validation { violations, .. } => violations,
            _ => &[],
        }
    }
}

/// A single failed property check.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Property name, prefixed with `[index].` when it belongs to a batch element.
    pub path: String,
    pub kind: ViolationKind,
}

impl Violation {
    pub fn new(path: impl Into<String>, kind: ViolationKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Re-root this violation under a batch element index.
    pub fn at_index(self, index: usize) -> Self {
        Self {
            path: format!("[{index}].{}", self.path),
            kind: self.kind,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.kind)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViolationKind {
    Missing,
    UnknownField,
    WrongType {
        expected: PropertyType,
        actual: PropertyType,
    },
    TooShort {
        min: usize,
        actual: usize,
    },
    BelowMinimum {
        min: f64,
        actual: f64,
    },
    Custom {
        validator: String,
    },
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::Missing => write!(f, "is required"),
            ViolationKind::UnknownField => write!(f, "is not part of the schema"),
            ViolationKind::WrongType { expected, actual } => {
                write!(f, "expected {expected}, got {actual}")
            }
            ViolationKind::TooShort { min, actual } => {
                write!(f, "length {actual} is shorter than {min}")
            }
            ViolationKind::BelowMinimum { min, actual } => {
                write!(f, "{actual} is below the minimum of {min}")
            }
            ViolationKind::Custom { validator } => write!(f, "rejected by validator {validator}"),
        }
    }
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, SchemaError>;
