//! Property validation against a schema definition.
//!
//! Every constraint kind is evaluated by [`check_property`]; whole property
//! sets go through [`validate_properties`], which reports every violated
//! field rather than stopping at the first.

use std::collections::BTreeMap;

use crate::error::{Result, SchemaError, Violation, ViolationKind};
use crate::schema::{Constraint, PropertySpec, SchemaDefinition};
use crate::value::{Properties, Value};

/// A named predicate referenced by [`Constraint::Custom`].
pub type ValidatorFn = fn(&Value) -> bool;

/// Table of custom validators, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Validators {
    inner: BTreeMap<String, ValidatorFn>,
}

impl Validators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: &str, validator: ValidatorFn) {
        self.inner.insert(id.to_string(), validator);
    }

    pub fn get(&self, id: &str) -> Option<ValidatorFn> {
        self.inner.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.contains_key(id)
    }
}

/// Check one property value against its spec.
///
/// A type mismatch short-circuits the remaining constraints for that field.
pub fn check_property(
    name: &str,
    spec: &PropertySpec,
    value: Option<&Value>,
    validators: &Validators,
) -> Vec<Violation> {
    let Some(value) = value else {
        return if spec.is_required() {
            vec![Violation::new(name, ViolationKind::Missing)]
        } else {
            Vec::new()
        };
    };

    if value.property_type() != spec.kind {
        return vec![Violation::new(
            name,
            ViolationKind::WrongType {
                expected: spec.kind,
                actual: value.property_type(),
            },
        )];
    }

    let mut violations = Vec::new();
    for constraint in &spec.constraints {
        match constraint {
            Constraint::Required => {}
            Constraint::MinLength(min) => {
                let actual = value.as_str().map(|s| s.chars().count()).unwrap_or(0);
                if actual < *min {
                    violations.push(Violation::new(
                        name,
                        ViolationKind::TooShort { min: *min, actual },
                    ));
                }
            }
            Constraint::Minimum(min) => {
                if let Some(actual) = value.as_f64() {
                    if actual.is_nan() || actual < *min {
                        violations.push(Violation::new(
                            name,
                            ViolationKind::BelowMinimum { min: *min, actual },
                        ));
                    }
                }
            }
            Constraint::Custom(id) => {
                let passed = validators.get(id).is_some_and(|validate| validate(value));
                if !passed {
                    violations.push(Violation::new(
                        name,
                        ViolationKind::Custom {
                            validator: id.clone(),
                        },
                    ));
                }
            }
        }
    }
    violations
}

/// Collect every violation of `properties` against `schema`.
pub fn collect_violations(
    schema: &SchemaDefinition,
    properties: &Properties,
    validators: &Validators,
) -> Vec<Violation> {
    let mut violations: Vec<Violation> = properties
        .keys()
        .filter(|name| schema.property(name).is_none())
        .map(|name| Violation::new(name.as_str(), ViolationKind::UnknownField))
        .collect();

    for (name, spec) in schema.properties() {
        violations.extend(check_property(name, spec, properties.get(name), validators));
    }
    violations
}

/// Validate a full property set, failing with every violated field.
pub fn validate_properties(
    schema: &SchemaDefinition,
    properties: &Properties,
    validators: &Validators,
) -> Result<()> {
    let violations = collect_violations(schema, properties, validators);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::Validation {
            label: schema.label().to_string(),
            violations,
        })
    }
}

/// Validate a batch; violation paths are prefixed with the element index.
pub fn validate_batch(
    schema: &SchemaDefinition,
    batch: &[Properties],
    validators: &Validators,
) -> Result<()> {
    let violations: Vec<Violation> = batch
        .iter()
        .enumerate()
        .flat_map(|(index, properties)| {
            collect_violations(schema, properties, validators)
                .into_iter()
                .map(move |v| v.at_index(index))
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::Validation {
            label: schema.label().to_string(),
            violations,
        })
    }
}

/// Validate a single field assignment.
pub fn validate_field(
    schema: &SchemaDefinition,
    name: &str,
    value: &Value,
    validators: &Validators,
) -> Result<()> {
    let spec = schema
        .property(name)
        .ok_or_else(|| SchemaError::UnknownProperty {
            label: schema.label().to_string(),
            property: name.to_string(),
        })?;

    let violations = check_property(name, spec, Some(value), validators);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::Validation {
            label: schema.label().to_string(),
            violations,
        })
    }
}
