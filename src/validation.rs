//! Validator adapter contract (§4.H). The core never references a concrete schema
//! library; it only consumes this trait, the way the teacher's `security` module
//! exposes `SecurityProvider` as a capability seam for something it doesn't implement.

use serde_json::Value;

use crate::error::{DispatchError, FieldError, ValidationException};

/// A named validation schema registry. `name` identifies a schema the way a
/// `ParamDescriptor::validation` field names one (§4.B).
pub trait Validator: Send + Sync {
    fn has_validation(&self, name: &str) -> bool;

    /// Validate `value` against the schema named `name`. Returns the (possibly
    /// coerced) data on success, or field-level errors on failure.
    fn validate(&self, name: &str, value: Value) -> Result<Value, Vec<FieldError>>;

    /// As [`validate`](Self::validate), but raises [`ValidationException`] on failure
    /// (§4.H: "raises `ValidationException` on failure").
    fn validate_or_throw(&self, name: &str, value: Value) -> Result<Value, DispatchError> {
        self.validate(name, value)
            .map_err(|errors| DispatchError::from(ValidationException::new(errors)))
    }
}

/// Validator with no registered schemas; every lookup and validation is a no-op pass
/// through. Used when the application does not wire a concrete adapter.
pub struct NullValidator;

impl Validator for NullValidator {
    fn has_validation(&self, _name: &str) -> bool {
        false
    }

    fn validate(&self, _name: &str, value: Value) -> Result<Value, Vec<FieldError>> {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_validator_passes_everything_through() {
        let v = NullValidator;
        assert!(!v.has_validation("anything"));
        assert_eq!(v.validate("anything", Value::Bool(true)).unwrap(), Value::Bool(true));
    }
}
