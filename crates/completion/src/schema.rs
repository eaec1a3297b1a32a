//! Minimal object-schema validation for completion output.
//!
//! Completions are only ever trusted after passing this check; callers
//! additionally re-validate domain values (the extractor runs every
//! returned slot through its normalizer).

use serde_json::Value;

use pl_domain::error::{Error, Result};

/// Expected JSON type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Bool,
    Object,
    Array,
}

impl FieldType {
    fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Bool => value.is_boolean(),
            FieldType::Object => value.is_object(),
            FieldType::Array => value.is_array(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Bool => "bool",
            FieldType::Object => "object",
            FieldType::Array => "array",
        }
    }
}

/// An object schema: required and optional typed fields.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    required: Vec<(String, FieldType)>,
    optional: Vec<(String, FieldType)>,
}

impl Schema {
    pub fn object() -> Self {
        Self::default()
    }

    pub fn required(mut self, field: &str, ty: FieldType) -> Self {
        self.required.push((field.to_owned(), ty));
        self
    }

    pub fn optional(mut self, field: &str, ty: FieldType) -> Self {
        self.optional.push((field.to_owned(), ty));
        self
    }

    /// Validate a value against the schema.
    pub fn validate(&self, value: &Value) -> Result<()> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::Validation("completion output is not an object".into()))?;

        for (field, ty) in &self.required {
            match obj.get(field) {
                None => {
                    return Err(Error::Validation(format!(
                        "completion output is missing required field {field}"
                    )));
                }
                Some(v) if !ty.matches(v) => {
                    return Err(Error::Validation(format!(
                        "completion field {field} is not a {}",
                        ty.name()
                    )));
                }
                Some(_) => {}
            }
        }

        for (field, ty) in &self.optional {
            if let Some(v) = obj.get(field) {
                if !v.is_null() && !ty.matches(v) {
                    return Err(Error::Validation(format!(
                        "completion field {field} is not a {}",
                        ty.name()
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn step_schema() -> Schema {
        Schema::object()
            .required("step_index", FieldType::Number)
            .required("step_type", FieldType::String)
            .required("instructions", FieldType::String)
            .optional("targets", FieldType::Object)
    }

    #[test]
    fn accepts_conforming_object() {
        let value = json!({
            "step_index": 0,
            "step_type": "warmup",
            "instructions": "15 min easy",
            "targets": {"pace": "easy"}
        });
        assert!(step_schema().validate(&value).is_ok());
    }

    #[test]
    fn rejects_missing_required_field() {
        let value = json!({"step_index": 0, "step_type": "warmup"});
        assert!(step_schema().validate(&value).is_err());
    }

    #[test]
    fn rejects_wrong_type() {
        let value = json!({
            "step_index": "zero",
            "step_type": "warmup",
            "instructions": "x"
        });
        assert!(step_schema().validate(&value).is_err());
    }

    #[test]
    fn optional_null_is_tolerated() {
        let value = json!({
            "step_index": 1,
            "step_type": "cooldown",
            "instructions": "10 min jog",
            "targets": null
        });
        assert!(step_schema().validate(&value).is_ok());
    }
}
