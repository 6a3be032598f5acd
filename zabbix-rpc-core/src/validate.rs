use crate::entity::{HistoryItem, ShapeError};
use schemars::{schema_for, JsonSchema};
use serde_json::Value;
use std::sync::LazyLock;

pub struct Validator {
    schema: jsonschema::Validator,
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator").finish_non_exhaustive()
    }
}

impl Validator {
    pub fn new(schema: Value) -> Result<Self, ShapeError> {
        let compiled = jsonschema::validator_for(&schema)
            .map_err(|e| ShapeError::Schema(vec![format!("invalid schema: {}", e)]))?;
        Ok(Validator { schema: compiled })
    }

    pub fn from_type<T: JsonSchema>() -> Result<Self, ShapeError> {
        let schema = schema_for!(T);
        let schema_value = serde_json::to_value(schema)?;
        Self::new(schema_value)
    }

    pub fn validate(&self, value: &Value) -> Result<(), ShapeError> {
        let errors: Vec<String> = self
            .schema
            .iter_errors(value)
            .map(|e| e.to_string())
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ShapeError::Schema(errors))
        }
    }

    pub fn is_valid(&self, value: &Value) -> bool {
        self.schema.is_valid(value)
    }
}

static HISTORY_VALIDATOR: LazyLock<Result<Validator, String>> =
    LazyLock::new(|| Validator::from_type::<Vec<HistoryItem>>().map_err(|e| e.to_string()));

/// Checks a `history.*` result payload against the schema of `Vec<HistoryItem>`.
pub fn validate_history(result: &Value) -> Result<(), ShapeError> {
    match &*HISTORY_VALIDATOR {
        Ok(validator) => validator.validate(result),
        Err(e) => Err(ShapeError::Schema(vec![e.clone()])),
    }
}
