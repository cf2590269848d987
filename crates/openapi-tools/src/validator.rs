//! Tool argument validation against the published input schema.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// One problem with a set of tool arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Violation {
    ArgumentsNotAnObject,
    #[serde(rename_all = "camelCase")]
    MissingRequiredParameter { parameter: String },
    #[serde(rename_all = "camelCase")]
    ConstraintViolation {
        parameter: String,
        message: String,
        instance_path: String,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArgumentsNotAnObject => write!(f, "arguments must be a JSON object"),
            Self::MissingRequiredParameter { parameter } => {
                write!(f, "missing required parameter '{parameter}'")
            }
            Self::ConstraintViolation {
                parameter,
                message,
                ..
            } => write!(f, "parameter '{parameter}': {message}"),
        }
    }
}

/// Compiled per-property validators for one tool.
pub struct InputValidator {
    properties: Vec<(String, Option<jsonschema::Validator>)>,
    required: Vec<String>,
}

impl fmt::Debug for InputValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let compiled: Vec<&str> = self
            .properties
            .iter()
            .filter(|(_, v)| v.is_some())
            .map(|(name, _)| name.as_str())
            .collect();
        f.debug_struct("InputValidator")
            .field("compiled", &compiled)
            .field("required", &self.required)
            .finish()
    }
}

impl InputValidator {
    /// Compile validators for each top-level property of an object schema.
    ///
    /// A property whose schema does not compile is left unvalidated.
    #[must_use]
    pub fn compile(schema: &Value) -> Self {
        let properties = schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(name, prop_schema)| {
                        let compiled = match jsonschema::validator_for(prop_schema) {
                            Ok(v) => Some(v),
                            Err(e) => {
                                tracing::warn!(
                                    parameter = %name,
                                    error = %e,
                                    "input schema property does not compile; leaving it unvalidated"
                                );
                                None
                            }
                        };
                        (name.clone(), compiled)
                    })
                    .collect()
            })
            .unwrap_or_default();

        let required = schema
            .get("required")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();

        Self {
            properties,
            required,
        }
    }

    #[must_use]
    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Check `arguments`. Properties the schema does not declare are accepted as-is.
    ///
    /// # Errors
    ///
    /// Returns every violation found.
    pub fn validate(&self, arguments: &Value) -> Result<(), Vec<Violation>> {
        let Some(args) = arguments.as_object() else {
            return Err(vec![Violation::ArgumentsNotAnObject]);
        };

        let mut violations: Vec<Violation> = self
            .required
            .iter()
            .filter(|r| !args.contains_key(r.as_str()))
            .map(|r| Violation::MissingRequiredParameter {
                parameter: r.clone(),
            })
            .collect();

        for (name, validator) in &self.properties {
            let (Some(validator), Some(value)) = (validator, args.get(name)) else {
                continue;
            };
            for e in validator.iter_errors(value) {
                violations.push(Violation::ConstraintViolation {
                    parameter: name.clone(),
                    message: e.to_string(),
                    instance_path: format!("/{name}{}", e.instance_path()),
                });
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}
