use serde_json::{json, Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("missing required field `{0}`")]
    MissingField(String),
    #[error("field `{field}` must be a {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },
    #[error("field `{field}` must be at least {min}, got {value}")]
    BelowMinimum { field: String, value: f64, min: f64 },
    #[error("field `{field}` must be at most {max}, got {value}")]
    AboveMaximum { field: String, value: f64, max: f64 },
    #[error("field `{field}` must be {expected} characters long, got {length}")]
    InvalidLength {
        field: String,
        length: usize,
        expected: String,
    },
    #[error("field `{field}` must be one of [{allowed}], got `{value}`")]
    NotAllowed {
        field: String,
        value: String,
        allowed: String,
    },
}

impl ValidationError {
    pub fn field(&self) -> &str {
        match self {
            ValidationError::MissingField(field) => field,
            ValidationError::WrongType { field, .. }
            | ValidationError::BelowMinimum { field, .. }
            | ValidationError::AboveMaximum { field, .. }
            | ValidationError::InvalidLength { field, .. }
            | ValidationError::NotAllowed { field, .. } => field,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Enum(Vec<String>),
}

impl FieldKind {
    pub fn json_type(&self) -> &'static str {
        match self {
            FieldKind::String | FieldKind::Enum(_) => "string",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

/// Fields are optional unless [`FieldSpec::required`] is called.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<Value>,
    pub constraints: Constraints,
    pub description: String,
}

impl FieldSpec {
    fn new(kind: FieldKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            required: false,
            default: None,
            constraints: Constraints::default(),
            description: description.into(),
        }
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::new(FieldKind::String, description)
    }

    pub fn number(description: impl Into<String>) -> Self {
        Self::new(FieldKind::Number, description)
    }

    pub fn boolean(description: impl Into<String>) -> Self {
        Self::new(FieldKind::Boolean, description)
    }

    pub fn one_of<I, S>(allowed: I, description: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowed = allowed.into_iter().map(Into::into).collect();
        Self::new(FieldKind::Enum(allowed), description)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.constraints.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.constraints.max = Some(max);
        self
    }

    pub fn range(self, min: f64, max: f64) -> Self {
        self.min(min).max(max)
    }

    pub fn length(mut self, length: usize) -> Self {
        self.constraints.min_length = Some(length);
        self.constraints.max_length = Some(length);
        self
    }

    pub fn min_length(mut self, length: usize) -> Self {
        self.constraints.min_length = Some(length);
        self
    }

    pub fn max_length(mut self, length: usize) -> Self {
        self.constraints.max_length = Some(length);
        self
    }

    fn check(&self, name: &str, value: &Value) -> Result<(), ValidationError> {
        let wrong_type = || ValidationError::WrongType {
            field: name.to_string(),
            expected: self.kind.json_type(),
        };

        match &self.kind {
            FieldKind::Boolean => value.as_bool().map(|_| ()).ok_or_else(wrong_type),
            FieldKind::Number => {
                let number = value.as_f64().ok_or_else(wrong_type)?;
                self.check_range(name, number)
            }
            FieldKind::String => {
                let text = value.as_str().ok_or_else(wrong_type)?;
                self.check_length(name, text)
            }
            FieldKind::Enum(allowed) => {
                let text = value.as_str().ok_or_else(wrong_type)?;
                if allowed.iter().any(|a| a == text) {
                    Ok(())
                } else {
                    Err(ValidationError::NotAllowed {
                        field: name.to_string(),
                        value: text.to_string(),
                        allowed: allowed.join(", "),
                    })
                }
            }
        }
    }

    fn check_range(&self, name: &str, value: f64) -> Result<(), ValidationError> {
        if let Some(min) = self.constraints.min.filter(|min| value < *min) {
            return Err(ValidationError::BelowMinimum {
                field: name.to_string(),
                value,
                min,
            });
        }
        if let Some(max) = self.constraints.max.filter(|max| value > *max) {
            return Err(ValidationError::AboveMaximum {
                field: name.to_string(),
                value,
                max,
            });
        }
        Ok(())
    }

    fn check_length(&self, name: &str, text: &str) -> Result<(), ValidationError> {
        let length = text.chars().count();
        let Constraints {
            min_length,
            max_length,
            ..
        } = self.constraints;

        let too_short = min_length.is_some_and(|min| length < min);
        let too_long = max_length.is_some_and(|max| length > max);
        if !too_short && !too_long {
            return Ok(());
        }

        let expected = match (min_length, max_length) {
            (Some(min), Some(max)) if min == max => format!("exactly {}", min),
            (Some(min), Some(max)) => format!("between {} and {}", min, max),
            (Some(min), None) => format!("at least {}", min),
            (None, Some(max)) => format!("at most {}", max),
            (None, None) => unreachable!("length checked without bounds"),
        };
        Err(ValidationError::InvalidLength {
            field: name.to_string(),
            length,
            expected,
        })
    }

    fn to_json_schema(&self) -> Value {
        let mut prop = Map::new();
        prop.insert("type".to_string(), json!(self.kind.json_type()));
        prop.insert("description".to_string(), json!(self.description));
        if let FieldKind::Enum(allowed) = &self.kind {
            prop.insert("enum".to_string(), json!(allowed));
        }
        if let Some(min) = self.constraints.min {
            prop.insert("minimum".to_string(), json!(min));
        }
        if let Some(max) = self.constraints.max {
            prop.insert("maximum".to_string(), json!(max));
        }
        if let Some(min) = self.constraints.min_length {
            prop.insert("minLength".to_string(), json!(min));
        }
        if let Some(max) = self.constraints.max_length {
            prop.insert("maxLength".to_string(), json!(max));
        }
        if let Some(default) = &self.default {
            prop.insert("default".to_string(), default.clone());
        }
        Value::Object(prop)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: Vec<(String, FieldSpec)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, replacing any earlier field of the same name.
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = spec,
            None => self.fields.push((name, spec)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, spec)| spec)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn validate(&self, raw: &Map<String, Value>) -> Result<Map<String, Value>, ValidationError> {
        validate(raw, self)
    }

    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, spec)| (name.clone(), spec.to_json_schema()))
            .collect();
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Checks `raw` against `schema` and returns only the declared fields, with
/// defaults filled in. Undeclared fields are dropped; an explicit `null` on an
/// optional field counts as absent.
pub fn validate(
    raw: &Map<String, Value>,
    schema: &Schema,
) -> Result<Map<String, Value>, ValidationError> {
    let mut validated = Map::new();

    for (name, spec) in schema.fields() {
        match raw.get(name).filter(|value| !value.is_null()) {
            Some(value) => {
                spec.check(name, value)?;
                validated.insert(name.to_string(), value.clone());
            }
            None if spec.required => {
                return Err(ValidationError::MissingField(name.to_string()));
            }
            None => {
                if let Some(default) = &spec.default {
                    validated.insert(name.to_string(), default.clone());
                }
            }
        }
    }

    Ok(validated)
}
