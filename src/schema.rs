use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("unsupported schema kind '{kind}' at {path}")]
    UnsupportedKind { path: String, kind: String },

    #[error("required name '{name}' at {path} has no matching property")]
    UnknownRequired { path: String, name: String },

    #[error("schema serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    String,
    Integer,
    Number,
    Boolean,
}

/// Structural description of a parameter or return shape.
///
/// The union is closed: external schema documents are converted once, at the
/// boundary ([`FieldSchema::from_json_value`]), and everything past that point
/// dispatches on the tag alone. Object property order is insertion order and
/// is significant for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldSchema {
    Primitive {
        kind: PrimitiveKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        enum_values: Vec<String>,
    },
    Object {
        #[serde(default)]
        properties: Vec<(String, FieldSchema)>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        required: Vec<String>,
    },
    Array {
        item: Box<FieldSchema>,
    },
}

impl FieldSchema {
    pub fn string() -> Self {
        Self::primitive(PrimitiveKind::String)
    }

    pub fn integer() -> Self {
        Self::primitive(PrimitiveKind::Integer)
    }

    pub fn number() -> Self {
        Self::primitive(PrimitiveKind::Number)
    }

    pub fn boolean() -> Self {
        Self::primitive(PrimitiveKind::Boolean)
    }

    fn primitive(kind: PrimitiveKind) -> Self {
        Self::Primitive {
            kind,
            description: None,
            enum_values: Vec::new(),
        }
    }

    pub fn object() -> Self {
        Self::Object {
            properties: Vec::new(),
            required: Vec::new(),
        }
    }

    pub fn array(item: FieldSchema) -> Self {
        Self::Array { item: Box::new(item) }
    }

    /// Attach a description. No effect on object or array schemas.
    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        if let Self::Primitive { description, .. } = &mut self {
            *description = Some(text.into());
        }
        self
    }

    /// Constrain a primitive to a closed, ordered set of string values.
    pub fn with_enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Self::Primitive { enum_values, .. } = &mut self {
            *enum_values = values.into_iter().map(Into::into).collect();
        }
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, schema: FieldSchema) -> Self {
        if let Self::Object { properties, .. } = &mut self {
            properties.push((name.into(), schema));
        }
        self
    }

    pub fn with_required_property(mut self, name: impl Into<String>, schema: FieldSchema) -> Self {
        let name = name.into();
        if let Self::Object { properties, required } = &mut self {
            properties.push((name.clone(), schema));
            required.push(name);
        }
        self
    }

    pub fn is_required(&self, name: &str) -> bool {
        match self {
            Self::Object { required, .. } => required.iter().any(|entry| entry == name),
            _ => false,
        }
    }

    /// Derive a schema from a Rust type's JSON schema.
    pub fn of<T: schemars::JsonSchema>() -> Result<Self, SchemaError> {
        let schema = schemars::schema_for!(T);
        let value = serde_json::to_value(schema.schema)?;
        Self::from_json_value(&value)
    }

    /// Convert an externally supplied JSON Schema document.
    ///
    /// This is the single open-world boundary: unknown or unsupported `type`
    /// tags fail with [`SchemaError::UnsupportedKind`] naming the offending
    /// path, never a silent fallback.
    pub fn from_json_value(value: &Value) -> Result<Self, SchemaError> {
        convert(value, "$")
    }
}

fn convert(value: &Value, path: &str) -> Result<FieldSchema, SchemaError> {
    let Some(object) = value.as_object() else {
        return Err(SchemaError::UnsupportedKind {
            path: path.to_string(),
            kind: json_kind(value).to_string(),
        });
    };

    let kind = type_tag(object.get("type"), path)?;
    let description = object
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);

    match kind.as_str() {
        "string" | "integer" | "number" | "boolean" => {
            let primitive = match kind.as_str() {
                "string" => PrimitiveKind::String,
                "integer" => PrimitiveKind::Integer,
                "number" => PrimitiveKind::Number,
                _ => PrimitiveKind::Boolean,
            };
            let enum_values = enum_values(object.get("enum"), path)?;
            Ok(FieldSchema::Primitive {
                kind: primitive,
                description,
                enum_values,
            })
        }
        "object" => {
            let mut properties = Vec::new();
            if let Some(Value::Object(map)) = object.get("properties") {
                for (name, child) in map {
                    let child_path = format!("{path}.{name}");
                    properties.push((name.clone(), convert(child, &child_path)?));
                }
            }

            let mut required = Vec::new();
            if let Some(Value::Array(names)) = object.get("required") {
                for name in names {
                    let Some(name) = name.as_str() else {
                        return Err(SchemaError::UnsupportedKind {
                            path: path.to_string(),
                            kind: "non-string required entry".to_string(),
                        });
                    };
                    if !properties.iter().any(|(known, _)| known == name) {
                        return Err(SchemaError::UnknownRequired {
                            path: path.to_string(),
                            name: name.to_string(),
                        });
                    }
                    required.push(name.to_string());
                }
            }

            Ok(FieldSchema::Object { properties, required })
        }
        "array" => {
            let Some(items) = object.get("items") else {
                return Err(SchemaError::UnsupportedKind {
                    path: path.to_string(),
                    kind: "array without items".to_string(),
                });
            };
            let item = convert(items, &format!("{path}[]"))?;
            Ok(FieldSchema::Array { item: Box::new(item) })
        }
        other => Err(SchemaError::UnsupportedKind {
            path: path.to_string(),
            kind: other.to_string(),
        }),
    }
}

/// Resolve the `type` tag. Nullable unions like `["string", "null"]` (the
/// shape schemars emits for `Option<T>`) collapse to their non-null member.
fn type_tag(tag: Option<&Value>, path: &str) -> Result<String, SchemaError> {
    match tag {
        Some(Value::String(kind)) => Ok(kind.clone()),
        Some(Value::Array(kinds)) => {
            let mut non_null = kinds
                .iter()
                .filter_map(Value::as_str)
                .filter(|kind| *kind != "null");
            match (non_null.next(), non_null.next()) {
                (Some(kind), None) => Ok(kind.to_string()),
                _ => Err(SchemaError::UnsupportedKind {
                    path: path.to_string(),
                    kind: "ambiguous type union".to_string(),
                }),
            }
        }
        _ => Err(SchemaError::UnsupportedKind {
            path: path.to_string(),
            kind: "untyped".to_string(),
        }),
    }
}

fn enum_values(values: Option<&Value>, path: &str) -> Result<Vec<String>, SchemaError> {
    let Some(Value::Array(values)) = values else {
        return Ok(Vec::new());
    };

    let mut out = Vec::with_capacity(values.len());
    for value in values {
        let Some(text) = value.as_str() else {
            return Err(SchemaError::UnsupportedKind {
                path: path.to_string(),
                kind: "non-string enum value".to_string(),
            });
        };
        out.push(text.to_string());
    }
    Ok(out)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
