use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::schema::{FieldSchema, PrimitiveKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    Text,
    Integer,
    Decimal,
    Toggle,
    Choice,
    Group,
    List,
}

/// Dotted/indexed field address, e.g. `config.tags[]` or `config.tags[2]`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self { segments }
    }

    /// Address of the array item template: the last segment gains `[]`.
    pub fn item_template(&self) -> Self {
        self.with_suffix("[]")
    }

    /// Address of a materialized array item, e.g. `tags[3]`.
    pub fn item(&self, index: usize) -> Self {
        self.with_suffix(&format!("[{index}]"))
    }

    fn with_suffix(&self, suffix: &str) -> Self {
        let mut segments = self.segments.clone();
        match segments.last_mut() {
            Some(last) => last.push_str(suffix),
            None => segments.push(suffix.to_string()),
        }
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("$");
        }
        f.write_str(&self.segments.join("."))
    }
}

/// Renderer-agnostic view of one form field.
///
/// Regenerated from the schema on every read; a UI layer consumes the tree and
/// never hands it back.
#[derive(Debug, Clone, Serialize)]
pub struct FormFieldDescriptor {
    pub path: FieldPath,
    pub widget: WidgetKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FormFieldDescriptor>,
}

/// Build the descriptor tree for a schema.
///
/// Array schemas produce a single `[]`-addressed template child; the consumer
/// materializes `[0]`, `[1]`, … instances at render time, so the tree depth is
/// bounded by the schema alone.
pub fn generate(schema: &FieldSchema, prefix: FieldPath) -> FormFieldDescriptor {
    descriptor(schema, prefix, None, false)
}

fn descriptor(
    schema: &FieldSchema,
    path: FieldPath,
    name: Option<&str>,
    required: bool,
) -> FormFieldDescriptor {
    let label = name.map(humanize);
    match schema {
        FieldSchema::Primitive {
            kind,
            description,
            enum_values,
        } => {
            let widget = if enum_values.is_empty() {
                match kind {
                    PrimitiveKind::String => WidgetKind::Text,
                    PrimitiveKind::Integer => WidgetKind::Integer,
                    PrimitiveKind::Number => WidgetKind::Decimal,
                    PrimitiveKind::Boolean => WidgetKind::Toggle,
                }
            } else {
                WidgetKind::Choice
            };
            FormFieldDescriptor {
                path,
                widget,
                label,
                description: description.clone(),
                required,
                options: enum_values.clone(),
                children: Vec::new(),
            }
        }
        FieldSchema::Object { properties, required: names } => {
            let children = properties
                .iter()
                .map(|(child_name, child)| {
                    descriptor(
                        child,
                        path.child(child_name),
                        Some(child_name),
                        names.iter().any(|entry| entry == child_name),
                    )
                })
                .collect();
            FormFieldDescriptor {
                path,
                widget: WidgetKind::Group,
                label,
                description: None,
                required,
                options: Vec::new(),
                children,
            }
        }
        FieldSchema::Array { item } => {
            let template = descriptor(item, path.item_template(), None, false);
            FormFieldDescriptor {
                path,
                widget: WidgetKind::List,
                label,
                description: None,
                required,
                options: Vec::new(),
                children: vec![template],
            }
        }
    }
}

fn humanize(name: &str) -> String {
    name.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl Violation {
    fn new(path: &FieldPath, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

/// Check `values` against `schema`, collecting every violation rather than
/// stopping at the first.
///
/// Null, the empty string, and the empty array count as missing; `0` and
/// `false` are present values.
pub fn validate(schema: &FieldSchema, values: &Value) -> Vec<Violation> {
    let mut violations = Vec::new();
    check(schema, values, &FieldPath::root(), true, &mut violations);
    violations
}

fn check(
    schema: &FieldSchema,
    value: &Value,
    path: &FieldPath,
    required: bool,
    out: &mut Vec<Violation>,
) {
    if is_missing(value) {
        if required {
            out.push(Violation::new(path, "value is required"));
        }
        return;
    }

    match schema {
        FieldSchema::Primitive { kind, enum_values, .. } => {
            if !enum_values.is_empty() {
                match value.as_str() {
                    Some(text) if enum_values.iter().any(|entry| entry == text) => {}
                    Some(text) => out.push(Violation::new(
                        path,
                        format!("'{text}' is not one of the allowed values"),
                    )),
                    None => out.push(Violation::new(path, "expected one of the allowed values")),
                }
                return;
            }
            match kind {
                PrimitiveKind::String => {
                    if !value.is_string() {
                        out.push(Violation::new(path, "expected a string"));
                    }
                }
                PrimitiveKind::Integer => {
                    if !value.is_i64() && !value.is_u64() {
                        out.push(Violation::new(path, "expected an integer"));
                    }
                }
                PrimitiveKind::Number => {
                    if !value.is_number() {
                        out.push(Violation::new(path, "expected a number"));
                    }
                }
                PrimitiveKind::Boolean => {
                    if !value.is_boolean() {
                        out.push(Violation::new(path, "expected a boolean"));
                    }
                }
            }
        }
        FieldSchema::Object { properties, required: names } => {
            let Some(map) = value.as_object() else {
                out.push(Violation::new(path, "expected an object"));
                return;
            };
            for (name, child) in properties {
                let child_value = map.get(name).unwrap_or(&Value::Null);
                check(
                    child,
                    child_value,
                    &path.child(name),
                    names.iter().any(|entry| entry == name),
                    out,
                );
            }
        }
        FieldSchema::Array { item } => {
            let Some(entries) = value.as_array() else {
                out.push(Violation::new(path, "expected an array"));
                return;
            };
            for (index, entry) in entries.iter().enumerate() {
                check(item, entry, &path.item(index), false, out);
            }
        }
    }
}

fn is_missing(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(entries) => entries.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::schema::FieldSchema;

    fn weather_schema() -> FieldSchema {
        FieldSchema::object()
            .with_required_property(
                "city",
                FieldSchema::string().with_description("City name"),
            )
            .with_property(
                "units",
                FieldSchema::string().with_enum_values(["metric", "imperial", "kelvin"]),
            )
            .with_property("days", FieldSchema::integer())
            .with_property("verbose", FieldSchema::boolean())
    }

    #[test]
    fn generates_children_in_property_order() {
        let form = generate(&weather_schema(), FieldPath::root());
        assert_eq!(form.widget, WidgetKind::Group);
        let names: Vec<_> = form
            .children
            .iter()
            .map(|child| child.path.to_string())
            .collect();
        assert_eq!(names, ["city", "units", "days", "verbose"]);
        assert!(form.children[0].required);
        assert!(!form.children[1].required);
    }

    #[test]
    fn enum_options_keep_given_order() {
        let form = generate(&weather_schema(), FieldPath::root());
        let units = &form.children[1];
        assert_eq!(units.widget, WidgetKind::Choice);
        assert_eq!(units.options, ["metric", "imperial", "kelvin"]);
    }

    #[test]
    fn primitive_widgets_map_one_to_one() {
        let form = generate(&weather_schema(), FieldPath::root());
        assert_eq!(form.children[0].widget, WidgetKind::Text);
        assert_eq!(form.children[2].widget, WidgetKind::Integer);
        assert_eq!(form.children[3].widget, WidgetKind::Toggle);

        let decimal = generate(&FieldSchema::number(), FieldPath::root());
        assert_eq!(decimal.widget, WidgetKind::Decimal);
    }

    #[test]
    fn array_produces_single_template_child() {
        let schema = FieldSchema::object().with_property(
            "tags",
            FieldSchema::array(FieldSchema::string()),
        );
        let form = generate(&schema, FieldPath::root());
        let tags = &form.children[0];
        assert_eq!(tags.widget, WidgetKind::List);
        assert_eq!(tags.children.len(), 1);
        assert_eq!(tags.children[0].path.to_string(), "tags[]");
        assert_eq!(tags.children[0].widget, WidgetKind::Text);
    }

    #[test]
    fn nested_objects_never_drop_properties() {
        let schema = FieldSchema::object().with_required_property(
            "location",
            FieldSchema::object()
                .with_required_property("lat", FieldSchema::number())
                .with_property("lon", FieldSchema::number()),
        );
        let form = generate(&schema, FieldPath::root());
        let location = &form.children[0];
        assert_eq!(location.widget, WidgetKind::Group);
        assert_eq!(location.children.len(), 2);
        assert_eq!(location.children[0].path.to_string(), "location.lat");
        assert!(location.children[0].required);
    }

    #[test]
    fn labels_are_humanized_field_names() {
        let schema = FieldSchema::object().with_property("max_retry_count", FieldSchema::integer());
        let form = generate(&schema, FieldPath::root());
        assert_eq!(form.children[0].label.as_deref(), Some("Max Retry Count"));
    }

    #[test]
    fn validate_passes_on_satisfying_values() {
        let values = json!({"city": "Berlin", "units": "metric", "days": 3, "verbose": false});
        assert!(validate(&weather_schema(), &values).is_empty());
    }

    #[test]
    fn validate_collects_all_violations() {
        let values = json!({"units": "fahrenheit", "days": "three"});
        let violations = validate(&weather_schema(), &values);
        let paths: Vec<_> = violations.iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, ["city", "units", "days"]);
    }

    #[test]
    fn empty_string_and_empty_array_count_as_missing() {
        let schema = FieldSchema::object()
            .with_required_property("name", FieldSchema::string())
            .with_required_property("tags", FieldSchema::array(FieldSchema::string()));
        let violations = validate(&schema, &json!({"name": "", "tags": []}));
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn zero_and_false_are_present_values() {
        let schema = FieldSchema::object()
            .with_required_property("count", FieldSchema::integer())
            .with_required_property("active", FieldSchema::boolean());
        assert!(validate(&schema, &json!({"count": 0, "active": false})).is_empty());
    }

    #[test]
    fn array_items_are_checked_with_indexed_paths() {
        let schema = FieldSchema::object().with_property(
            "scores",
            FieldSchema::array(FieldSchema::integer()),
        );
        let violations = validate(&schema, &json!({"scores": [1, "two", 3]}));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "scores[1]");
    }

    #[test]
    fn missing_root_is_one_violation() {
        let violations = validate(&weather_schema(), &Value::Null);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "$");
    }
}
