//! Parameter schemas published by tools.
//!
//! Schemas serialise to JSON Schema objects
//! (`{"type":"object","properties":{...},"required":[...]}`). The dispatcher does
//! not enforce them; each tool checks what it needs in `validate_parameters`.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// JSON Schema primitive type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    /// `"string"`
    String,
    /// `"number"`
    Number,
    /// `"integer"`
    Integer,
    /// `"boolean"`
    Boolean,
    /// `"array"`
    Array,
    /// `"object"`
    Object,
}

/// The schema of one property.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    kind: SchemaType,

    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<Value>,

    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    allowed: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    minimum: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    maximum: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pattern: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    example: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    items: Option<Box<PropertySchema>>,

    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    properties: IndexMap<String, PropertySchema>,
}

impl PropertySchema {
    fn of(kind: SchemaType, description: &str) -> Self {
        Self {
            kind,
            description: Some(description.to_string()),
            default: None,
            allowed: Vec::new(),
            minimum: None,
            maximum: None,
            pattern: None,
            example: None,
            items: None,
            properties: IndexMap::new(),
        }
    }

    /// A string property.
    #[must_use]
    pub fn string(description: &str) -> Self {
        Self::of(SchemaType::String, description)
    }

    /// A number property.
    #[must_use]
    pub fn number(description: &str) -> Self {
        Self::of(SchemaType::Number, description)
    }

    /// An integer property.
    #[must_use]
    pub fn integer(description: &str) -> Self {
        Self::of(SchemaType::Integer, description)
    }

    /// A boolean property.
    #[must_use]
    pub fn boolean(description: &str) -> Self {
        Self::of(SchemaType::Boolean, description)
    }

    /// An array property whose elements follow `items`.
    #[must_use]
    pub fn array(description: &str, items: Self) -> Self {
        let mut schema = Self::of(SchemaType::Array, description);
        schema.items = Some(Box::new(items));
        schema
    }

    /// An object property.
    #[must_use]
    pub fn object(description: &str) -> Self {
        Self::of(SchemaType::Object, description)
    }

    /// An untitled element schema for arrays.
    #[must_use]
    pub fn element(kind: SchemaType) -> Self {
        let mut schema = Self::of(kind, "");
        schema.description = None;
        schema
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Restricts the value to the given set.
    #[must_use]
    pub fn with_enum(mut self, allowed: &[&str]) -> Self {
        self.allowed = allowed.iter().map(ToString::to_string).collect();
        self
    }

    /// Sets an inclusive numeric range.
    #[must_use]
    pub const fn with_range(mut self, minimum: f64, maximum: f64) -> Self {
        self.minimum = Some(minimum);
        self.maximum = Some(maximum);
        self
    }

    /// Sets a regular-expression pattern for strings.
    #[must_use]
    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(pattern.to_string());
        self
    }

    /// Sets an example value.
    #[must_use]
    pub fn with_example(mut self, example: impl Into<Value>) -> Self {
        self.example = Some(example.into());
        self
    }

    /// Adds a nested property (object schemas).
    #[must_use]
    pub fn with_property(mut self, name: &str, property: Self) -> Self {
        self.properties.insert(name.to_string(), property);
        self
    }

    /// The declared type.
    #[must_use]
    pub const fn kind(&self) -> SchemaType {
        self.kind
    }

    /// The declared enum values.
    #[must_use]
    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }
}

/// The parameter schema of a tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    kind: SchemaType,

    properties: IndexMap<String, PropertySchema>,

    required: Vec<String>,
}

impl ParameterSchema {
    /// An object schema with no properties.
    #[must_use]
    pub fn new() -> Self {
        Self {
            kind: SchemaType::Object,
            properties: IndexMap::new(),
            required: Vec::new(),
        }
    }

    /// Adds an optional property.
    #[must_use]
    pub fn property(mut self, name: &str, property: PropertySchema) -> Self {
        self.properties.insert(name.to_string(), property);
        self
    }

    /// Adds a required property.
    #[must_use]
    pub fn required(mut self, name: &str, property: PropertySchema) -> Self {
        self.required.push(name.to_string());
        self.property(name, property)
    }

    /// Looks up a property by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PropertySchema> {
        self.properties.get(name)
    }

    /// Names of the required properties.
    #[must_use]
    pub fn required_names(&self) -> &[String] {
        &self.required
    }

    /// The schema as a JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
    }
}

impl Default for ParameterSchema {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_schema_shape() {
        assert_eq!(
            ParameterSchema::new().to_value(),
            json!({"type": "object", "properties": {}, "required": []})
        );
    }

    #[test]
    fn schema_with_properties() {
        let schema = ParameterSchema::new()
            .required(
                "latitude",
                PropertySchema::number("Latitude in degrees").with_range(-90.0, 90.0),
            )
            .property(
                "format",
                PropertySchema::string("Output format")
                    .with_enum(&["ISO8601", "UNIX"])
                    .with_default("ISO8601"),
            );

        let value = schema.to_value();
        assert_eq!(value["required"], json!(["latitude"]));
        assert_eq!(value["properties"]["latitude"]["type"], "number");
        assert_eq!(value["properties"]["latitude"]["minimum"], json!(-90.0));
        assert_eq!(value["properties"]["format"]["enum"], json!(["ISO8601", "UNIX"]));
        assert_eq!(value["properties"]["format"]["default"], "ISO8601");
        assert!(value["properties"]["format"].get("minimum").is_none());
    }

    #[test]
    fn array_items_serialise() {
        let schema = ParameterSchema::new().property(
            "to_timezones",
            PropertySchema::array("Zones", PropertySchema::element(SchemaType::String)),
        );
        let value = schema.to_value();
        assert_eq!(
            value["properties"]["to_timezones"]["items"],
            json!({"type": "string"})
        );
    }

    #[test]
    fn nested_object_properties() {
        let relative = PropertySchema::object("Offset from now")
            .with_property("amount", PropertySchema::integer("How many units"));
        let value = ParameterSchema::new()
            .property("relative_time", relative)
            .to_value();
        assert_eq!(
            value["properties"]["relative_time"]["properties"]["amount"]["type"],
            "integer"
        );
    }
}
