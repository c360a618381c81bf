//! Property value types for graph nodes and relationships
//!
//! Values form a small tagged union. Lists hold scalars and are stored in the
//! index as repeated fields, so after a round trip they behave as a multiset.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Property holding a human readable label
pub const LABEL_KEY: &str = "label";

/// Property holding an opaque value that is stored but never indexed
pub const STORED_VALUE_KEY: &str = "storedvalue";

/// Property value type supporting multiple data types
///
/// Supports:
/// - String
/// - Integer (i64)
/// - Float (f64, narrower floats are widened)
/// - Boolean
/// - DateTime (Unix timestamp in milliseconds)
/// - Array (list of scalars)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(i64), // Unix timestamp in milliseconds
    Array(Vec<PropertyValue>),
    Null,
}

impl PropertyValue {
    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    /// Get string value if this is a string
    pub fn as_string(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get integer value if this is an integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get float value if this is a float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get boolean value if this is a boolean
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get datetime value if this is a datetime
    pub fn as_datetime(&self) -> Option<i64> {
        match self {
            PropertyValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Get array value if this is an array
    pub fn as_array(&self) -> Option<&Vec<PropertyValue>> {
        match self {
            PropertyValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// True for integers, floats and datetimes, which are indexed as ordered points
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            PropertyValue::Integer(_) | PropertyValue::Float(_) | PropertyValue::DateTime(_)
        )
    }

    /// Get type name as string
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::String(_) => "String",
            PropertyValue::Integer(_) => "Integer",
            PropertyValue::Float(_) => "Float",
            PropertyValue::Boolean(_) => "Boolean",
            PropertyValue::DateTime(_) => "DateTime",
            PropertyValue::Array(_) => "Array",
            PropertyValue::Null => "Null",
        }
    }

    /// Unquoted textual form, used by coercions and by query rendering.
    ///
    /// Returns `None` for `Null`.
    pub fn to_plain_string(&self) -> Option<String> {
        match self {
            PropertyValue::String(s) => Some(s.clone()),
            PropertyValue::Integer(i) => Some(i.to_string()),
            PropertyValue::Float(f) => Some(f.to_string()),
            PropertyValue::Boolean(b) => Some(b.to_string()),
            PropertyValue::DateTime(ms) => Some(
                Utc.timestamp_millis_opt(*ms)
                    .single()
                    .map(|dt| dt.to_rfc3339())
                    .unwrap_or_else(|| ms.to_string()),
            ),
            PropertyValue::Array(arr) => {
                let parts: Vec<String> = arr.iter().filter_map(|v| v.to_plain_string()).collect();
                Some(format!("[{}]", parts.join(", ")))
            }
            PropertyValue::Null => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => write!(f, "\"{}\"", s),
            PropertyValue::Integer(i) => write!(f, "{}", i),
            PropertyValue::Float(fl) => write!(f, "{}", fl),
            PropertyValue::Boolean(b) => write!(f, "{}", b),
            PropertyValue::DateTime(dt) => write!(f, "DateTime({})", dt),
            PropertyValue::Array(arr) => {
                write!(f, "[")?;
                for (i, val) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", val)?;
                }
                write!(f, "]")
            }
            PropertyValue::Null => write!(f, "null"),
        }
    }
}

// Convenience conversions
impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<i32> for PropertyValue {
    fn from(i: i32) -> Self {
        PropertyValue::Integer(i as i64)
    }
}

impl From<i16> for PropertyValue {
    fn from(i: i16) -> Self {
        PropertyValue::Integer(i as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<f32> for PropertyValue {
    fn from(f: f32) -> Self {
        PropertyValue::Float(f as f64)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

impl From<DateTime<Utc>> for PropertyValue {
    fn from(dt: DateTime<Utc>) -> Self {
        PropertyValue::DateTime(dt.timestamp_millis())
    }
}

impl From<Vec<PropertyValue>> for PropertyValue {
    fn from(arr: Vec<PropertyValue>) -> Self {
        PropertyValue::Array(arr)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(arr: Vec<String>) -> Self {
        PropertyValue::Array(arr.into_iter().map(PropertyValue::String).collect())
    }
}

impl From<Vec<&str>> for PropertyValue {
    fn from(arr: Vec<&str>) -> Self {
        PropertyValue::Array(arr.into_iter().map(PropertyValue::from).collect())
    }
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(PropertyValue::Null)
    }
}

/// Property map for storing node and relationship properties
pub type PropertyMap = HashMap<String, PropertyValue>;

/// Typed accessors shared by nodes and relationships.
///
/// Every getter coerces where it sensibly can and returns `None` when it
/// cannot; a failed coercion is never an error.
pub trait PropertyHolder {
    fn properties(&self) -> &PropertyMap;

    fn properties_mut(&mut self) -> &mut PropertyMap;

    /// Get a property value
    fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties().get(key)
    }

    /// Set a property value, returning the previous one
    fn set_property(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue>
    where
        Self: Sized,
    {
        self.properties_mut().insert(key.into(), value.into())
    }

    /// Append a value, turning the property into a list if needed
    fn add_property(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>)
    where
        Self: Sized,
    {
        let key = key.into();
        let value = value.into();
        let props = self.properties_mut();
        let merged = match props.remove(&key) {
            None | Some(PropertyValue::Null) => PropertyValue::Array(vec![value]),
            Some(PropertyValue::Array(mut values)) => {
                values.push(value);
                PropertyValue::Array(values)
            }
            Some(existing) => PropertyValue::Array(vec![existing, value]),
        };
        props.insert(key, merged);
    }

    /// Remove a property
    fn remove_property(&mut self, key: &str) -> Option<PropertyValue> {
        self.properties_mut().remove(key)
    }

    /// Check if property exists
    fn has_property(&self, key: &str) -> bool {
        self.properties().contains_key(key)
    }

    /// Names of all properties, in no particular order
    fn property_names(&self) -> Vec<String> {
        self.properties().keys().cloned().collect()
    }

    /// All values of a property; scalars come back as a single element list
    fn get_properties(&self, key: &str) -> Vec<PropertyValue> {
        match self.properties().get(key) {
            Some(PropertyValue::Array(values)) => values.clone(),
            Some(PropertyValue::Null) | None => Vec::new(),
            Some(value) => vec![value.clone()],
        }
    }

    fn get_string(&self, key: &str) -> Option<String> {
        self.properties().get(key)?.to_plain_string()
    }

    fn get_long(&self, key: &str) -> Option<i64> {
        match self.properties().get(key)? {
            PropertyValue::Integer(i) => Some(*i),
            PropertyValue::Float(f) => Some(*f as i64),
            PropertyValue::DateTime(ms) => Some(*ms),
            other => other.to_plain_string()?.trim().parse().ok(),
        }
    }

    fn get_integer(&self, key: &str) -> Option<i32> {
        match self.properties().get(key)? {
            PropertyValue::Integer(i) => i32::try_from(*i).ok(),
            PropertyValue::Float(f) => Some(*f as i32),
            other => other.to_plain_string()?.trim().parse().ok(),
        }
    }

    fn get_double(&self, key: &str) -> Option<f64> {
        match self.properties().get(key)? {
            PropertyValue::Integer(i) => Some(*i as f64),
            PropertyValue::Float(f) => Some(*f),
            other => other.to_plain_string()?.trim().parse().ok(),
        }
    }

    /// Dates come from datetime values, epoch millis, or ISO-8601 text
    fn get_date(&self, key: &str) -> Option<DateTime<Utc>> {
        match self.properties().get(key)? {
            PropertyValue::DateTime(ms) | PropertyValue::Integer(ms) => {
                Utc.timestamp_millis_opt(*ms).single()
            }
            PropertyValue::String(s) => parse_date(s),
            _ => None,
        }
    }

    /// Booleans also accept text starting with `t`, `1` or `y`
    fn get_boolean(&self, key: &str) -> Option<bool> {
        match self.properties().get(key)? {
            PropertyValue::Boolean(b) => Some(*b),
            other => {
                let text = other.to_plain_string()?.to_lowercase();
                let first = text.chars().next()?;
                Some(matches!(first, 't' | '1' | 'y'))
            }
        }
    }

    fn label(&self) -> Option<String> {
        self.get_string(LABEL_KEY)
    }

    fn set_label(&mut self, label: impl Into<String>)
    where
        Self: Sized,
    {
        self.set_property(LABEL_KEY, PropertyValue::String(label.into()));
    }

    fn stored_value(&self) -> Option<String> {
        self.get_string(STORED_VALUE_KEY)
    }

    fn set_stored_value(&mut self, value: impl Into<String>)
    where
        Self: Sized,
    {
        self.set_property(STORED_VALUE_KEY, PropertyValue::String(value.into()));
    }
}

/// Parse epoch millis or the common ISO-8601 shapes
fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(ms) = text.parse::<i64>() {
        return Utc.timestamp_millis_opt(ms).single();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Holder(PropertyMap);

    impl PropertyHolder for Holder {
        fn properties(&self) -> &PropertyMap {
            &self.0
        }

        fn properties_mut(&mut self) -> &mut PropertyMap {
            &mut self.0
        }
    }

    #[test]
    fn test_property_value_types() {
        assert_eq!(
            PropertyValue::String("test".to_string()).type_name(),
            "String"
        );
        assert_eq!(PropertyValue::Integer(42).type_name(), "Integer");
        assert_eq!(PropertyValue::Float(3.14).type_name(), "Float");
        assert_eq!(PropertyValue::Boolean(true).type_name(), "Boolean");
        assert_eq!(PropertyValue::DateTime(1234567890).type_name(), "DateTime");
        assert_eq!(PropertyValue::Array(vec![]).type_name(), "Array");
        assert_eq!(PropertyValue::Null.type_name(), "Null");
    }

    #[test]
    fn test_property_value_conversions() {
        let string_prop: PropertyValue = "hello".into();
        assert_eq!(string_prop.as_string(), Some("hello"));

        let int_prop: PropertyValue = 42i64.into();
        assert_eq!(int_prop.as_integer(), Some(42));

        let float_prop: PropertyValue = 1.5f32.into();
        assert_eq!(float_prop.as_float(), Some(1.5));

        let bool_prop: PropertyValue = true.into();
        assert_eq!(bool_prop.as_boolean(), Some(true));

        let none: PropertyValue = Option::<i64>::None.into();
        assert!(none.is_null());
    }

    #[test]
    fn test_coercions() {
        let mut h = Holder(PropertyMap::new());
        h.set_property("count", "42");
        h.set_property("ratio", 0.5);
        h.set_property("flag", "yes");
        h.set_property("junk", "abc");

        assert_eq!(h.get_long("count"), Some(42));
        assert_eq!(h.get_integer("count"), Some(42));
        assert_eq!(h.get_double("count"), Some(42.0));
        assert_eq!(h.get_string("ratio"), Some("0.5".to_string()));
        assert_eq!(h.get_boolean("flag"), Some(true));
        assert_eq!(h.get_long("junk"), None);
        assert_eq!(h.get_boolean("missing"), None);
    }

    #[test]
    fn test_dates() {
        let mut h = Holder(PropertyMap::new());
        h.set_property("a", PropertyValue::DateTime(86_400_000));
        h.set_property("b", "1970-01-02");
        h.set_property("c", "1970-01-02T00:00:00Z");

        let expected = Utc.timestamp_millis_opt(86_400_000).single();
        assert_eq!(h.get_date("a"), expected);
        assert_eq!(h.get_date("b"), expected);
        assert_eq!(h.get_date("c"), expected);
    }

    #[test]
    fn test_add_property_builds_list() {
        let mut h = Holder(PropertyMap::new());
        h.add_property("tag", "a");
        assert_eq!(h.get_properties("tag"), vec![PropertyValue::from("a")]);

        h.set_property("alias", "x");
        h.add_property("alias", "y");
        assert_eq!(
            h.get_property("alias"),
            Some(&PropertyValue::from(vec!["x", "y"]))
        );
    }

    #[test]
    fn test_label_and_stored_value() {
        let mut h = Holder(PropertyMap::new());
        h.set_label("Alice");
        h.set_stored_value("{\"raw\":true}");
        assert_eq!(h.label(), Some("Alice".to_string()));
        assert_eq!(h.stored_value(), Some("{\"raw\":true}".to_string()));
    }
}
