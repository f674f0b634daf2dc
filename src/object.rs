use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::TryFrom;
use thiserror::Error;

/// All possible types that can be stored inside an [`Object`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Number(i64),
    String(String),
    List(Vec<String>),
}

/// A set of properties that may be stored in a [`Store`](crate::Store).
pub type Object = HashMap<String, PropValue>;

/// Convenience macro for creating an [`Object`].
#[macro_export]
macro_rules! object {
    ( $($key:expr => $value:expr $(,)?)* ) => {{
        let mut object = Object::new();
        $(object.insert($key.into(), $value.into());)*
        object
    }};
    () => {
        Object::new()
    };
}

/// Errors that may occur while translating between an [`Object`] and a typed shape.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConversionError {
    #[error("field {0} missing")]
    FieldMissing(String),

    #[error("field {0} should be a {1}")]
    FieldWrongType(String, String),

    #[error("fixed field {0} should have been {1:?}, was {2:?}")]
    FixedFieldWrongValue(String, PropValue, PropValue),
}

/// A typed shape that can be translated to and from an [`Object`].
///
/// Usually implemented via `#[derive(ObjectShape)]`.
pub trait ObjectShape: TryFrom<Object, Error = ConversionError> + Into<Object> {}

/// An [`ObjectShape`] that carries the ID of its stored object.
///
/// Derived for shapes with an `object_id: Option<i64>` field; this is what
/// [`Store::save`](crate::Store::save) uses to decide between insert and replace.
pub trait ObjectShapeWithId: ObjectShape {
    fn get_object_id(&self) -> Option<i64>;
    fn set_object_id(&mut self, object_id: i64);
}

impl PropValue {
    /// If this [`PropValue`] contains a [`String`], return it. If not, return [`None`].
    pub fn as_str(&self) -> Option<&String> {
        match self {
            PropValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// If this [`PropValue`] contains an [`i64`], return it. If not, return [`None`].
    pub fn as_number(&self) -> Option<i64> {
        match self {
            PropValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// If this [`PropValue`] contains a list of strings, return it. If not, return [`None`].
    pub fn as_list(&self) -> Option<&Vec<String>> {
        match self {
            PropValue::List(l) => Some(l),
            _ => None,
        }
    }
}

impl<'a> From<&'a str> for PropValue {
    fn from(s: &str) -> Self {
        PropValue::String(s.to_string())
    }
}

impl From<String> for PropValue {
    fn from(s: String) -> Self {
        PropValue::String(s)
    }
}

impl From<&String> for PropValue {
    fn from(s: &String) -> Self {
        PropValue::String(s.clone())
    }
}

impl From<i64> for PropValue {
    fn from(n: i64) -> Self {
        PropValue::Number(n)
    }
}

impl From<Vec<String>> for PropValue {
    fn from(l: Vec<String>) -> Self {
        PropValue::List(l)
    }
}

impl From<&[&str]> for PropValue {
    fn from(l: &[&str]) -> Self {
        PropValue::List(l.iter().map(|s| s.to_string()).collect())
    }
}

impl From<Vec<&str>> for PropValue {
    fn from(l: Vec<&str>) -> Self {
        PropValue::List(l.into_iter().map(|s| s.to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_match_variants() {
        assert_eq!(PropValue::from(42).as_number(), Some(42));
        assert_eq!(PropValue::from(42).as_str(), None);
        assert_eq!(PropValue::from("tacos").as_str(), Some(&"tacos".to_string()));
        assert_eq!(
            PropValue::from(vec!["tacos", "sushi"]).as_list(),
            Some(&vec!["tacos".to_string(), "sushi".to_string()])
        );
        assert_eq!(PropValue::from(vec!["tacos"]).as_number(), None);
    }

    #[test]
    fn objects_round_trip_through_json() {
        let object = object!(
            "name" => "Mary",
            "age" => 34,
            "favoriteFoods" => vec!["pizza", "fries"],
        );

        let serialized = serde_json::to_string(&object).unwrap();
        let deserialized: Object = serde_json::from_str(&serialized).unwrap();

        assert_eq!(object, deserialized);
    }
}
