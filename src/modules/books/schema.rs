//! Declarative payload schema for books.
//!
//! A [`Schema`] is a list of [`FieldRule`]s checked generically against a JSON
//! payload. Validation never stops at the first problem: every violated rule
//! contributes one message, in schema order. Every named field is required;
//! fields not named by the schema are ignored.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Type constraint for a single field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// JSON string; `non_empty` rejects blank strings
    Text { non_empty: bool },
    /// JSON integer that fits in 32 bits, optionally bounded below
    Integer { min: Option<i64> },
}

impl FieldKind {
    fn describe(&self) -> &'static str {
        match self {
            FieldKind::Text { .. } => "a string",
            FieldKind::Integer { .. } => "an integer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldRule {
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text { non_empty: true },
        }
    }

    pub const fn integer(name: &'static str, min: Option<i64>) -> Self {
        Self {
            name,
            kind: FieldKind::Integer { min },
        }
    }

    fn check(&self, value: &Value) -> Option<String> {
        match self.kind {
            FieldKind::Text { non_empty } => match value.as_str() {
                None => Some(self.type_mismatch(value)),
                Some(s) if non_empty && s.trim().is_empty() => {
                    Some(format!("{} must not be empty", self.name))
                }
                Some(_) => None,
            },
            FieldKind::Integer { min } => {
                let n = match value.as_i64() {
                    Some(n) if i32::try_from(n).is_ok() => n,
                    Some(_) => return Some(self.out_of_range()),
                    None if value.is_u64() => return Some(self.out_of_range()),
                    None => return Some(self.type_mismatch(value)),
                };
                match min {
                    Some(min) if n < min => Some(format!("{} must be at least {}", self.name, min)),
                    _ => None,
                }
            }
        }
    }

    fn out_of_range(&self) -> String {
        format!("{} must be between {} and {}", self.name, i32::MIN, i32::MAX)
    }

    fn type_mismatch(&self, value: &Value) -> String {
        format!(
            "{} must be {}, got {}",
            self.name,
            self.kind.describe(),
            json_type_name(value)
        )
    }
}

/// A named, ordered set of field rules
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub name: &'static str,
    pub fields: &'static [FieldRule],
}

/// Payload accepted by both create and update. On update the key comes
/// from the path, but the body must still carry a well-formed `isbn`.
pub const BOOK_SCHEMA: Schema = Schema {
    name: "book",
    fields: &[
        FieldRule::text("isbn"),
        FieldRule::text("amazon_url"),
        FieldRule::text("author"),
        FieldRule::text("language"),
        FieldRule::integer("pages", Some(1)),
        FieldRule::text("publisher"),
        FieldRule::text("title"),
        FieldRule::integer("year", None),
    ],
};

impl Schema {
    /// Check `payload` against every rule, collecting all violations.
    pub fn validate(&self, payload: &Value) -> Result<(), Vec<String>> {
        let Some(object) = payload.as_object() else {
            return Err(vec![format!(
                "{} must be a JSON object, got {}",
                self.name,
                json_type_name(payload)
            )]);
        };

        let errors = self.violations(object);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate, then deserialize into the typed record.
    pub fn parse<T: DeserializeOwned>(&self, payload: Value) -> Result<T, Vec<String>> {
        self.validate(&payload)?;
        serde_json::from_value(payload).map_err(|e| vec![e.to_string()])
    }

    fn violations(&self, object: &Map<String, Value>) -> Vec<String> {
        self.fields
            .iter()
            .filter_map(|rule| match object.get(rule.name) {
                None | Some(Value::Null) => Some(format!("{} is required", rule.name)),
                Some(value) => rule.check(value),
            })
            .collect()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::models::{Book, BookChanges};
    use serde_json::json;

    fn valid_payload() -> Value {
        json!({
            "isbn": "246810",
            "amazon_url": "https://amazon.com/dog",
            "author": "Test2",
            "language": "Test2",
            "pages": 200,
            "publisher": "Test2",
            "title": "Test2",
            "year": 2000
        })
    }

    #[test]
    fn valid_payload_passes() {
        assert!(BOOK_SCHEMA.validate(&valid_payload()).is_ok());
    }

    #[test]
    fn isbn_is_required() {
        let mut payload = valid_payload();
        payload.as_object_mut().unwrap().remove("isbn");

        assert_eq!(
            BOOK_SCHEMA.validate(&payload).unwrap_err(),
            vec!["isbn is required".to_string()]
        );
    }

    #[test]
    fn isbn_must_be_a_string() {
        let mut payload = valid_payload();
        payload["isbn"] = json!(42);
        assert_eq!(
            BOOK_SCHEMA.validate(&payload).unwrap_err(),
            vec!["isbn must be a string, got integer"]
        );
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let mut payload = valid_payload();
        payload["edition"] = json!("second");
        assert!(BOOK_SCHEMA.validate(&payload).is_ok());
    }

    #[test]
    fn all_violations_are_collected_in_schema_order() {
        let payload = json!({
            "isbn": "",
            "author": 7,
            "language": null,
            "pages": "many",
            "publisher": "P",
            "title": "T",
            "year": 1999.5
        });

        assert_eq!(
            BOOK_SCHEMA.validate(&payload).unwrap_err(),
            vec![
                "isbn must not be empty",
                "amazon_url is required",
                "author must be a string, got integer",
                "language is required",
                "pages must be an integer, got string",
                "year must be an integer, got number",
            ]
        );
    }

    #[test]
    fn pages_must_be_positive() {
        let mut payload = valid_payload();
        payload["pages"] = json!(0);
        assert_eq!(
            BOOK_SCHEMA.validate(&payload).unwrap_err(),
            vec!["pages must be at least 1"]
        );
    }

    #[test]
    fn integers_must_fit_in_32_bits() {
        let mut payload = valid_payload();
        payload["year"] = json!(i64::from(i32::MAX) + 1);
        let errors = BOOK_SCHEMA.validate(&payload).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("year must be between"));
    }

    #[test]
    fn non_object_payload_is_rejected() {
        assert_eq!(
            BOOK_SCHEMA.validate(&json!(["isbn"])).unwrap_err(),
            vec!["book must be a JSON object, got array"]
        );
    }

    #[test]
    fn parse_yields_typed_records() {
        let book: Book = BOOK_SCHEMA.parse(valid_payload()).unwrap();
        assert_eq!(book.isbn, "246810");
        assert_eq!(book.pages, 200);

        let changes: BookChanges = BOOK_SCHEMA.parse(valid_payload()).unwrap();
        assert_eq!(changes.title, "Test2");
    }
}
