//! Typed views over decoded records and conversions between scalar kinds.

use crate::error::{BinRpcError, Result};
use crate::record::{Record, RecordType, StructItem, Value};

/// Requested shape for [`Record::coerce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Text,
    Int,
    Double,
    StructItems,
}

impl Shape {
    fn name(self) -> &'static str {
        match self {
            Shape::Text => "string",
            Shape::Int => "int",
            Shape::Double => "double",
            Shape::StructItems => "struct",
        }
    }
}

impl Record {
    /// The integer value, or `TypeMismatch`.
    pub fn as_int(&self) -> Result<i32> {
        match &self.value {
            Value::Int(n) => Ok(*n),
            _ => Err(self.mismatch("int")),
        }
    }

    /// The string value, or `TypeMismatch`.
    pub fn as_str(&self) -> Result<&str> {
        match &self.value {
            Value::Str(text) => Ok(text),
            _ => Err(self.mismatch("string")),
        }
    }

    /// The double value, or `TypeMismatch`.
    pub fn as_double(&self) -> Result<f64> {
        match &self.value {
            Value::Double(d) => Ok(*d),
            _ => Err(self.mismatch("double")),
        }
    }

    /// The members of a struct, or `TypeMismatch`.
    pub fn struct_items(&self) -> Result<&[StructItem]> {
        match &self.value {
            Value::Struct(items) => Ok(items),
            _ => Err(self.mismatch("struct")),
        }
    }

    /// First member of a struct named `key`.
    ///
    /// Returns `None` for missing keys and for non-struct records.
    pub fn field(&self, key: &str) -> Option<&Record> {
        self.struct_items()
            .ok()?
            .iter()
            .find(|item| item.key == key)
            .map(|item| &item.value)
    }

    /// Every member of a struct named `key`, in wire order.
    pub fn fields<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Record> + 'a {
        let items: &[StructItem] = match &self.value {
            Value::Struct(items) => items,
            _ => &[],
        };
        items
            .iter()
            .filter(move |item| item.key == key)
            .map(|item| &item.value)
    }

    /// Convert into the requested shape.
    ///
    /// | shape         | accepted sources                                   |
    /// |---------------|----------------------------------------------------|
    /// | `Text`        | string; int as decimal; double with 3 decimals     |
    /// | `Int`         | int; string parsed as base-10                      |
    /// | `Double`      | double; int widened; string parsed as float        |
    /// | `StructItems` | struct                                             |
    pub fn coerce(&self, shape: Shape) -> Result<Value> {
        match (shape, &self.value) {
            (Shape::Text, Value::Str(text)) => Ok(Value::Str(text.clone())),
            (Shape::Text, Value::Int(n)) => Ok(Value::Str(n.to_string())),
            (Shape::Text, Value::Double(d)) => Ok(Value::Str(format!("{d:.3}"))),

            (Shape::Int, Value::Int(n)) => Ok(Value::Int(*n)),
            (Shape::Int, Value::Str(text)) => text
                .parse::<i32>()
                .map(Value::Int)
                .map_err(|_| BinRpcError::NotANumber(text.clone())),

            (Shape::Double, Value::Double(d)) => Ok(Value::Double(*d)),
            (Shape::Double, Value::Int(n)) => Ok(Value::Double(f64::from(*n))),
            (Shape::Double, Value::Str(text)) => text
                .parse::<f64>()
                .map(Value::Double)
                .map_err(|_| BinRpcError::NotANumber(text.clone())),

            (Shape::StructItems, Value::Struct(items)) => Ok(Value::Struct(items.clone())),

            (shape, _) => Err(self.mismatch(shape.name())),
        }
    }

    pub fn to_text(&self) -> Result<String> {
        match self.coerce(Shape::Text)? {
            Value::Str(text) => Ok(text),
            _ => Err(self.mismatch("string")),
        }
    }

    pub fn to_int(&self) -> Result<i32> {
        match self.coerce(Shape::Int)? {
            Value::Int(n) => Ok(n),
            _ => Err(self.mismatch("int")),
        }
    }

    pub fn to_double(&self) -> Result<f64> {
        match self.coerce(Shape::Double)? {
            Value::Double(d) => Ok(d),
            _ => Err(self.mismatch("double")),
        }
    }

    pub fn to_struct_items(&self) -> Result<Vec<StructItem>> {
        match self.coerce(Shape::StructItems)? {
            Value::Struct(items) => Ok(items),
            _ => Err(self.mismatch("struct")),
        }
    }

    fn mismatch(&self, expected: &'static str) -> BinRpcError {
        BinRpcError::TypeMismatch {
            expected,
            found: self.record_type(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> Record {
        Record::new(vec![
            StructItem::new("current", 2),
            StructItem::new("total", 8_388_605),
            StructItem::new("current", 3),
        ])
    }

    #[test]
    fn typed_accessors_match_kind() {
        assert_eq!(Record::new(42).as_int().unwrap(), 42);
        assert_eq!(Record::new("tm.stats").as_str().unwrap(), "tm.stats");
        assert_eq!(Record::new(1.588).as_double().unwrap(), 1.588);
        assert_eq!(stats().struct_items().unwrap().len(), 3);
    }

    #[test]
    fn typed_accessors_reject_other_kinds() {
        let err = Record::new("42").as_int().unwrap_err();
        assert!(matches!(
            err,
            BinRpcError::TypeMismatch {
                expected: "int",
                found: RecordType::Str
            }
        ));
        assert!(Record::new(42).as_str().is_err());
        assert!(Record::new(42).as_double().is_err());
        assert!(Record::new(42).struct_items().is_err());
    }

    #[test]
    fn field_lookup_keeps_duplicates() {
        let record = stats();
        assert_eq!(record.field("current").unwrap().as_int().unwrap(), 2);
        let all: Vec<i32> = record
            .fields("current")
            .map(|r| r.as_int().unwrap())
            .collect();
        assert_eq!(all, [2, 3]);
        assert!(record.field("missing").is_none());
        assert!(Record::new(1).field("current").is_none());
    }

    #[test]
    fn field_outlives_lookup_key() {
        let record = stats();
        let found = {
            let key = String::from("total");
            record.field(&key)
        };
        assert_eq!(found.unwrap().as_int().unwrap(), 8_388_605);
    }

    #[test]
    fn coerce_to_text() {
        assert_eq!(Record::new("abc").to_text().unwrap(), "abc");
        assert_eq!(Record::new(-17).to_text().unwrap(), "-17");
        assert_eq!(Record::new(1.5).to_text().unwrap(), "1.500");
        assert_eq!(Record::new(1.588).to_text().unwrap(), "1.588");
        assert!(matches!(
            stats().to_text(),
            Err(BinRpcError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn coerce_to_int() {
        assert_eq!(Record::new(7).to_int().unwrap(), 7);
        assert_eq!(Record::new("500").to_int().unwrap(), 500);
        assert!(matches!(
            Record::new("five").to_int(),
            Err(BinRpcError::NotANumber(text)) if text == "five"
        ));
        assert!(matches!(
            Record::new(2.5).to_int(),
            Err(BinRpcError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn coerce_to_double() {
        assert_eq!(Record::new(0.25).to_double().unwrap(), 0.25);
        assert_eq!(Record::new(3).to_double().unwrap(), 3.0);
        assert_eq!(Record::new("2.75").to_double().unwrap(), 2.75);
        assert!(matches!(
            Record::new("n/a").to_double(),
            Err(BinRpcError::NotANumber(_))
        ));
    }

    #[test]
    fn coerce_to_struct_items() {
        assert_eq!(stats().to_struct_items().unwrap().len(), 3);
        assert!(matches!(
            Record::new("x").coerce(Shape::StructItems),
            Err(BinRpcError::TypeMismatch {
                expected: "struct",
                found: RecordType::Str
            })
        ));
    }
}
