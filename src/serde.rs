//! JSON-deserializable layout description.
//!
//! These types describe the *shape* of a record. They are intended to be
//! loaded from a layout file shipped with your application and then resolved
//! into a [crate::Schema] with `Schema::try_from`.
//!
//! ```
//! use bitlayout::{Schema, serde::LayoutDef};
//!
//! let def: LayoutDef = serde_json::from_str(r#"{
//!     "fields": [
//!         { "name": "opcode", "byte_offset": 0,
//!           "kind": { "type": "Enum", "values": { "Read": 2, "Write": 1 } } },
//!         { "name": "fua", "byte_offset": 1, "kind": { "type": "Bool" } },
//!         { "name": "lba", "byte_offset": 2, "bit_width": 64, "endianness": "Big" }
//!     ]
//! }"#).unwrap();
//!
//! let schema = Schema::try_from(def).unwrap();
//! assert_eq!(schema.total_bytes(), 10);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    enum_map::EnumMap,
    errors::LayoutError,
    field::{Endianness, FieldSpec, LogicalType},
    schema::Schema,
};

/// Top-level layout definition: a list of fields and an optional record size.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LayoutDef {
    /// All fields of the record.
    pub fields: Vec<FieldDef>,
    /// Record size in bytes; defaults to the end of the last field.
    #[serde(default)]
    pub size: Option<usize>,
}

/// Description of a single field.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FieldDef {
    /// Key of the field in records.
    pub name: String,
    /// Index of the byte holding the field's lowest bit.
    pub byte_offset: usize,
    /// Bit within the first byte, 0 being the least significant.
    #[serde(default)]
    pub bit_offset: Option<u8>,
    /// Width in bits; defaults depend on the kind and bit offset.
    #[serde(default)]
    pub bit_width: Option<usize>,
    /// Byte order of the field's span; defaults to little endian.
    #[serde(default)]
    pub endianness: Option<EndiannessDef>,
    /// Logical type; defaults to unsigned integer.
    #[serde(default)]
    pub kind: KindDef,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy)]
pub enum EndiannessDef {
    Big,
    Little,
}

/// Logical type of a field.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(tag = "type")]
pub enum KindDef {
    #[default]
    UInt,
    Bool,
    /// Integer with named values.
    Enum {
        /// Name to integer mapping.
        values: BTreeMap<String, u64>,
    },
}

impl From<EndiannessDef> for Endianness {
    fn from(value: EndiannessDef) -> Self {
        match value {
            EndiannessDef::Big => Endianness::Big,
            EndiannessDef::Little => Endianness::Little,
        }
    }
}

impl From<KindDef> for LogicalType {
    fn from(value: KindDef) -> Self {
        match value {
            KindDef::UInt => LogicalType::UInt,
            KindDef::Bool => LogicalType::Bool,
            KindDef::Enum { values } => LogicalType::Enum(values.into_iter().collect::<EnumMap>()),
        }
    }
}

impl From<FieldDef> for FieldSpec {
    fn from(value: FieldDef) -> Self {
        FieldSpec {
            name: value.name,
            byte_offset: value.byte_offset,
            bit_offset: value.bit_offset,
            bit_width: value.bit_width,
            endianness: value.endianness.map(Into::into).unwrap_or_default(),
            logical_type: value.kind.into(),
        }
    }
}

impl TryFrom<LayoutDef> for Schema {
    type Error = LayoutError;

    fn try_from(value: LayoutDef) -> Result<Self, Self::Error> {
        let specs: Vec<FieldSpec> = value.fields.into_iter().map(Into::into).collect();
        match value.size {
            Some(size) => Schema::resolve_sized(&specs, size),
            None => Schema::resolve(&specs),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::value::{Record, Value};

    use super::*;

    #[test]
    fn test_field_defaults() {
        let def: FieldDef = serde_json::from_str(r#"{ "name": "a", "byte_offset": 3 }"#).unwrap();
        let spec = FieldSpec::from(def);
        assert_eq!(spec, FieldSpec::uint("a", 3));
    }

    #[test]
    fn test_layout_with_size() {
        let def: LayoutDef = serde_json::from_str(
            r#"{ "fields": [ { "name": "a", "byte_offset": 0, "bit_width": 16 } ], "size": 8 }"#,
        )
        .unwrap();
        assert_eq!(Schema::try_from(def).unwrap().total_bytes(), 8);
    }

    #[test]
    fn test_layout_errors_surface() {
        let def: LayoutDef = serde_json::from_str(
            r#"{ "fields": [
                { "name": "a", "byte_offset": 0, "bit_offset": 2, "kind": { "type": "Bool" } },
                { "name": "b", "byte_offset": 0, "bit_offset": 2, "bit_width": 3 }
            ] }"#,
        )
        .unwrap();
        assert!(matches!(
            Schema::try_from(def),
            Err(LayoutError::OverlappingFields(_))
        ));
    }

    #[test]
    fn test_record_json() {
        let record = Record::new()
            .with("lba", 7u64)
            .with("fua", true)
            .with("opcode", "Write");
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"fua":true,"lba":7,"opcode":"Write"}"#);

        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.get("opcode"), Some(&Value::Enum("Write".to_string())));
    }
}
