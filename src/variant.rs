//! Variant dispatch: refine a decoded record into a named variant by the
//! values of some of its fields, and encode records as a given variant.
//!
//! Variants form a tree. A variant matches when every one of its conditions
//! holds; among siblings the one declared last wins, and classification
//! descends into the winner's children until none of them match.
//!
//! ```
//! use bitlayout::{EnumMap, FieldSpec, Record, Schema};
//! use bitlayout::variant::{Classifier, Variant};
//!
//! let opcode = EnumMap::new().with("Nop", 0).with("Write", 1);
//! let schema = Schema::resolve(&[
//!     FieldSpec::enumeration("opcode", 0, opcode),
//!     FieldSpec::boolean("fua", 1),
//! ])
//! .unwrap();
//!
//! let classifier = Classifier::new(
//!     schema,
//!     vec![Variant::new("Write")
//!         .when("opcode", "Write")
//!         .child(Variant::new("ForceWrite").when("fua", true))],
//! )
//! .unwrap();
//!
//! let bytes = classifier.encode_as("ForceWrite", &Record::new()).unwrap();
//! assert_eq!(bytes, vec![0x01, 0x01]);
//! assert_eq!(classifier.decode(&bytes).unwrap().0, Some("ForceWrite"));
//! ```

use std::collections::HashMap;

use tracing::debug;

use crate::{
    errors::{DecodeError, VariantError},
    schema::Schema,
    value::{Record, Value},
};

/// Declaration of a named variant: the field values that identify it and
/// its more specific sub-variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub name: String,
    pub conditions: Vec<(String, Value)>,
    pub children: Vec<Variant>,
}

impl Variant {
    pub fn new(name: impl Into<String>) -> Self {
        Variant {
            name: name.into(),
            conditions: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Requires `field` to hold `value`.
    pub fn when(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    pub fn child(mut self, variant: Variant) -> Self {
        self.children.push(variant);
        self
    }
}

#[derive(Debug, Clone)]
struct Condition {
    field: usize,
    raw: u64,
    /// Canonical value written on encode.
    value: Value,
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    conditions: Vec<Condition>,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// A [Schema] together with a validated variant tree.
#[derive(Debug, Clone)]
pub struct Classifier {
    schema: Schema,
    nodes: Vec<Node>,
    roots: Vec<usize>,
    by_name: HashMap<String, usize>,
}

impl Classifier {
    /// Validates every condition of `variants` against `schema`.
    pub fn new(schema: Schema, variants: Vec<Variant>) -> Result<Self, VariantError> {
        let mut classifier = Classifier {
            schema,
            nodes: Vec::new(),
            roots: Vec::new(),
            by_name: HashMap::new(),
        };

        for variant in variants {
            let id = classifier.add(variant, None)?;
            classifier.roots.push(id);
        }

        debug!(variants = classifier.nodes.len(), "built variant classifier");

        Ok(classifier)
    }

    fn add(&mut self, variant: Variant, parent: Option<usize>) -> Result<usize, VariantError> {
        let mut conditions = Vec::with_capacity(variant.conditions.len());
        for (field_name, value) in &variant.conditions {
            let index = self.schema.index_of(field_name).ok_or_else(|| VariantError::UnknownField {
                variant: variant.name.clone(),
                field: field_name.clone(),
            })?;
            let field = &self.schema.fields()[index];

            let raw = field.to_raw(value).map_err(|source| VariantError::InvalidCondition {
                variant: variant.name.clone(),
                source,
            })?;
            // enum conditions given as integers are stored by name
            let value = field.to_value(raw).unwrap_or_else(|_| value.clone());

            conditions.push(Condition {
                field: index,
                raw,
                value,
            });
        }

        let id = self.nodes.len();
        if self.by_name.insert(variant.name.clone(), id).is_some() {
            return Err(VariantError::DuplicateVariant(variant.name));
        }

        self.nodes.push(Node {
            name: variant.name,
            conditions,
            parent,
            children: Vec::new(),
        });

        for child in variant.children {
            let child_id = self.add(child, Some(id))?;
            self.nodes[id].children.push(child_id);
        }

        Ok(id)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Names the most specific variant `record` belongs to, or `None` when
    /// no top-level variant matches.
    pub fn classify(&self, record: &Record) -> Option<&str> {
        let mut found = None;
        let mut candidates = &self.roots;

        while let Some(&id) = candidates
            .iter()
            .rev()
            .find(|&&id| self.matches(&self.nodes[id], record))
        {
            found = Some(id);
            candidates = &self.nodes[id].children;
        }

        found.map(|id| self.nodes[id].name.as_str())
    }

    /// Decodes `data` and classifies the result.
    pub fn decode(&self, data: &[u8]) -> Result<(Option<&str>, Record), DecodeError> {
        let record = self.schema.decode(data)?;
        Ok((self.classify(&record), record))
    }

    /// Encodes `record` as variant `name`: the fixed values of the variant and
    /// of all its ancestors are filled in, overriding the record's own.
    pub fn encode_as(&self, name: &str, record: &Record) -> Result<Vec<u8>, VariantError> {
        let mut id = *self
            .by_name
            .get(name)
            .ok_or_else(|| VariantError::UnknownVariant(name.to_string()))?;

        let mut path = vec![id];
        while let Some(parent) = self.nodes[id].parent {
            path.push(parent);
            id = parent;
        }

        let mut record = record.clone();
        for &id in path.iter().rev() {
            for condition in &self.nodes[id].conditions {
                let field = &self.schema.fields()[condition.field];
                record.insert(field.name.clone(), condition.value.clone());
            }
        }

        Ok(self.schema.encode(&record)?)
    }

    fn matches(&self, node: &Node, record: &Record) -> bool {
        node.conditions.iter().all(|condition| {
            let field = &self.schema.fields()[condition.field];
            record
                .get(&field.name)
                .and_then(|value| field.to_raw(value).ok())
                == Some(condition.raw)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        enum_map::EnumMap,
        errors::EncodeError,
        field::FieldSpec,
    };

    use super::*;

    fn base_schema() -> Schema {
        Schema::resolve(&[FieldSpec::uint("first", 0), FieldSpec::uint("second", 1)]).unwrap()
    }

    fn classifier() -> Classifier {
        Classifier::new(
            base_schema(),
            vec![
                Variant::new("First").when("first", 1u64),
                Variant::new("Second")
                    .when("first", 2u64)
                    .child(Variant::new("Third").when("second", 1u64)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_classify_hierarchy() {
        let classifier = classifier();
        assert_eq!(classifier.decode(&[0, 0]).unwrap().0, None);
        assert_eq!(classifier.decode(&[1, 0]).unwrap().0, Some("First"));
        assert_eq!(classifier.decode(&[2, 0]).unwrap().0, Some("Second"));
        assert_eq!(classifier.decode(&[2, 1]).unwrap().0, Some("Third"));
        assert_eq!(classifier.decode(&[1, 1]).unwrap().0, Some("First"));
    }

    #[test]
    fn test_last_declared_sibling_wins() {
        let classifier = Classifier::new(
            base_schema(),
            vec![
                Variant::new("Any"),
                Variant::new("One").when("first", 1u64),
            ],
        )
        .unwrap();

        assert_eq!(classifier.decode(&[1, 0]).unwrap().0, Some("One"));
        assert_eq!(classifier.decode(&[3, 0]).unwrap().0, Some("Any"));
    }

    #[test]
    fn test_encode_as_fills_path() {
        let classifier = classifier();
        let record = Record::new().with("first", 9u64).with("second", 0u64);

        assert_eq!(classifier.encode_as("Third", &record).unwrap(), vec![2, 1]);
        assert_eq!(classifier.encode_as("First", &record).unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_encode_as_missing_free_field() {
        let classifier = classifier();
        assert_eq!(
            classifier.encode_as("First", &Record::new()),
            Err(VariantError::Encode(EncodeError::MissingField(
                "second".to_string()
            )))
        );
    }

    #[test]
    fn test_unknown_variant() {
        assert_eq!(
            classifier().encode_as("Fourth", &Record::new()),
            Err(VariantError::UnknownVariant("Fourth".to_string()))
        );
    }

    #[test]
    fn test_invalid_declarations() {
        assert!(matches!(
            Classifier::new(base_schema(), vec![Variant::new("X").when("third", 1u64)]),
            Err(VariantError::UnknownField { .. })
        ));
        assert!(matches!(
            Classifier::new(base_schema(), vec![Variant::new("X").when("first", 256u64)]),
            Err(VariantError::InvalidCondition {
                source: EncodeError::ValueOutOfRange { .. },
                ..
            })
        ));
        assert_eq!(
            Classifier::new(
                base_schema(),
                vec![Variant::new("X"), Variant::new("Y").child(Variant::new("X"))]
            )
            .unwrap_err(),
            VariantError::DuplicateVariant("X".to_string())
        );
    }

    #[test]
    fn test_enum_conditions_match_by_value() {
        let schema = Schema::resolve(&[FieldSpec::enumeration(
            "op",
            0,
            EnumMap::new().with("Nop", 0).with("Read", 2),
        )])
        .unwrap();
        let classifier = Classifier::new(schema, vec![Variant::new("Read").when("op", 2u64)]).unwrap();

        assert_eq!(classifier.classify(&Record::new().with("op", "Read")), Some("Read"));
        assert_eq!(classifier.encode_as("Read", &Record::new()).unwrap(), vec![2]);
    }
}
