//! Schema: resolved set of fields used to decode buffers into records and
//! encode records into buffers.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::{
    compiled::ResolvedField,
    errors::{DecodeError, EncodeError, LayoutError, Overlap},
    field::FieldSpec,
    value::{Record, Value},
};

/// An immutable, validated record layout. Use [Schema::resolve] to build it
/// from [FieldSpec]s, then [Schema::decode] and [Schema::encode] as often as
/// needed, from any number of threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<ResolvedField>,
    index: HashMap<String, usize>,
    total_bytes: usize,
}

impl Schema {
    /// Resolves `specs` into a schema sized to fit its last field.
    ///
    /// Fields are validated one by one in input order and the first invalid
    /// one is reported. Overlaps are checked afterwards and every conflicting
    /// pair is reported.
    pub fn resolve(specs: &[FieldSpec]) -> Result<Self, LayoutError> {
        let mut fields: Vec<ResolvedField> = Vec::with_capacity(specs.len());
        let mut index = HashMap::with_capacity(specs.len());

        for spec in specs {
            let field = ResolvedField::try_from(spec)?;

            if index.insert(field.name.clone(), fields.len()).is_some() {
                return Err(LayoutError::DuplicateField { field: field.name });
            }

            fields.push(field);
        }

        let overlaps = find_overlaps(&fields);
        if !overlaps.is_empty() {
            return Err(LayoutError::OverlappingFields(overlaps));
        }

        let total_bytes = fields.iter().map(ResolvedField::span_end).max().unwrap_or(0);

        debug!(fields = fields.len(), total_bytes, "resolved schema");

        Ok(Schema {
            fields,
            index,
            total_bytes,
        })
    }

    /// Like [Schema::resolve], but the record is `size` bytes long. Bytes
    /// past the last field are left zero on encode.
    pub fn resolve_sized(specs: &[FieldSpec], size: usize) -> Result<Self, LayoutError> {
        let mut schema = Self::resolve(specs)?;
        if size < schema.total_bytes {
            return Err(LayoutError::SizeTooSmall {
                declared: size,
                required: schema.total_bytes,
            });
        }
        schema.total_bytes = size;
        Ok(schema)
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[ResolvedField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&ResolvedField> {
        self.index_of(name).map(|i| &self.fields[i])
    }

    /// Position of field `name` in [Schema::fields].
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Size of an encoded record in bytes.
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Decodes every field of `data`. Fails if `data` is too short or an enum
    /// field holds an unmapped value. Bytes past [Schema::total_bytes] are ignored.
    pub fn decode(&self, data: &[u8]) -> Result<Record, DecodeError> {
        if data.len() < self.total_bytes {
            return Err(DecodeError::BufferTooSmall {
                required: self.total_bytes,
                actual: data.len(),
            });
        }

        let mut record = Record::new();
        for field in &self.fields {
            let value = field.to_value(field.extract(data))?;
            record.insert(field.name.clone(), value);
        }

        trace!(%record, "decoded record");

        Ok(record)
    }

    /// Encodes `record` into a new zero-filled buffer of [Schema::total_bytes].
    ///
    /// Every schema field must be present, and the record may not name
    /// fields the schema lacks.
    pub fn encode(&self, record: &Record) -> Result<Vec<u8>, EncodeError> {
        let mut data = vec![0u8; self.total_bytes];
        self.encode_into(record, &mut data)?;
        Ok(data)
    }

    /// Encodes `record` over `data`, leaving bits outside every field as they
    /// were. `data` is untouched when an error is returned.
    pub fn encode_into(&self, record: &Record, data: &mut [u8]) -> Result<(), EncodeError> {
        if data.len() < self.total_bytes {
            return Err(EncodeError::BufferTooSmall {
                required: self.total_bytes,
                actual: data.len(),
            });
        }

        let raws = self.raw_values(record)?;
        for (field, raw) in self.fields.iter().zip(raws) {
            field.insert(data, raw);
        }

        trace!(%record, "encoded record");

        Ok(())
    }

    /// Decodes the single field `name`. `data` only needs to cover that field.
    pub fn read_field(&self, data: &[u8], name: &str) -> Result<Value, DecodeError> {
        let field = self
            .field(name)
            .ok_or_else(|| DecodeError::UnknownField(name.to_string()))?;

        if data.len() < field.span_end() {
            return Err(DecodeError::BufferTooSmall {
                required: field.span_end(),
                actual: data.len(),
            });
        }

        field.to_value(field.extract(data))
    }

    /// Encodes the single field `name` in place, leaving every other bit of
    /// `data` as it was.
    pub fn write_field(&self, data: &mut [u8], name: &str, value: &Value) -> Result<(), EncodeError> {
        let field = self
            .field(name)
            .ok_or_else(|| EncodeError::UnknownField(name.to_string()))?;

        let raw = field.to_raw(value)?;
        if data.len() < field.span_end() {
            return Err(EncodeError::BufferTooSmall {
                required: field.span_end(),
                actual: data.len(),
            });
        }

        field.insert(data, raw);
        Ok(())
    }

    /// Converts every record value to raw bits, in field order.
    fn raw_values(&self, record: &Record) -> Result<Vec<u64>, EncodeError> {
        let mut raws = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let value = record
                .get(&field.name)
                .ok_or_else(|| EncodeError::MissingField(field.name.clone()))?;
            raws.push(field.to_raw(value)?);
        }

        if let Some((name, _)) = record.iter().find(|(name, _)| !self.index.contains_key(*name)) {
            return Err(EncodeError::UnknownField(name.to_string()));
        }

        Ok(raws)
    }
}

/// Lists every pair of fields that share a bit, ordered by the first shared
/// bit. A pair conflicts when their resolved bit ranges intersect, or when
/// their bits collide where they physically live, since a big endian span
/// reorders its bytes. Intersecting ranges are reported as the overlap. The
/// result does not depend on field order.
fn find_overlaps(fields: &[ResolvedField]) -> Vec<Overlap> {
    let mut by_start: Vec<usize> = (0..fields.len()).collect();
    by_start.sort_by_key(|&i| (fields[i].byte_offset, fields[i].span_end()));

    let mut overlaps = Vec::new();
    for (pos, &i) in by_start.iter().enumerate() {
        let a = &fields[i];
        for &j in &by_start[pos + 1..] {
            let b = &fields[j];
            if b.byte_offset >= a.span_end() {
                break;
            }

            let Some((start, end)) = shared_range(a, b).or_else(|| shared_bits(a, b)) else {
                continue;
            };

            let (first, second) = if i < j { (a, b) } else { (b, a) };
            overlaps.push(Overlap {
                first: first.name.clone(),
                second: second.name.clone(),
                start,
                end,
            });
        }
    }

    overlaps.sort_by(|x, y| (x.start, x.end).cmp(&(y.start, y.end)));
    overlaps
}

/// Intersection of the resolved bit ranges of both fields.
fn shared_range(a: &ResolvedField, b: &ResolvedField) -> Option<(usize, usize)> {
    let start = a.bit_start().max(b.bit_start());
    let end = a.bit_end().min(b.bit_end());
    (start < end).then_some((start, end))
}

/// First and one-past-last physical bit used by both fields.
fn shared_bits(a: &ResolvedField, b: &ResolvedField) -> Option<(usize, usize)> {
    let b_masks = b.byte_masks();
    let mut range: Option<(usize, usize)> = None;

    for (byte, a_mask) in a.byte_masks() {
        let Some(&(_, b_mask)) = b_masks.iter().find(|(other, _)| *other == byte) else {
            continue;
        };

        let shared = a_mask & b_mask;
        if shared == 0 {
            continue;
        }

        let first = byte * 8 + shared.trailing_zeros() as usize;
        let last = byte * 8 + 8 - shared.leading_zeros() as usize;
        range = Some(match range {
            Some((start, end)) => (start.min(first), end.max(last)),
            None => (first, last),
        });
    }

    range
}
