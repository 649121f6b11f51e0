//! Error types for layout resolution, decoding, encoding and variant dispatch.

use std::fmt;

use crate::field::Kind;

/// A pair of fields whose bit ranges intersect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlap {
    /// Field declared first.
    pub first: String,
    /// Field declared second.
    pub second: String,
    /// First absolute bit shared by both fields.
    pub start: usize,
    /// One past the last absolute bit shared by both fields.
    pub end: usize,
}

impl fmt::Display for Overlap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "`{}` and `{}` share bits {}..{}",
            self.first, self.second, self.start, self.end
        )
    }
}

struct Overlaps<'a>(&'a [Overlap]);

impl fmt::Display for Overlaps<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, overlap) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{overlap}")?;
        }
        Ok(())
    }
}

/// Errors produced when resolving [crate::field::FieldSpec]s into a [crate::Schema].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// Bit offset is not in 0..=7.
    #[error("field `{field}`: bit offset {bit_offset} is outside 0..=7")]
    InvalidBitOffset { field: String, bit_offset: u8 },
    /// Bit width is zero or wider than 64 bits.
    #[error("field `{field}`: bit width {width} is outside 1..=64")]
    InvalidWidth { field: String, width: usize },
    /// Field ends past the last addressable bit.
    #[error("field `{field}`: byte offset {byte_offset} is too large to address")]
    OffsetOverflow { field: String, byte_offset: usize },
    /// Logical type cannot be stored in the declared width.
    #[error("field `{field}`: {kind} does not fit in {width} bits")]
    TypeWidthMismatch {
        field: String,
        kind: Kind,
        width: usize,
    },
    /// Two specs share a name.
    #[error("duplicate field `{field}`")]
    DuplicateField { field: String },
    /// At least one pair of fields share bits. Every conflict is listed.
    #[error("overlapping fields: {}", Overlaps(.0))]
    OverlappingFields(Vec<Overlap>),
    /// An enum mapping repeats a name or an integer.
    #[error("field `{field}`: enum entry `{entry}` is declared twice")]
    DuplicateEnumEntry { field: String, entry: String },
    /// Declared record size cannot hold every field.
    #[error("declared size of {declared} bytes is smaller than the {required} bytes the fields need")]
    SizeTooSmall { declared: usize, required: usize },
}

/// Errors produced when reading values out of a buffer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Input is shorter than the schema requires.
    #[error("buffer of {actual} bytes is shorter than the {required} bytes required")]
    BufferTooSmall { required: usize, actual: usize },
    /// Raw value of an enum field has no name.
    #[error("field `{field}`: value {value} has no enum mapping")]
    UnknownEnumValue { field: String, value: u64 },
    /// Field name is not part of the schema.
    #[error("unknown field `{0}`")]
    UnknownField(String),
}

/// Errors produced when writing values into a buffer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// Record does not supply a schema field.
    #[error("missing field `{0}`")]
    MissingField(String),
    /// Record names a field the schema does not have.
    #[error("unknown field `{0}`")]
    UnknownField(String),
    /// Symbolic value has no enum mapping.
    #[error("field `{field}`: enum name `{name}` has no mapping")]
    UnknownEnumName { field: String, name: String },
    /// Integer given for an enum field has no enum mapping.
    #[error("field `{field}`: value {value} has no enum mapping")]
    UnknownEnumValue { field: String, value: u64 },
    /// Unsigned value needs more bits than the field has.
    #[error("field `{field}`: value {value} does not fit in {width} bits")]
    ValueOutOfRange {
        field: String,
        value: u64,
        width: usize,
    },
    /// Value variant does not match the field's logical type.
    #[error("field `{field}`: expected {expected} value, found {found}")]
    TypeMismatch {
        field: String,
        expected: Kind,
        found: &'static str,
    },
    /// Output buffer is shorter than the schema requires.
    #[error("buffer of {actual} bytes is shorter than the {required} bytes required")]
    BufferTooSmall { required: usize, actual: usize },
}

/// Errors produced when building or using a [crate::variant::Classifier].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VariantError {
    /// Condition names a field the schema does not have.
    #[error("variant `{variant}`: unknown field `{field}`")]
    UnknownField { variant: String, field: String },
    /// Condition value cannot be stored in its field.
    #[error("variant `{variant}`: {source}")]
    InvalidCondition {
        variant: String,
        #[source]
        source: EncodeError,
    },
    /// Two variants share a name.
    #[error("duplicate variant `{0}`")]
    DuplicateVariant(String),
    /// No variant has the requested name.
    #[error("unknown variant `{0}`")]
    UnknownVariant(String),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}
