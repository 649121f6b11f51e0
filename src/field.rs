//! Field descriptors used to build a [crate::Schema].

use std::fmt;

use crate::enum_map::EnumMap;

/// Byte order of a field's span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    /// Most significant byte at the lowest offset.
    Big,
    /// Least significant byte at the lowest offset.
    #[default]
    Little,
}

/// How the raw bits of a field are presented to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogicalType {
    /// Plain unsigned integer.
    #[default]
    UInt,
    /// Single bit, `true` when set.
    Bool,
    /// Integer with a name for every valid value.
    Enum(EnumMap),
}

impl LogicalType {
    /// The type's [Kind], without the enum mapping.
    pub fn kind(&self) -> Kind {
        match self {
            LogicalType::UInt => Kind::UInt,
            LogicalType::Bool => Kind::Bool,
            LogicalType::Enum(_) => Kind::Enum,
        }
    }
}

/// Logical type without its payload. Used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    UInt,
    Bool,
    Enum,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::UInt => "uint",
            Kind::Bool => "bool",
            Kind::Enum => "enum",
        })
    }
}

/// A single named field of a fixed-layout record.
///
/// Bit 0 is the least significant bit of the byte at `byte_offset`. A field
/// wider than the remainder of that byte continues into the following bytes,
/// which together form the field's span and are ordered by `endianness`.
///
/// ```
/// use bitlayout::field::FieldSpec;
///
/// // byte 2..10, big endian
/// let lba = FieldSpec::uint("lba", 2).bytes(8).big_endian();
/// // bits 6..=1 of byte 0
/// let flags = FieldSpec::uint("flags", 0).bits(6, 1);
/// # let _ = (lba, flags);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Key used in records; unique within a schema.
    pub name: String,
    /// Index of the byte holding the field's lowest bit.
    pub byte_offset: usize,
    /// Bit index within the byte at `byte_offset`. `None` means 0.
    pub bit_offset: Option<u8>,
    /// Number of bits. `None` picks a default from the other settings.
    pub bit_width: Option<usize>,
    pub endianness: Endianness,
    pub logical_type: LogicalType,
}

impl FieldSpec {
    /// Field of any logical type at bit 0 of `byte_offset`, with default width and little endian.
    pub fn new(name: impl Into<String>, byte_offset: usize, logical_type: LogicalType) -> Self {
        FieldSpec {
            name: name.into(),
            byte_offset,
            bit_offset: None,
            bit_width: None,
            endianness: Endianness::default(),
            logical_type,
        }
    }

    /// Unsigned integer field, one byte wide unless resized.
    pub fn uint(name: impl Into<String>, byte_offset: usize) -> Self {
        Self::new(name, byte_offset, LogicalType::UInt)
    }

    /// Single-bit boolean field at bit 0 unless moved with [FieldSpec::bit].
    pub fn boolean(name: impl Into<String>, byte_offset: usize) -> Self {
        Self::new(name, byte_offset, LogicalType::Bool)
    }

    /// Enumerated field, one byte wide unless resized.
    pub fn enumeration(name: impl Into<String>, byte_offset: usize, map: EnumMap) -> Self {
        Self::new(name, byte_offset, LogicalType::Enum(map))
    }

    /// Places the field at `bit` within its first byte.
    pub fn bit(mut self, bit: u8) -> Self {
        self.bit_offset = Some(bit);
        self
    }

    /// Covers bits `msb` down to `lsb` (inclusive), counted from bit 0 of the first byte.
    pub fn bits(mut self, msb: u8, lsb: u8) -> Self {
        self.bit_offset = Some(lsb);
        self.bit_width = Some((msb as usize + 1).saturating_sub(lsb as usize));
        self
    }

    pub fn width(mut self, bits: usize) -> Self {
        self.bit_width = Some(bits);
        self
    }

    /// Sets the width to `n` whole bytes.
    pub fn bytes(mut self, n: usize) -> Self {
        self.bit_width = Some(n.saturating_mul(8));
        self
    }

    pub fn endian(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    pub fn big_endian(self) -> Self {
        self.endian(Endianness::Big)
    }

    pub fn little_endian(self) -> Self {
        self.endian(Endianness::Little)
    }

    /// Width after defaults: explicit width, else 1 for booleans and for
    /// fields placed at a bit, else one byte.
    pub fn effective_width(&self) -> usize {
        match (self.bit_width, &self.logical_type, self.bit_offset) {
            (Some(width), _, _) => width,
            (None, LogicalType::Bool, _) => 1,
            (None, _, Some(_)) => 1,
            (None, _, None) => 8,
        }
    }
}
