use crate::{
    bits,
    errors::{DecodeError, EncodeError, LayoutError},
    field::{Endianness, FieldSpec, Kind, LogicalType},
    value::Value,
};

/// Largest supported field width. Raw values are carried in a `u64`.
pub const MAX_FIELD_BITS: usize = 64;

/// A validated field with its absolute position resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedField {
    pub name: String,
    pub byte_offset: usize,
    pub bit_offset: u8,
    pub bit_width: usize,
    pub endianness: Endianness,
    pub logical_type: LogicalType,
}

impl TryFrom<&FieldSpec> for ResolvedField {
    type Error = LayoutError;

    fn try_from(spec: &FieldSpec) -> Result<Self, Self::Error> {
        let bit_offset = spec.bit_offset.unwrap_or(0);
        if bit_offset > 7 {
            return Err(LayoutError::InvalidBitOffset {
                field: spec.name.clone(),
                bit_offset,
            });
        }

        let width = spec.effective_width();
        if width == 0 || width > MAX_FIELD_BITS {
            return Err(LayoutError::InvalidWidth {
                field: spec.name.clone(),
                width,
            });
        }

        // every absolute bit of the span, including its last byte, must fit a usize
        let addressable = spec
            .byte_offset
            .checked_add(bits::span_len(bit_offset, width))
            .and_then(|end| end.checked_mul(8));
        if addressable.is_none() {
            return Err(LayoutError::OffsetOverflow {
                field: spec.name.clone(),
                byte_offset: spec.byte_offset,
            });
        }

        match &spec.logical_type {
            LogicalType::UInt => {}
            LogicalType::Bool => {
                if width != 1 {
                    return Err(LayoutError::TypeWidthMismatch {
                        field: spec.name.clone(),
                        kind: Kind::Bool,
                        width,
                    });
                }
            }
            LogicalType::Enum(map) => {
                if let Some(entry) = map.first_duplicate() {
                    return Err(LayoutError::DuplicateEnumEntry {
                        field: spec.name.clone(),
                        entry,
                    });
                }
                if map.max_value().is_some_and(|max| bits::bits_needed(max) > width) {
                    return Err(LayoutError::TypeWidthMismatch {
                        field: spec.name.clone(),
                        kind: Kind::Enum,
                        width,
                    });
                }
            }
        }

        Ok(ResolvedField {
            name: spec.name.clone(),
            byte_offset: spec.byte_offset,
            bit_offset,
            bit_width: width,
            endianness: spec.endianness,
            logical_type: spec.logical_type.clone(),
        })
    }
}

impl ResolvedField {
    /// First bit of the field, counted from bit 0 of byte 0.
    pub fn bit_start(&self) -> usize {
        self.byte_offset * 8 + self.bit_offset as usize
    }

    /// One past the last bit of the field.
    pub fn bit_end(&self) -> usize {
        self.bit_start() + self.bit_width
    }

    pub fn span_len(&self) -> usize {
        bits::span_len(self.bit_offset, self.bit_width)
    }

    /// One past the last byte of the field's span.
    pub fn span_end(&self) -> usize {
        self.byte_offset + self.span_len()
    }

    /// Bits the field occupies in each byte of its span, as
    /// `(byte index, mask)` pairs in byte order. For little endian and
    /// single-byte fields these cover exactly `bit_start()..bit_end()`.
    pub fn byte_masks(&self) -> Vec<(usize, u8)> {
        let len = self.span_len();
        let lo = self.bit_offset as usize;
        let hi = lo + self.bit_width;

        (0..len)
            .map(|j| {
                let significance = match self.endianness {
                    Endianness::Little => j,
                    Endianness::Big => len - 1 - j,
                };
                let from = lo.max(significance * 8) - significance * 8;
                let to = hi.min(significance * 8 + 8) - significance * 8;
                let mask = if from < to {
                    (((1u16 << (to - from)) - 1) << from) as u8
                } else {
                    0
                };
                (self.byte_offset + j, mask)
            })
            .collect()
    }

    pub fn kind(&self) -> Kind {
        self.logical_type.kind()
    }

    /// Reads the raw bits of the field. `data` must cover the span.
    pub fn extract(&self, data: &[u8]) -> u64 {
        let span = &data[self.byte_offset..self.span_end()];
        bits::extract(span, self.endianness, self.bit_offset, self.bit_width)
    }

    /// Overwrites the raw bits of the field. `data` must cover the span and
    /// `raw` must fit the width.
    pub fn insert(&self, data: &mut [u8], raw: u64) {
        let (start, end) = (self.byte_offset, self.span_end());
        bits::insert(
            &mut data[start..end],
            self.endianness,
            self.bit_offset,
            self.bit_width,
            raw,
        );
    }

    /// Converts raw bits to the field's logical value.
    pub fn to_value(&self, raw: u64) -> Result<Value, DecodeError> {
        match &self.logical_type {
            LogicalType::UInt => Ok(Value::UInt(raw)),
            LogicalType::Bool => Ok(Value::Bool(raw != 0)),
            LogicalType::Enum(map) => map
                .name_of(raw)
                .map(|name| Value::Enum(name.to_string()))
                .ok_or_else(|| DecodeError::UnknownEnumValue {
                    field: self.name.clone(),
                    value: raw,
                }),
        }
    }

    /// Converts a logical value to raw bits, checking it fits the field.
    pub fn to_raw(&self, value: &Value) -> Result<u64, EncodeError> {
        match (&self.logical_type, value) {
            (LogicalType::UInt, Value::UInt(raw)) => {
                if *raw > bits::low_mask(self.bit_width) {
                    return Err(EncodeError::ValueOutOfRange {
                        field: self.name.clone(),
                        value: *raw,
                        width: self.bit_width,
                    });
                }
                Ok(*raw)
            }
            (LogicalType::Bool, Value::Bool(flag)) => Ok(*flag as u64),
            (LogicalType::Enum(map), Value::Enum(name)) => {
                map.value_of(name)
                    .ok_or_else(|| EncodeError::UnknownEnumName {
                        field: self.name.clone(),
                        name: name.clone(),
                    })
            }
            (LogicalType::Enum(map), Value::UInt(raw)) => match map.name_of(*raw) {
                Some(_) => Ok(*raw),
                None => Err(EncodeError::UnknownEnumValue {
                    field: self.name.clone(),
                    value: *raw,
                }),
            },
            (logical_type, value) => Err(EncodeError::TypeMismatch {
                field: self.name.clone(),
                expected: logical_type.kind(),
                found: value.type_name(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::enum_map::EnumMap;

    use super::*;

    fn resolve(spec: FieldSpec) -> Result<ResolvedField, LayoutError> {
        ResolvedField::try_from(&spec)
    }

    #[test]
    fn test_absolute_range() {
        let field = resolve(FieldSpec::uint("a", 2).bit(3).width(12)).unwrap();
        assert_eq!(field.bit_start(), 19);
        assert_eq!(field.bit_end(), 31);
        assert_eq!(field.span_len(), 2);
        assert_eq!(field.span_end(), 4);
    }

    #[test]
    fn test_byte_masks() {
        let le = resolve(FieldSpec::uint("a", 1).bit(4).width(12)).unwrap();
        assert_eq!(le.byte_masks(), vec![(1, 0xf0), (2, 0xff)]);

        let be = resolve(FieldSpec::uint("a", 1).bit(4).width(12).big_endian()).unwrap();
        assert_eq!(be.byte_masks(), vec![(1, 0xff), (2, 0xf0)]);

        let be = resolve(FieldSpec::uint("a", 0).bits(14, 1).big_endian()).unwrap();
        assert_eq!(be.byte_masks(), vec![(0, 0x7f), (1, 0xfe)]);
    }

    #[test]
    fn test_invalid_bit_offset() {
        assert_eq!(
            resolve(FieldSpec::uint("a", 0).bit(8)).unwrap_err(),
            LayoutError::InvalidBitOffset {
                field: "a".to_string(),
                bit_offset: 8
            }
        );
    }

    #[test]
    fn test_invalid_width() {
        assert!(matches!(
            resolve(FieldSpec::uint("a", 0).width(0)),
            Err(LayoutError::InvalidWidth { width: 0, .. })
        ));
        assert!(matches!(
            resolve(FieldSpec::uint("a", 0).width(65)),
            Err(LayoutError::InvalidWidth { width: 65, .. })
        ));
        assert!(resolve(FieldSpec::uint("a", 0).bit(7).width(64)).is_ok());
        assert!(matches!(
            resolve(FieldSpec::uint("a", 0).bytes(usize::MAX)),
            Err(LayoutError::InvalidWidth { width: usize::MAX, .. })
        ));
    }

    #[test]
    fn test_offset_overflow() {
        assert_eq!(
            resolve(FieldSpec::uint("a", usize::MAX)).unwrap_err(),
            LayoutError::OffsetOverflow {
                field: "a".to_string(),
                byte_offset: usize::MAX
            }
        );
        assert!(matches!(
            resolve(FieldSpec::uint("a", usize::MAX / 8).bit(7).width(2)),
            Err(LayoutError::OffsetOverflow { .. })
        ));

        let last = usize::MAX / 8 - 1;
        let field = resolve(FieldSpec::uint("a", last)).unwrap();
        assert_eq!(field.span_end(), usize::MAX / 8);
    }

    #[test]
    fn test_bool_width() {
        assert_eq!(
            resolve(FieldSpec::boolean("flag", 0).width(2)).unwrap_err(),
            LayoutError::TypeWidthMismatch {
                field: "flag".to_string(),
                kind: Kind::Bool,
                width: 2
            }
        );
    }

    #[test]
    fn test_enum_width() {
        let map = EnumMap::new().with("LOW", 0).with("HIGH", 4);
        assert!(matches!(
            resolve(FieldSpec::enumeration("level", 0, map.clone()).width(2)),
            Err(LayoutError::TypeWidthMismatch { kind: Kind::Enum, width: 2, .. })
        ));
        assert!(resolve(FieldSpec::enumeration("level", 0, map).width(3)).is_ok());
    }

    #[test]
    fn test_enum_duplicate_entry() {
        let map = EnumMap::new().with("A", 0).with("A", 1);
        assert_eq!(
            resolve(FieldSpec::enumeration("e", 0, map)).unwrap_err(),
            LayoutError::DuplicateEnumEntry {
                field: "e".to_string(),
                entry: "A".to_string()
            }
        );
    }

    #[test]
    fn test_to_raw_checks_range() {
        let field = resolve(FieldSpec::uint("a", 0).width(4)).unwrap();
        assert_eq!(field.to_raw(&Value::UInt(15)), Ok(15));
        assert_eq!(
            field.to_raw(&Value::UInt(16)),
            Err(EncodeError::ValueOutOfRange {
                field: "a".to_string(),
                value: 16,
                width: 4
            })
        );
    }

    #[test]
    fn test_to_raw_type_mismatch() {
        let field = resolve(FieldSpec::boolean("flag", 0)).unwrap();
        assert_eq!(
            field.to_raw(&Value::UInt(1)),
            Err(EncodeError::TypeMismatch {
                field: "flag".to_string(),
                expected: Kind::Bool,
                found: "uint"
            })
        );
    }

    #[test]
    fn test_enum_conversions() {
        let map = EnumMap::new().with("READ", 0).with("WRITE", 1);
        let field = resolve(FieldSpec::enumeration("op", 0, map)).unwrap();

        assert_eq!(field.to_raw(&Value::from("WRITE")), Ok(1));
        assert_eq!(field.to_raw(&Value::UInt(0)), Ok(0));
        assert!(matches!(
            field.to_raw(&Value::from("ERASE")),
            Err(EncodeError::UnknownEnumName { .. })
        ));
        assert!(matches!(
            field.to_raw(&Value::UInt(2)),
            Err(EncodeError::UnknownEnumValue { value: 2, .. })
        ));

        assert_eq!(field.to_value(1), Ok(Value::from("WRITE")));
        assert_eq!(
            field.to_value(2),
            Err(DecodeError::UnknownEnumValue {
                field: "op".to_string(),
                value: 2
            })
        );
    }
}
