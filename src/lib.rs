//! # bitlayout
//!
//! A fixed-layout binary record codec driven by declarative field layouts.
//!
//! Describe each field by byte offset, bit offset, bit width, byte order and
//! logical type (unsigned integer, boolean or named enum), resolve the fields
//! into a [Schema] once, then decode byte slices into [Record]s and encode
//! records back into bytes. Bit 0 is the least significant bit of a byte;
//! multi-byte fields are reordered as a whole span before bits are extracted.
//!
//! ## Example
//!
//! ```
//! use bitlayout::{EnumMap, FieldSpec, Record, Schema};
//!
//! let opcode = EnumMap::new().with("Nop", 0).with("Write", 1).with("Read", 2);
//! let schema = Schema::resolve(&[
//!     FieldSpec::enumeration("opcode", 0, opcode),
//!     FieldSpec::boolean("fua", 1),
//!     FieldSpec::uint("lba", 2).bytes(8).big_endian(),
//! ])
//! .unwrap();
//!
//! let record = schema.decode(&[0x02, 0x01, 0, 0, 0, 0, 0, 0, 0x12, 0x34]).unwrap();
//! assert_eq!(record.enumeration("opcode"), Some("Read"));
//! assert_eq!(record.boolean("fua"), Some(true));
//! assert_eq!(record.uint("lba"), Some(0x1234));
//!
//! let bytes = schema.encode(&record).unwrap();
//! assert_eq!(bytes, vec![0x02, 0x01, 0, 0, 0, 0, 0, 0, 0x12, 0x34]);
//! ```

pub mod bits;
pub mod compiled;
pub mod enum_map;
pub mod errors;
pub mod field;
pub mod schema;
#[cfg(feature = "serde")]
pub mod serde;
pub mod value;
pub mod variant;

pub use compiled::ResolvedField;
pub use enum_map::EnumMap;
pub use errors::{DecodeError, EncodeError, LayoutError, Overlap, VariantError};
pub use field::{Endianness, FieldSpec, LogicalType};
pub use schema::Schema;
pub use value::{Record, Value};
