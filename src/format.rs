//! Defines the wire vocabulary of the Pagepack stream and file container.
//!
//! # Stream Layout
//!
//! The object stream is a flat, tag-prefixed byte sequence consumable in one
//! pass. Every value starts with a one-byte [`Tag`]; class ids and handles are
//! two bytes, array lengths four bytes, all little-endian:
//!
//! ```text
//! NULL                                  -- null reference
//! HANDLE          u16 handle            -- back-reference to an earlier value
//! CLASS           u16 class-id          -- a type-descriptor value
//! CLASS_DEF       u16 class-id  body    -- first occurrence of an object
//! ARRAY           u16 comp-id   u32 len -- then len recursively-written elements
//! PRIMITIVE_ARRAY u16 kind-id   u32 len -- then the raw contiguous payload
//! ```
//!
//! The concrete tag and reserved-id values are internal protocol constants:
//! only self-consistency between encoder and decoder matters.
//!
//! # File Container
//!
//! [`Pagepack::save`](crate::Pagepack::save) wraps one encoded stream in a
//! minimal container: `Magic(4) "PPK1" + Version(2) + MetaByte(1) + payload`.
//! The [`MetaByte`] carries the compression algorithm id for the payload.

use std::fmt;

/// Magic bytes identifying the container format: "PPK1".
pub const MAGIC_BYTES: [u8; 4] = *b"PPK1";

/// Container format version.
pub const FORMAT_VERSION: u16 = 1;

/// Size of the container header: Magic(4) + Version(2) + MetaByte(1).
pub const CONTAINER_HEADER_SIZE: usize = 7;

/// One-byte tag prefixing every value in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Tag {
    /// A null reference. No payload.
    Null = 0,
    /// Back-reference to a previously written value.
    Handle = 1,
    /// A type-descriptor value itself.
    Class = 2,
    /// First occurrence of a scalar object (or string).
    ClassDef = 3,
    /// A reference-typed array.
    Array = 4,
    /// A primitive-typed array with a contiguous payload.
    PrimitiveArray = 5,
}

impl Tag {
    /// Decodes a raw tag byte, or `None` if the byte is not a known tag.
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Null),
            1 => Some(Self::Handle),
            2 => Some(Self::Class),
            3 => Some(Self::ClassDef),
            4 => Some(Self::Array),
            5 => Some(Self::PrimitiveArray),
            _ => None,
        }
    }
}

/// A compact numeric identifier for a registered class.
///
/// Ids below [`ClassId::FIRST_USER`] are reserved wire vocabulary: primitive
/// kinds, the string class and the generic object bucket. User classes are
/// assigned ids from a monotonically increasing counter in registration
/// order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u16);

impl ClassId {
    /// Sentinel id terminating a field-map block.
    pub const NULL: ClassId = ClassId(0);
    /// Primitive kind: boolean.
    pub const BOOLEAN: ClassId = ClassId(1);
    /// Primitive kind: 8-bit signed byte.
    pub const BYTE: ClassId = ClassId(2);
    /// Primitive kind: 16-bit signed short.
    pub const SHORT: ClassId = ClassId(3);
    /// Primitive kind: character (u32 code point on the wire).
    pub const CHAR: ClassId = ClassId(4);
    /// Primitive kind: 32-bit signed int.
    pub const INT: ClassId = ClassId(5);
    /// Primitive kind: 64-bit signed long.
    pub const LONG: ClassId = ClassId(6);
    /// Primitive kind: 32-bit float.
    pub const FLOAT: ClassId = ClassId(7);
    /// Primitive kind: 64-bit double.
    pub const DOUBLE: ClassId = ClassId(8);
    /// The character string class (compact UTF encoding).
    pub const STRING: ClassId = ClassId(9);
    /// Generic object bucket used by field-map blocks and untyped arrays.
    pub const OBJECT: ClassId = ClassId(10);
    /// First id available to user classes.
    pub const FIRST_USER: u16 = 16;

    /// Creates a ClassId from a raw wire value.
    pub(crate) fn new(id: u16) -> Self {
        Self(id)
    }

    /// Returns the raw numeric value written on the wire.
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// True for ids below the user space (wire vocabulary).
    pub fn is_reserved(&self) -> bool {
        self.0 < Self::FIRST_USER
    }

    /// Display name of a reserved id, used in error traces.
    pub(crate) fn reserved_name(&self) -> Option<&'static str> {
        match *self {
            Self::NULL => Some("null"),
            Self::BOOLEAN => Some("boolean"),
            Self::BYTE => Some("byte"),
            Self::SHORT => Some("short"),
            Self::CHAR => Some("char"),
            Self::INT => Some("int"),
            Self::LONG => Some("long"),
            Self::FLOAT => Some("float"),
            Self::DOUBLE => Some("double"),
            Self::STRING => Some("string"),
            Self::OBJECT => Some("object"),
            _ => None,
        }
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self.0)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Configuration flags for a container payload, stored in one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaByte(u8);

impl MetaByte {
    const COMPRESSION_MASK: u8 = 0b0000_0111; // Bits 0-2

    /// Creates a new MetaByte.
    pub fn new(compression_id: u8) -> Self {
        Self(compression_id & Self::COMPRESSION_MASK)
    }

    /// Decodes the byte.
    pub fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    /// Returns the compression algorithm ID (0-7).
    pub fn compression_method(&self) -> u8 {
        self.0 & Self::COMPRESSION_MASK
    }

    /// Returns the raw byte representation.
    pub fn as_u8(&self) -> u8 {
        self.0
    }
}
