//! The [`Persist`] trait: how a type declares its serializable shape.
//!
//! There is no runtime reflection here. A participating type describes its
//! fields by implementing [`Persist::default_write`] and
//! [`Persist::default_read`] as two symmetric enumerations in declared field
//! order, the behavioral contract the original reflective machinery
//! provided, expressed as a trait at the seam. `#[derive(PagepackObject)]`
//! generates both methods for plain structs.
//!
//! Types can opt into three escape hatches, all defaulting to "not present":
//!
//! * [`Persist::custom_write`] / [`Persist::custom_read`] replace the default
//!   field enumeration entirely, typically to emit a named
//!   [`FieldMap`](crate::fields::FieldMap) block.
//! * [`Persist::replace_for_write`] substitutes another value before
//!   serialization (proxy representations).
//! * [`Persist::resolve_after_read`] substitutes a value after
//!   deserialization, mirroring the write-replace hook.

use crate::decoder::GraphDecoder;
use crate::encoder::GraphEncoder;
use crate::error::{PagepackError, Result};
use crate::value::{ObjRef, Value};
use std::any::Any;

/// A type whose instances can participate in an encoded object graph.
///
/// Implementations must keep `default_write` and `default_read` symmetric:
/// whatever sequence of primitives and objects one writes, the other reads in
/// the same order.
pub trait Persist: Any {
    /// Writes the declared fields in stable order (the default write path).
    fn default_write(&self, enc: &mut GraphEncoder<'_>) -> Result<()>;

    /// Reads the declared fields in the same order `default_write` wrote them.
    fn default_read(&mut self, dec: &mut GraphDecoder<'_>) -> Result<()>;

    /// Custom write logic. Return `Ok(true)` if the object wrote itself, or
    /// `Ok(false)` (the default) to fall back to `default_write`.
    ///
    /// A custom writer may call
    /// [`GraphEncoder::default_write_object`] to also emit the declared
    /// fields, and [`GraphEncoder::put_fields`] /
    /// [`GraphEncoder::write_fields`] to emit a named field-map block.
    fn custom_write(&self, enc: &mut GraphEncoder<'_>) -> Result<bool> {
        let _ = enc;
        Ok(false)
    }

    /// Mirror of [`Persist::custom_write`] on the decode side.
    fn custom_read(&mut self, dec: &mut GraphDecoder<'_>) -> Result<bool> {
        let _ = dec;
        Ok(false)
    }

    /// Write-replace hook: a value to serialize in place of this object.
    ///
    /// The replacement must be an object or a string. The original instance
    /// keeps the handle that was already assigned to it, so later encounters
    /// of the original still collapse to a back-reference.
    fn replace_for_write(&self) -> Option<Value> {
        None
    }

    /// Read-resolve hook: called after the fields of a freshly decoded
    /// instance have been populated. Returning a value substitutes it for
    /// this instance, including in the decoder's handle table.
    fn resolve_after_read(&self) -> Option<Value> {
        None
    }

    /// Upcast for concrete-type inspection.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for concrete-type inspection.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A single field position in the default write/read enumeration.
///
/// Implemented for the primitive kinds, `String`, [`Value`] and [`ObjRef`];
/// the derive macro emits one `write_to`/`read_from` pair per struct field.
pub trait FieldValue: Sized {
    /// Writes this field value to the stream.
    fn write_to(&self, enc: &mut GraphEncoder<'_>) -> Result<()>;

    /// Reads a field value of this type from the stream.
    fn read_from(dec: &mut GraphDecoder<'_>) -> Result<Self>;
}

macro_rules! impl_primitive_field {
    ($( $ty:ty, $write:ident, $read:ident ;)*) => {
        $(
            impl FieldValue for $ty {
                fn write_to(&self, enc: &mut GraphEncoder<'_>) -> Result<()> {
                    enc.$write(*self)
                }

                fn read_from(dec: &mut GraphDecoder<'_>) -> Result<Self> {
                    dec.$read()
                }
            }
        )*
    };
}

impl_primitive_field! {
    bool, write_bool, read_bool;
    i8,   write_i8,   read_i8;
    i16,  write_i16,  read_i16;
    char, write_char, read_char;
    i32,  write_i32,  read_i32;
    i64,  write_i64,  read_i64;
    f32,  write_f32,  read_f32;
    f64,  write_f64,  read_f64;
}

impl FieldValue for Value {
    fn write_to(&self, enc: &mut GraphEncoder<'_>) -> Result<()> {
        enc.write_object(self)
    }

    fn read_from(dec: &mut GraphDecoder<'_>) -> Result<Self> {
        dec.read_object()
    }
}

// Strings are full graph objects: each owned String field becomes a distinct
// stream object with its own handle, matching the identity semantics of the
// handle table (equal but distinct instances get distinct handles).
impl FieldValue for String {
    fn write_to(&self, enc: &mut GraphEncoder<'_>) -> Result<()> {
        enc.write_object(&Value::string(self.clone()))
    }

    fn read_from(dec: &mut GraphDecoder<'_>) -> Result<Self> {
        match dec.read_object()? {
            Value::Str(s) => Ok((*s).clone()),
            other => Err(PagepackError::Protocol(format!(
                "expected a string field, found {other:?}"
            ))),
        }
    }
}

impl FieldValue for ObjRef {
    fn write_to(&self, enc: &mut GraphEncoder<'_>) -> Result<()> {
        enc.write_object(&Value::Object(self.clone()))
    }

    fn read_from(dec: &mut GraphDecoder<'_>) -> Result<Self> {
        match dec.read_object()? {
            Value::Object(rc) => Ok(rc),
            other => Err(PagepackError::Protocol(format!(
                "expected an object field, found {other:?}"
            ))),
        }
    }
}
