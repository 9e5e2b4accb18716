//! The graph decoder: mirror of the encoder, rebuilding a graph from bytes.
//!
//! Decoding maintains its own handle table, a plain vector of reconstructed
//! values indexed by handle, valid because handles are assigned in strictly
//! ascending write order. The critical ordering rule is that an object's or
//! array's slot is registered *before* its contents are populated, so a
//! back-reference inside those contents (including a value pointing at
//! itself) resolves to the allocation under construction rather than failing
//! or recursing.
//!
//! Objects are allocated through the registry's instantiation hook without
//! running any user constructor logic, then populated field by field; the
//! read-resolve hook may substitute the populated instance, in which case the
//! substitute also takes over the handle slot.

use crate::error::{PagepackError, Result};
use crate::fields::FieldBag;
use crate::format::{ClassId, Tag};
use crate::io::DataSource;
use crate::persist::Persist;
use crate::registry::ClassRegistry;
use crate::value::{ObjArray, PrimArray, Value};
use std::rc::Rc;
use std::sync::Arc;

/// Reconstructs an object graph from an encoded byte slice.
///
/// Single-threaded, one read session per instance, mirror of
/// [`GraphEncoder`](crate::encoder::GraphEncoder).
pub struct GraphDecoder<'a> {
    src: DataSource<'a>,
    registry: Arc<ClassRegistry>,
    /// Handle -> reconstructed value, in registration order.
    handles: Vec<Value>,
    /// Identity tokens of objects whose default fields were already read.
    default_read: Vec<usize>,
}

impl<'a> GraphDecoder<'a> {
    /// Creates a decoder over `bytes`, resolving class ids through
    /// `registry`. The registry must contain the same types, registered in
    /// the same order, as the one the stream was encoded with.
    pub fn new(registry: Arc<ClassRegistry>, bytes: &'a [u8]) -> Self {
        Self {
            src: DataSource::new(bytes),
            registry,
            handles: Vec::new(),
            default_read: Vec::new(),
        }
    }

    /// Reads the next value from the stream.
    pub fn read_object(&mut self) -> Result<Value> {
        let byte = self.src.read_u8()?;
        let tag = Tag::from_u8(byte).ok_or_else(|| {
            PagepackError::Protocol(format!(
                "unknown wire tag {byte:#04x} at offset {}",
                self.src.position() - 1
            ))
        })?;
        match tag {
            Tag::Null => Ok(Value::Null),
            Tag::Handle => {
                let handle = self.src.read_u16()? as usize;
                self.handles.get(handle).cloned().ok_or_else(|| {
                    PagepackError::Protocol(format!(
                        "back-reference to handle {handle}, but only {} are registered",
                        self.handles.len()
                    ))
                })
            }
            Tag::Class => {
                let id = ClassId::new(self.src.read_u16()?);
                if !self.registry.contains(id) {
                    return Err(PagepackError::Protocol(format!(
                        "class descriptor for unknown class id {id}"
                    )));
                }
                Ok(Value::Class(id))
            }
            Tag::ClassDef => self.read_class_def(),
            Tag::Array => self.read_ref_array(),
            Tag::PrimitiveArray => self.read_prim_array(),
        }
    }

    fn read_class_def(&mut self) -> Result<Value> {
        let id = ClassId::new(self.src.read_u16()?);
        if id == ClassId::STRING {
            let s = self.src.read_utf()?;
            let value = Value::Str(Rc::new(s));
            self.handles.push(value.clone());
            return Ok(value);
        }
        let handler = self.registry.lookup_id(id)?;
        let rc = handler.instantiate();
        let slot = self.handles.len();
        // Register before populating so self-references resolve.
        self.handles.push(Value::Object(rc.clone()));
        let result = {
            let mut obj = rc.borrow_mut();
            (|| -> Result<()> {
                if !obj.custom_read(self)? {
                    obj.default_read(self)?;
                }
                Ok(())
            })()
        };
        result.map_err(|e| e.with_frame(handler.name().to_string()))?;
        let resolved = rc.borrow().resolve_after_read();
        if let Some(resolved) = resolved {
            self.handles[slot] = resolved.clone();
            return Ok(resolved);
        }
        Ok(Value::Object(rc))
    }

    fn read_ref_array(&mut self) -> Result<Value> {
        let component = ClassId::new(self.src.read_u16()?);
        let len = self.src.read_u32()? as usize;
        // A corrupted length must not preallocate unbounded memory; every
        // element costs at least one tag byte.
        let arr = Rc::new(ObjArray::with_capacity(
            component,
            len.min(self.src.remaining()),
        ));
        let value = Value::Array(arr.clone());
        self.handles.push(value.clone());
        let result = (|| -> Result<()> {
            for _ in 0..len {
                let elem = self.read_object()?;
                arr.push(elem);
            }
            Ok(())
        })();
        result.map_err(|e| {
            e.with_frame(format!("{}[{len}]", self.registry.name_of(component)))
        })?;
        Ok(value)
    }

    fn read_prim_array(&mut self) -> Result<Value> {
        let kind = ClassId::new(self.src.read_u16()?);
        let len = self.src.read_u32()? as usize;
        if len > self.src.remaining() {
            return Err(PagepackError::Protocol(format!(
                "primitive array of {len} elements does not fit the remaining stream"
            )));
        }
        let pa = PrimArray::read_payload(kind, len, &mut self.src)?;
        let value = Value::PrimArray(pa);
        self.handles.push(value.clone());
        Ok(value)
    }

    /// Reads the declared fields of the object currently being read.
    ///
    /// Mirror of [`GraphEncoder::default_write_object`](crate::encoder::GraphEncoder::default_write_object);
    /// idempotent per instance per session.
    pub fn default_read_object(&mut self, obj: &mut dyn Persist) -> Result<()> {
        let token = obj as *mut dyn Persist as *mut () as usize;
        if self.default_read.contains(&token) {
            return Ok(());
        }
        self.default_read.push(token);
        obj.default_read(self)
    }

    /// Consumes one field-map block sequence written by
    /// [`GraphEncoder::write_fields`](crate::encoder::GraphEncoder::write_fields).
    pub fn read_fields(&mut self) -> Result<FieldBag> {
        FieldBag::read(self)
    }

    /// Reads a boolean.
    pub fn read_bool(&mut self) -> Result<bool> {
        self.src.read_bool()
    }

    /// Reads an 8 bit byte.
    pub fn read_i8(&mut self) -> Result<i8> {
        self.src.read_i8()
    }

    /// Reads a 16 bit short.
    pub fn read_i16(&mut self) -> Result<i16> {
        self.src.read_i16()
    }

    /// Reads a character.
    pub fn read_char(&mut self) -> Result<char> {
        self.src.read_char()
    }

    /// Reads a 32 bit int.
    pub fn read_i32(&mut self) -> Result<i32> {
        self.src.read_i32()
    }

    /// Reads a 64 bit long.
    pub fn read_i64(&mut self) -> Result<i64> {
        self.src.read_i64()
    }

    /// Reads a 32 bit float.
    pub fn read_f32(&mut self) -> Result<f32> {
        self.src.read_f32()
    }

    /// Reads a 64 bit double.
    pub fn read_f64(&mut self) -> Result<f64> {
        self.src.read_f64()
    }

    /// Reads a length-prefixed UTF-8 string written by
    /// [`GraphEncoder::write_utf`](crate::encoder::GraphEncoder::write_utf).
    pub fn read_utf(&mut self) -> Result<String> {
        self.src.read_utf()
    }

    /// Number of handles registered so far in this session.
    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    pub(crate) fn src(&mut self) -> &mut DataSource<'a> {
        &mut self.src
    }

    /// Releases all per-session state.
    pub fn close(mut self) {
        self.handles.clear();
        self.default_read.clear();
    }
}
