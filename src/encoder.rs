//! The graph encoder: recursive writer for object graphs.
//!
//! One [`GraphEncoder`] is one write session: stateful, single-threaded,
//! driven from [`GraphEncoder::write_object`] to [`GraphEncoder::close`].
//! The encoder owns the session's handle table and threads two pieces of
//! write-in-progress context (the object currently being written and its
//! pending field map) through recursive writes, saving and restoring them
//! around every nested object so a child cannot corrupt its parent's
//! in-progress state.
//!
//! The write protocol per value:
//!
//! 1. Null and type-descriptor values are a bare tag (plus class id).
//! 2. Anything with identity is first looked up in the handle table; a hit
//!    emits a two-byte back-reference instead of re-serializing.
//! 3. A miss assigns the next handle *before* recursing into contents, so a
//!    value reachable from its own fields resolves to a back-reference
//!    instead of recursing forever.
//! 4. Arrays branch on component shape: primitive components are written as
//!    one contiguous payload, reference components element by element.
//! 5. Scalar objects may substitute a replacement via
//!    [`Persist::replace_for_write`], then write either their custom stream
//!    shape or their declared fields.
//!
//! Failures inside a nested write surface with a trace of the containment
//! path; see [`PagepackError::Serialization`].

use crate::error::{PagepackError, Result};
use crate::fields::FieldMap;
use crate::format::{ClassId, Tag};
use crate::handles::HandleTable;
use crate::io::DataSink;
use crate::persist::Persist;
use crate::registry::ClassRegistry;
use crate::value::{ObjArray, ObjRef, PrimArray, Value};
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;
use std::sync::Arc;

/// Serializes an object graph to a byte sink.
///
/// Not safe for concurrent use; the shared [`ClassRegistry`] is the only
/// cross-session resource.
pub struct GraphEncoder<'w> {
    out: DataSink<'w>,
    registry: Arc<ClassRegistry>,
    handles: HandleTable,
    /// Interned field names, so repeated names across field maps collapse to
    /// one string object and a back-reference.
    names: HashMap<String, Rc<String>>,
    /// Identity tokens of objects whose default fields were already written,
    /// guarding reentry of the default-write path within one session.
    default_written: Vec<usize>,
    cur_token: Option<usize>,
    cur_put: Option<FieldMap>,
}

impl<'w> GraphEncoder<'w> {
    /// Creates an encoder writing to `sink`, resolving types through
    /// `registry`.
    pub fn new(registry: Arc<ClassRegistry>, sink: &'w mut dyn Write) -> Self {
        Self {
            out: DataSink::new(sink),
            registry,
            handles: HandleTable::new(),
            names: HashMap::new(),
            default_written: Vec::new(),
            cur_token: None,
            cur_put: None,
        }
    }

    /// Writes one value, recursively serializing everything reachable from
    /// it that has not been written before in this session.
    pub fn write_object(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Null => self.out.write_u8(Tag::Null as u8),
            Value::Class(id) => {
                if !self.registry.contains(*id) {
                    return Err(PagepackError::Registry(format!(
                        "class descriptor {id} is not registered"
                    )));
                }
                self.out.write_u8(Tag::Class as u8)?;
                self.out.write_u16(id.as_u16())
            }
            Value::Object(_) | Value::Str(_) | Value::Array(_) | Value::PrimArray(_) => {
                let token = match value.identity() {
                    Some(token) => token,
                    None => {
                        return Err(PagepackError::serialization(
                            "graph node unexpectedly has no identity",
                        ))
                    }
                };
                if let Some(handle) = self.handles.lookup(token) {
                    self.out.write_u8(Tag::Handle as u8)?;
                    return self.out.write_u16(handle as u16);
                }
                let handle = self.handles.assign(token, value.clone());
                if handle > u16::MAX as usize {
                    return Err(PagepackError::serialization(
                        "handle space exhausted (65536 values per stream)",
                    ));
                }
                match value {
                    Value::PrimArray(pa) => self.write_prim_array(pa),
                    Value::Array(arr) => self.write_ref_array(arr),
                    Value::Str(s) => self.write_string(s),
                    Value::Object(rc) => self.write_instance(rc),
                    // Identity-less variants were dispatched above.
                    Value::Null | Value::Class(_) => Ok(()),
                }
            }
        }
    }

    fn write_prim_array(&mut self, pa: &PrimArray) -> Result<()> {
        let result = (|| -> Result<()> {
            self.out.write_u8(Tag::PrimitiveArray as u8)?;
            self.out.write_u16(pa.kind_id().as_u16())?;
            let len = u32::try_from(pa.len()).map_err(|_| {
                PagepackError::serialization("array length exceeds the u32 wire field")
            })?;
            self.out.write_u32(len)?;
            pa.write_payload(&mut self.out)
        })();
        result.map_err(|e| e.with_frame(format!("{}[{}]", pa.kind_name(), pa.len())))
    }

    fn write_ref_array(&mut self, arr: &Rc<ObjArray>) -> Result<()> {
        let component_name = self.registry.name_of(arr.component());
        // Clone the element handles out so a custom write method touching
        // the array being written cannot invalidate the iteration.
        let elems = arr.to_vec();
        let result = (|| -> Result<()> {
            self.out.write_u8(Tag::Array as u8)?;
            self.out.write_u16(arr.component().as_u16())?;
            let len = u32::try_from(elems.len()).map_err(|_| {
                PagepackError::serialization("array length exceeds the u32 wire field")
            })?;
            self.out.write_u32(len)?;
            for elem in &elems {
                self.write_object(elem)?;
            }
            Ok(())
        })();
        result.map_err(|e| e.with_frame(format!("{component_name}[{}]", elems.len())))
    }

    // Strings get the dedicated compact encoding instead of a field pass.
    fn write_string(&mut self, s: &Rc<String>) -> Result<()> {
        self.out.write_u8(Tag::ClassDef as u8)?;
        self.out.write_u16(ClassId::STRING.as_u16())?;
        self.out.write_utf(s)
    }

    fn write_instance(&mut self, rc: &ObjRef) -> Result<()> {
        let obj = rc.borrow();
        let handler = self.registry.lookup_instance(&*obj)?;
        if let Some(replacement) = obj.replace_for_write() {
            let original = handler.name().to_string();
            drop(obj);
            return self.write_replacement(replacement, &original);
        }
        self.out.write_u8(Tag::ClassDef as u8)?;
        self.out.write_u16(handler.class_id().as_u16())?;
        let token = Rc::as_ptr(rc) as *const () as usize;
        self.write_object_body(&*obj, token)
            .map_err(|e| e.with_frame(handler.name().to_string()))
    }

    /// Writes the substitute produced by a write-replace hook. The original
    /// instance keeps the handle that was already assigned to it.
    fn write_replacement(&mut self, replacement: Value, original: &str) -> Result<()> {
        match replacement {
            Value::Str(s) => self.write_string(&s),
            Value::Object(rc) => {
                let obj = rc.borrow();
                let handler = self.registry.lookup_instance(&*obj)?;
                self.out.write_u8(Tag::ClassDef as u8)?;
                self.out.write_u16(handler.class_id().as_u16())?;
                let token = Rc::as_ptr(&rc) as *const () as usize;
                self.write_object_body(&*obj, token).map_err(|e| {
                    e.with_frame(format!("{}(replace of {original})", handler.name()))
                })
            }
            other => Err(PagepackError::serialization(format!(
                "write-replace for {original} must produce an object or a string, got {other:?}"
            ))),
        }
    }

    /// Runs the custom or default write path with the write-in-progress
    /// context swapped in, restoring the parent's context whether or not the
    /// body succeeds.
    fn write_object_body(&mut self, obj: &dyn Persist, token: usize) -> Result<()> {
        let saved_put = self.cur_put.take();
        let saved_token = self.cur_token.replace(token);
        let result = (|| -> Result<()> {
            if !obj.custom_write(self)? {
                obj.default_write(self)?;
            }
            Ok(())
        })();
        self.cur_put = saved_put;
        self.cur_token = saved_token;
        result
    }

    /// Writes the declared fields of the object currently being written.
    ///
    /// For use from custom write methods that want the default fields in
    /// addition to their own data. Idempotent per instance per session: a
    /// second call for the same object writes nothing.
    pub fn default_write_object(&mut self, obj: &dyn Persist) -> Result<()> {
        let token = self.cur_token.ok_or_else(|| {
            PagepackError::serialization("default_write_object called outside an object write")
        })?;
        if self.default_written.contains(&token) {
            return Ok(());
        }
        self.default_written.push(token);
        obj.default_write(self)
    }

    /// Returns the pending field map for the object currently being written,
    /// creating it on first use.
    pub fn put_fields(&mut self) -> &mut FieldMap {
        self.cur_put.get_or_insert_with(FieldMap::default)
    }

    /// Flushes the pending field map as kind-tagged blocks. Writes nothing
    /// if no fields were put.
    pub fn write_fields(&mut self) -> Result<()> {
        if let Some(map) = self.cur_put.take() {
            let result = map.write(self);
            self.cur_put = Some(map);
            result?;
        }
        Ok(())
    }

    /// Writes a boolean.
    pub fn write_bool(&mut self, val: bool) -> Result<()> {
        self.out.write_bool(val)
    }

    /// Writes an 8 bit byte.
    pub fn write_i8(&mut self, val: i8) -> Result<()> {
        self.out.write_i8(val)
    }

    /// Writes a 16 bit short.
    pub fn write_i16(&mut self, val: i16) -> Result<()> {
        self.out.write_i16(val)
    }

    /// Writes a character.
    pub fn write_char(&mut self, val: char) -> Result<()> {
        self.out.write_char(val)
    }

    /// Writes a 32 bit int.
    pub fn write_i32(&mut self, val: i32) -> Result<()> {
        self.out.write_i32(val)
    }

    /// Writes a 64 bit long.
    pub fn write_i64(&mut self, val: i64) -> Result<()> {
        self.out.write_i64(val)
    }

    /// Writes a 32 bit float.
    pub fn write_f32(&mut self, val: f32) -> Result<()> {
        self.out.write_f32(val)
    }

    /// Writes a 64 bit double.
    pub fn write_f64(&mut self, val: f64) -> Result<()> {
        self.out.write_f64(val)
    }

    /// Writes a length-prefixed UTF-8 string without identity tracking.
    pub fn write_utf(&mut self, val: &str) -> Result<()> {
        self.out.write_utf(val)
    }

    pub(crate) fn out(&mut self) -> &mut DataSink<'w> {
        &mut self.out
    }

    pub(crate) fn intern_name(&mut self, name: &str) -> Rc<String> {
        if let Some(rc) = self.names.get(name) {
            return rc.clone();
        }
        let rc = Rc::new(name.to_string());
        self.names.insert(name.to_string(), rc.clone());
        rc
    }

    /// Number of handles assigned so far in this session.
    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    /// Releases all per-session state and flushes the underlying sink.
    ///
    /// No attempt is made to complete a partially-written value.
    pub fn close(mut self) -> Result<()> {
        self.cur_token = None;
        self.cur_put = None;
        self.handles.clear();
        self.names.clear();
        self.default_written.clear();
        self.out.flush()
    }
}
