//! Named field maps: the escape hatch for custom field writing.
//!
//! A type whose stream shape does not match its declared fields 1:1 (computed
//! fields, forward/backward compatible layouts) can write a *field map*
//! instead: named values grouped into one lazily-created bucket per primitive
//! kind plus a generic object bucket. On flush the non-empty buckets are
//! written as tagged blocks in a fixed kind order (boolean, byte, short,
//! char, int, long, float, double, object), each block carrying the kind's
//! class id, a count, and name/value pairs; the whole sequence is terminated
//! by the NULL sentinel id. Field names are written as ordinary string
//! objects, so a name repeated across objects collapses to a back-reference.
//!
//! [`FieldBag`] is the decode-side mirror: it consumes the block sequence
//! into per-kind lookup maps queried by name.

use crate::decoder::GraphDecoder;
use crate::encoder::GraphEncoder;
use crate::error::{PagepackError, Result};
use crate::format::ClassId;
use crate::value::Value;
use std::collections::HashMap;

type Bucket<T> = Option<Vec<(String, T)>>;

fn put_entry<T>(bucket: &mut Bucket<T>, name: &str, val: T) {
    let entries = bucket.get_or_insert_with(Vec::new);
    // Last write for a name wins within one flush.
    if let Some(entry) = entries.iter_mut().find(|(n, _)| n == name) {
        entry.1 = val;
    } else {
        entries.push((name.to_string(), val));
    }
}

/// A transient, per-object buffer of named field values pending flush.
///
/// Obtained from [`GraphEncoder::put_fields`] inside a custom write method
/// and flushed by [`GraphEncoder::write_fields`].
#[derive(Default)]
pub struct FieldMap {
    booleans: Bucket<bool>,
    bytes: Bucket<i8>,
    shorts: Bucket<i16>,
    chars: Bucket<char>,
    ints: Bucket<i32>,
    longs: Bucket<i64>,
    floats: Bucket<f32>,
    doubles: Bucket<f64>,
    objects: Bucket<Value>,
}

impl FieldMap {
    /// Stores a named boolean.
    pub fn put_bool(&mut self, name: &str, val: bool) {
        put_entry(&mut self.booleans, name, val);
    }

    /// Stores a named byte.
    pub fn put_i8(&mut self, name: &str, val: i8) {
        put_entry(&mut self.bytes, name, val);
    }

    /// Stores a named short.
    pub fn put_i16(&mut self, name: &str, val: i16) {
        put_entry(&mut self.shorts, name, val);
    }

    /// Stores a named char.
    pub fn put_char(&mut self, name: &str, val: char) {
        put_entry(&mut self.chars, name, val);
    }

    /// Stores a named int.
    pub fn put_i32(&mut self, name: &str, val: i32) {
        put_entry(&mut self.ints, name, val);
    }

    /// Stores a named long.
    pub fn put_i64(&mut self, name: &str, val: i64) {
        put_entry(&mut self.longs, name, val);
    }

    /// Stores a named float.
    pub fn put_f32(&mut self, name: &str, val: f32) {
        put_entry(&mut self.floats, name, val);
    }

    /// Stores a named double.
    pub fn put_f64(&mut self, name: &str, val: f64) {
        put_entry(&mut self.doubles, name, val);
    }

    /// Stores a named object value.
    pub fn put_value(&mut self, name: &str, val: Value) {
        put_entry(&mut self.objects, name, val);
    }

    /// Stores a named string (a fresh string object in the object bucket).
    pub fn put_str(&mut self, name: &str, val: &str) {
        self.put_value(name, Value::string(val));
    }

    fn write_bucket<T>(
        enc: &mut GraphEncoder<'_>,
        kind: ClassId,
        bucket: &Bucket<T>,
        mut emit: impl FnMut(&mut GraphEncoder<'_>, &T) -> Result<()>,
    ) -> Result<()> {
        let entries = match bucket {
            Some(entries) if !entries.is_empty() => entries,
            _ => return Ok(()),
        };
        let count = u16::try_from(entries.len()).map_err(|_| {
            PagepackError::serialization(format!(
                "field map block for kind {kind} exceeds 65535 entries"
            ))
        })?;
        enc.out().write_u16(kind.as_u16())?;
        enc.out().write_u16(count)?;
        for (name, val) in entries {
            let interned = enc.intern_name(name);
            enc.write_object(&Value::Str(interned))?;
            emit(enc, val)?;
        }
        Ok(())
    }

    /// Flushes all non-empty buckets in fixed kind order, then the
    /// terminating sentinel.
    pub(crate) fn write(&self, enc: &mut GraphEncoder<'_>) -> Result<()> {
        Self::write_bucket(enc, ClassId::BOOLEAN, &self.booleans, |e, v| e.write_bool(*v))?;
        Self::write_bucket(enc, ClassId::BYTE, &self.bytes, |e, v| e.write_i8(*v))?;
        Self::write_bucket(enc, ClassId::SHORT, &self.shorts, |e, v| e.write_i16(*v))?;
        Self::write_bucket(enc, ClassId::CHAR, &self.chars, |e, v| e.write_char(*v))?;
        Self::write_bucket(enc, ClassId::INT, &self.ints, |e, v| e.write_i32(*v))?;
        Self::write_bucket(enc, ClassId::LONG, &self.longs, |e, v| e.write_i64(*v))?;
        Self::write_bucket(enc, ClassId::FLOAT, &self.floats, |e, v| e.write_f32(*v))?;
        Self::write_bucket(enc, ClassId::DOUBLE, &self.doubles, |e, v| e.write_f64(*v))?;
        Self::write_bucket(enc, ClassId::OBJECT, &self.objects, |e, v| e.write_object(v))?;
        enc.out().write_u16(ClassId::NULL.as_u16())
    }
}

/// Decoded named field values, grouped by primitive kind.
///
/// Obtained from [`GraphDecoder::read_fields`] inside a custom read method.
/// Getters return `None` for names the writing side did not emit, letting
/// readers tolerate absent fields.
#[derive(Default)]
pub struct FieldBag {
    booleans: HashMap<String, bool>,
    bytes: HashMap<String, i8>,
    shorts: HashMap<String, i16>,
    chars: HashMap<String, char>,
    ints: HashMap<String, i32>,
    longs: HashMap<String, i64>,
    floats: HashMap<String, f32>,
    doubles: HashMap<String, f64>,
    objects: HashMap<String, Value>,
}

impl FieldBag {
    /// Consumes one field-map block sequence from the stream.
    pub(crate) fn read(dec: &mut GraphDecoder<'_>) -> Result<Self> {
        let mut bag = Self::default();
        loop {
            let kind = ClassId::new(dec.src().read_u16()?);
            if kind == ClassId::NULL {
                break;
            }
            let count = dec.src().read_u16()?;
            for _ in 0..count {
                let name = match dec.read_object()? {
                    Value::Str(s) => (*s).clone(),
                    other => {
                        return Err(PagepackError::Protocol(format!(
                            "expected a field name string, found {other:?}"
                        )))
                    }
                };
                match kind {
                    ClassId::BOOLEAN => {
                        bag.booleans.insert(name, dec.read_bool()?);
                    }
                    ClassId::BYTE => {
                        bag.bytes.insert(name, dec.read_i8()?);
                    }
                    ClassId::SHORT => {
                        bag.shorts.insert(name, dec.read_i16()?);
                    }
                    ClassId::CHAR => {
                        bag.chars.insert(name, dec.read_char()?);
                    }
                    ClassId::INT => {
                        bag.ints.insert(name, dec.read_i32()?);
                    }
                    ClassId::LONG => {
                        bag.longs.insert(name, dec.read_i64()?);
                    }
                    ClassId::FLOAT => {
                        bag.floats.insert(name, dec.read_f32()?);
                    }
                    ClassId::DOUBLE => {
                        bag.doubles.insert(name, dec.read_f64()?);
                    }
                    ClassId::OBJECT => {
                        bag.objects.insert(name, dec.read_object()?);
                    }
                    other => {
                        return Err(PagepackError::Protocol(format!(
                            "unknown field block kind id {other}"
                        )))
                    }
                }
            }
        }
        Ok(bag)
    }

    /// Returns a named boolean, if the writer emitted one.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.booleans.get(name).copied()
    }

    /// Returns a named byte.
    pub fn get_i8(&self, name: &str) -> Option<i8> {
        self.bytes.get(name).copied()
    }

    /// Returns a named short.
    pub fn get_i16(&self, name: &str) -> Option<i16> {
        self.shorts.get(name).copied()
    }

    /// Returns a named char.
    pub fn get_char(&self, name: &str) -> Option<char> {
        self.chars.get(name).copied()
    }

    /// Returns a named int.
    pub fn get_i32(&self, name: &str) -> Option<i32> {
        self.ints.get(name).copied()
    }

    /// Returns a named long.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.longs.get(name).copied()
    }

    /// Returns a named float.
    pub fn get_f32(&self, name: &str) -> Option<f32> {
        self.floats.get(name).copied()
    }

    /// Returns a named double.
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.doubles.get(name).copied()
    }

    /// Returns a named object value.
    pub fn get_value(&self, name: &str) -> Option<&Value> {
        self.objects.get(name)
    }

    /// Returns a named string from the object bucket.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.objects.get(name).and_then(Value::as_str)
    }
}
