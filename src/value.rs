//! The graph node handle: [`Value`] and its array forms.
//!
//! An object graph handed to the encoder is a web of `Value`s. Reference
//! identity, the property the handle table keys on, comes from the `Rc`
//! allocation behind each non-trivial variant: cloning a `Value` clones the
//! handle, not the node, so two clones of the same `Value` serialize as one
//! definition plus a back-reference, and cycles are expressible by storing a
//! clone of an ancestor inside a descendant.

use crate::error::{PagepackError, Result};
use crate::format::ClassId;
use crate::io::{DataSink, DataSource};
use crate::persist::Persist;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A shared, mutable reference to a participating object.
pub type ObjRef = Rc<RefCell<dyn Persist>>;

/// A node handle in a serializable object graph.
#[derive(Clone)]
pub enum Value {
    /// A null reference.
    Null,
    /// A scalar object implementing [`Persist`].
    Object(ObjRef),
    /// A character string. Identity-tracked like any other object.
    Str(Rc<String>),
    /// A reference-typed array.
    Array(Rc<ObjArray>),
    /// A primitive-typed array written as one contiguous payload.
    PrimArray(PrimArray),
    /// A type-descriptor value.
    Class(ClassId),
}

impl Value {
    /// Wraps an object into a freshly allocated graph node.
    pub fn object<T: Persist>(obj: T) -> Self {
        Self::Object(Rc::new(RefCell::new(obj)))
    }

    /// Wraps a string into a freshly allocated graph node.
    pub fn string(s: impl Into<String>) -> Self {
        Self::Str(Rc::new(s.into()))
    }

    /// Creates a reference array with the given component class id.
    pub fn array(component: ClassId, elems: Vec<Value>) -> Self {
        Self::Array(Rc::new(ObjArray {
            component,
            elems: RefCell::new(elems),
        }))
    }

    /// True if this is the null reference.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the object reference, if this node is a scalar object.
    pub fn as_object(&self) -> Option<&ObjRef> {
        match self {
            Self::Object(rc) => Some(rc),
            _ => None,
        }
    }

    /// Returns the string contents, if this node is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(rc) => Some(rc.as_str()),
            _ => None,
        }
    }

    /// Returns the reference array, if this node is one.
    pub fn as_array(&self) -> Option<&Rc<ObjArray>> {
        match self {
            Self::Array(rc) => Some(rc),
            _ => None,
        }
    }

    /// Returns the primitive array, if this node is one.
    pub fn as_prim_array(&self) -> Option<&PrimArray> {
        match self {
            Self::PrimArray(pa) => Some(pa),
            _ => None,
        }
    }

    /// True if both handles point at the same allocation.
    ///
    /// `Null` and `Class` values carry no identity and never compare equal.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// The identity token of this node: the address of its allocation.
    ///
    /// Values without identity (`Null`, `Class`) return `None`. A token is
    /// only valid while some clone of the `Value` keeps the allocation alive;
    /// the handle table pins a clone per assigned handle for that reason.
    pub(crate) fn identity(&self) -> Option<usize> {
        match self {
            Self::Null | Self::Class(_) => None,
            Self::Object(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Self::Str(rc) => Some(Rc::as_ptr(rc) as usize),
            Self::Array(rc) => Some(Rc::as_ptr(rc) as usize),
            Self::PrimArray(pa) => Some(pa.identity()),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Null
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Object(_) => write!(f, "Object(..)"),
            Self::Str(s) => write!(f, "Str({s:?})"),
            Self::Array(a) => write!(f, "Array({}, len={})", a.component(), a.len()),
            Self::PrimArray(pa) => write!(f, "PrimArray({}[{}])", pa.kind_name(), pa.len()),
            Self::Class(id) => write!(f, "Class({id})"),
        }
    }
}

impl From<ObjRef> for Value {
    fn from(rc: ObjRef) -> Self {
        Self::Object(rc)
    }
}

/// A reference-typed array: a component class id plus element handles.
///
/// Elements live behind a `RefCell` so the decoder can populate an array
/// whose handle is already registered, which is what makes self-referential
/// arrays decodable.
pub struct ObjArray {
    component: ClassId,
    elems: RefCell<Vec<Value>>,
}

impl ObjArray {
    pub(crate) fn with_capacity(component: ClassId, capacity: usize) -> Self {
        Self {
            component,
            elems: RefCell::new(Vec::with_capacity(capacity)),
        }
    }

    /// The component class id written on the wire.
    pub fn component(&self) -> ClassId {
        self.component
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elems.borrow().len()
    }

    /// True if the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.elems.borrow().is_empty()
    }

    /// Clones the element at `index`, if present.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.elems.borrow().get(index).cloned()
    }

    /// Replaces the element at `index`.
    pub fn set(&self, index: usize, value: Value) -> Result<()> {
        let mut elems = self.elems.borrow_mut();
        match elems.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(PagepackError::serialization(format!(
                "array index {index} out of bounds (len {})",
                elems.len()
            ))),
        }
    }

    /// Appends an element. Used while building graphs and by the decoder.
    pub fn push(&self, value: Value) {
        self.elems.borrow_mut().push(value);
    }

    /// Clones out all elements.
    pub fn to_vec(&self) -> Vec<Value> {
        self.elems.borrow().clone()
    }
}

impl fmt::Debug for ObjArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjArray({}, len={})", self.component, self.len())
    }
}

macro_rules! prim_array_variants {
    ($( $variant:ident, $ty:ty, $kind:path, $name:literal, $write:ident, $read:ident ;)*) => {
        /// A primitive-component array.
        ///
        /// One variant per primitive kind; the payload is written as the raw
        /// contiguous sequence of little-endian element values rather than as
        /// individually tagged objects.
        #[derive(Clone)]
        pub enum PrimArray {
            $(
                #[doc = concat!("An array of ", $name, " elements.")]
                $variant(Rc<Vec<$ty>>),
            )*
        }

        impl PrimArray {
            /// The class id of the component kind.
            pub fn kind_id(&self) -> ClassId {
                match self {
                    $( Self::$variant(_) => $kind, )*
                }
            }

            /// Display name of the component kind, used in error traces.
            pub fn kind_name(&self) -> &'static str {
                match self {
                    $( Self::$variant(_) => $name, )*
                }
            }

            /// Number of elements.
            pub fn len(&self) -> usize {
                match self {
                    $( Self::$variant(v) => v.len(), )*
                }
            }

            /// True if the array has no elements.
            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            pub(crate) fn identity(&self) -> usize {
                match self {
                    $( Self::$variant(v) => Rc::as_ptr(v) as usize, )*
                }
            }

            /// Writes the contiguous element payload.
            pub(crate) fn write_payload(&self, out: &mut DataSink<'_>) -> Result<()> {
                match self {
                    $(
                        Self::$variant(v) => {
                            for elem in v.iter() {
                                out.$write(*elem)?;
                            }
                            Ok(())
                        }
                    )*
                }
            }

            /// Reads a payload of `len` elements of the given kind.
            pub(crate) fn read_payload(
                kind: ClassId,
                len: usize,
                src: &mut DataSource<'_>,
            ) -> Result<Self> {
                match kind {
                    $(
                        $kind => {
                            let mut v = Vec::with_capacity(len);
                            for _ in 0..len {
                                v.push(src.$read()?);
                            }
                            Ok(Self::$variant(Rc::new(v)))
                        }
                    )*
                    other => Err(PagepackError::Protocol(format!(
                        "unknown primitive array kind id {other}"
                    ))),
                }
            }
        }

        $(
            impl From<Vec<$ty>> for PrimArray {
                fn from(v: Vec<$ty>) -> Self {
                    Self::$variant(Rc::new(v))
                }
            }

            impl From<Vec<$ty>> for Value {
                fn from(v: Vec<$ty>) -> Self {
                    Value::PrimArray(PrimArray::from(v))
                }
            }
        )*
    };
}

prim_array_variants! {
    Bool,   bool, ClassId::BOOLEAN, "boolean", write_bool, read_bool;
    Byte,   i8,   ClassId::BYTE,    "byte",    write_i8,   read_i8;
    Short,  i16,  ClassId::SHORT,   "short",   write_i16,  read_i16;
    Char,   char, ClassId::CHAR,    "char",    write_char, read_char;
    Int,    i32,  ClassId::INT,     "int",     write_i32,  read_i32;
    Long,   i64,  ClassId::LONG,    "long",    write_i64,  read_i64;
    Float,  f32,  ClassId::FLOAT,   "float",   write_f32,  read_f32;
    Double, f64,  ClassId::DOUBLE,  "double",  write_f64,  read_f64;
}

impl fmt::Debug for PrimArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.kind_name(), self.len())
    }
}

impl PrimArray {
    /// Returns the elements, if this is an int array.
    pub fn as_ints(&self) -> Option<&[i32]> {
        match self {
            Self::Int(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Returns the elements, if this is a long array.
    pub fn as_longs(&self) -> Option<&[i64]> {
        match self {
            Self::Long(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Returns the elements, if this is a short array.
    pub fn as_shorts(&self) -> Option<&[i16]> {
        match self {
            Self::Short(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Returns the elements, if this is a char array.
    pub fn as_chars(&self) -> Option<&[char]> {
        match self {
            Self::Char(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Returns the elements, if this is a float array.
    pub fn as_floats(&self) -> Option<&[f32]> {
        match self {
            Self::Float(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Returns the elements, if this is a byte array.
    pub fn as_bytes(&self) -> Option<&[i8]> {
        match self {
            Self::Byte(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Returns the elements, if this is a double array.
    pub fn as_doubles(&self) -> Option<&[f64]> {
        match self {
            Self::Double(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Returns the elements, if this is a boolean array.
    pub fn as_bools(&self) -> Option<&[bool]> {
        match self {
            Self::Bool(v) => Some(v.as_slice()),
            _ => None,
        }
    }
}
