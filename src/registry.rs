//! The per-class stream handler registry.
//!
//! Each runtime type participating in a graph is registered once, receiving a
//! compact numeric [`ClassId`] used on the wire in place of a type name, and a
//! cached [`ClassHandler`] describing how to reconstruct instances on decode.
//! The registry is an explicit, injectable dependency shared by reference
//! between encoders and decoders; there is no hidden process-wide singleton.
//! Lookups are safe from multiple threads; registration is idempotent, so a
//! registration race resolves to the first writer's handler.
//!
//! Encoder and decoder must share a registry populated with the same types in
//! the same order: class ids are assigned from a monotonically increasing
//! counter, and the stream carries only the ids.

use crate::error::{PagepackError, Result};
use crate::format::ClassId;
use crate::persist::Persist;
use crate::value::ObjRef;
use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, RwLock};

fn instantiate<T: Persist + Default>() -> ObjRef {
    Rc::new(RefCell::new(T::default()))
}

/// Cached description of one registered class.
///
/// Immutable once constructed; one instance per distinct runtime type, cached
/// for the life of the registry.
pub struct ClassHandler {
    id: ClassId,
    name: String,
    type_id: TypeId,
    instantiate: fn() -> ObjRef,
}

impl ClassHandler {
    /// The compact id written on the wire for this class.
    pub fn class_id(&self) -> ClassId {
        self.id
    }

    /// Display name, used in error traces.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `TypeId` of the registered concrete type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Allocates a blank instance for the decoder to populate.
    ///
    /// This is the allocate-without-constructor step of default
    /// deserialization: the instance comes from `Default` and its handle slot
    /// is registered before any field is read.
    pub fn instantiate(&self) -> ObjRef {
        (self.instantiate)()
    }
}

#[derive(Default)]
struct RegistryInner {
    by_type: HashMap<TypeId, Arc<ClassHandler>>,
    by_id: HashMap<ClassId, Arc<ClassHandler>>,
    next_id: u16,
}

/// Thread-safe cache of class stream handlers, keyed by type identity.
pub struct ClassRegistry {
    inner: RwLock<RegistryInner>,
}

impl ClassRegistry {
    /// Creates an empty registry. User class ids start at
    /// [`ClassId::FIRST_USER`]; lower ids are reserved wire vocabulary.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: RwLock::new(RegistryInner {
                by_type: HashMap::new(),
                by_id: HashMap::new(),
                next_id: ClassId::FIRST_USER,
            }),
        })
    }

    /// Registers a type under a display name, returning its class id.
    ///
    /// Idempotent: registering the same type again returns the id it already
    /// holds, regardless of the name passed.
    pub fn register<T: Persist + Default>(&self, name: &str) -> Result<ClassId> {
        let type_id = TypeId::of::<T>();
        let mut inner = self
            .inner
            .write()
            .map_err(|_| PagepackError::Registry("class registry lock poisoned".into()))?;
        if let Some(existing) = inner.by_type.get(&type_id) {
            return Ok(existing.class_id());
        }
        let id = ClassId::new(inner.next_id);
        inner.next_id = inner.next_id.checked_add(1).ok_or_else(|| {
            PagepackError::Registry("class id space exhausted (65535 classes)".into())
        })?;
        let handler = Arc::new(ClassHandler {
            id,
            name: name.to_string(),
            type_id,
            instantiate: instantiate::<T>,
        });
        inner.by_type.insert(type_id, handler.clone());
        inner.by_id.insert(id, handler);
        Ok(id)
    }

    /// Resolves the handler for a live instance by its concrete type.
    pub fn lookup_instance(&self, obj: &dyn Persist) -> Result<Arc<ClassHandler>> {
        let type_id = obj.as_any().type_id();
        let inner = self
            .inner
            .read()
            .map_err(|_| PagepackError::Registry("class registry lock poisoned".into()))?;
        inner.by_type.get(&type_id).cloned().ok_or_else(|| {
            PagepackError::Registry(
                "object type was not registered with the class registry".into(),
            )
        })
    }

    /// Resolves the handler for a class id read from the stream.
    pub fn lookup_id(&self, id: ClassId) -> Result<Arc<ClassHandler>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| PagepackError::Registry("class registry lock poisoned".into()))?;
        inner.by_id.get(&id).cloned().ok_or_else(|| {
            PagepackError::Protocol(format!("unknown class id {id} in stream"))
        })
    }

    /// True if the id is reserved vocabulary or a registered class.
    pub fn contains(&self, id: ClassId) -> bool {
        if id.is_reserved() {
            return true;
        }
        match self.inner.read() {
            Ok(inner) => inner.by_id.contains_key(&id),
            Err(_) => false,
        }
    }

    /// Display name for a class id: the registered name, the reserved
    /// vocabulary name, or `class#N` as a last resort.
    pub fn name_of(&self, id: ClassId) -> String {
        if let Some(name) = id.reserved_name() {
            return name.to_string();
        }
        if let Ok(inner) = self.inner.read() {
            if let Some(handler) = inner.by_id.get(&id) {
                return handler.name().to_string();
            }
        }
        format!("class{id}")
    }
}
