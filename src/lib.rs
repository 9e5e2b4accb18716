//! # Pagepack
//!
//! A compact, handle-based object graph serializer for snapshotting page and
//! component state between requests. Pagepack trades the generality of a
//! reflective serialization mechanism for a smaller and faster wire shape:
//! type names become two-byte class ids resolved through a shared registry,
//! and every distinct object instance is written exactly once; later
//! encounters, including cycles, collapse to a two-byte back-reference.
//!
//! ## Overview
//!
//! An object graph is a web of [`Value`] handles. Scalar objects implement
//! the [`Persist`](persist::Persist) trait (usually via
//! `#[derive(PagepackObject)]`), declaring how their fields are written and
//! read in a stable order. Strings, reference arrays and primitive arrays
//! are built-in graph shapes with dedicated compact encodings; primitive
//! arrays in particular are written as one contiguous payload rather than
//! element by element.
//!
//! ```rust
//! use pagepack::{ClassRegistry, Pagepack, PagepackObject, Value};
//!
//! #[derive(Default, PagepackObject)]
//! struct Counter {
//!     label: String,
//!     count: i64,
//! }
//!
//! # fn main() -> pagepack::Result<()> {
//! let registry = ClassRegistry::new();
//! registry.register::<Counter>("Counter")?;
//!
//! let root = Value::object(Counter { label: "clicks".into(), count: 41 });
//! let bytes = Pagepack::to_bytes(&registry, &root)?;
//! let decoded = Pagepack::from_bytes(&registry, &bytes)?;
//!
//! let obj = decoded.as_object().unwrap().borrow();
//! let counter = obj.as_any().downcast_ref::<Counter>().unwrap();
//! assert_eq!(counter.count, 41);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! * [`encoder::GraphEncoder`]: one write session, a recursive tag-dispatched
//!   writer with an identity [handle table](handles::HandleTable) assigning
//!   monotonically increasing handles in first-seen order.
//! * [`decoder::GraphDecoder`]: the mirror; rebuilds the graph in one pass,
//!   registering each handle slot before populating contents so shared and
//!   self-referential structure is reproduced, not duplicated.
//! * [`registry::ClassRegistry`]: the only cross-session shared resource, a
//!   thread-safe, injectable cache mapping runtime types to compact class
//!   ids and decode-side instantiation hooks. No hidden global state.
//! * [`fields::FieldMap`] / [`fields::FieldBag`]: named, kind-partitioned
//!   field blocks for types whose stream shape departs from their declared
//!   fields.
//! * [`api::Pagepack`]: whole-graph convenience layer plus the file
//!   container (magic, version, optional compression; files are
//!   memory-mapped on load).
//!
//! Sessions are strictly single-threaded; share the registry, not the
//! encoder.
//!
//! ### Safety and Error Handling
//!
//! * **Encapsulated Unsafe:** `unsafe` appears only at the memory-mapping
//!   call in the load path.
//! * **No Panics:** no `unwrap()` or `panic!()` in the library (enforced by
//!   clippy lints); corrupted streams surface as
//!   [`PagepackError::Protocol`].
//! * **Traced Failures:** serialization failures carry the containment path
//!   from the failure point back to the root of the graph.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

// --- PUBLIC API MODULES ---
pub mod api;
pub mod compression;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod fields;
pub mod format;
pub mod persist;
pub mod registry;
pub mod value;

// --- INTERNAL IMPLEMENTATION MODULES (Hidden from Docs) ---
#[doc(hidden)]
pub mod handles;
#[doc(hidden)]
pub mod io;

// --- RE-EXPORTS ---

#[cfg(feature = "lz4_flex")]
pub use compression::Lz4Compressor;
pub use compression::{Compressor, NoCompression};

pub use api::Pagepack;
pub use decoder::GraphDecoder;
pub use encoder::GraphEncoder;
pub use error::{PagepackError, Result};
pub use fields::{FieldBag, FieldMap};
pub use format::{ClassId, Tag};
pub use persist::{FieldValue, Persist};
pub use registry::ClassRegistry;
pub use value::{ObjArray, ObjRef, PrimArray, Value};

// Re-export the derive macro so it is accessible as `pagepack::PagepackObject`
pub use pagepack_derive::PagepackObject;
