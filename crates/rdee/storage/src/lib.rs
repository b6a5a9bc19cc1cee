//! # rdee-storage
//!
//! Where finalized traces go. The engine only ever calls
//! [`TraceArchive::persist`]; what happens behind it is the archive's business.
//!
//! Two implementations ship with the crate:
//!
//! - [`InMemoryTraceArchive`]: for tests and embedding, queryable by trace id
//!   and root seed
//! - [`JsonLinesArchive`]: one JSON trace per line, appended in persist order,
//!   readable back with [`JsonLinesArchive::load`]
//!
//! Archives reject a second trace with an id they already hold. A trace that
//! cannot be persisted is an error, never a silent drop.

#![deny(unsafe_code)]

pub mod archive;
pub mod error;
pub mod jsonl;
pub mod memory;

pub use archive::TraceArchive;
pub use error::{StorageError, StorageResult};
pub use jsonl::JsonLinesArchive;
pub use memory::InMemoryTraceArchive;
