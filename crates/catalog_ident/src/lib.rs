//! Identity layer for catalog objects.
//!
//! Every catalog object is identified internally by an [`InternalId`], a
//! compact self-describing encoding of a [`Section`] and a list of segments
//! (schema name, object name, nested ids, ...). Internal ids are durable and
//! may be persisted.
//!
//! Postgres clients expect 32-bit OIDs instead. The [`IdentityCache`] maps
//! between the two for the lifetime of a process. OIDs handed out by the cache
//! are not durable.
//!
//! The [`OperationRegistry`] lets object families react to renames and
//! deletes of other families without depending on them directly.
pub mod builtin;
pub mod cache;
pub mod config;
pub mod errors;
pub mod internal;
pub mod registry;
pub mod section;
pub mod typed;

pub use cache::{BUILTIN_OID_CEILING, IdentityCache};
pub use errors::{IdentError, Result};
pub use internal::InternalId;
pub use registry::{Operation, OperationArgs, OperationRegistry};
pub use section::Section;
