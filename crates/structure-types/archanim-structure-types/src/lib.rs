//! Structure-type extensions for archanim.
//!
//! Each structure kind ships as an extension declaring its name, version
//! and the versions of other kinds it builds on. This crate orders the
//! declarations, fails the ones whose dependencies cannot be met, and hands
//! the rest to a host-supplied loader, dependencies first.

pub mod error;
pub mod loader;
pub mod topo;
pub mod types;

pub use error::StructureTypeError;
pub use loader::{LoadReport, StructureTypeLoader};
pub use topo::{load_order, LoadOrder};
pub use types::{Dependency, StructureTypeInfo};
