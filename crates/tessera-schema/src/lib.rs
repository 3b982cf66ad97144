//! # tessera-schema
//!
//! Declares what a module's configuration may look like and checks
//! concrete configuration against it.
//!
//! Handles:
//! - **Constraint**: type checks and field rules (pattern, enumeration, range, nullable enumeration).
//! - **Field**: a named, typed, optionally defaulted and constrained value.
//! - **Schema**: a module kind's ordered fields and declared outputs.
//! - **Instance**: all-or-nothing instantiation of a schema from supplied values.
//! - **Registry**: the immutable, process-wide set of schemas.
//! - **Catalog**: the built-in infrastructure module schemas.

pub mod catalog;
pub mod constraint;
pub mod field;
pub mod instance;
pub mod registry;
pub mod schema;
