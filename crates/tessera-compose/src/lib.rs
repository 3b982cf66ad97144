//! # tessera-compose
//!
//! Turns a set of validated module instances into an ordered plan.
//!
//! Handles:
//! - **Parser**: Lexing, AST construction, and validation of `.tsr` files.
//! - **Resolver**: Substitution of cross-instance output references.
//! - **Graph**: Dependency graph construction and deterministic topological ordering.
//! - **Plan**: The ordered, fully resolved result.

pub mod graph;
pub mod parser;
pub mod plan;
pub mod resolver;

pub use graph::DependencyGraph;
pub use plan::CompositionPlan;
pub use resolver::{Reference, resolve};
