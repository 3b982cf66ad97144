//! # tessera-sdk
//!
//! Public SDK for using Tessera as a Rust library.
//!
//! [`Composer`](composer::Composer) validates module requests against a
//! schema registry, resolves their cross-module references, and orders them
//! so every producer comes before its consumers.
//!
//! # Example
//!
//! ```rust,no_run
//! use tessera_common::config::EngineConfig;
//! use tessera_sdk::composer::Composer;
//! use tessera_schema::instance::ModuleRequest;
//!
//! let composer = Composer::builtin(EngineConfig::strict())?;
//! let plan = composer.compose_requests(&[
//!     ModuleRequest::new("net", "virtual-network")
//!         .with("name", "vnet-ci")
//!         .with("resource_group_name", "rg-net")
//!         .with("subscription_id", "00000000-0000-0000-0000-000000000001"),
//! ])?;
//! for step in plan.steps() {
//!     tracing::info!(id = %step.id(), kind = %step.kind(), "step");
//! }
//! # Ok::<(), tessera_common::error::TesseraError>(())
//! ```

pub mod composer;

pub use composer::{Composer, load_file, parse_requests};
pub use tessera_common::config::{EngineConfig, ValidationMode};
pub use tessera_common::error::{Result, TesseraError};
pub use tessera_compose::plan::CompositionPlan;
pub use tessera_schema::instance::{FieldValue, ModuleInstance, ModuleRequest, OutputRef};
