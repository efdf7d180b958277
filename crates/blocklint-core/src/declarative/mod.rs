//! Declarative classifiers and styles driven by TOML configuration.
//!
//! # Architecture
//!
//! ```text
//! TOML text
//!   ↓ serde (DTO layer)
//! config_dto types
//!   ↓ validate + convert (loader)
//! Vec<ClassRule> / BTreeMap<label, StyleDef>
//!   ↓
//! Classifier / StyleChecker
//! ```
//!
//! Every regex is compiled and every measurement converted during loading,
//! so a configuration that loads never fails while blocks are visited.

pub mod config_dto;
pub mod loader;

pub use loader::{load_classifiers, load_styles, parse_range_expression, LoadError};
