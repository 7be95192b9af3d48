//! lithoscope-common — shared plumbing for the INSPIRE harvester.
//! - Typed error enum used across the workspace
//! - Harvester configuration (TOML-loadable, code defaults)
//! - JSON dotted-path access and pure deep-merge helpers
//! - EDTF level-0 date parsing
//! - Identifier format validation (DOI, ISBN)

pub mod config;
pub mod edtf;
pub mod error;
pub mod idents;
pub mod json;

pub use error::{HarvestError, Result};
