//! # Textmorph Ops
//!
//! Text analysis operations for textmorph.
//! Provides the backend capability trait, a rule-based backend, one
//! backend-powered operation per capability, and the catalog builder.

pub mod backend;
pub mod catalog;
pub mod operations;
pub mod simple;

pub use backend::{Entity, TaggedToken, TextBackend};
pub use catalog::{register_text_operations, text_catalog};
pub use operations::{Capability, TextOperation};
pub use simple::SimpleBackend;
