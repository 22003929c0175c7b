//! cassnap engine - snapshot/restore orchestration
//!
//! Coordinates schema inspection (`inspector`), the filesystem layer
//! (`cassnap-store`) and the collaborator seams (`cassnap_core::collaborators`)
//! into the operations the CLI exposes. Every command validates its whole
//! request before the first side effect.

pub mod commands;
pub mod context;
pub mod inspector;

pub use context::NodeContext;
pub use inspector::SchemaInspector;
