#![forbid(unsafe_code)]

//! Core domain model and business logic for workout mode.
//!
//! This crate provides:
//! - Domain types (exercises, plans, session records, run outcomes)
//! - Exercise library and the plan catalog contract
//! - Plan persistence
//! - Transactional session store (JSONL file or in-memory)
//! - Progression engine walking a user through a plan
//! - Finished-run history

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod plans;
pub mod store;
pub mod progression;
pub mod engine;
pub mod history;

// Re-export commonly used types
pub use error::{Error, ErrorKind, Result};
pub use types::*;
pub use catalog::{get_default_library, Library, PlanCatalog};
pub use config::Config;
pub use plans::{PlanBook, UserPlans};
pub use store::{JsonlStore, MemoryStore, SessionStore, SessionTable};
pub use engine::ProgressionEngine;
pub use history::{append_run, load_run_history};
