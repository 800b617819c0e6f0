pub mod error;
pub mod types;
pub mod rule;
pub mod action;
pub mod engine;
pub mod config;
pub mod store;
pub mod secret;
pub mod webhook;
pub mod orchestrator;
pub mod verify;
pub mod validation;

pub use error::{Denied, Error, Result};
pub use types::*;
pub use rule::{Condition, CountOp, EqOp, Rule, SetOp, TimeOp};
pub use action::{ActionOutcome, ActionSpec};
pub use engine::{evaluate, Evaluation};
pub use config::EngineConfig;
pub use store::{AccessRecord, AccessStore, MemoryAccessStore};
pub use secret::{hash_secret, verify_secret};
pub use orchestrator::{AccessOrchestrator, Directive, OrchestrationResult, SideEffects};
