//! Transformations built on the analysis results.
//!
//! This module turns the facts computed by [`crate::analysis`] into concrete changes of an
//! [`SsaFunction`](crate::analysis::SsaFunction):
//!
//! - [`crate::analysis`] - SSA model, lattice, SCCP fixpoint
//! - [`compiler`](self) - rewriting, passes, scheduling, change tracking
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Compiler Pipeline                           │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  PassScheduler               Fixpoint over passes                │
//! │    └─ per pass: all functions in parallel (rayon)                │
//! │                                                                  │
//! │  SsaPass trait               Interface for all passes            │
//! │    ├─ should_run()            Skip functions with nothing to do  │
//! │    └─ run_on_function()       Per-function transformation        │
//! │                                                                  │
//! │  ConstantPropagationPass     validate → SCCP → rewrite           │
//! │    ├─ SccpConfig              What to fold, validation, history  │
//! │    └─ Rewriter                Constants → literals, br → jmp     │
//! │                                                                  │
//! │  EventLog                    Change tracking and diagnostics     │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod events;
mod pass;
mod passes;
mod rewriter;
mod scheduler;

pub use config::SccpConfig;
pub use events::{Event, EventBuilder, EventKind, EventLog, EventLogIter};
pub use pass::SsaPass;
pub use passes::ConstantPropagationPass;
pub use rewriter::Rewriter;
pub use scheduler::PassScheduler;
