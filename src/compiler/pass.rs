//! The pass interface.
//!
//! A pass transforms one [`SsaFunction`] at a time and records what it did in a shared
//! [`EventLog`]. Passes hold no per-function state, so one instance can be run over many
//! functions in parallel by the [`crate::compiler::PassScheduler`].

use crate::{analysis::SsaFunction, compiler::EventLog, Result};

/// A transformation that operates on SSA form.
///
/// All passes must be thread-safe (`Send + Sync`) to allow parallel execution. Passes receive
/// mutable access to the function they transform and shared access to the event log.
pub trait SsaPass: Send + Sync {
    /// Unique name for logging and debugging.
    fn name(&self) -> &'static str;

    /// Should this pass run on a specific function?
    ///
    /// Called before [`SsaPass::run_on_function`]. Override to skip functions the pass has
    /// nothing to do for.
    fn should_run(&self, _ssa: &SsaFunction) -> bool {
        true
    }

    /// Runs the pass on a single function.
    ///
    /// Returns `true` if the function was modified, `false` otherwise. Events are recorded
    /// directly into `events`.
    ///
    /// # Errors
    ///
    /// Returns an error if the function is malformed or the pass fails on it. A failing pass
    /// leaves the function unchanged.
    fn run_on_function(&self, ssa: &mut SsaFunction, events: &EventLog) -> Result<bool>;

    /// Get a description of what this pass does.
    fn description(&self) -> &'static str {
        "No description available"
    }
}
