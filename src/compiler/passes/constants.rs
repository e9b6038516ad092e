//! Conditional constant propagation pass.
//!
//! Runs [`ConstantPropagation`] on a function and materializes the result with the
//! [`Rewriter`]: values proven constant are replaced by literals and conditional branches with a
//! decided condition become jumps.
//!
//! # Example
//!
//! Before:
//! ```text
//! B0:
//!   %0 = icmp sgt 10, 3
//!   br %0, B1, B2
//! B1:  ; preds: B0
//!   ret 1
//! B2:  ; preds: B0
//!   ret 2
//! ```
//!
//! After:
//! ```text
//! B0:
//!   jmp B1
//! B1:  ; preds: B0
//!   ret 1
//! B2:  ; preds: B0
//!   ret 2
//! ```

use crate::{
    analysis::{ConstantPropagation, SccpResult, SsaFunction},
    compiler::{pass::SsaPass, EventKind, EventLog, Rewriter, SccpConfig},
    Result,
};

/// Sparse conditional constant propagation as a function pass.
///
/// Analysis and rewrite both see the same configuration. With
/// [`SccpConfig::analysis_only`] the pass only validates and analyzes, and always reports the
/// function as unchanged.
#[derive(Debug, Clone, Default)]
pub struct ConstantPropagationPass {
    config: SccpConfig,
}

impl ConstantPropagationPass {
    /// Creates a new pass with the default configuration.
    ///
    /// # Returns
    ///
    /// A new `ConstantPropagationPass` instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new pass with the given configuration.
    #[must_use]
    pub fn with_config(config: SccpConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration of this pass.
    #[must_use]
    pub fn config(&self) -> &SccpConfig {
        &self.config
    }

    /// Records one `Info` event per instruction whose value changed during the run, e.g.
    /// `%3: unknown -> const 4 -> overdefined`.
    ///
    /// Runs before rewriting, while every analyzed instruction is still in place.
    fn report_history(&self, ssa: &SsaFunction, result: &SccpResult, events: &EventLog) {
        for instr in ssa.instructions() {
            let Some(history) = result.history(instr.id()) else {
                continue;
            };
            if history.len() < 2 {
                continue;
            }

            let steps: Vec<String> = history.iter().map(ToString::to_string).collect();
            events
                .record(EventKind::Info)
                .at(ssa.name(), instr.block())
                .pass(self.name())
                .message(format!("{}: {}", instr.id(), steps.join(" -> ")));
        }
    }
}

impl SsaPass for ConstantPropagationPass {
    fn name(&self) -> &'static str {
        "conditional-constant-propagation"
    }

    fn description(&self) -> &'static str {
        "Propagates constants along executable paths and folds decided branches using SCCP"
    }

    fn should_run(&self, ssa: &SsaFunction) -> bool {
        !ssa.is_empty()
    }

    fn run_on_function(&self, ssa: &mut SsaFunction, events: &EventLog) -> Result<bool> {
        events
            .record(EventKind::PassStarted)
            .function(ssa.name())
            .pass(self.name());

        if self.config.verify_input {
            ssa.validate()?;
        }

        let result = ConstantPropagation::new(ssa)
            .with_history(self.config.record_history)
            .solve()?;

        if self.config.record_history {
            self.report_history(ssa, &result, events);
        }

        let changes = if self.config.rewrites() {
            Rewriter::new(&result, self.config)
                .with_pass(self.name())
                .apply(ssa, events)?
        } else {
            0
        };

        log::debug!(
            "{} on '{}': {} constants, {}/{} blocks reachable, {} rewrites",
            self.name(),
            ssa.name(),
            result.constant_count(),
            result.reachable_block_count(),
            ssa.block_count(),
            changes
        );

        events
            .record(EventKind::PassCompleted)
            .function(ssa.name())
            .pass(self.name())
            .message(format!("{changes} rewrites"));

        Ok(changes > 0)
    }
}
