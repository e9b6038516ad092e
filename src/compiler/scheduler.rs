//! Pass scheduler for running SSA passes over many functions.
//!
//! Functions are independent of each other: every pass invocation builds its own analysis state
//! for the function it works on. The [`PassScheduler`] therefore processes the functions of one
//! pass in parallel with rayon, collecting the events of each function into a shared log.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::{
    analysis::SsaFunction,
    compiler::{pass::SsaPass, EventKind, EventLog},
    Result,
};

/// Runs a sequence of passes over a set of functions until nothing changes.
///
/// Each iteration runs every pass once, in order, over all functions. The scheduler stops after
/// the first iteration that changed nothing, or after `max_iterations`.
///
/// # Examples
///
/// ```rust
/// use ccprop::analysis::SsaFunctionBuilder;
/// use ccprop::compiler::{ConstantPropagationPass, EventLog, PassScheduler};
///
/// let mut functions: Vec<_> = (0..4i64)
///     .map(|i| {
///         SsaFunctionBuilder::new(format!("f{i}")).build_with(|f| {
///             f.block(0, |b| {
///                 let v = b.add(i, 1);
///                 b.ret_val(v);
///             });
///         })
///     })
///     .collect();
///
/// let scheduler = PassScheduler::default().with_pass(ConstantPropagationPass::new());
/// let events = EventLog::new();
/// let iterations = scheduler.run(&mut functions, &events)?;
/// assert_eq!(iterations, 2);
/// assert_eq!(events.functions_transformed(), 4);
/// # Ok::<(), ccprop::Error>(())
/// ```
pub struct PassScheduler {
    /// Maximum iterations over the whole pass list.
    max_iterations: usize,
    /// Passes in execution order.
    passes: Vec<Box<dyn SsaPass>>,
}

impl Default for PassScheduler {
    fn default() -> Self {
        Self::new(5)
    }
}

impl PassScheduler {
    /// Creates a scheduler without passes.
    ///
    /// # Arguments
    ///
    /// * `max_iterations` - Maximum iterations over the pass list before stopping.
    #[must_use]
    pub fn new(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            passes: Vec::new(),
        }
    }

    /// Appends `pass` to the pass list.
    #[must_use]
    pub fn with_pass(mut self, pass: impl SsaPass + 'static) -> Self {
        self.passes.push(Box::new(pass));
        self
    }

    /// Appends a boxed pass to the pass list.
    pub fn add_pass(&mut self, pass: Box<dyn SsaPass>) {
        self.passes.push(pass);
    }

    /// Returns the maximum number of iterations.
    #[must_use]
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Returns the names of the scheduled passes, in order.
    #[must_use]
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Runs every pass once over all functions.
    ///
    /// Returns `true` if any pass changed any function.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a pass. Functions already processed keep their
    /// changes; the failing function is left as the pass found it.
    pub fn run_once(&self, functions: &mut [SsaFunction], events: &EventLog) -> Result<bool> {
        let any_changed = AtomicBool::new(false);

        for pass in &self.passes {
            functions.par_iter_mut().try_for_each(|ssa| {
                if !pass.should_run(ssa) {
                    return Ok(());
                }

                let local = EventLog::new();
                let result = pass.run_on_function(ssa, &local);
                events.merge(&local);

                match result {
                    Ok(changed) => {
                        if changed {
                            any_changed.store(true, Ordering::Relaxed);
                        }
                        Ok(())
                    }
                    Err(e) => {
                        events
                            .record(EventKind::Error)
                            .function(ssa.name())
                            .pass(pass.name())
                            .message(e.to_string());
                        Err(e)
                    }
                }
            })?;
        }

        Ok(any_changed.load(Ordering::Relaxed))
    }

    /// Runs the pass list until an iteration changes nothing.
    ///
    /// Returns the number of iterations performed, including the final one that found nothing
    /// left to change.
    ///
    /// # Errors
    ///
    /// Returns an error if any pass fails.
    pub fn run(&self, functions: &mut [SsaFunction], events: &EventLog) -> Result<usize> {
        let mut iterations = 0;

        while iterations < self.max_iterations {
            iterations += 1;
            if !self.run_once(functions, events)? {
                break;
            }
        }

        log::debug!(
            "scheduler: {} passes over {} functions, {} iterations, {}",
            self.passes.len(),
            functions.len(),
            iterations,
            events.summary()
        );
        Ok(iterations)
    }
}
