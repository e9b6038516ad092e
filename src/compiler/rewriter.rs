//! Materializes propagation results in the function.
//!
//! The [`Rewriter`] runs once, after the fixpoint has converged. It plans every edit against the
//! unchanged function first and only then mutates it, so an error leaves the function as it was.
//!
//! Before:
//! ```text
//! B0:
//!   %0 = add 2, 3
//!   %1 = icmp sgt %0, 4
//!   br %1, B1, B2
//! ```
//!
//! After:
//! ```text
//! B0:
//!   jmp B1
//! ```
//!
//! The untaken successor is left in place; removing unreachable blocks is a separate concern.

use crate::{
    analysis::{InstrId, Operand, SccpResult, SsaFunction, SsaOp},
    compiler::{EventKind, EventLog, SccpConfig},
    Error, Result,
};

/// A single planned edit.
#[derive(Debug)]
enum Edit {
    /// Replace every use of the value with the constant, then remove the definition.
    Fold {
        id: InstrId,
        block: usize,
        value: i64,
        is_phi: bool,
        text: String,
    },
    /// Replace the terminator of `block` with an unconditional jump.
    Branch {
        block: usize,
        target: usize,
        text: String,
    },
}

/// Applies an [`SccpResult`] to the function it was computed for.
///
/// - Compare, phi, add and sub instructions at `Constant(c)` have their uses replaced by the
///   literal `c` and are removed
/// - Conditional branches in reachable blocks whose condition resolves to `0` or `1` become
///   jumps to the selected successor
/// - Everything at `Unknown` or `Overdefined`, and everything already removed, is untouched
///
/// Applying the same result twice changes nothing the second time.
///
/// # Examples
///
/// ```rust
/// use ccprop::analysis::{ConstantPropagation, SsaFunctionBuilder};
/// use ccprop::compiler::{EventLog, Rewriter, SccpConfig};
///
/// let mut ssa = SsaFunctionBuilder::new("sum").build_with(|f| {
///     f.block(0, |b| {
///         let c = b.add(2, 3);
///         b.ret_val(c);
///     });
/// });
///
/// let result = ConstantPropagation::new(&ssa).solve()?;
/// let events = EventLog::new();
/// let changes = Rewriter::new(&result, SccpConfig::default()).apply(&mut ssa, &events)?;
/// assert_eq!(changes, 1);
/// assert_eq!(ssa.to_string(), "fn sum {\nB0:\n  ret 5\n}");
/// # Ok::<(), ccprop::Error>(())
/// ```
pub struct Rewriter<'a> {
    result: &'a SccpResult,
    config: SccpConfig,
    /// Pass name attached to recorded events.
    pass: Option<&'static str>,
}

impl<'a> Rewriter<'a> {
    /// Creates a rewriter for `result`.
    #[must_use]
    pub fn new(result: &'a SccpResult, config: SccpConfig) -> Self {
        Self {
            result,
            config,
            pass: None,
        }
    }

    /// Attributes the recorded events to the pass `name`.
    #[must_use]
    pub fn with_pass(mut self, name: &'static str) -> Self {
        self.pass = Some(name);
        self
    }

    /// Rewrites `ssa` and returns the number of instructions changed.
    ///
    /// Every change is recorded in `events`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidCondition`] if a decided branch condition is neither `0` nor `1`
    /// - [`Error::UnknownInstruction`] if the function changed underneath the plan
    pub fn apply(&self, ssa: &mut SsaFunction, events: &EventLog) -> Result<usize> {
        if self.result.lattice().len() != ssa.instruction_slots() {
            let message = format!(
                "lattice of {} entries applied to '{}' with {} instruction slots",
                self.result.lattice().len(),
                ssa.name(),
                ssa.instruction_slots()
            );
            log::warn!("{message}");
            let event = events
                .record(EventKind::Warning)
                .function(ssa.name())
                .message(message);
            if let Some(pass) = self.pass {
                event.pass(pass);
            }
        }

        let edits = self.plan(ssa)?;
        for edit in &edits {
            self.commit(ssa, edit, events)?;
        }

        if !edits.is_empty() {
            log::debug!("rewrote {} instructions in '{}'", edits.len(), ssa.name());
        }
        Ok(edits.len())
    }

    /// Collects the edits for every live instruction, block by block.
    fn plan(&self, ssa: &SsaFunction) -> Result<Vec<Edit>> {
        let mut edits = Vec::new();

        for block in ssa.blocks() {
            for instr in ssa.block_instructions(block.id()) {
                match instr.op() {
                    op if op.is_foldable() => {
                        if !self.config.fold_values {
                            continue;
                        }
                        if let Some(value) = self.result.constant_value(instr.id()) {
                            edits.push(Edit::Fold {
                                id: instr.id(),
                                block: block.id(),
                                value,
                                is_phi: op.is_phi(),
                                text: instr.to_string(),
                            });
                        }
                    }
                    SsaOp::Branch {
                        condition,
                        true_target,
                        false_target,
                    } => {
                        if !self.config.fold_branches
                            || !self.result.is_block_reachable(block.id())
                        {
                            continue;
                        }
                        let Some(value) = self.resolve(*condition) else {
                            continue;
                        };
                        let target = match value {
                            1 => *true_target,
                            0 => *false_target,
                            value => {
                                return Err(Error::InvalidCondition {
                                    block: block.id(),
                                    value,
                                })
                            }
                        };
                        edits.push(Edit::Branch {
                            block: block.id(),
                            target,
                            text: instr.to_string(),
                        });
                    }
                    _ => {}
                }
            }
        }

        Ok(edits)
    }

    /// Returns the constant `operand` is known to hold.
    fn resolve(&self, operand: Operand) -> Option<i64> {
        match operand {
            Operand::Const(c) => Some(c),
            Operand::Value(id) => self.result.constant_value(id),
            Operand::Undef => None,
        }
    }

    fn commit(&self, ssa: &mut SsaFunction, edit: &Edit, events: &EventLog) -> Result<()> {
        match edit {
            Edit::Fold {
                id,
                block,
                value,
                is_phi,
                text,
            } => {
                let uses = ssa.replace_all_uses_with(*id, Operand::Const(*value))?;
                ssa.remove_instruction(*id)?;
                log::trace!("{text} -> {value} ({uses} uses)");

                let kind = if *is_phi {
                    EventKind::PhiSimplified
                } else {
                    EventKind::ConstantFolded
                };
                self.record(events, kind, ssa, *block, format!("{text} -> {value}"));
                self.record(events, EventKind::InstructionRemoved, ssa, *block, id.to_string());
            }
            Edit::Branch {
                block,
                target,
                text,
            } => {
                let jump = SsaOp::Jump { target: *target };
                let message = format!("{text} -> {jump}");
                ssa.replace_terminator(*block, jump)?;
                log::trace!("B{block}: {message}");

                self.record(events, EventKind::BranchSimplified, ssa, *block, message);
            }
        }
        Ok(())
    }

    fn record(
        &self,
        events: &EventLog,
        kind: EventKind,
        ssa: &SsaFunction,
        block: usize,
        message: String,
    ) {
        let event = events.record(kind).at(ssa.name(), block).message(message);
        if let Some(pass) = self.pass {
            event.pass(pass);
        }
    }
}
