//! Sparse Conditional Constant Propagation (SCCP).
//!
//! SCCP combines two analyses that feed each other:
//!
//! 1. **Sparse analysis**: values are propagated along SSA def-use edges rather than by
//!    iterating over all program points
//! 2. **Conditional propagation**: branches whose condition is a known constant only make the
//!    selected successor reachable, so values defined on dead paths never pollute merges
//!
//! # Algorithm Overview
//!
//! Every instruction starts at `Unknown` and every block unreached. Two FIFO worklists drive
//! the fixpoint:
//!
//! - **CFG worklist**: blocks to evaluate. A block is evaluated on its first visit and
//!   re-evaluated while its evaluation count stays below its number of incoming edges.
//! - **SSA worklist**: instructions to re-evaluate because an operand changed.
//!
//! The driver drains the CFG worklist, then the SSA worklist, and repeats until both are empty.
//! Stored values only move up the lattice (`Unknown` -> `Constant` -> `Overdefined`), so each
//! value changes at most twice and the run terminates.
//!
//! # Reachability and Phi Merges
//!
//! A phi merge only folds in inputs whose predecessor block is reachable. When a block becomes
//! reachable for the first time, the phi merges of its already reachable successors are queued
//! again so the new input is seen even when their block has used up its re-evaluations.
//!
//! # Reference
//!
//! Wegman & Zadeck, "Constant Propagation with Conditional Branches", 1991.

use std::{collections::VecDeque, fmt};

use crate::{
    analysis::{
        dataflow::{Evaluator, ExecutionState, LatticeMap, LatticeValue},
        ssa::{InstrId, SsaFunction, SsaOp},
    },
    utils::BitSet,
    Error, Result,
};

/// Sparse Conditional Constant Propagation over one [`SsaFunction`].
///
/// All analysis state is owned by this value and created fresh by [`ConstantPropagation::new`];
/// [`ConstantPropagation::solve`] consumes it and returns an immutable [`SccpResult`].
///
/// # Example
///
/// ```rust
/// use ccprop::analysis::{CmpPredicate, ConstantPropagation, LatticeValue, SsaFunctionBuilder};
///
/// let mut cond = None;
/// let ssa = SsaFunctionBuilder::new("pick").build_with(|f| {
///     f.block(0, |b| {
///         let c = b.icmp(CmpPredicate::Sgt, 10, 3);
///         cond = Some(c);
///         b.branch(c, 1, 2);
///     });
///     f.block(1, |b| b.ret_val(1));
///     f.block(2, |b| b.ret_val(2));
/// });
///
/// let result = ConstantPropagation::new(&ssa).solve()?;
/// assert_eq!(result.value(cond.unwrap()), Some(LatticeValue::Constant(1)));
/// assert!(result.is_block_reachable(1));
/// assert!(!result.is_block_reachable(2));
/// # Ok::<(), ccprop::Error>(())
/// ```
pub struct ConstantPropagation<'a> {
    /// The function under analysis.
    ssa: &'a SsaFunction,
    /// Current value of every instruction.
    lattice: LatticeMap,
    /// Per-block evaluation counters.
    execution: ExecutionState,
    /// Blocks pending evaluation.
    cfg_worklist: VecDeque<usize>,
    /// Membership of `cfg_worklist`.
    cfg_queued: BitSet,
    /// Instructions pending re-evaluation.
    ssa_worklist: VecDeque<InstrId>,
    /// Membership of `ssa_worklist`.
    ssa_queued: BitSet,
    /// Value history per instruction, when recording.
    history: Option<Vec<Vec<LatticeValue>>>,
    /// Number of block evaluations performed.
    block_evaluations: usize,
    /// Number of single-instruction evaluations performed.
    instruction_evaluations: usize,
    /// Number of stored value changes.
    value_changes: usize,
}

impl<'a> ConstantPropagation<'a> {
    /// Creates the analysis state for `ssa`.
    ///
    /// Every instruction slot starts at `Unknown`, every block at zero evaluations with its
    /// incoming edge count as re-evaluation bound.
    #[must_use]
    pub fn new(ssa: &'a SsaFunction) -> Self {
        Self {
            ssa,
            lattice: LatticeMap::for_function(ssa),
            execution: ExecutionState::for_function(ssa),
            cfg_worklist: VecDeque::new(),
            cfg_queued: BitSet::new(ssa.block_count()),
            ssa_worklist: VecDeque::new(),
            ssa_queued: BitSet::new(ssa.instruction_slots()),
            history: None,
            block_evaluations: 0,
            instruction_evaluations: 0,
            value_changes: 0,
        }
    }

    /// Enables or disables recording of every value each instruction takes.
    #[must_use]
    pub fn with_history(mut self, record: bool) -> Self {
        self.history = record.then(|| vec![vec![LatticeValue::Unknown]; self.lattice.len()]);
        self
    }

    /// Runs the fixpoint to completion.
    ///
    /// # Errors
    ///
    /// - [`Error::Empty`] if the function has no blocks
    /// - [`Error::MissingLattice`] if an operand references an instruction without an entry
    /// - [`Error::InvalidCondition`] if a branch condition folds to a constant outside `{0, 1}`
    /// - [`Error::UnknownBlock`] / [`Error::UnknownInstruction`] for dangling references
    pub fn solve(mut self) -> Result<SccpResult> {
        if self.ssa.is_empty() {
            return Err(Error::Empty);
        }

        self.enqueue_block(0)?;

        loop {
            while let Some(block) = self.cfg_worklist.pop_front() {
                self.cfg_queued.remove(block);
                self.process_block(block)?;
            }

            while let Some(id) = self.ssa_worklist.pop_front() {
                self.ssa_queued.remove(id.index());
                self.instruction_evaluations += 1;
                self.evaluate_and_update(id)?;
            }

            if self.cfg_worklist.is_empty() {
                break;
            }
        }

        log::debug!(
            "sccp '{}': {} block evaluations, {} instruction evaluations, {} value changes",
            self.ssa.name(),
            self.block_evaluations,
            self.instruction_evaluations,
            self.value_changes
        );

        Ok(SccpResult {
            function: self.ssa.name().to_string(),
            executed: self.execution.executed_counts(),
            lattice: self.lattice,
            history: self.history,
            block_evaluations: self.block_evaluations,
            instruction_evaluations: self.instruction_evaluations,
            value_changes: self.value_changes,
        })
    }

    /// Evaluates every instruction of `block` if it may still execute.
    fn process_block(&mut self, block: usize) -> Result<()> {
        if !self.execution.can_execute(block) {
            log::trace!("B{block}: revisit limit reached");
            return Ok(());
        }

        let first_visit = !self.execution.is_reachable(block);
        let count = self.execution.mark_executed(block)?;
        self.block_evaluations += 1;
        log::trace!("B{block}: evaluation #{count}");

        if first_visit {
            self.requeue_phis_fed_by(block);
        }

        let ssa = self.ssa;
        let instructions = ssa.block(block).ok_or(Error::UnknownBlock(block))?;
        for &id in instructions.instructions() {
            self.evaluate_and_update(id)?;
        }
        Ok(())
    }

    /// Queues the phi merges in reachable successors of `pred` that take an input from it.
    fn requeue_phis_fed_by(&mut self, pred: usize) {
        let ssa = self.ssa;
        let mut successors = ssa.block_successors(pred);
        successors.sort_unstable();
        successors.dedup();

        for succ in successors {
            if succ == pred || !self.execution.is_reachable(succ) {
                continue;
            }
            for instr in ssa.block_instructions(succ) {
                if let SsaOp::Phi { incoming } = instr.op() {
                    if incoming.iter().any(|input| input.predecessor() == pred) {
                        self.enqueue_instruction(instr.id());
                    }
                }
            }
        }
    }

    /// Evaluates `id`, makes feasible successors pending and propagates a changed value.
    fn evaluate_and_update(&mut self, id: InstrId) -> Result<()> {
        let ssa = self.ssa;
        let instr = ssa.try_instruction(id)?;
        let evaluation = Evaluator::new(&self.lattice, &self.execution).evaluate(instr)?;

        for target in evaluation.feasible {
            self.enqueue_block(target)?;
        }

        let Some(stored) = self.lattice.update(id, evaluation.value)? else {
            return Ok(());
        };

        self.value_changes += 1;
        log::trace!("{id} -> {stored}");
        if let Some(history) = self.history.as_mut().and_then(|h| h.get_mut(id.index())) {
            history.push(stored);
        }

        for &user in ssa.users(id) {
            let reachable = ssa
                .instruction(user)
                .is_some_and(|u| self.execution.is_reachable(u.block()));
            if reachable {
                self.enqueue_instruction(user);
            }
        }
        Ok(())
    }

    fn enqueue_block(&mut self, block: usize) -> Result<()> {
        if block >= self.ssa.block_count() {
            return Err(Error::UnknownBlock(block));
        }
        if self.cfg_queued.insert(block) {
            self.cfg_worklist.push_back(block);
        }
        Ok(())
    }

    fn enqueue_instruction(&mut self, id: InstrId) {
        if id.index() < self.ssa_queued.len() && self.ssa_queued.insert(id.index()) {
            self.ssa_worklist.push_back(id);
        }
    }
}

/// Results of one SCCP run.
///
/// A snapshot detached from the analyzed function: it stays valid while the function is
/// rewritten, since instruction ids are stable.
#[derive(Debug, Clone)]
pub struct SccpResult {
    /// Name of the analyzed function.
    function: String,
    /// Final value of every instruction slot.
    lattice: LatticeMap,
    /// Evaluation count of every block.
    executed: Vec<usize>,
    /// Value history per instruction, when recorded.
    history: Option<Vec<Vec<LatticeValue>>>,
    block_evaluations: usize,
    instruction_evaluations: usize,
    value_changes: usize,
}

impl SccpResult {
    /// Returns the final lattice map.
    #[must_use]
    pub fn lattice(&self) -> &LatticeMap {
        &self.lattice
    }

    /// Returns the value of `id`, `None` if it has no entry.
    #[must_use]
    pub fn value(&self, id: InstrId) -> Option<LatticeValue> {
        self.lattice.get(id).ok()
    }

    /// Returns `true` if `id` is a known constant.
    #[must_use]
    pub fn is_constant(&self, id: InstrId) -> bool {
        self.value(id).is_some_and(|v| v.is_constant())
    }

    /// Returns the constant of `id` if known.
    #[must_use]
    pub fn constant_value(&self, id: InstrId) -> Option<i64> {
        self.value(id).and_then(|v| v.as_constant())
    }

    /// Returns `true` if `block` was found reachable.
    #[must_use]
    pub fn is_block_reachable(&self, block: usize) -> bool {
        self.execution_count(block) > 0
    }

    /// Returns how many times `block` was evaluated.
    #[must_use]
    pub fn execution_count(&self, block: usize) -> usize {
        self.executed.get(block).copied().unwrap_or(0)
    }

    /// Iterates over the reachable blocks in index order.
    pub fn reachable_blocks(&self) -> impl Iterator<Item = usize> + '_ {
        self.executed
            .iter()
            .enumerate()
            .filter(|(_, &count)| count > 0)
            .map(|(block, _)| block)
    }

    /// Returns the number of reachable blocks.
    #[must_use]
    pub fn reachable_block_count(&self) -> usize {
        self.reachable_blocks().count()
    }

    /// Iterates over every instruction with a constant value.
    pub fn constants(&self) -> impl Iterator<Item = (InstrId, i64)> + '_ {
        self.lattice
            .iter()
            .filter_map(|(id, v)| v.as_constant().map(|c| (id, c)))
    }

    /// Returns the number of instructions with a constant value.
    #[must_use]
    pub fn constant_count(&self) -> usize {
        self.constants().count()
    }

    /// Returns the values `id` went through, starting at `Unknown`.
    ///
    /// Only available when the run recorded history.
    #[must_use]
    pub fn history(&self, id: InstrId) -> Option<&[LatticeValue]> {
        self.history
            .as_ref()
            .and_then(|h| h.get(id.index()))
            .map(Vec::as_slice)
    }

    /// Returns the number of block evaluations performed.
    #[must_use]
    pub const fn block_evaluations(&self) -> usize {
        self.block_evaluations
    }

    /// Returns the number of single-instruction re-evaluations performed.
    #[must_use]
    pub const fn instruction_evaluations(&self) -> usize {
        self.instruction_evaluations
    }

    /// Returns the number of stored value changes.
    #[must_use]
    pub const fn value_changes(&self) -> usize {
        self.value_changes
    }
}

impl fmt::Display for SccpResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "lattice of {}:", self.function)?;
        for (id, value) in self.lattice.iter() {
            writeln!(f, "  {id}: {value}")?;
        }
        let blocks: Vec<String> = self.reachable_blocks().map(|b| format!("B{b}")).collect();
        write!(f, "reachable: [{}]", blocks.join(", "))
    }
}
