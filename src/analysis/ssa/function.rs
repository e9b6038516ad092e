//! SSA function representation.
//!
//! An [`SsaFunction`] is a complete control-flow graph in SSA form: an ordered list of blocks
//! (block 0 is the entry), an arena of instructions addressed by [`InstrId`], and a user index
//! mapping every value to the instructions that read it.
//!
//! # Structure
//!
//! ```text
//! SsaFunction
//! ├── blocks: Vec<SsaBlock>                 (instruction ids + predecessor edges)
//! ├── instructions: Vec<Option<SsaInstruction>>  (arena, `None` for removed slots)
//! └── users: Vec<Vec<InstrId>>              (def -> use adjacency)
//! ```
//!
//! The user index is an index-based adjacency list rather than back pointers, so rewriting
//! instructions can never leave dangling references: [`SsaFunction::replace_all_uses_with`],
//! [`SsaFunction::remove_instruction`] and [`SsaFunction::replace_terminator`] keep it in sync.
//!
//! # Thread Safety
//!
//! `SsaFunction` is `Send` and `Sync`. Independent functions can be analyzed in parallel.

use std::fmt;

use crate::{
    analysis::ssa::{InstrId, Operand, SsaBlock, SsaInstruction, SsaOp},
    utils::graph::{GraphBase, NodeId, Predecessors, RootedGraph, Successors},
    Error, Result,
};

/// A function in SSA form.
///
/// Built with [`SsaFunctionBuilder`](crate::analysis::SsaFunctionBuilder).
///
/// # Examples
///
/// ```rust
/// use ccprop::analysis::SsaFunctionBuilder;
///
/// let mut sum = None;
/// let ssa = SsaFunctionBuilder::new("five").build_with(|f| {
///     f.block(0, |b| {
///         let v = b.add(2, 3);
///         sum = Some(v);
///         b.ret_val(v);
///     });
/// });
///
/// let sum = sum.unwrap();
/// assert_eq!(ssa.block_count(), 1);
/// assert_eq!(ssa.users(sum).len(), 1);
/// assert!(ssa.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SsaFunction {
    /// Function name, used in diagnostics.
    name: String,
    /// Basic blocks, block 0 is the entry.
    blocks: Vec<SsaBlock>,
    /// Instruction arena indexed by `InstrId`.
    instructions: Vec<Option<SsaInstruction>>,
    /// Users of each instruction, indexed by `InstrId`.
    users: Vec<Vec<InstrId>>,
}

impl SsaFunction {
    /// Creates an empty function with no blocks.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Assembles a function from prepared blocks and arena, then computes predecessors and users.
    pub(crate) fn from_parts(
        name: String,
        blocks: Vec<SsaBlock>,
        instructions: Vec<Option<SsaInstruction>>,
    ) -> Self {
        let mut function = Self {
            name,
            blocks,
            instructions,
            users: Vec::new(),
        };
        function.recompute_predecessors();
        function.rebuild_uses();
        function
    }

    /// Returns the function name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns all blocks in index order.
    #[must_use]
    pub fn blocks(&self) -> &[SsaBlock] {
        &self.blocks
    }

    /// Returns the block at `index`.
    #[must_use]
    pub fn block(&self, index: usize) -> Option<&SsaBlock> {
        self.blocks.get(index)
    }

    /// Returns the number of blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if the function has no blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Returns the number of arena slots, including removed ones.
    ///
    /// Every `InstrId` ever handed out is smaller than this bound, which makes it the size of
    /// tables indexed by instruction id.
    #[must_use]
    pub fn instruction_slots(&self) -> usize {
        self.instructions.len()
    }

    /// Returns the number of live instructions.
    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.instructions.iter().flatten().count()
    }

    /// Returns the live instruction `id`.
    #[must_use]
    pub fn instruction(&self, id: InstrId) -> Option<&SsaInstruction> {
        self.instructions.get(id.index()).and_then(Option::as_ref)
    }

    /// Returns the live instruction `id`, or [`Error::UnknownInstruction`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownInstruction`] if `id` is out of range or was removed.
    pub fn try_instruction(&self, id: InstrId) -> Result<&SsaInstruction> {
        self.instruction(id).ok_or(Error::UnknownInstruction(id))
    }

    /// Iterates over every live instruction in arena order.
    pub fn instructions(&self) -> impl Iterator<Item = &SsaInstruction> {
        self.instructions.iter().flatten()
    }

    /// Iterates over the live instructions of `block` in execution order.
    pub fn block_instructions(&self, block: usize) -> impl Iterator<Item = &SsaInstruction> {
        self.blocks
            .get(block)
            .map(SsaBlock::instructions)
            .unwrap_or_default()
            .iter()
            .filter_map(|&id| self.instruction(id))
    }

    /// Returns the instructions that read the value defined by `id`.
    ///
    /// Each user appears once even if it reads the value several times.
    #[must_use]
    pub fn users(&self, id: InstrId) -> &[InstrId] {
        self.users.get(id.index()).map_or(&[], Vec::as_slice)
    }

    /// Returns the successor blocks of `block`, one entry per outgoing edge.
    #[must_use]
    pub fn block_successors(&self, block: usize) -> Vec<usize> {
        self.blocks
            .get(block)
            .and_then(SsaBlock::terminator)
            .and_then(|id| self.instruction(id))
            .map(|instr| instr.op().successors())
            .unwrap_or_default()
    }

    /// Returns the predecessor blocks of `block`, one entry per incoming edge.
    #[must_use]
    pub fn block_predecessors(&self, block: usize) -> &[usize] {
        self.blocks.get(block).map_or(&[], SsaBlock::predecessors)
    }

    /// Recomputes every block's predecessor list from the current terminators.
    ///
    /// Edges to blocks that do not exist are ignored here and reported by [`Self::validate`].
    pub fn recompute_predecessors(&mut self) {
        let mut predecessors = vec![Vec::new(); self.blocks.len()];
        for block in 0..self.blocks.len() {
            for succ in self.block_successors(block) {
                if let Some(preds) = predecessors.get_mut(succ) {
                    preds.push(block);
                }
            }
        }

        for (block, preds) in self.blocks.iter_mut().zip(predecessors) {
            block.set_predecessors(preds);
        }
    }

    /// Rebuilds the user index from the operands of every live instruction.
    pub fn rebuild_uses(&mut self) {
        let mut users: Vec<Vec<InstrId>> = vec![Vec::new(); self.instructions.len()];
        for instr in self.instructions.iter().flatten() {
            for operand in instr.op().operands() {
                if let Some(list) = operand.as_value().and_then(|def| users.get_mut(def.index())) {
                    if !list.contains(&instr.id()) {
                        list.push(instr.id());
                    }
                }
            }
        }
        self.users = users;
    }

    /// Rewrites every use of `id` to `replacement`.
    ///
    /// The user index is updated: `id` is left without users and, when `replacement` is itself a
    /// value, the rewritten instructions become its users. The definition of `id` is untouched.
    ///
    /// Returns the number of operands rewritten.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownInstruction`] if `id` is out of range or was removed.
    pub fn replace_all_uses_with(&mut self, id: InstrId, replacement: Operand) -> Result<usize> {
        self.try_instruction(id)?;
        if replacement.references(id) {
            return Ok(0);
        }

        let users = self
            .users
            .get_mut(id.index())
            .map(std::mem::take)
            .unwrap_or_default();
        let mut rewritten = 0;
        for &user in &users {
            let Some(instr) = self.instructions.get_mut(user.index()).and_then(Option::as_mut)
            else {
                continue;
            };
            instr.op_mut().for_each_operand_mut(|operand| {
                if operand.references(id) {
                    *operand = replacement;
                    rewritten += 1;
                }
            });

            if let Some(list) = replacement
                .as_value()
                .and_then(|new| self.users.get_mut(new.index()))
            {
                if !list.contains(&user) {
                    list.push(user);
                }
            }
        }

        Ok(rewritten)
    }

    /// Removes instruction `id` from its block and tombstones its arena slot.
    ///
    /// The id is never reused. `id` is dropped from the user lists of its operands; remaining
    /// users of `id` itself are the caller's concern and are reported by [`Self::validate`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownInstruction`] if `id` is out of range or already removed.
    pub fn remove_instruction(&mut self, id: InstrId) -> Result<SsaInstruction> {
        let instr = self
            .instructions
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or(Error::UnknownInstruction(id))?;

        if let Some(block) = self.blocks.get_mut(instr.block()) {
            block.detach(id);
        }
        self.unlink_operands(id, instr.op());
        Ok(instr)
    }

    /// Replaces the terminator of `block` with `op`, returning the previous operation.
    ///
    /// Predecessor lists are left as they are; call [`Self::recompute_predecessors`] for the
    /// pruned view.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownBlock`] if `block` does not exist
    /// - [`Error::Malformed`] if `op` is not a terminator or the block has no terminator
    pub fn replace_terminator(&mut self, block: usize, op: SsaOp) -> Result<SsaOp> {
        if !op.is_terminator() {
            return Err(malformed_error!(
                "replacement for terminator of B{} is not a terminator: {}",
                block,
                op
            ));
        }

        let term = self
            .blocks
            .get(block)
            .ok_or(Error::UnknownBlock(block))?
            .terminator()
            .ok_or_else(|| malformed_error!("block B{} has no terminator", block))?;

        let new_operands = op.operands();
        let instr = self
            .instructions
            .get_mut(term.index())
            .and_then(Option::as_mut)
            .filter(|instr| instr.is_terminator())
            .ok_or_else(|| malformed_error!("block B{} does not end in a terminator", block))?;
        let old = instr.set_op(op);

        self.unlink_operands(term, &old);
        for def in new_operands.iter().filter_map(Operand::as_value) {
            if let Some(list) = self.users.get_mut(def.index()) {
                if !list.contains(&term) {
                    list.push(term);
                }
            }
        }
        Ok(old)
    }

    /// Drops `user` from the user lists of the values `op` reads.
    fn unlink_operands(&mut self, user: InstrId, op: &SsaOp) {
        for def in op.operands().iter().filter_map(Operand::as_value) {
            if let Some(list) = self.users.get_mut(def.index()) {
                list.retain(|&u| u != user);
            }
        }
    }

    /// Checks the structural invariants the analysis relies on.
    ///
    /// - The function has at least one block
    /// - Every block is non-empty and ends with its only terminator
    /// - Every listed instruction is live and owned by the block listing it
    /// - Jump and branch targets name existing blocks
    /// - Phi predecessors are actual predecessors of the phi's block
    /// - Every value operand names a live, value-producing instruction
    ///
    /// # Errors
    ///
    /// Returns [`Error::Empty`] for a function without blocks and [`Error::Malformed`] for the
    /// first violation found.
    pub fn validate(&self) -> Result<()> {
        if self.blocks.is_empty() {
            return Err(Error::Empty);
        }

        let block_count = self.blocks.len();
        let mut listed = 0;
        for (index, block) in self.blocks.iter().enumerate() {
            if block.is_empty() {
                return Err(malformed_error!("block B{} is empty", index));
            }

            let last = block.len() - 1;
            for (pos, &id) in block.instructions().iter().enumerate() {
                let instr = self.instruction(id).ok_or_else(|| {
                    malformed_error!("block B{} lists removed instruction {}", index, id)
                })?;
                listed += 1;

                if instr.block() != index {
                    return Err(malformed_error!(
                        "instruction {} is listed in B{} but owned by B{}",
                        id,
                        index,
                        instr.block()
                    ));
                }
                if instr.is_terminator() != (pos == last) {
                    return Err(malformed_error!(
                        "block B{} must end with exactly one terminator (at {})",
                        index,
                        id
                    ));
                }

                for succ in instr.op().successors() {
                    if succ >= block_count {
                        return Err(malformed_error!(
                            "{} in B{} targets missing block B{}",
                            id,
                            index,
                            succ
                        ));
                    }
                }

                if let SsaOp::Phi { incoming } = instr.op() {
                    for input in incoming {
                        if !block.predecessors().contains(&input.predecessor()) {
                            return Err(malformed_error!(
                                "phi {} names B{} which is not a predecessor of B{}",
                                id,
                                input.predecessor(),
                                index
                            ));
                        }
                    }
                }

                for def in instr.op().operands().iter().filter_map(Operand::as_value) {
                    match self.instruction(def) {
                        Some(d) if d.op().produces_value() => {}
                        Some(_) => {
                            return Err(malformed_error!(
                                "{} uses {} which does not produce a value",
                                id,
                                def
                            ))
                        }
                        None => {
                            return Err(malformed_error!(
                                "{} uses {} which does not exist",
                                id,
                                def
                            ))
                        }
                    }
                }
            }
        }

        if listed != self.instruction_count() {
            return Err(malformed_error!(
                "{} live instructions but only {} are placed in blocks",
                self.instruction_count(),
                listed
            ));
        }

        Ok(())
    }
}

impl GraphBase for SsaFunction {
    fn node_count(&self) -> usize {
        self.blocks.len()
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.blocks.len()).map(NodeId::new)
    }
}

impl Successors for SsaFunction {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.block_successors(node.index())
            .into_iter()
            .map(NodeId::new)
    }
}

impl Predecessors for SsaFunction {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.block_predecessors(node.index())
            .iter()
            .map(|&p| NodeId::new(p))
    }
}

impl RootedGraph for SsaFunction {
    fn entry(&self) -> NodeId {
        NodeId::new(0)
    }
}

impl fmt::Display for SsaFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "fn {} {{", self.name)?;
        for block in &self.blocks {
            write!(f, "B{}:", block.id())?;
            if !block.predecessors().is_empty() {
                let preds: Vec<String> =
                    block.predecessors().iter().map(|p| format!("B{p}")).collect();
                write!(f, "  ; preds: {}", preds.join(", "))?;
            }
            writeln!(f)?;
            for instr in self.block_instructions(block.id()) {
                writeln!(f, "  {instr}")?;
            }
        }
        write!(f, "}}")
    }
}
