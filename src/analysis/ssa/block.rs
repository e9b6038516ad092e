//! SSA basic blocks.
//!
//! A block owns an ordered list of instruction ids. The instructions themselves live in the
//! function's arena so ids stay valid while blocks are edited.
//!
//! # Block Structure
//!
//! ```text
//! B2:
//!   %5 = phi [%1, B0], [%3, B1]
//!   %6 = add %5, 1
//!   br %7, B3, B4
//! ```
//!
//! The last instruction is the terminator. Predecessors hold one entry per incoming edge, so a
//! branch whose two targets coincide is listed twice.

use crate::analysis::ssa::InstrId;

/// A basic block of an [`SsaFunction`](crate::analysis::SsaFunction).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SsaBlock {
    /// Block index (position in the function).
    id: usize,
    /// Instructions in execution order, terminator last.
    instructions: Vec<InstrId>,
    /// One entry per incoming CFG edge.
    predecessors: Vec<usize>,
}

impl SsaBlock {
    /// Creates a new empty block.
    #[must_use]
    pub fn new(id: usize) -> Self {
        Self {
            id,
            instructions: Vec::new(),
            predecessors: Vec::new(),
        }
    }

    /// Returns the block index.
    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Returns the instructions in execution order.
    #[must_use]
    pub fn instructions(&self) -> &[InstrId] {
        &self.instructions
    }

    /// Returns the number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns `true` if the block holds no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Returns the last instruction, which is the terminator in a well-formed block.
    #[must_use]
    pub fn terminator(&self) -> Option<InstrId> {
        self.instructions.last().copied()
    }

    /// Returns the incoming edges, one entry per edge.
    #[must_use]
    pub fn predecessors(&self) -> &[usize] {
        &self.predecessors
    }

    /// Returns the number of incoming edges.
    #[must_use]
    pub fn predecessor_count(&self) -> usize {
        self.predecessors.len()
    }

    pub(crate) fn push(&mut self, id: InstrId) {
        self.instructions.push(id);
    }

    /// Detaches `id` from the block. Returns `true` if it was present.
    pub(crate) fn detach(&mut self, id: InstrId) -> bool {
        match self.instructions.iter().position(|&i| i == id) {
            Some(pos) => {
                self.instructions.remove(pos);
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_predecessors(&mut self, predecessors: Vec<usize>) {
        self.predecessors = predecessors;
    }
}
