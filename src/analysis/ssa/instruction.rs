//! SSA instructions.
//!
//! An [`SsaInstruction`] is one definition site: it pairs an [`SsaOp`] with its identity and the
//! block that owns it.

use std::fmt;

use crate::analysis::ssa::{InstrId, SsaOp};

/// A single instruction of an [`SsaFunction`](crate::analysis::SsaFunction).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsaInstruction {
    /// Arena id, also the name of the value this instruction defines.
    id: InstrId,
    /// Index of the owning block.
    block: usize,
    /// The operation performed.
    op: SsaOp,
}

impl SsaInstruction {
    /// Creates a new instruction.
    #[must_use]
    pub const fn new(id: InstrId, block: usize, op: SsaOp) -> Self {
        Self { id, block, op }
    }

    /// Returns the instruction id.
    #[must_use]
    pub const fn id(&self) -> InstrId {
        self.id
    }

    /// Returns the index of the owning block.
    #[must_use]
    pub const fn block(&self) -> usize {
        self.block
    }

    /// Returns the operation.
    #[must_use]
    pub const fn op(&self) -> &SsaOp {
        &self.op
    }

    /// Returns the operation mutably.
    ///
    /// Callers that change operands are responsible for keeping the function's user index in
    /// sync (see [`SsaFunction::rebuild_uses`](crate::analysis::SsaFunction::rebuild_uses)).
    pub fn op_mut(&mut self) -> &mut SsaOp {
        &mut self.op
    }

    /// Replaces the operation, returning the previous one.
    pub fn set_op(&mut self, op: SsaOp) -> SsaOp {
        std::mem::replace(&mut self.op, op)
    }

    /// Returns `true` if this instruction ends its block.
    #[must_use]
    pub const fn is_terminator(&self) -> bool {
        self.op.is_terminator()
    }
}

impl fmt::Display for SsaInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.op.produces_value() {
            write!(f, "{} = {}", self.id, self.op)
        } else {
            write!(f, "{}", self.op)
        }
    }
}
