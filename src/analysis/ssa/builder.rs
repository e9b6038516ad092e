//! Closure-based construction of SSA functions.
//!
//! The builder hands out [`InstrId`]s as instructions are appended and computes predecessor
//! lists and the user index once, on [`SsaFunctionBuilder::build`].
//!
//! Loops need values before their definition is written (a loop header phi reads the value
//! computed in the latch). [`SsaFunctionContext::reserve`] allocates such an id up front;
//! [`SsaBlockBuilder::phi_into`], [`SsaBlockBuilder::define`] or [`SsaBlockBuilder::place`]
//! later fills it.
//!
//! # Usage
//!
//! ```rust
//! use ccprop::analysis::{CmpPredicate, Operand, SsaFunctionBuilder};
//!
//! // i = 0; while i < 10 { i = i + 1 }; return i
//! let ssa = SsaFunctionBuilder::new("count").build_with(|f| {
//!     let i = f.reserve();
//!     let next = f.reserve();
//!     f.block(0, |b| b.jump(1));
//!     f.block(1, |b| {
//!         b.phi_into(i, &[(Operand::Const(0), 0), (next.into(), 2)]);
//!         let c = b.icmp(CmpPredicate::Slt, i, 10);
//!         b.branch(c, 2, 3);
//!     });
//!     f.block(2, |b| {
//!         b.define(next, "add", vec![i.into(), Operand::Const(1)]);
//!         b.jump(1);
//!     });
//!     f.block(3, |b| b.ret_val(i));
//! });
//!
//! assert_eq!(ssa.block_count(), 4);
//! assert_eq!(ssa.block_predecessors(1), &[0, 2]);
//! assert!(ssa.validate().is_ok());
//! ```

use crate::analysis::ssa::{
    CmpPredicate, InstrId, Operand, PhiOperand, SsaBlock, SsaFunction, SsaInstruction, SsaOp,
};

/// Builder for [`SsaFunction`].
#[derive(Debug, Default)]
pub struct SsaFunctionBuilder {
    name: String,
    blocks: Vec<SsaBlock>,
    instructions: Vec<Option<SsaInstruction>>,
}

impl SsaFunctionBuilder {
    /// Creates a builder for a function called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Runs `f` against a construction context and builds the function.
    #[must_use]
    pub fn build_with<F>(mut self, f: F) -> SsaFunction
    where
        F: FnOnce(&mut SsaFunctionContext<'_>),
    {
        let mut ctx = SsaFunctionContext { builder: &mut self };
        f(&mut ctx);
        self.build()
    }

    /// Finishes construction, computing predecessors and users.
    ///
    /// The result is not validated; call [`SsaFunction::validate`] for that.
    #[must_use]
    pub fn build(self) -> SsaFunction {
        SsaFunction::from_parts(self.name, self.blocks, self.instructions)
    }

    fn allocate(&mut self) -> InstrId {
        let id = InstrId::new(self.instructions.len());
        self.instructions.push(None);
        id
    }

    fn ensure_block(&mut self, index: usize) {
        while self.blocks.len() <= index {
            let id = self.blocks.len();
            self.blocks.push(SsaBlock::new(id));
        }
    }

    fn place(&mut self, block: usize, id: InstrId, op: SsaOp) {
        while self.instructions.len() <= id.index() {
            self.instructions.push(None);
        }

        if let Some(previous) = self.instructions[id.index()].take() {
            if let Some(old) = self.blocks.get_mut(previous.block()) {
                old.detach(id);
            }
        }

        self.ensure_block(block);
        self.blocks[block].push(id);
        self.instructions[id.index()] = Some(SsaInstruction::new(id, block, op));
    }
}

/// Function-level construction context passed to [`SsaFunctionBuilder::build_with`].
pub struct SsaFunctionContext<'a> {
    builder: &'a mut SsaFunctionBuilder,
}

impl SsaFunctionContext<'_> {
    /// Allocates an instruction id whose definition is written later.
    pub fn reserve(&mut self) -> InstrId {
        self.builder.allocate()
    }

    /// Appends instructions to block `index`, creating it (and any lower-numbered blocks) if
    /// needed. Calling it again for the same block appends further instructions.
    pub fn block<F>(&mut self, index: usize, f: F)
    where
        F: FnOnce(&mut SsaBlockBuilder<'_>),
    {
        self.builder.ensure_block(index);
        let mut b = SsaBlockBuilder {
            builder: &mut *self.builder,
            block: index,
        };
        f(&mut b);
    }
}

/// Block-level construction context.
///
/// Value-producing methods return the new instruction's id. Terminator methods return nothing
/// so a single-terminator block can be written as `f.block(0, |b| b.jump(1))`.
pub struct SsaBlockBuilder<'a> {
    builder: &'a mut SsaFunctionBuilder,
    block: usize,
}

impl SsaBlockBuilder<'_> {
    /// Returns the index of the block being built.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.block
    }

    /// Appends an arbitrary operation.
    pub fn op(&mut self, op: SsaOp) -> InstrId {
        let id = self.builder.allocate();
        self.builder.place(self.block, id, op);
        id
    }

    /// Writes the definition of a previously reserved id into this block.
    ///
    /// Placing an id that already has a definition moves it here.
    pub fn place(&mut self, id: InstrId, op: SsaOp) {
        self.builder.place(self.block, id, op);
    }

    /// `left + right`
    pub fn add(&mut self, left: impl Into<Operand>, right: impl Into<Operand>) -> InstrId {
        self.op(SsaOp::Add {
            left: left.into(),
            right: right.into(),
        })
    }

    /// `left - right`
    pub fn sub(&mut self, left: impl Into<Operand>, right: impl Into<Operand>) -> InstrId {
        self.op(SsaOp::Sub {
            left: left.into(),
            right: right.into(),
        })
    }

    /// `icmp predicate left, right`
    pub fn icmp(
        &mut self,
        predicate: CmpPredicate,
        left: impl Into<Operand>,
        right: impl Into<Operand>,
    ) -> InstrId {
        self.op(SsaOp::Compare {
            predicate,
            left: left.into(),
            right: right.into(),
        })
    }

    /// Phi merge with `(value, predecessor)` inputs.
    pub fn phi(&mut self, incoming: &[(Operand, usize)]) -> InstrId {
        self.op(Self::phi_op(incoming))
    }

    /// Phi merge written into a reserved id.
    pub fn phi_into(&mut self, id: InstrId, incoming: &[(Operand, usize)]) {
        self.place(id, Self::phi_op(incoming));
    }

    /// Operation without a folding rule (`mul`, `call`, a function argument, ...).
    pub fn opaque(&mut self, name: impl Into<String>, operands: Vec<Operand>) -> InstrId {
        self.op(SsaOp::Opaque {
            name: name.into(),
            operands,
        })
    }

    /// Opaque operation written into a reserved id.
    pub fn define(&mut self, id: InstrId, name: impl Into<String>, operands: Vec<Operand>) {
        self.place(
            id,
            SsaOp::Opaque {
                name: name.into(),
                operands,
            },
        );
    }

    /// Unconditional branch to `target`.
    pub fn jump(&mut self, target: usize) {
        self.op(SsaOp::Jump { target });
    }

    /// Conditional branch on `condition`.
    pub fn branch(&mut self, condition: impl Into<Operand>, true_target: usize, false_target: usize) {
        self.op(SsaOp::Branch {
            condition: condition.into(),
            true_target,
            false_target,
        });
    }

    /// Return without a value.
    pub fn ret(&mut self) {
        self.op(SsaOp::Return { value: None });
    }

    /// Return `value`.
    pub fn ret_val(&mut self, value: impl Into<Operand>) {
        self.op(SsaOp::Return {
            value: Some(value.into()),
        });
    }

    fn phi_op(incoming: &[(Operand, usize)]) -> SsaOp {
        SsaOp::Phi {
            incoming: incoming
                .iter()
                .map(|&(value, pred)| PhiOperand::new(value, pred))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_follow_allocation_order() {
        let mut ids = Vec::new();
        let ssa = SsaFunctionBuilder::new("order").build_with(|f| {
            let r = f.reserve();
            ids.push(r);
            f.block(0, |b| {
                ids.push(b.add(1, 2));
                b.place(r, SsaOp::Sub {
                    left: 4.into(),
                    right: 1.into(),
                });
                b.ret_val(r);
            });
        });

        assert_eq!(ids, vec![InstrId::new(0), InstrId::new(1)]);
        let block = ssa.block(0).unwrap();
        assert_eq!(
            block.instructions(),
            &[InstrId::new(1), InstrId::new(0), InstrId::new(2)]
        );
        assert!(ssa.validate().is_ok());
    }

    #[test]
    fn test_blocks_created_on_demand() {
        let ssa = SsaFunctionBuilder::new("gaps").build_with(|f| {
            f.block(2, |b| b.ret());
        });
        assert_eq!(ssa.block_count(), 3);
        assert!(ssa.block(0).unwrap().is_empty());
    }

    #[test]
    fn test_block_reopened_appends() {
        let ssa = SsaFunctionBuilder::new("twice").build_with(|f| {
            f.block(0, |b| {
                b.opaque("call", vec![]);
            });
            f.block(0, |b| b.ret());
        });
        assert_eq!(ssa.block(0).unwrap().len(), 2);
        assert!(ssa.validate().is_ok());
    }

    #[test]
    fn test_replacing_definition_moves_it() {
        let ssa = SsaFunctionBuilder::new("move").build_with(|f| {
            let r = f.reserve();
            f.block(0, |b| {
                b.define(r, "a", vec![]);
                b.jump(1);
            });
            f.block(1, |b| {
                b.define(r, "b", vec![]);
                b.ret_val(r);
            });
        });
        assert_eq!(ssa.block(0).unwrap().len(), 1);
        assert_eq!(ssa.block(1).unwrap().len(), 2);
        assert_eq!(ssa.instruction(InstrId::new(0)).unwrap().block(), 1);
    }

    #[test]
    fn test_empty_build() {
        let ssa = SsaFunctionBuilder::new("empty").build();
        assert!(ssa.is_empty());
        assert_eq!(ssa.name(), "empty");
    }
}
