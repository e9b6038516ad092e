//! Program analysis over SSA functions.
//!
//! This module provides the program model and the constant propagation engine that runs
//! over it. It builds upon the generic graph infrastructure in [`crate::utils::graph`]: an
//! [`SsaFunction`] is a rooted graph of basic blocks.
//!
//! # Architecture
//!
//! - [`ssa`] - SSA program model (instructions, blocks, functions, builder)
//! - [`dataflow`] - Lattice, evaluator and fixpoint driver for sparse conditional constant
//!   propagation
//!
//! # Usage
//!
//! ```rust
//! use ccprop::analysis::{ConstantPropagation, Operand, SsaFunctionBuilder};
//!
//! // B0: br undef, B1, B2   B1: jmp B3   B2: jmp B3   B3: phi [4, B1], [4, B2]
//! let mut phi = None;
//! let ssa = SsaFunctionBuilder::new("merge").build_with(|f| {
//!     f.block(0, |b| b.branch(Operand::Undef, 1, 2));
//!     f.block(1, |b| b.jump(3));
//!     f.block(2, |b| b.jump(3));
//!     f.block(3, |b| {
//!         let p = b.phi(&[(Operand::Const(4), 1), (Operand::Const(4), 2)]);
//!         phi = Some(p);
//!         b.ret_val(p);
//!     });
//! });
//!
//! let result = ConstantPropagation::new(&ssa).solve()?;
//! assert_eq!(result.constant_value(phi.unwrap()), Some(4));
//! # Ok::<(), ccprop::Error>(())
//! ```

pub mod dataflow;
pub mod ssa;

// Re-export primary types at module level
pub use dataflow::{
    BlockExecution, ConstantPropagation, Evaluation, Evaluator, ExecutionState, LatticeMap,
    LatticeValue, MeetSemiLattice, SccpResult,
};
pub use ssa::{
    CmpPredicate, InstrId, Operand, PhiOperand, SsaBlock, SsaBlockBuilder, SsaFunction,
    SsaFunctionBuilder, SsaFunctionContext, SsaInstruction, SsaOp,
};
