//! Static Single Assignment (SSA) program model.
//!
//! This module provides the control-flow graph the propagation engine reads and rewrites. Every
//! value is defined exactly once, by the instruction whose [`InstrId`] names it, and control
//! flow merges select between values with phi merges.
//!
//! # Architecture
//!
//! - [`InstrId`] / [`Operand`] - Value identity and operand references
//! - [`SsaOp`] / [`CmpPredicate`] - The instruction kinds
//! - [`PhiOperand`] - Phi inputs paired with their predecessor block
//! - [`SsaInstruction`] - A definition site
//! - [`SsaBlock`] - Basic blocks with predecessor edges
//! - [`SsaFunction`] - Arena, blocks, def-use index and mutation helpers
//! - [`SsaFunctionBuilder`] - Closure-based construction
//!
//! The model does not construct SSA form from some other representation; functions are built
//! directly in SSA form with the builder.
//!
//! # Usage
//!
//! ```rust
//! use ccprop::analysis::{CmpPredicate, SsaFunctionBuilder};
//!
//! let ssa = SsaFunctionBuilder::new("select").build_with(|f| {
//!     f.block(0, |b| {
//!         let c = b.icmp(CmpPredicate::Sgt, 10, 3);
//!         b.branch(c, 1, 2);
//!     });
//!     f.block(1, |b| b.ret_val(1));
//!     f.block(2, |b| b.ret_val(2));
//! });
//!
//! for block in ssa.blocks() {
//!     println!("B{} has {} predecessor edges", block.id(), block.predecessor_count());
//! }
//! println!("{ssa}");
//! ```

mod block;
mod builder;
mod function;
mod instruction;
mod ops;
mod phi;
mod value;

pub use block::SsaBlock;
pub use builder::{SsaBlockBuilder, SsaFunctionBuilder, SsaFunctionContext};
pub use function::SsaFunction;
pub use instruction::SsaInstruction;
pub use ops::{CmpPredicate, SsaOp};
pub use phi::PhiOperand;
pub use value::{InstrId, Operand};
