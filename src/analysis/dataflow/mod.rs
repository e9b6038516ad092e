//! Sparse conditional constant propagation over SSA form.
//!
//! This module holds the dataflow engine: the value lattice, the per-run state, the
//! per-instruction transfer functions and the two-worklist fixpoint driver.
//!
//! # Architecture
//!
//! - **Lattice** ([`LatticeValue`], [`MeetSemiLattice`]): `Unknown`, `Constant(v)` or
//!   `Overdefined` per value
//! - **State** ([`LatticeMap`], [`ExecutionState`]): values and block evaluation counters of one
//!   run
//! - **Evaluator** ([`Evaluator`]): transfer functions per instruction kind
//! - **Driver** ([`ConstantPropagation`]): runs the fixpoint and produces an [`SccpResult`]
//!
//! # Example
//!
//! ```rust
//! use ccprop::analysis::{ConstantPropagation, SsaFunctionBuilder};
//!
//! let mut sum = None;
//! let ssa = SsaFunctionBuilder::new("sum").build_with(|f| {
//!     f.block(0, |b| {
//!         let c = b.add(2, 3);
//!         sum = Some(c);
//!         b.ret_val(c);
//!     });
//! });
//!
//! let result = ConstantPropagation::new(&ssa).solve()?;
//! assert_eq!(result.constant_value(sum.unwrap()), Some(5));
//! # Ok::<(), ccprop::Error>(())
//! ```
//!
//! # Thread Safety
//!
//! All types in this module are `Send` and `Sync`. One driver owns its state exclusively;
//! independent functions can be solved on different threads.

mod evaluator;
mod lattice;
mod sccp;
mod state;

pub use evaluator::{Evaluation, Evaluator};
pub use lattice::{LatticeValue, MeetSemiLattice};
pub use sccp::{ConstantPropagation, SccpResult};
pub use state::{BlockExecution, ExecutionState, LatticeMap};
