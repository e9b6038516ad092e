// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # ccprop
//!
//! Sparse Conditional Constant Propagation (SCCP) over control-flow graphs in SSA form.
//!
//! `ccprop` finds the values of a function that are provably constant and the blocks that are
//! provably unreachable, then writes those facts back into the function: constant compares,
//! phi merges and arithmetic are replaced by literals, and conditional branches with a decided
//! condition become unconditional jumps.
//!
//! ## Features
//!
//! - **Optimistic analysis** - values start unknown and only rise to non-constant on evidence
//! - **Conditional reachability** - code behind a decided branch never pollutes a merge
//! - **Sound rewriting** - every edit is planned before the function is touched
//! - **Parallel pipeline** - independent functions are processed concurrently
//! - **Change tracking** - every rewrite is recorded in a thread-safe event log
//!
//! ## Quick Start
//!
//! ```rust
//! use ccprop::prelude::*;
//!
//! let mut ssa = SsaFunctionBuilder::new("select").build_with(|f| {
//!     f.block(0, |b| {
//!         let cond = b.icmp(CmpPredicate::Sgt, 10, 3);
//!         b.branch(cond, 1, 2);
//!     });
//!     f.block(1, |b| b.ret_val(1));
//!     f.block(2, |b| b.ret_val(2));
//! });
//!
//! let events = EventLog::new();
//! let changed = ConstantPropagationPass::new().run_on_function(&mut ssa, &events)?;
//! assert!(changed);
//! assert!(events.has(EventKind::BranchSimplified));
//! # Ok::<(), ccprop::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`analysis`] - The SSA program model and the propagation engine
//!   - [`analysis::ssa`] - Blocks, instructions, operands, def-use index, builder
//!   - [`analysis::dataflow`] - Lattice, per-run state, evaluator, fixpoint driver
//! - [`compiler`] - Rewriter, passes, scheduler and event log
//! - [`utils`] - Bit set and generic graph traversal
//!
//! ## Analysis Only
//!
//! The engine can be used without touching the function:
//!
//! ```rust
//! use ccprop::prelude::*;
//!
//! let mut sum = None;
//! let ssa = SsaFunctionBuilder::new("sum").build_with(|f| {
//!     f.block(0, |b| {
//!         let s = b.add(2, 3);
//!         sum = Some(s);
//!         b.ret_val(s);
//!     });
//! });
//!
//! let result = ConstantPropagation::new(&ssa).solve()?;
//! assert_eq!(result.constant_value(sum.unwrap()), Some(5));
//! println!("{result}");
//! # Ok::<(), ccprop::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`]. Errors describe precondition violations of the
//! input function and abort the run; no partial result is produced and nothing is rewritten.
//!
//! ## Logging
//!
//! The crate logs through the [`log`](https://docs.rs/log) facade: `debug` for per-run
//! summaries, `trace` for worklist activity and `warn` for unexpected shapes. No logger is
//! installed by the library.

#[macro_use]
pub(crate) mod error;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use ccprop::prelude::*;
///
/// let ssa = SsaFunctionBuilder::new("f").build_with(|f| f.block(0, |b| b.ret()));
/// let result = ConstantPropagation::new(&ssa).solve()?;
/// assert!(result.is_block_reachable(0));
/// # Ok::<(), ccprop::Error>(())
/// ```
pub mod prelude;

/// SSA program model and sparse conditional constant propagation.
///
/// # Key Types
///
/// - [`analysis::SsaFunction`] / [`analysis::SsaFunctionBuilder`] - The program model
/// - [`analysis::LatticeValue`] - Abstract value of one SSA value
/// - [`analysis::ConstantPropagation`] / [`analysis::SccpResult`] - The fixpoint driver
pub mod analysis;

/// Rewriting, passes and pipeline orchestration.
///
/// # Key Types
///
/// - [`compiler::Rewriter`] - Writes analysis results back into a function
/// - [`compiler::ConstantPropagationPass`] - Analysis and rewrite as a single pass
/// - [`compiler::PassScheduler`] - Runs passes over many functions in parallel
/// - [`compiler::EventLog`] - Records every change
pub mod compiler;

/// Shared utilities: dense bit set and graph traversal.
pub mod utils;

/// `ccprop` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `ccprop` Error type
///
/// The main error type for all operations in this crate.
pub use error::Error;
