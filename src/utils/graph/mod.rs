//! Graph abstractions shared by the program model and its analyses.
//!
//! The control-flow graph of an [`SsaFunction`](crate::analysis::SsaFunction)
//! exposes its blocks through the traits in this module, which lets the
//! generic traversal algorithms in [`algorithms`] run directly over it.
//!
//! # Key Components
//!
//! - [`NodeId`] - Strongly-typed node identifier
//! - [`GraphBase`], [`Successors`], [`Predecessors`], [`RootedGraph`] - Capability traits
//! - [`algorithms`] - Depth-first, post-order and reverse post-order traversal
//!
//! # Usage Examples
//!
//! ```rust
//! use ccprop::analysis::SsaFunctionBuilder;
//! use ccprop::utils::graph::{algorithms, NodeId, RootedGraph};
//!
//! let ssa = SsaFunctionBuilder::new("f").build_with(|f| {
//!     f.block(0, |b| b.jump(1));
//!     f.block(1, |b| b.ret());
//!     f.block(2, |b| b.ret());
//! });
//!
//! let order: Vec<NodeId> = algorithms::dfs(&ssa, ssa.entry()).collect();
//! assert_eq!(order, vec![NodeId::new(0), NodeId::new(1)]);
//! ```

mod node;
mod traits;

pub mod algorithms;

pub use node::NodeId;
pub use traits::{GraphBase, Predecessors, RootedGraph, Successors};
