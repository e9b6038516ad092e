//! Built-in SSA passes.
//!
//! - [`ConstantPropagationPass`] - Sparse conditional constant propagation and folding

mod constants;

pub use constants::ConstantPropagationPass;
