//! # ccprop Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the ccprop library. Import this module to build functions, analyze them and run
//! the propagation pass.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all ccprop operations
pub use crate::Error;

/// The result type used throughout ccprop
pub use crate::Result;

// ================================================================================================
// Program Model
// ================================================================================================

/// SSA functions, blocks and instructions
pub use crate::analysis::{
    CmpPredicate, InstrId, Operand, PhiOperand, SsaBlock, SsaFunction, SsaFunctionBuilder,
    SsaInstruction, SsaOp,
};

// ================================================================================================
// Analysis
// ================================================================================================

/// The lattice and the fixpoint driver
pub use crate::analysis::{ConstantPropagation, LatticeValue, MeetSemiLattice, SccpResult};

// ================================================================================================
// Passes and Pipeline
// ================================================================================================

/// Rewriting, passes and change tracking
pub use crate::compiler::{
    ConstantPropagationPass, EventKind, EventLog, PassScheduler, Rewriter, SccpConfig, SsaPass,
};
