//! SSA operations.
//!
//! This module defines [`SsaOp`], the closed set of instruction kinds the propagation engine
//! reasons about, and [`CmpPredicate`], the integer comparison predicates.
//!
//! # Operation Categories
//!
//! - **Control flow**: [`SsaOp::Jump`], [`SsaOp::Branch`], [`SsaOp::Return`]
//! - **Comparison**: [`SsaOp::Compare`]
//! - **Merges**: [`SsaOp::Phi`]
//! - **Arithmetic**: [`SsaOp::Add`], [`SsaOp::Sub`]
//! - **Everything else**: [`SsaOp::Opaque`], which is never folded
//!
//! # Field Documentation
//!
//! - `left`, `right`: Binary operands (left and right hand side)
//! - `condition`: The boolean operand of a conditional branch
//! - `target`, `true_target`, `false_target`: Branch targets (block indices)
//! - `incoming`: Phi inputs paired with their predecessor block

use std::fmt;

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::analysis::ssa::{Operand, PhiOperand};

/// Integer comparison predicate.
///
/// Signed predicates compare the operands as `i64`, unsigned predicates reinterpret the same
/// bits as `u64`.
///
/// # Examples
///
/// ```rust
/// use std::str::FromStr;
/// use ccprop::analysis::CmpPredicate;
///
/// let pred = CmpPredicate::from_str("ult").unwrap();
/// assert_eq!(pred, CmpPredicate::Ult);
/// assert!(!pred.is_signed());
/// assert!(pred.evaluate(1, -1)); // 1 < 0xffff_ffff_ffff_ffff
/// assert!(!CmpPredicate::Slt.evaluate(1, -1));
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum CmpPredicate {
    /// Equal
    Eq,
    /// Not equal
    Ne,
    /// Signed greater than
    Sgt,
    /// Signed greater than or equal
    Sge,
    /// Signed less than
    Slt,
    /// Signed less than or equal
    Sle,
    /// Unsigned greater than
    Ugt,
    /// Unsigned greater than or equal
    Uge,
    /// Unsigned less than
    Ult,
    /// Unsigned less than or equal
    Ule,
}

impl CmpPredicate {
    /// Returns `true` for the signed relational predicates.
    ///
    /// Equality predicates are sign-agnostic and report `false`.
    #[must_use]
    pub const fn is_signed(self) -> bool {
        matches!(self, Self::Sgt | Self::Sge | Self::Slt | Self::Sle)
    }

    /// Returns `true` for the unsigned relational predicates.
    #[must_use]
    pub const fn is_unsigned(self) -> bool {
        matches!(self, Self::Ugt | Self::Uge | Self::Ult | Self::Ule)
    }

    /// Evaluates the predicate on two concrete integers.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn evaluate(self, left: i64, right: i64) -> bool {
        let (ul, ur) = (left as u64, right as u64);
        match self {
            Self::Eq => left == right,
            Self::Ne => left != right,
            Self::Sgt => left > right,
            Self::Sge => left >= right,
            Self::Slt => left < right,
            Self::Sle => left <= right,
            Self::Ugt => ul > ur,
            Self::Uge => ul >= ur,
            Self::Ult => ul < ur,
            Self::Ule => ul <= ur,
        }
    }
}

/// A single SSA operation.
///
/// Each variant is one instruction kind. Value-producing kinds define the SSA value named by
/// the owning instruction's [`InstrId`](crate::analysis::InstrId); terminators do not.
///
/// # Conventions
///
/// - Every block ends with exactly one terminator (`Jump`, `Branch` or `Return`)
/// - Operands are listed in source order, left before right
/// - Kinds the engine has no folding rule for are expressed as `Opaque`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SsaOp {
    /// Unconditional branch to `target`.
    Jump {
        /// Destination block
        target: usize,
    },

    /// Conditional branch: `true_target` when `condition` is 1, `false_target` when it is 0.
    Branch {
        /// The 0/1 condition
        condition: Operand,
        /// Destination when the condition holds
        true_target: usize,
        /// Destination when the condition does not hold
        false_target: usize,
    },

    /// Return from the function.
    Return {
        /// Returned value, if any
        value: Option<Operand>,
    },

    /// Integer comparison producing 0 or 1.
    Compare {
        /// The comparison predicate
        predicate: CmpPredicate,
        /// Left hand side
        left: Operand,
        /// Right hand side
        right: Operand,
    },

    /// Merge of values flowing in from predecessor blocks.
    Phi {
        /// One entry per incoming edge
        incoming: Vec<PhiOperand>,
    },

    /// Wrapping integer addition.
    Add {
        /// Left hand side
        left: Operand,
        /// Right hand side
        right: Operand,
    },

    /// Wrapping integer subtraction.
    Sub {
        /// Left hand side
        left: Operand,
        /// Right hand side
        right: Operand,
    },

    /// Any operation without a folding rule (`mul`, `call`, `load`, ...).
    Opaque {
        /// Mnemonic used when printing
        name: String,
        /// Operands consumed by the operation
        operands: Vec<Operand>,
    },
}

impl SsaOp {
    /// Returns `true` if this operation ends a block.
    #[must_use]
    pub const fn is_terminator(&self) -> bool {
        matches!(self, Self::Jump { .. } | Self::Branch { .. } | Self::Return { .. })
    }

    /// Returns `true` if this operation defines an SSA value other instructions may use.
    #[must_use]
    pub const fn produces_value(&self) -> bool {
        !self.is_terminator()
    }

    /// Returns `true` for phi merges.
    #[must_use]
    pub const fn is_phi(&self) -> bool {
        matches!(self, Self::Phi { .. })
    }

    /// Returns `true` if the rewriter may replace this operation by a literal.
    #[must_use]
    pub const fn is_foldable(&self) -> bool {
        matches!(
            self,
            Self::Compare { .. } | Self::Phi { .. } | Self::Add { .. } | Self::Sub { .. }
        )
    }

    /// Returns the short mnemonic of this operation.
    #[must_use]
    pub fn mnemonic(&self) -> &str {
        match self {
            Self::Jump { .. } => "jmp",
            Self::Branch { .. } => "br",
            Self::Return { .. } => "ret",
            Self::Compare { .. } => "icmp",
            Self::Phi { .. } => "phi",
            Self::Add { .. } => "add",
            Self::Sub { .. } => "sub",
            Self::Opaque { name, .. } => name,
        }
    }

    /// Returns every operand of the operation in source order.
    ///
    /// For phi merges this is the incoming values, without their predecessor blocks.
    #[must_use]
    pub fn operands(&self) -> Vec<Operand> {
        match self {
            Self::Jump { .. } | Self::Return { value: None } => Vec::new(),
            Self::Branch { condition, .. } => vec![*condition],
            Self::Return { value: Some(v) } => vec![*v],
            Self::Compare { left, right, .. }
            | Self::Add { left, right }
            | Self::Sub { left, right } => vec![*left, *right],
            Self::Phi { incoming } => incoming.iter().map(PhiOperand::value).collect(),
            Self::Opaque { operands, .. } => operands.clone(),
        }
    }

    /// Calls `f` on a mutable reference to every operand.
    pub fn for_each_operand_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut Operand),
    {
        match self {
            Self::Jump { .. } | Self::Return { value: None } => {}
            Self::Branch { condition, .. } => f(condition),
            Self::Return { value: Some(v) } => f(v),
            Self::Compare { left, right, .. }
            | Self::Add { left, right }
            | Self::Sub { left, right } => {
                f(left);
                f(right);
            }
            Self::Phi { incoming } => incoming.iter_mut().for_each(|p| f(p.value_mut())),
            Self::Opaque { operands, .. } => operands.iter_mut().for_each(f),
        }
    }

    /// Returns the successor blocks of a terminator, in edge order.
    ///
    /// A conditional branch whose targets coincide yields the block twice. Non-terminators
    /// have no successors.
    #[must_use]
    pub fn successors(&self) -> Vec<usize> {
        match self {
            Self::Jump { target } => vec![*target],
            Self::Branch {
                true_target,
                false_target,
                ..
            } => vec![*true_target, *false_target],
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for SsaOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jump { target } => write!(f, "jmp B{target}"),
            Self::Branch {
                condition,
                true_target,
                false_target,
            } => write!(f, "br {condition}, B{true_target}, B{false_target}"),
            Self::Return { value: None } => f.write_str("ret"),
            Self::Return { value: Some(v) } => write!(f, "ret {v}"),
            Self::Compare {
                predicate,
                left,
                right,
            } => write!(f, "icmp {predicate} {left}, {right}"),
            Self::Phi { incoming } => {
                f.write_str("phi")?;
                for (i, operand) in incoming.iter().enumerate() {
                    let sep = if i == 0 { " " } else { ", " };
                    write!(f, "{sep}{operand}")?;
                }
                Ok(())
            }
            Self::Add { left, right } => write!(f, "add {left}, {right}"),
            Self::Sub { left, right } => write!(f, "sub {left}, {right}"),
            Self::Opaque { name, operands } => {
                f.write_str(name)?;
                for (i, operand) in operands.iter().enumerate() {
                    let sep = if i == 0 { " " } else { ", " };
                    write!(f, "{sep}{operand}")?;
                }
                Ok(())
            }
        }
    }
}
