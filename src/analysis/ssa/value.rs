//! Instruction identifiers and operand references.
//!
//! Every instruction that produces a value *is* that value: an [`InstrId`]
//! names both the definition site and the SSA value it defines. Operands are
//! either literal integers, references to another instruction, or the explicit
//! `undef` placeholder that phi merges use for not-yet-initialized inputs.
//!
//! # Thread Safety
//!
//! All types in this module are `Copy`, `Send` and `Sync`.

use std::fmt;

/// Identifier of an instruction inside an [`SsaFunction`](crate::analysis::SsaFunction).
///
/// Ids are indices into the function's instruction arena. They stay stable
/// for the lifetime of the function: removing an instruction leaves a hole
/// instead of shifting later ids, so lattice tables indexed by id remain valid
/// across rewrites.
///
/// # Examples
///
/// ```rust
/// use ccprop::analysis::InstrId;
///
/// let id = InstrId::new(3);
/// assert_eq!(id.index(), 3);
/// assert_eq!(id.to_string(), "%3");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstrId(usize);

impl InstrId {
    /// Creates an id from a raw arena index.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the raw arena index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for InstrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

impl fmt::Display for InstrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// An instruction operand.
///
/// # Examples
///
/// ```rust
/// use ccprop::analysis::{InstrId, Operand};
///
/// let lit: Operand = 7.into();
/// let val: Operand = InstrId::new(2).into();
/// assert_eq!(lit.as_const(), Some(7));
/// assert_eq!(val.as_value(), Some(InstrId::new(2)));
/// assert!(Operand::Undef.is_undef());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    /// A literal integer constant.
    Const(i64),
    /// The value defined by another instruction.
    Value(InstrId),
    /// An explicitly undefined input.
    ///
    /// Phi merges skip these entirely. Anywhere else an undefined operand
    /// carries no information and evaluates like a value that was never
    /// defined.
    Undef,
}

impl Operand {
    /// Returns the literal if this operand is a constant.
    #[must_use]
    pub const fn as_const(&self) -> Option<i64> {
        match self {
            Self::Const(c) => Some(*c),
            _ => None,
        }
    }

    /// Returns the referenced instruction if this operand is a value reference.
    #[must_use]
    pub const fn as_value(&self) -> Option<InstrId> {
        match self {
            Self::Value(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns `true` for the `undef` placeholder.
    #[must_use]
    pub const fn is_undef(&self) -> bool {
        matches!(self, Self::Undef)
    }

    /// Returns `true` if this operand references `id`.
    #[must_use]
    pub fn references(&self, id: InstrId) -> bool {
        matches!(self, Self::Value(v) if *v == id)
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Self::Const(value)
    }
}

impl From<i32> for Operand {
    fn from(value: i32) -> Self {
        Self::Const(i64::from(value))
    }
}

impl From<bool> for Operand {
    fn from(value: bool) -> Self {
        Self::Const(i64::from(value))
    }
}

impl From<InstrId> for Operand {
    fn from(id: InstrId) -> Self {
        Self::Value(id)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Const(c) => write!(f, "{c}"),
            Self::Value(id) => write!(f, "{id}"),
            Self::Undef => f.write_str("undef"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operand_conversions() {
        assert_eq!(Operand::from(5i64), Operand::Const(5));
        assert_eq!(Operand::from(-5i32), Operand::Const(-5));
        assert_eq!(Operand::from(true), Operand::Const(1));
        assert_eq!(Operand::from(false), Operand::Const(0));
        assert_eq!(
            Operand::from(InstrId::new(4)),
            Operand::Value(InstrId::new(4))
        );
    }

    #[test]
    fn test_operand_references() {
        let op = Operand::Value(InstrId::new(1));
        assert!(op.references(InstrId::new(1)));
        assert!(!op.references(InstrId::new(2)));
        assert!(!Operand::Const(1).references(InstrId::new(1)));
        assert!(!Operand::Undef.references(InstrId::new(1)));
    }

    #[test]
    fn test_operand_display() {
        assert_eq!(Operand::Const(-3).to_string(), "-3");
        assert_eq!(Operand::Value(InstrId::new(9)).to_string(), "%9");
        assert_eq!(Operand::Undef.to_string(), "undef");
    }
}
