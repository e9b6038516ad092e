//! Phi merge operands.
//!
//! A phi merge `%3 = phi [%1, B1], [%2, B2]` selects `%1` when control arrived
//! from `B1` and `%2` when it arrived from `B2`. Each incoming entry pairs the
//! value with the predecessor block it flows in from.

use std::fmt;

use crate::analysis::ssa::Operand;

/// An incoming entry of a phi merge - a value coming from a specific predecessor block.
///
/// # Examples
///
/// ```rust
/// use ccprop::analysis::{Operand, PhiOperand};
///
/// // Value 4 coming from block 1
/// let operand = PhiOperand::new(Operand::Const(4), 1);
/// assert_eq!(operand.predecessor(), 1);
/// assert_eq!(operand.to_string(), "[4, B1]");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhiOperand {
    /// The value selected when control arrives from `predecessor`.
    value: Operand,
    /// The predecessor block from which this value comes.
    predecessor: usize,
}

impl PhiOperand {
    /// Creates a new phi operand.
    ///
    /// # Arguments
    ///
    /// * `value` - The operand providing the value
    /// * `predecessor` - The block index from which this value comes
    #[must_use]
    pub const fn new(value: Operand, predecessor: usize) -> Self {
        Self { value, predecessor }
    }

    /// Returns the operand providing the value.
    #[must_use]
    pub const fn value(&self) -> Operand {
        self.value
    }

    /// Returns a mutable reference to the operand.
    pub fn value_mut(&mut self) -> &mut Operand {
        &mut self.value
    }

    /// Returns the predecessor block index.
    #[must_use]
    pub const fn predecessor(&self) -> usize {
        self.predecessor
    }
}

impl fmt::Display for PhiOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, B{}]", self.value, self.predecessor)
    }
}
