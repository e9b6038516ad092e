//! The constant propagation lattice.
//!
//! A lattice defines how abstract values combine where control flow joins. The propagation
//! engine uses a three-point lattice per SSA value:
//!
//! ```text
//!           Overdefined         (height 2: more than one value, or unanalyzable)
//!       /    |     |    \
//!  ... C(-1)  C(0)  C(1) ...    (height 1: exactly one integer)
//!       \    |     |    /
//!            Unknown            (height 0: nothing proven yet)
//! ```
//!
//! The order is the one drawn above, `Unknown < Constant(v) < Overdefined`, and values only
//! ever move up during a run. [`MeetSemiLattice::meet`] is the only way the engine changes a
//! stored value, which makes that guarantee structural.
//!
//! # Lattice Properties
//!
//! - **Identity**: `Unknown.meet(x) == x`
//! - **Absorption**: `Overdefined.meet(x) == Overdefined`
//! - **Conflict**: `Constant(a).meet(Constant(b)) == Overdefined` for `a != b`

use std::{cmp::Ordering, fmt, fmt::Debug};

/// A semi-lattice with a `meet` operation that merges facts from several control flow paths.
///
/// In the ordering of [`LatticeValue`], `meet` returns the smallest element at or above both
/// arguments, so merging never lowers a value.
/// It must satisfy:
///
/// - **Idempotent**: `x.meet(x) = x`
/// - **Commutative**: `x.meet(y) = y.meet(x)`
/// - **Associative**: `x.meet(y.meet(z)) = (x.meet(y)).meet(z)`
pub trait MeetSemiLattice: Clone + Debug + PartialEq {
    /// Merges two lattice elements.
    #[must_use]
    fn meet(&self, other: &Self) -> Self;

    /// Returns `true` if this is the absorbing element, the top of the order.
    ///
    /// Once it is reached, further meets cannot change the value.
    fn is_saturated(&self) -> bool;
}

/// Abstract value of one SSA value.
///
/// Equality is the lattice `equals`: two constants are equal iff their integers are, and
/// `Unknown`/`Overdefined` are only equal to themselves.
///
/// The partial order follows information content, `Unknown < Constant(v) < Overdefined`.
/// Distinct constants are incomparable.
///
/// # Examples
///
/// ```rust
/// use ccprop::analysis::{LatticeValue, MeetSemiLattice};
///
/// let four = LatticeValue::Constant(4);
/// assert_eq!(LatticeValue::Unknown.meet(&four), four);
/// assert_eq!(four.meet(&LatticeValue::Constant(7)), LatticeValue::Overdefined);
/// assert!(LatticeValue::Unknown < four && four < LatticeValue::Overdefined);
/// assert!(four.partial_cmp(&LatticeValue::Constant(7)).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LatticeValue {
    /// Not yet proven to be anything (least element).
    #[default]
    Unknown,
    /// Proven equal to exactly this integer.
    Constant(i64),
    /// Proven to take more than one value, or not analyzable (greatest element).
    Overdefined,
}

impl LatticeValue {
    /// Returns `true` for `Unknown`.
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Returns `true` for `Overdefined`.
    #[must_use]
    pub const fn is_overdefined(&self) -> bool {
        matches!(self, Self::Overdefined)
    }

    /// Returns `true` for a known constant.
    #[must_use]
    pub const fn is_constant(&self) -> bool {
        matches!(self, Self::Constant(_))
    }

    /// Returns the constant if this value is one.
    #[must_use]
    pub const fn as_constant(&self) -> Option<i64> {
        match self {
            Self::Constant(c) => Some(*c),
            _ => None,
        }
    }

    /// Height in the lattice: 0 for `Unknown`, 1 for constants, 2 for `Overdefined`.
    #[must_use]
    pub const fn height(&self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Constant(_) => 1,
            Self::Overdefined => 2,
        }
    }
}

impl MeetSemiLattice for LatticeValue {
    fn meet(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Unknown, x) | (x, Self::Unknown) => *x,
            (Self::Constant(a), Self::Constant(b)) if a == b => Self::Constant(*a),
            _ => Self::Overdefined,
        }
    }

    fn is_saturated(&self) -> bool {
        self.is_overdefined()
    }
}

impl PartialOrd for LatticeValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Constant(a), Self::Constant(b)) => (a == b).then_some(Ordering::Equal),
            _ => Some(self.height().cmp(&other.height())),
        }
    }
}

impl fmt::Display for LatticeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str("unknown"),
            Self::Constant(c) => write!(f, "const {c}"),
            Self::Overdefined => f.write_str("overdefined"),
        }
    }
}
