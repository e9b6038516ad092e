//! Per-run state of the propagation engine.
//!
//! [`LatticeMap`] holds the abstract value of every instruction and [`ExecutionState`] tracks
//! how often each block has been evaluated. Both are created fresh for one run and owned by it.

use crate::{
    analysis::{
        dataflow::{LatticeValue, MeetSemiLattice},
        ssa::{InstrId, Operand, SsaFunction},
    },
    utils::BitSet,
    Error, Result,
};

/// Dense map from instruction to lattice value.
///
/// Every slot of the function's instruction arena gets an entry, initialized to
/// [`LatticeValue::Unknown`]. Only slots holding a live instruction can be read or updated;
/// reserved slots that were never defined and removed slots report
/// [`Error::MissingLattice`]. Entries change only through [`LatticeMap::update`], which stores
/// the meet of the old and the new value, so an entry can never move back towards `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatticeMap {
    values: Vec<LatticeValue>,
    live: BitSet,
}

impl LatticeMap {
    /// Creates a map with `len` live entries, all `Unknown`.
    #[must_use]
    pub fn new(len: usize) -> Self {
        let mut live = BitSet::new(len);
        for index in 0..len {
            live.insert(index);
        }
        Self {
            values: vec![LatticeValue::Unknown; len],
            live,
        }
    }

    /// Creates a map covering every instruction slot of `ssa`, with only the slots of live
    /// instructions readable.
    #[must_use]
    pub fn for_function(ssa: &SsaFunction) -> Self {
        let len = ssa.instruction_slots();
        let mut live = BitSet::new(len);
        for instr in ssa.instructions() {
            live.insert(instr.id().index());
        }
        Self {
            values: vec![LatticeValue::Unknown; len],
            live,
        }
    }

    /// Returns the number of entries, dead slots included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns `true` if `id` names a live entry.
    #[must_use]
    pub fn contains(&self, id: InstrId) -> bool {
        id.index() < self.live.len() && self.live.contains(id.index())
    }

    /// Returns the value of `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingLattice`] if `id` has no live entry.
    pub fn get(&self, id: InstrId) -> Result<LatticeValue> {
        if !self.contains(id) {
            return Err(Error::MissingLattice(id));
        }
        self.values
            .get(id.index())
            .copied()
            .ok_or(Error::MissingLattice(id))
    }

    /// Resolves an operand: literals are constants, `undef` is `Unknown`, references are looked
    /// up.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingLattice`] for a reference without a live entry.
    pub fn resolve(&self, operand: Operand) -> Result<LatticeValue> {
        match operand {
            Operand::Const(c) => Ok(LatticeValue::Constant(c)),
            Operand::Undef => Ok(LatticeValue::Unknown),
            Operand::Value(id) => self.get(id),
        }
    }

    /// Raises the entry of `id` to `meet(old, new)`.
    ///
    /// Returns the stored value if it changed, `None` otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingLattice`] if `id` has no live entry.
    pub fn update(&mut self, id: InstrId, new: LatticeValue) -> Result<Option<LatticeValue>> {
        if !self.contains(id) {
            return Err(Error::MissingLattice(id));
        }
        let slot = self
            .values
            .get_mut(id.index())
            .ok_or(Error::MissingLattice(id))?;
        let merged = slot.meet(&new);
        if merged == *slot {
            return Ok(None);
        }
        *slot = merged;
        Ok(Some(merged))
    }

    /// Iterates over the `(id, value)` pairs of live entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (InstrId, LatticeValue)> + '_ {
        self.live
            .iter()
            .filter_map(|i| self.values.get(i).map(|v| (InstrId::new(i), *v)))
    }
}

/// Execution bookkeeping of one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockExecution {
    /// Number of times the block has been evaluated.
    pub executed_count: usize,
    /// Number of incoming edges, duplicates included.
    pub max_count: usize,
}

/// Per-block execution counters.
///
/// A block is reachable once it has been evaluated at least once. It may be re-evaluated while
/// its count stays below the number of its incoming edges, which bounds the total work of a
/// run.
///
/// # Examples
///
/// ```rust
/// use ccprop::analysis::ExecutionState;
///
/// // Entry block without predecessors, merge block with two
/// let mut state = ExecutionState::new(vec![0, 2]);
/// assert!(state.can_execute(0));
/// state.mark_executed(0).unwrap();
/// assert!(state.is_reachable(0));
/// assert!(!state.can_execute(0));
///
/// state.mark_executed(1).unwrap();
/// assert!(state.can_execute(1));
/// state.mark_executed(1).unwrap();
/// assert!(!state.can_execute(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionState {
    blocks: Vec<BlockExecution>,
}

impl ExecutionState {
    /// Creates the state from the incoming edge count of every block.
    #[must_use]
    pub fn new(max_counts: Vec<usize>) -> Self {
        Self {
            blocks: max_counts
                .into_iter()
                .map(|max_count| BlockExecution {
                    executed_count: 0,
                    max_count,
                })
                .collect(),
        }
    }

    /// Creates the state for `ssa`, using the predecessor edges recorded on its blocks.
    #[must_use]
    pub fn for_function(ssa: &SsaFunction) -> Self {
        Self::new(
            ssa.blocks()
                .iter()
                .map(|block| block.predecessor_count())
                .collect(),
        )
    }

    /// Returns the number of blocks tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if no blocks are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Returns the counters of `block`.
    #[must_use]
    pub fn get(&self, block: usize) -> Option<BlockExecution> {
        self.blocks.get(block).copied()
    }

    /// Returns `true` once `block` has been evaluated. Unknown blocks are never reachable.
    #[must_use]
    pub fn is_reachable(&self, block: usize) -> bool {
        self.blocks
            .get(block)
            .is_some_and(|b| b.executed_count > 0)
    }

    /// Returns `true` if `block` may be (re)evaluated: always on the first visit, afterwards
    /// while it has been evaluated fewer times than it has incoming edges.
    #[must_use]
    pub fn can_execute(&self, block: usize) -> bool {
        self.blocks
            .get(block)
            .is_some_and(|b| b.executed_count == 0 || b.executed_count < b.max_count)
    }

    /// Records one evaluation of `block` and returns the new count.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBlock`] if `block` is out of range.
    pub fn mark_executed(&mut self, block: usize) -> Result<usize> {
        let entry = self
            .blocks
            .get_mut(block)
            .ok_or(Error::UnknownBlock(block))?;
        entry.executed_count += 1;
        Ok(entry.executed_count)
    }

    /// Returns the evaluation count of every block, by index.
    #[must_use]
    pub fn executed_counts(&self) -> Vec<usize> {
        self.blocks.iter().map(|b| b.executed_count).collect()
    }
}
