use thiserror::Error;

use crate::analysis::InstrId;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every variant describes a precondition violation of the input graph or of an API call. None
/// of them is recoverable inside a propagation run: the run is aborted, no partial result is
/// produced and no rewrite is applied.
///
/// # Error Categories
///
/// ## Input Graph Errors
/// - [`Error::Malformed`] - The function violates a structural invariant
/// - [`Error::Empty`] - The function has no blocks
/// - [`Error::MissingLattice`] - An operand references an instruction without a lattice entry
/// - [`Error::InvalidCondition`] - A branch condition folded to something other than 0 or 1
///
/// ## Lookup Errors
/// - [`Error::UnknownBlock`] - A block index is out of range
/// - [`Error::UnknownInstruction`] - An instruction id is out of range or already removed
///
/// # Examples
///
/// ```rust
/// use ccprop::{analysis::SsaFunctionBuilder, analysis::ConstantPropagation, Error};
///
/// let ssa = SsaFunctionBuilder::new("empty").build();
/// match ConstantPropagation::new(&ssa).solve() {
///     Err(Error::Empty) => println!("nothing to analyze"),
///     Err(e) => println!("Other error: {}", e),
///     Ok(_) => unreachable!(),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The input function is structurally broken.
    ///
    /// Raised by [`crate::analysis::SsaFunction::validate`] and by the analysis whenever it
    /// encounters a shape it cannot reason about (a block without terminator, a branch to a block
    /// that does not exist, an operand that names a non-value instruction, ...). The error
    /// includes the source location where the malformation was detected.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// The function has no basic blocks, so there is no entry to start from.
    #[error("Provided function was empty")]
    Empty,

    /// An operand references an instruction for which no lattice entry exists.
    #[error("No lattice entry for instruction {0}")]
    MissingLattice(InstrId),

    /// A conditional branch condition resolved to a constant outside `{0, 1}`.
    #[error("Branch condition in block B{block} folded to {value}, expected 0 or 1")]
    InvalidCondition {
        /// Block whose terminator carries the condition
        block: usize,
        /// The offending constant
        value: i64,
    },

    /// A block index does not name a block of the function.
    #[error("Block B{0} does not exist")]
    UnknownBlock(usize),

    /// An instruction id is out of range or refers to a removed instruction.
    #[error("Instruction {0} does not exist")]
    UnknownInstruction(InstrId),
}
