//! Configuration of the constant propagation pass.
//!
//! Controls which of the computed facts are written back into the function, whether the input
//! is validated first, and whether the analysis keeps per-instruction value histories.

/// Configuration for [`crate::compiler::ConstantPropagationPass`] and [`crate::compiler::Rewriter`].
///
/// # Examples
///
/// ```rust
/// use ccprop::compiler::SccpConfig;
///
/// let config = SccpConfig::default();
/// assert!(config.fold_values && config.fold_branches);
///
/// let readonly = SccpConfig::analysis_only();
/// assert!(!readonly.rewrites());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct SccpConfig {
    /// Replace compare, phi, add and sub instructions that resolved to a constant
    pub fold_values: bool,

    /// Rewrite conditional branches with a decided condition into unconditional jumps
    pub fold_branches: bool,

    /// Run [`crate::analysis::SsaFunction::validate`] before the analysis
    pub verify_input: bool,

    /// Keep the lattice history of every instruction in the analysis result. The pass reports
    /// each instruction whose value changed as an [`crate::compiler::EventKind::Info`] event.
    /// Only useful for debugging and property tests; costs one vector per instruction
    pub record_history: bool,
}

impl Default for SccpConfig {
    fn default() -> Self {
        Self {
            fold_values: true,
            fold_branches: true,
            verify_input: true,
            record_history: false,
        }
    }
}

impl SccpConfig {
    /// Creates a configuration that analyzes but never mutates the function.
    #[must_use]
    pub fn analysis_only() -> Self {
        Self {
            fold_values: false,
            fold_branches: false,
            verify_input: true,
            record_history: false,
        }
    }

    /// Creates the default configuration with history recording enabled.
    #[must_use]
    pub fn debugging() -> Self {
        Self {
            record_history: true,
            ..Self::default()
        }
    }

    /// Creates a configuration that skips input validation.
    ///
    /// **Warning**: A malformed function can then surface as an analysis error deep inside the
    /// run instead of a descriptive [`crate::Error::Malformed`].
    #[must_use]
    pub fn unchecked() -> Self {
        Self {
            verify_input: false,
            ..Self::default()
        }
    }

    /// Returns `true` if this configuration rewrites anything.
    #[must_use]
    pub fn rewrites(&self) -> bool {
        self.fold_values || self.fold_branches
    }
}
