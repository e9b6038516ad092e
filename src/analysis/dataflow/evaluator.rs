//! Transfer functions of the propagation engine.
//!
//! [`Evaluator`] computes the lattice value of one instruction from the current [`LatticeMap`]
//! and [`ExecutionState`]. Terminators additionally report which successor blocks are feasible;
//! the driver turns those into control-flow worklist entries.
//!
//! # Rules
//!
//! | Kind      | Result                                                                    |
//! |-----------|---------------------------------------------------------------------------|
//! | `Jump`    | `Overdefined`, target feasible                                            |
//! | `Branch`  | condition value; both targets unless it is `Constant(1)` or `Constant(0)` |
//! | `Compare` | `Overdefined` > `Unknown` > predicate on two constants                    |
//! | `Phi`     | meet over inputs from reachable predecessors, `undef` inputs skipped      |
//! | `Add/Sub` | `Overdefined` > `Unknown` > wrapping arithmetic on two constants          |
//! | otherwise | `Overdefined`                                                             |

use crate::{
    analysis::{
        dataflow::{ExecutionState, LatticeMap, LatticeValue, MeetSemiLattice},
        ssa::{CmpPredicate, Operand, PhiOperand, SsaInstruction, SsaOp},
    },
    Error, Result,
};

/// Result of evaluating one instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// The instruction's new lattice value.
    pub value: LatticeValue,
    /// Successor blocks that became feasible, in edge order. Empty for non-terminators.
    pub feasible: Vec<usize>,
}

impl Evaluation {
    fn value(value: LatticeValue) -> Self {
        Self {
            value,
            feasible: Vec::new(),
        }
    }
}

/// Evaluates instructions against a snapshot of the analysis state.
///
/// # Examples
///
/// ```rust
/// use ccprop::analysis::{
///     Evaluator, ExecutionState, LatticeMap, LatticeValue, SsaFunctionBuilder,
/// };
///
/// let ssa = SsaFunctionBuilder::new("f").build_with(|f| {
///     f.block(0, |b| {
///         let s = b.sub(9, 4);
///         b.ret_val(s);
///     });
/// });
///
/// let lattice = LatticeMap::for_function(&ssa);
/// let execution = ExecutionState::for_function(&ssa);
/// let sub = ssa.block_instructions(0).next().unwrap();
/// let eval = Evaluator::new(&lattice, &execution).evaluate(sub).unwrap();
/// assert_eq!(eval.value, LatticeValue::Constant(5));
/// ```
pub struct Evaluator<'a> {
    lattice: &'a LatticeMap,
    execution: &'a ExecutionState,
}

impl<'a> Evaluator<'a> {
    /// Creates an evaluator over the given state.
    #[must_use]
    pub const fn new(lattice: &'a LatticeMap, execution: &'a ExecutionState) -> Self {
        Self { lattice, execution }
    }

    /// Evaluates `instr`.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingLattice`] if an operand has no lattice entry
    /// - [`Error::InvalidCondition`] if a branch condition is a constant other than 0 or 1
    pub fn evaluate(&self, instr: &SsaInstruction) -> Result<Evaluation> {
        match instr.op() {
            SsaOp::Jump { target } => Ok(Evaluation {
                value: LatticeValue::Overdefined,
                feasible: vec![*target],
            }),
            SsaOp::Branch {
                condition,
                true_target,
                false_target,
            } => self.evaluate_branch(instr.block(), *condition, *true_target, *false_target),
            SsaOp::Compare {
                predicate,
                left,
                right,
            } => self
                .evaluate_compare(*predicate, *left, *right)
                .map(Evaluation::value),
            SsaOp::Phi { incoming } => self.evaluate_phi(incoming).map(Evaluation::value),
            SsaOp::Add { left, right } => self
                .evaluate_arithmetic(*left, *right, i64::wrapping_add)
                .map(Evaluation::value),
            SsaOp::Sub { left, right } => self
                .evaluate_arithmetic(*left, *right, i64::wrapping_sub)
                .map(Evaluation::value),
            SsaOp::Return { .. } | SsaOp::Opaque { .. } => {
                Ok(Evaluation::value(LatticeValue::Overdefined))
            }
        }
    }

    fn evaluate_branch(
        &self,
        block: usize,
        condition: Operand,
        true_target: usize,
        false_target: usize,
    ) -> Result<Evaluation> {
        let value = self.lattice.resolve(condition)?;
        let feasible = match value {
            LatticeValue::Constant(1) => vec![true_target],
            LatticeValue::Constant(0) => vec![false_target],
            LatticeValue::Constant(other) => {
                return Err(Error::InvalidCondition {
                    block,
                    value: other,
                })
            }
            LatticeValue::Unknown | LatticeValue::Overdefined => vec![true_target, false_target],
        };
        Ok(Evaluation { value, feasible })
    }

    /// Overdefined wins over Unknown, Unknown wins over constants.
    fn evaluate_compare(
        &self,
        predicate: CmpPredicate,
        left: Operand,
        right: Operand,
    ) -> Result<LatticeValue> {
        let lhs = self.lattice.resolve(left)?;
        let rhs = self.lattice.resolve(right)?;
        Ok(match (lhs, rhs) {
            (LatticeValue::Overdefined, _) | (_, LatticeValue::Overdefined) => {
                LatticeValue::Overdefined
            }
            (LatticeValue::Constant(l), LatticeValue::Constant(r)) => {
                LatticeValue::Constant(i64::from(predicate.evaluate(l, r)))
            }
            _ => LatticeValue::Unknown,
        })
    }

    fn evaluate_phi(&self, incoming: &[PhiOperand]) -> Result<LatticeValue> {
        let mut result = LatticeValue::Unknown;
        for input in incoming {
            if input.value().is_undef() || !self.execution.is_reachable(input.predecessor()) {
                continue;
            }
            result = result.meet(&self.lattice.resolve(input.value())?);
            if result.is_saturated() {
                break;
            }
        }
        Ok(result)
    }

    fn evaluate_arithmetic<F>(&self, left: Operand, right: Operand, f: F) -> Result<LatticeValue>
    where
        F: FnOnce(i64, i64) -> i64,
    {
        let lhs = self.lattice.resolve(left)?;
        let rhs = self.lattice.resolve(right)?;
        Ok(match (lhs, rhs) {
            (LatticeValue::Overdefined, _) | (_, LatticeValue::Overdefined) => {
                LatticeValue::Overdefined
            }
            (LatticeValue::Constant(l), LatticeValue::Constant(r)) => {
                LatticeValue::Constant(f(l, r))
            }
            _ => LatticeValue::Unknown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ssa::{InstrId, SsaFunction, SsaFunctionBuilder};

    struct Fixture {
        ssa: SsaFunction,
        lattice: LatticeMap,
        execution: ExecutionState,
    }

    impl Fixture {
        fn new(ssa: SsaFunction) -> Self {
            Self {
                lattice: LatticeMap::for_function(&ssa),
                execution: ExecutionState::for_function(&ssa),
                ssa,
            }
        }

        fn set(&mut self, id: InstrId, value: LatticeValue) {
            self.lattice.update(id, value).unwrap();
        }

        fn eval(&self, id: InstrId) -> Result<Evaluation> {
            let instr = self.ssa.instruction(id).unwrap();
            Evaluator::new(&self.lattice, &self.execution).evaluate(instr)
        }
    }

    /// B0: %0 = arg; %1 = arg; %2..: op under test; ret
    fn binary(make: impl FnOnce(InstrId, InstrId) -> SsaOp) -> (Fixture, [InstrId; 3]) {
        let mut ids = [InstrId::new(0); 3];
        let ssa = SsaFunctionBuilder::new("binary").build_with(|f| {
            f.block(0, |b| {
                ids[0] = b.opaque("arg", vec![]);
                ids[1] = b.opaque("arg", vec![]);
                ids[2] = b.op(make(ids[0], ids[1]));
                b.ret();
            });
        });
        (Fixture::new(ssa), ids)
    }

    #[test]
    fn test_compare_precedence() {
        let (mut fx, [a, b, cmp]) = binary(|a, b| SsaOp::Compare {
            predicate: CmpPredicate::Sgt,
            left: a.into(),
            right: b.into(),
        });

        assert_eq!(fx.eval(cmp).unwrap().value, LatticeValue::Unknown);

        fx.set(a, LatticeValue::Constant(10));
        assert_eq!(fx.eval(cmp).unwrap().value, LatticeValue::Unknown);

        fx.set(b, LatticeValue::Constant(3));
        assert_eq!(fx.eval(cmp).unwrap().value, LatticeValue::Constant(1));

        fx.set(b, LatticeValue::Overdefined);
        assert_eq!(fx.eval(cmp).unwrap().value, LatticeValue::Overdefined);
    }

    #[test]
    fn test_compare_overdefined_beats_unknown() {
        let (mut fx, [a, _, cmp]) = binary(|a, b| SsaOp::Compare {
            predicate: CmpPredicate::Eq,
            left: a.into(),
            right: b.into(),
        });
        fx.set(a, LatticeValue::Overdefined);
        assert_eq!(fx.eval(cmp).unwrap().value, LatticeValue::Overdefined);
    }

    #[test]
    fn test_compare_unsigned_reinterprets_bits() {
        let (mut fx, [a, b, cmp]) = binary(|a, b| SsaOp::Compare {
            predicate: CmpPredicate::Ult,
            left: a.into(),
            right: b.into(),
        });
        fx.set(a, LatticeValue::Constant(1));
        fx.set(b, LatticeValue::Constant(-1));
        assert_eq!(fx.eval(cmp).unwrap().value, LatticeValue::Constant(1));
    }

    #[test]
    fn test_arithmetic() {
        let (mut fx, [a, b, sub]) = binary(|a, b| SsaOp::Sub {
            left: a.into(),
            right: b.into(),
        });

        fx.set(b, LatticeValue::Constant(1));
        assert_eq!(fx.eval(sub).unwrap().value, LatticeValue::Unknown);

        fx.set(a, LatticeValue::Constant(5));
        assert_eq!(fx.eval(sub).unwrap().value, LatticeValue::Constant(4));

        fx.set(a, LatticeValue::Overdefined);
        assert_eq!(fx.eval(sub).unwrap().value, LatticeValue::Overdefined);
    }

    #[test]
    fn test_arithmetic_wraps() {
        let (mut fx, [a, b, add]) = binary(|a, b| SsaOp::Add {
            left: a.into(),
            right: b.into(),
        });
        fx.set(a, LatticeValue::Constant(i64::MAX));
        fx.set(b, LatticeValue::Constant(1));
        assert_eq!(fx.eval(add).unwrap().value, LatticeValue::Constant(i64::MIN));
    }

    #[test]
    fn test_opaque_and_return_are_overdefined() {
        let (fx, [a, _, _]) = binary(|a, b| SsaOp::Add {
            left: a.into(),
            right: b.into(),
        });
        assert_eq!(fx.eval(a).unwrap().value, LatticeValue::Overdefined);
        let ret = InstrId::new(3);
        let eval = fx.eval(ret).unwrap();
        assert_eq!(eval.value, LatticeValue::Overdefined);
        assert!(eval.feasible.is_empty());
    }

    /// B0: %0 = arg; br %0, B1, B2
    fn branch_fixture() -> (Fixture, InstrId, InstrId) {
        let mut ids = (InstrId::new(0), InstrId::new(0));
        let ssa = SsaFunctionBuilder::new("branch").build_with(|f| {
            f.block(0, |b| {
                let c = b.opaque("arg", vec![]);
                b.branch(c, 1, 2);
                ids = (c, InstrId::new(1));
            });
            f.block(1, |b| b.ret());
            f.block(2, |b| b.ret());
        });
        (Fixture::new(ssa), ids.0, ids.1)
    }

    #[test]
    fn test_branch_feasibility() {
        let (mut fx, cond, br) = branch_fixture();

        let eval = fx.eval(br).unwrap();
        assert_eq!(eval.value, LatticeValue::Unknown);
        assert_eq!(eval.feasible, vec![1, 2]);

        fx.set(cond, LatticeValue::Constant(0));
        let eval = fx.eval(br).unwrap();
        assert_eq!(eval.value, LatticeValue::Constant(0));
        assert_eq!(eval.feasible, vec![2]);

        fx.set(cond, LatticeValue::Overdefined);
        let eval = fx.eval(br).unwrap();
        assert_eq!(eval.value, LatticeValue::Overdefined);
        assert_eq!(eval.feasible, vec![1, 2]);
    }

    #[test]
    fn test_branch_rejects_non_boolean() {
        let (mut fx, cond, br) = branch_fixture();
        fx.set(cond, LatticeValue::Constant(2));
        assert!(matches!(
            fx.eval(br),
            Err(Error::InvalidCondition { block: 0, value: 2 })
        ));
    }

    #[test]
    fn test_jump() {
        let fx = Fixture::new(SsaFunctionBuilder::new("jump").build_with(|f| {
            f.block(0, |b| b.jump(3));
        }));
        let eval = fx.eval(InstrId::new(0)).unwrap();
        assert_eq!(eval.value, LatticeValue::Overdefined);
        assert_eq!(eval.feasible, vec![3]);
    }

    /// B0: br %0, B1, B2; B1: jmp B3; B2: jmp B3; B3: %4 = phi [4, B1], [second, B2]
    fn phi_fixture(second: Operand) -> (Fixture, InstrId) {
        let mut phi = InstrId::new(0);
        let ssa = SsaFunctionBuilder::new("phi").build_with(|f| {
            f.block(0, |b| {
                let c = b.opaque("arg", vec![]);
                b.branch(c, 1, 2);
            });
            f.block(1, |b| b.jump(3));
            f.block(2, |b| b.jump(3));
            f.block(3, |b| {
                phi = b.phi(&[(Operand::Const(4), 1), (second, 2)]);
                b.ret_val(phi);
            });
        });
        (Fixture::new(ssa), phi)
    }

    #[test]
    fn test_phi_respects_reachability() {
        let (mut fx, phi) = phi_fixture(Operand::Const(7));
        assert_eq!(fx.eval(phi).unwrap().value, LatticeValue::Unknown);

        fx.execution.mark_executed(1).unwrap();
        assert_eq!(fx.eval(phi).unwrap().value, LatticeValue::Constant(4));

        fx.execution.mark_executed(2).unwrap();
        assert_eq!(fx.eval(phi).unwrap().value, LatticeValue::Overdefined);
    }

    #[test]
    fn test_phi_agreeing_inputs() {
        let (mut fx, phi) = phi_fixture(Operand::Const(4));
        fx.execution.mark_executed(1).unwrap();
        fx.execution.mark_executed(2).unwrap();
        assert_eq!(fx.eval(phi).unwrap().value, LatticeValue::Constant(4));
    }

    #[test]
    fn test_phi_skips_undef() {
        let (mut fx, phi) = phi_fixture(Operand::Undef);
        fx.execution.mark_executed(1).unwrap();
        fx.execution.mark_executed(2).unwrap();
        assert_eq!(fx.eval(phi).unwrap().value, LatticeValue::Constant(4));
    }

    #[test]
    fn test_missing_lattice_entry() {
        let (mut fx, phi) = phi_fixture(Operand::Value(InstrId::new(99)));
        fx.execution.mark_executed(2).unwrap();
        assert!(matches!(fx.eval(phi), Err(Error::MissingLattice(_))));
    }

    #[test]
    fn test_undefined_operand_has_no_lattice_entry() {
        let mut ids = (InstrId::new(0), InstrId::new(0));
        let ssa = SsaFunctionBuilder::new("ghost").build_with(|f| {
            let ghost = f.reserve();
            f.block(0, |b| {
                ids = (ghost, b.add(ghost, 1));
                b.ret();
            });
        });
        let fx = Fixture::new(ssa);
        let (ghost, add) = ids;
        assert!(matches!(fx.eval(add), Err(Error::MissingLattice(i)) if i == ghost));
    }
}
