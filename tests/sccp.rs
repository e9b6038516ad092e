//! Sparse conditional constant propagation integration tests.
//!
//! These tests drive the public API end to end:
//! 1. Build a function with `SsaFunctionBuilder`
//! 2. Solve it with `ConstantPropagation`
//! 3. Rewrite it with `ConstantPropagationPass` / `Rewriter`
//! 4. Verify lattice values, reachability and the rewritten function

use std::collections::HashSet;

use ccprop::{
    analysis::{
        CmpPredicate, ConstantPropagation, InstrId, LatticeValue, Operand, SccpResult,
        SsaFunction, SsaFunctionBuilder, SsaOp,
    },
    compiler::{
        ConstantPropagationPass, EventKind, EventLog, PassScheduler, Rewriter, SccpConfig,
        SsaPass,
    },
    utils::graph::{algorithms, RootedGraph},
    Error, Result,
};

/// Run the propagation pass on `ssa` with the default configuration.
fn run_pass(ssa: &mut SsaFunction) -> Result<(bool, EventLog)> {
    let events = EventLog::new();
    let changed = ConstantPropagationPass::new().run_on_function(ssa, &events)?;
    Ok((changed, events))
}

/// Operation of the terminator of `block`.
fn terminator(ssa: &SsaFunction, block: usize) -> SsaOp {
    ssa.block(block)
        .and_then(|b| b.terminator())
        .and_then(|id| ssa.instruction(id))
        .map(|instr| instr.op().clone())
        .expect("block has a terminator")
}

/// Upper bound on block evaluations: one per incoming edge, at least one per block.
fn evaluation_bound(ssa: &SsaFunction) -> usize {
    ssa.blocks()
        .iter()
        .map(|b| b.predecessor_count().max(1))
        .sum()
}

/// B0: jmp B1
/// B1: %i = phi [0, B0], [%next, B2]; %c = icmp slt %i, 10; br %c, B2, B3
/// B2: %next = add %i, 1; jmp B1
/// B3: ret %i
fn counting_loop() -> (SsaFunction, [InstrId; 3]) {
    let mut ids = [InstrId::new(0); 3];
    let ssa = SsaFunctionBuilder::new("count").build_with(|f| {
        let i = f.reserve();
        let next = f.reserve();
        ids[0] = i;
        ids[2] = next;
        f.block(0, |b| b.jump(1));
        f.block(1, |b| {
            b.phi_into(i, &[(Operand::Const(0), 0), (Operand::Value(next), 2)]);
            let c = b.icmp(CmpPredicate::Slt, i, 10);
            ids[1] = c;
            b.branch(c, 2, 3);
        });
        f.block(2, |b| {
            b.place(
                next,
                SsaOp::Add {
                    left: i.into(),
                    right: 1.into(),
                },
            );
            b.jump(1);
        });
        f.block(3, |b| b.ret_val(i));
    });
    (ssa, ids)
}

/// B0: %c = icmp ult -1, 5; br %c, B1, B2
/// B1: jmp B4
/// B2: %p = param; br %p, B3, B4
/// B3: jmp B4
/// B4: %m = phi [1, B1], [2, B2], [3, B3]; ret %m
fn nested_branches() -> (SsaFunction, [InstrId; 2]) {
    let mut ids = [InstrId::new(0); 2];
    let ssa = SsaFunctionBuilder::new("nested").build_with(|f| {
        f.block(0, |b| {
            let c = b.icmp(CmpPredicate::Ult, -1, 5);
            ids[0] = c;
            b.branch(c, 1, 2);
        });
        f.block(1, |b| b.jump(4));
        f.block(2, |b| {
            let p = b.opaque("param", vec![]);
            b.branch(p, 3, 4);
        });
        f.block(3, |b| b.jump(4));
        f.block(4, |b| {
            let m = b.phi(&[
                (Operand::Const(1), 1),
                (Operand::Const(2), 2),
                (Operand::Const(3), 3),
            ]);
            ids[1] = m;
            b.ret_val(m);
        });
    });
    (ssa, ids)
}

/// Two-way merge of `left` and `right` behind an unknown condition.
fn merge_of(name: &str, left: i64, right: i64) -> (SsaFunction, InstrId) {
    let mut phi = InstrId::new(0);
    let ssa = SsaFunctionBuilder::new(name).build_with(|f| {
        f.block(0, |b| {
            let p = b.opaque("param", vec![]);
            b.branch(p, 1, 2);
        });
        f.block(1, |b| b.jump(3));
        f.block(2, |b| b.jump(3));
        f.block(3, |b| {
            phi = b.phi(&[(Operand::Const(left), 1), (Operand::Const(right), 2)]);
            b.ret_val(phi);
        });
    });
    (ssa, phi)
}

/// Returns `true` if the edge `pred -> succ` may execute according to `result`.
fn edge_is_live(ssa: &SsaFunction, result: &SccpResult, pred: usize, succ: usize) -> bool {
    if !result.is_block_reachable(pred) {
        return false;
    }
    match terminator(ssa, pred) {
        SsaOp::Jump { target } => target == succ,
        SsaOp::Branch {
            condition,
            true_target,
            false_target,
        } => {
            let value = match condition {
                Operand::Const(c) => LatticeValue::Constant(c),
                Operand::Value(id) => result.value(id).unwrap_or_default(),
                Operand::Undef => LatticeValue::Unknown,
            };
            match value {
                LatticeValue::Constant(1) => true_target == succ,
                LatticeValue::Constant(0) => false_target == succ,
                _ => true_target == succ || false_target == succ,
            }
        }
        _ => false,
    }
}

#[test]
fn test_sccp_single_block_add() -> Result<()> {
    // %0 = add 2, 3; ret %0
    let mut sum = InstrId::new(0);
    let mut ssa = SsaFunctionBuilder::new("add").build_with(|f| {
        f.block(0, |b| {
            sum = b.add(2, 3);
            b.ret_val(sum);
        });
    });

    let result = ConstantPropagation::new(&ssa).solve()?;
    assert_eq!(result.value(sum), Some(LatticeValue::Constant(5)));

    let (changed, events) = run_pass(&mut ssa)?;
    assert!(changed);
    assert_eq!(events.count_kind(EventKind::ConstantFolded), 1);
    assert!(ssa.instruction(sum).is_none());
    assert_eq!(
        terminator(&ssa, 0),
        SsaOp::Return {
            value: Some(Operand::Const(5))
        }
    );
    ssa.validate()
}

#[test]
fn test_sccp_decided_branch() -> Result<()> {
    // %0 = icmp sgt 10, 3; br %0, B1, B2
    let mut cond = InstrId::new(0);
    let mut ssa = SsaFunctionBuilder::new("branch").build_with(|f| {
        f.block(0, |b| {
            cond = b.icmp(CmpPredicate::Sgt, 10, 3);
            b.branch(cond, 1, 2);
        });
        f.block(1, |b| b.ret_val(1));
        f.block(2, |b| b.ret_val(2));
    });

    let result = ConstantPropagation::new(&ssa).solve()?;
    assert_eq!(result.value(cond), Some(LatticeValue::Constant(1)));
    assert!(result.is_block_reachable(1));
    assert!(!result.is_block_reachable(2));

    let (changed, events) = run_pass(&mut ssa)?;
    assert!(changed);
    assert_eq!(events.count_kind(EventKind::BranchSimplified), 1);
    assert_eq!(terminator(&ssa, 0), SsaOp::Jump { target: 1 });
    // The untaken successor is left for unreachable-code elimination
    assert_eq!(ssa.block_count(), 3);
    assert_eq!(ssa.block_predecessors(2), &[0]);
    Ok(())
}

#[test]
fn test_sccp_phi_same_constant() -> Result<()> {
    let (mut ssa, phi) = merge_of("same", 4, 4);

    let result = ConstantPropagation::new(&ssa).solve()?;
    assert!(result.is_block_reachable(1) && result.is_block_reachable(2));
    assert_eq!(result.value(phi), Some(LatticeValue::Constant(4)));

    let (changed, events) = run_pass(&mut ssa)?;
    assert!(changed);
    assert_eq!(events.count_kind(EventKind::PhiSimplified), 1);
    assert!(ssa.instruction(phi).is_none());
    assert_eq!(
        terminator(&ssa, 3),
        SsaOp::Return {
            value: Some(Operand::Const(4))
        }
    );
    Ok(())
}

#[test]
fn test_sccp_phi_conflicting_constants() -> Result<()> {
    let (mut ssa, phi) = merge_of("conflict", 4, 7);
    let before = ssa.to_string();

    let result = ConstantPropagation::new(&ssa).solve()?;
    assert_eq!(result.value(phi), Some(LatticeValue::Overdefined));

    let (changed, events) = run_pass(&mut ssa)?;
    assert!(!changed);
    assert_eq!(events.transformation_count(), 0);
    assert_eq!(ssa.to_string(), before);
    Ok(())
}

#[test]
fn test_sccp_phi_ignores_unreachable_input() -> Result<()> {
    // B0: %c = icmp eq 1, 1; br %c, B1, B2
    // B3: %m = phi [9, B1], [5, B2]
    let mut phi = InstrId::new(0);
    let mut ssa = SsaFunctionBuilder::new("one_live").build_with(|f| {
        f.block(0, |b| {
            let c = b.icmp(CmpPredicate::Eq, 1, 1);
            b.branch(c, 1, 2);
        });
        f.block(1, |b| b.jump(3));
        f.block(2, |b| b.jump(3));
        f.block(3, |b| {
            phi = b.phi(&[(Operand::Const(9), 1), (Operand::Const(5), 2)]);
            b.ret_val(phi);
        });
    });

    let result = ConstantPropagation::new(&ssa).solve()?;
    assert!(!result.is_block_reachable(2));
    assert_eq!(result.execution_count(2), 0);
    assert_eq!(result.value(phi), Some(LatticeValue::Constant(9)));

    run_pass(&mut ssa)?;
    assert_eq!(
        terminator(&ssa, 3),
        SsaOp::Return {
            value: Some(Operand::Const(9))
        }
    );
    Ok(())
}

#[test]
fn test_sccp_sub_waits_for_operand() -> Result<()> {
    // %x = sub %a, 1 is evaluated before %a has a value.
    // With the definition of %a unreachable, %x never leaves Unknown.
    let mut x = InstrId::new(0);
    let mut a = InstrId::new(0);
    let mut ssa = SsaFunctionBuilder::new("pending").build_with(|f| {
        a = f.reserve();
        f.block(0, |b| {
            x = b.sub(a, 1);
            b.ret_val(x);
        });
        f.block(1, |b| {
            b.place(
                a,
                SsaOp::Add {
                    left: 2.into(),
                    right: 3.into(),
                },
            );
            b.ret();
        });
    });
    let result = ConstantPropagation::new(&ssa).solve()?;
    assert_eq!(result.value(a), Some(LatticeValue::Unknown));
    assert_eq!(result.value(x), Some(LatticeValue::Unknown));

    let before = ssa.to_string();
    let (changed, _) = run_pass(&mut ssa)?;
    assert!(!changed);
    assert_eq!(ssa.to_string(), before);

    // Once the definition of %a runs, %x follows it
    let mut ssa = SsaFunctionBuilder::new("resolved").build_with(|f| {
        a = f.reserve();
        f.block(0, |b| {
            x = b.sub(a, 1);
            b.jump(1);
        });
        f.block(1, |b| {
            b.place(
                a,
                SsaOp::Add {
                    left: 2.into(),
                    right: 3.into(),
                },
            );
            b.ret_val(x);
        });
    });
    let result = ConstantPropagation::new(&ssa)
        .with_history(true)
        .solve()?;
    assert_eq!(result.value(a), Some(LatticeValue::Constant(5)));
    assert_eq!(
        result.history(x),
        Some(&[LatticeValue::Unknown, LatticeValue::Constant(4)][..])
    );

    let (changed, _) = run_pass(&mut ssa)?;
    assert!(changed);
    assert!(ssa.instruction(x).is_none());
    assert_eq!(
        terminator(&ssa, 1),
        SsaOp::Return {
            value: Some(Operand::Const(4))
        }
    );
    Ok(())
}

#[test]
fn test_sccp_unsigned_compare_selects_false_edge() -> Result<()> {
    let (ssa, [cond, phi]) = nested_branches();
    let result = ConstantPropagation::new(&ssa).solve()?;

    // -1 reinterpreted as u64 is the largest value
    assert_eq!(result.value(cond), Some(LatticeValue::Constant(0)));
    assert_eq!(result.reachable_blocks().collect::<Vec<_>>(), vec![0, 2, 3, 4]);
    // Inputs 2 and 3 arrive over live edges, input 1 does not
    assert_eq!(result.value(phi), Some(LatticeValue::Overdefined));
    Ok(())
}

#[test]
fn test_sccp_monotonic_history() -> Result<()> {
    let fixtures = vec![
        counting_loop().0,
        nested_branches().0,
        merge_of("merge", 1, 2).0,
    ];

    for ssa in &fixtures {
        let result = ConstantPropagation::new(ssa).with_history(true).solve()?;
        for slot in 0..ssa.instruction_slots() {
            let id = InstrId::new(slot);
            let history = result.history(id).expect("history was recorded");

            assert_eq!(history.first(), Some(&LatticeValue::Unknown));
            assert!(history.len() <= 3, "{id} changed more than twice");
            for pair in history.windows(2) {
                assert!(
                    pair[0] < pair[1],
                    "{id} moved from {} to {} in {}",
                    pair[0],
                    pair[1],
                    ssa.name()
                );
            }
            assert_eq!(history.last().copied(), result.value(id));
        }
    }
    Ok(())
}

#[test]
fn test_sccp_loop_counter() -> Result<()> {
    let (ssa, [i, c, next]) = counting_loop();
    let result = ConstantPropagation::new(&ssa).with_history(true).solve()?;

    assert_eq!(result.value(i), Some(LatticeValue::Overdefined));
    assert_eq!(result.value(c), Some(LatticeValue::Overdefined));
    assert_eq!(result.value(next), Some(LatticeValue::Overdefined));
    assert_eq!(
        result.history(i),
        Some(
            &[
                LatticeValue::Unknown,
                LatticeValue::Constant(0),
                LatticeValue::Overdefined
            ][..]
        )
    );
    assert_eq!(result.reachable_block_count(), 4);
    Ok(())
}

#[test]
fn test_sccp_rewrite_idempotent() -> Result<()> {
    let fixtures = vec![
        counting_loop().0,
        nested_branches().0,
        merge_of("same", 4, 4).0,
        merge_of("conflict", 4, 7).0,
    ];

    for mut ssa in fixtures {
        let result = ConstantPropagation::new(&ssa).solve()?;
        let events = EventLog::new();
        let rewriter = Rewriter::new(&result, SccpConfig::default());

        rewriter.apply(&mut ssa, &events)?;
        let once = ssa.to_string();
        assert_eq!(rewriter.apply(&mut ssa, &events)?, 0);
        assert_eq!(ssa.to_string(), once);

        // A fresh analysis of the rewritten function finds nothing more to do
        let (changed, _) = run_pass(&mut ssa)?;
        assert!(!changed, "second run changed {}", ssa.name());
        assert_eq!(ssa.to_string(), once);
        ssa.validate()?;
    }
    Ok(())
}

#[test]
fn test_sccp_reachability_soundness() -> Result<()> {
    let fixtures = vec![
        counting_loop().0,
        nested_branches().0,
        merge_of("merge", 4, 7).0,
    ];

    for ssa in &fixtures {
        let result = ConstantPropagation::new(ssa).solve()?;
        let structural: HashSet<usize> = algorithms::dfs(ssa, ssa.entry())
            .map(|node| node.index())
            .collect();

        assert!(result.is_block_reachable(0));
        for block in result.reachable_blocks().filter(|&b| b != 0) {
            assert!(structural.contains(&block));
            let live = ssa
                .block_predecessors(block)
                .iter()
                .any(|&pred| edge_is_live(ssa, &result, pred, block));
            assert!(live, "B{block} in {} has no live incoming edge", ssa.name());
        }
    }
    Ok(())
}

#[test]
fn test_sccp_termination_bound() -> Result<()> {
    let fixtures = vec![
        counting_loop().0,
        nested_branches().0,
        merge_of("merge", 4, 7).0,
    ];

    for ssa in &fixtures {
        let result = ConstantPropagation::new(ssa).solve()?;
        assert!(result.block_evaluations() <= evaluation_bound(ssa));
        assert!(result.value_changes() <= 2 * ssa.instruction_slots());
        for block in 0..ssa.block_count() {
            let edges = ssa.block_predecessors(block).len().max(1);
            assert!(result.execution_count(block) <= edges);
        }
    }
    Ok(())
}

#[test]
fn test_sccp_invalid_condition_leaves_function() {
    let mut ssa = SsaFunctionBuilder::new("bad").build_with(|f| {
        f.block(0, |b| {
            let v = b.add(1, 1);
            b.branch(v, 1, 2);
        });
        f.block(1, |b| b.ret());
        f.block(2, |b| b.ret());
    });
    let before = ssa.to_string();

    assert!(matches!(
        ConstantPropagation::new(&ssa).solve(),
        Err(Error::InvalidCondition { block: 0, value: 2 })
    ));

    let events = EventLog::new();
    assert!(ConstantPropagationPass::new()
        .run_on_function(&mut ssa, &events)
        .is_err());
    assert_eq!(ssa.to_string(), before);
    assert_eq!(events.transformation_count(), 0);
}

#[test]
fn test_sccp_empty_function() {
    let ssa = SsaFunctionBuilder::new("empty").build();
    assert!(matches!(
        ConstantPropagation::new(&ssa).solve(),
        Err(Error::Empty)
    ));
}

#[test]
fn test_scheduler_parallel_functions() -> Result<()> {
    let mut functions = vec![
        counting_loop().0,
        nested_branches().0,
        merge_of("same", 4, 4).0,
        merge_of("conflict", 4, 7).0,
        SsaFunctionBuilder::new("empty").build(),
    ];

    let scheduler = PassScheduler::default().with_pass(ConstantPropagationPass::new());
    let events = EventLog::new();
    let iterations = scheduler.run(&mut functions, &events)?;

    assert_eq!(iterations, 2);
    assert!(events.errors().next().is_none());
    assert_eq!(events.functions_transformed(), 2);
    assert_eq!(events.filter_function("conflict").count(), 4);
    assert_eq!(events.count_kind(EventKind::BranchSimplified), 1);
    assert_eq!(events.count_kind(EventKind::PhiSimplified), 1);

    for ssa in functions.iter().filter(|f| !f.is_empty()) {
        ssa.validate()?;
    }
    Ok(())
}

#[test]
fn test_pass_history_config() -> Result<()> {
    let pass = ConstantPropagationPass::with_config(SccpConfig::debugging());
    assert!(pass.config().record_history);

    let (mut ssa, phi) = merge_of("dbg", 4, 4);
    let events = EventLog::new();
    assert!(pass.run_on_function(&mut ssa, &events)?);

    let history: Vec<_> = events.filter_kind(EventKind::Info).collect();
    assert!(!history.is_empty());
    assert!(history.iter().all(|e| e.function.as_deref() == Some("dbg")));
    let merge = history
        .iter()
        .find(|e| e.message.starts_with(&format!("{phi}:")))
        .expect("phi history is reported");
    assert_eq!(merge.block, Some(3));
    assert_eq!(merge.message, format!("{phi}: unknown -> const 4"));

    // Without history recording no info events are emitted
    let (mut ssa, _) = merge_of("plain", 4, 4);
    let events = EventLog::new();
    assert!(ConstantPropagationPass::new().run_on_function(&mut ssa, &events)?);
    assert_eq!(events.count_kind(EventKind::Info), 0);
    Ok(())
}

#[test]
fn test_unchecked_pass_rejects_undefined_operand() {
    let mut ghost = InstrId::new(0);
    let mut ssa = SsaFunctionBuilder::new("ghost").build_with(|f| {
        ghost = f.reserve();
        f.block(0, |b| {
            let v = b.add(ghost, 1);
            b.ret_val(v);
        });
    });
    let before = ssa.to_string();

    assert!(ssa.validate().is_err());
    assert!(matches!(
        ConstantPropagation::new(&ssa).solve(),
        Err(Error::MissingLattice(i)) if i == ghost
    ));

    let pass = ConstantPropagationPass::with_config(SccpConfig::unchecked());
    let events = EventLog::new();
    assert!(matches!(
        pass.run_on_function(&mut ssa, &events),
        Err(Error::MissingLattice(_))
    ));
    assert_eq!(ssa.to_string(), before);
    assert_eq!(events.transformation_count(), 0);
}
