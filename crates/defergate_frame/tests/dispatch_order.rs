//! Dispatch ordering and eligibility tests.
//!
//! Tests covering reverse registration order, eligibility gating on early
//! exits, repeated reaches of loop gates, gate independence and nested
//! dispatch.


use core::cell::Cell;

use defergate_frame::{BoxedAction, DispatchReport, Frame, FrameError, HookSite, gates, hook};
use test_utils::Trace;

// ═══════════════════════════════════════════════════════════════════════════════
// REVERSE ORDER
// ═══════════════════════════════════════════════════════════════════════════════

fn open_two(trace: &Trace) -> Result<DispatchReport, FrameError> {
    let frame = Frame::new();
    gates!(frame; ret);

    trace.push("open(R1)");
    hook!(frame, ret => { trace.push("close(R1)") })?;

    trace.push("open(R2)");
    hook!(frame, ret => { trace.push("close(R2)") })?;

    trace.push("read");
    frame.finish(ret)
}

/// Verifies the two-resource scenario: the resource opened last closes first.
#[test]
fn two_resources_close_in_reverse_order() {
    let trace = Trace::new();
    let report = open_two(&trace).expect("procedure should succeed");

    assert_eq!(
        trace.events(),
        ["open(R1)", "open(R2)", "read", "close(R2)", "close(R1)"]
    );
    assert_eq!(report.ran().len(), 2);
}

/// Verifies that many hooks on one gate run strictly newest first.
#[test]
fn hooks_run_last_registered_first() {
    let trace = Trace::new();
    let frame = Frame::new();
    let ret = frame.declare_gate("ret").unwrap();

    let mut seqs = Vec::new();
    for n in 0..10 {
        let trace = &trace;
        seqs.push(frame.register(ret, move || trace.push(format!("A{n}"))).unwrap());
    }

    let report = frame.reach(ret).unwrap();

    let expected: Vec<String> = (0..10).rev().map(|n| format!("A{n}")).collect();
    assert_eq!(trace.events(), expected);
    seqs.reverse();
    assert_eq!(report.ran(), seqs.as_slice());
}

// ═══════════════════════════════════════════════════════════════════════════════
// ELIGIBILITY
// ═══════════════════════════════════════════════════════════════════════════════

/// Acquires `count` resources, jumping to `ret` when acquisition `fail_at`
/// fails. Every registration site is declared up front and armed only once
/// its resource is live.
fn acquire(trace: &Trace, count: usize, fail_at: Option<usize>) -> Result<DispatchReport, FrameError> {
    let frame = Frame::new();
    gates!(frame; ret);

    let sites: Vec<HookSite> = (0..count)
        .map(|k| {
            frame.declare_hook(
                ret,
                BoxedAction::infallible(move || trace.push(format!("release({k})"))),
            )
        })
        .collect::<Result<_, _>>()?;

    for (k, site) in sites.into_iter().enumerate() {
        if fail_at == Some(k) {
            trace.push(format!("failed({k})"));
            return frame.finish(ret);
        }
        trace.push(format!("acquire({k})"));
        frame.arm(site)?;
    }

    frame.finish(ret)
}

/// Verifies that an early jump to the gate only runs hooks whose registration
/// site executed.
#[test]
fn early_exit_runs_only_registered_hooks() {
    let trace = Trace::new();
    let report = acquire(&trace, 2, Some(1)).unwrap();

    assert_eq!(trace.events(), ["acquire(0)", "failed(1)", "release(0)"]);
    assert_eq!(report.ran().len(), 1);
    assert_eq!(report.skipped(), 1);
}

/// Verifies that a failure before any registration runs nothing.
#[test]
fn failure_before_first_registration_runs_nothing() {
    let trace = Trace::new();
    let report = acquire(&trace, 3, Some(0)).unwrap();

    assert_eq!(trace.events(), ["failed(0)"]);
    assert!(report.ran().is_empty());
    assert_eq!(report.skipped(), 3);
}

/// Verifies the full path releases everything in reverse.
#[test]
fn full_acquisition_releases_everything() {
    let trace = Trace::new();
    acquire(&trace, 3, None).unwrap();

    assert_eq!(
        trace.events(),
        [
            "acquire(0)",
            "acquire(1)",
            "acquire(2)",
            "release(2)",
            "release(1)",
            "release(0)",
        ]
    );
}

/// Verifies that a skipped site stays ineligible on later reaches too.
#[test]
fn unarmed_site_never_runs() {
    let ran = Cell::new(false);
    let frame = Frame::new();
    let ret = frame.declare_gate("ret").unwrap();
    let _site = frame
        .declare_hook(ret, BoxedAction::infallible(|| ran.set(true)))
        .unwrap();

    for _ in 0..3 {
        let report = frame.reach(ret).unwrap();
        assert_eq!(report.skipped(), 1);
    }
    assert!(!ran.get());
}

// ═══════════════════════════════════════════════════════════════════════════════
// REPEATED REACH
// ═══════════════════════════════════════════════════════════════════════════════

/// Verifies that a loop gate re-runs its hooks on every reach and that the
/// action observes the live loop counter each time.
#[test]
fn loop_gate_observes_live_counter() {
    let trace = Trace::new();
    let i = Cell::new(0);
    let frame = Frame::new();
    let retry = frame.declare_gate("retry").unwrap();

    // registered outside the loop, reached inside it
    frame
        .register(retry, || trace.push(format!("retry at i={}", i.get())))
        .unwrap();

    for n in 0..4 {
        i.set(n * 10);
        frame.reach(retry).unwrap();
    }

    assert_eq!(
        trace.events(),
        ["retry at i=0", "retry at i=10", "retry at i=20", "retry at i=30"]
    );
    assert_eq!(frame.reach_count(retry).unwrap(), 4);
    assert_eq!(frame.eligible_count(retry).unwrap(), 1, "hooks are not consumed");
}

/// Verifies that hooks registered between reaches join later passes.
#[test]
fn later_registrations_join_later_passes() {
    let trace = Trace::new();
    let frame = Frame::new();
    let retry = frame.declare_gate("retry").unwrap();

    frame.register(retry, || trace.push("A")).unwrap();
    frame.reach(retry).unwrap();

    frame.register(retry, || trace.push("B")).unwrap();
    frame.reach(retry).unwrap();

    assert_eq!(trace.events(), ["A", "B", "A"]);
}

// ═══════════════════════════════════════════════════════════════════════════════
// GATE INDEPENDENCE
// ═══════════════════════════════════════════════════════════════════════════════

/// Verifies that reaching one gate never runs another gate's hooks.
#[test]
fn gates_do_not_interleave() {
    let trace = Trace::new();
    let frame = Frame::new();
    let a = frame.declare_gate("a").unwrap();
    let b = frame.declare_gate("b").unwrap();

    frame.register(a, || trace.push("a1")).unwrap();
    frame.register(b, || trace.push("b1")).unwrap();
    frame.register(a, || trace.push("a2")).unwrap();
    frame.register(b, || trace.push("b2")).unwrap();

    frame.reach(a).unwrap();
    assert_eq!(trace.events(), ["a2", "a1"]);

    trace.clear();
    frame.reach(b).unwrap();
    assert_eq!(trace.events(), ["b2", "b1"]);
}

/// Verifies that a gate may be declared and never reached.
#[test]
fn gate_reached_zero_times_runs_nothing() {
    let ran = Cell::new(false);
    let frame = Frame::new();
    let ret = frame.declare_gate("ret").unwrap();
    let unused = frame.declare_gate("unused").unwrap();

    frame.register(unused, || ran.set(true)).unwrap();
    frame.finish(ret).unwrap();

    assert!(!ran.get());
}

// ═══════════════════════════════════════════════════════════════════════════════
// NESTED DISPATCH
// ═══════════════════════════════════════════════════════════════════════════════

/// Verifies that an action reaching another gate starts an independent pass.
#[test]
fn action_can_reach_another_gate() {
    let trace = Trace::new();
    let frame = Frame::new();
    let inner = frame.declare_gate("inner").unwrap();
    let outer = frame.declare_gate("outer").unwrap();

    frame.register(inner, || trace.push("inner")).unwrap();
    frame.register(outer, || trace.push("outer first")).unwrap();
    let trace_ref = &trace;
    frame
        .register_boxed(
            outer,
            BoxedAction::new(move |nested| {
                let trace = trace_ref;
                trace.push("outer jumps");
                nested.reach(inner)?;
                Ok(())
            }),
        )
        .unwrap();

    frame.reach(outer).unwrap();

    assert_eq!(trace.events(), ["outer jumps", "inner", "outer first"]);
    assert_eq!(frame.reach_count(inner).unwrap(), 1);
}

/// Verifies that an action reaching its own gate starts a nested pass over
/// the same hooks, after which the outer pass finishes its own hooks.
#[test]
fn action_reaching_own_gate_runs_nested_pass() {
    let trace = Trace::new();
    let calls = Cell::new(0);
    let frame = Frame::new();
    let ret = frame.declare_gate("ret").unwrap();

    frame.register(ret, || trace.push("sibling")).unwrap();
    let (trace_ref, calls) = (&trace, &calls);
    frame
        .register_boxed(
            ret,
            BoxedAction::new(move |nested| {
                calls.set(calls.get() + 1);
                trace_ref.push(format!("self{}", calls.get()));
                if calls.get() == 1 {
                    nested.reach(ret)?;
                }
                Ok(())
            }),
        )
        .unwrap();

    let report = frame.reach(ret).expect("nested same-gate pass should succeed");

    assert_eq!(trace.events(), ["self1", "self2", "sibling", "sibling"]);
    assert_eq!(report.ran().len(), 2, "outer pass ran both of its hooks");
    assert_eq!(frame.reach_count(ret).unwrap(), 2);
}

/// Verifies that a failure inside a nested same-gate pass surfaces through
/// the outer pass.
#[test]
fn nested_same_gate_failure_propagates() {
    let trace = Trace::new();
    let depth = Cell::new(0);
    let frame = Frame::new();
    let ret = frame.declare_gate("ret").unwrap();

    frame.register(ret, || trace.push("sibling")).unwrap();
    let (trace_ref, depth) = (&trace, &depth);
    frame
        .register_boxed(
            ret,
            BoxedAction::new(move |nested| {
                depth.set(depth.get() + 1);
                if depth.get() == 1 {
                    nested.reach(ret)?;
                    Ok(())
                } else {
                    trace_ref.push("inner fails");
                    Err("inner close failed".into())
                }
            }),
        )
        .unwrap();

    let err = frame.reach(ret).expect_err("inner failure should surface");
    let FrameError::ActionFailure { source, .. } = err else {
        panic!("expected ActionFailure");
    };
    let inner = source
        .downcast_ref::<FrameError>()
        .expect("source should be the nested FrameError");
    assert!(matches!(inner, FrameError::ActionFailure { .. }));
    assert_eq!(trace.events(), ["inner fails"]);
}

/// Verifies that a hook registered by an action runs on the next reach only.
#[test]
fn hook_registered_during_pass_waits_for_next_reach() {
    let trace = Trace::new();
    let registered = Cell::new(false);
    let frame = Frame::new();
    let ret = frame.declare_gate("ret").unwrap();

    let (trace_ref, registered) = (&trace, &registered);
    frame
        .register_boxed(
            ret,
            BoxedAction::new(move |nested| {
                let trace = trace_ref;
                trace.push("outer");
                if !registered.replace(true) {
                    nested.register(ret, move || trace.push("late"))?;
                }
                Ok(())
            }),
        )
        .unwrap();

    frame.reach(ret).unwrap();
    assert_eq!(trace.events(), ["outer"]);

    trace.clear();
    frame.reach(ret).unwrap();
    assert_eq!(trace.events(), ["late", "outer"]);
}
