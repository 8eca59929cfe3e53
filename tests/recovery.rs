use std::thread;
use std::time::Duration;

use rstest::*;
use tokio_util::sync::CancellationToken;
use xs128p_recover::codec::{self, DROPPED_BITS};
use xs128p_recover::{GeneratorState, LinearSolver, Recovery, RecoveryError, SolveBudget};

fn outputs(seed: GeneratorState, n: usize) -> Vec<f64> {
    let mut s = seed;
    (0..n).map(|_| { s = s.next(); s.output() }).collect()
}

#[fixture]
fn recovery() -> Recovery<LinearSolver> {
    Recovery::new(LinearSolver::new())
}

#[rstest]
#[case(GeneratorState::new(0x0123_4567_89AB_CDEF, 0xFEDC_BA98_7654_3210), 4)]
#[case(GeneratorState::new(0x1, 0x2), 5)]
#[case(GeneratorState::new(0xDEAD_BEEF_0BAD_F00D, 0x0123_4567_89AB_CDEF), 5)]
#[case(GeneratorState::new(u64::MAX, 0x8000_0000_0000_0000), 6)]
#[case(GeneratorState::new(0x9E37_79B9_7F4A_7C15, 0), 8)]
fn recovered_state_replays_future_outputs(recovery: Recovery<LinearSolver>, #[case] seed: GeneratorState, #[case] n: usize) {
    let all = outputs(seed, n + 50);
    let predictor = recovery.predictor(&all[..n], &SolveBudget::unbounded()).unwrap();
    let predicted = predictor.take(50);
    for (i, (p, e)) in predicted.iter().zip(&all[n..]).enumerate() {
        assert_eq!(p.to_bits(), e.to_bits(), "prediction {i} differs");
    }
}

#[rstest]
fn corrupted_observation_is_unsatisfiable(recovery: Recovery<LinearSolver>) {
    let seed = GeneratorState::new(0x0F1E_2D3C_4B5A_6978, 0x8796_A5B4_C3D2_E1F0);
    let mut obs = outputs(seed, 6);
    // Flip the lowest bit that reaches the double.
    let word = codec::encode(obs[5]) << DROPPED_BITS;
    obs[5] = codec::decode(word ^ (1 << DROPPED_BITS));
    let err = recovery.recover(&obs, &SolveBudget::unbounded()).unwrap_err();
    assert!(matches!(err, RecoveryError::Unsatisfiable), "got {err:?}");
}

#[rstest]
fn two_observations_are_ambiguous(recovery: Recovery<LinearSolver>) {
    let seed = GeneratorState::new(0x1111_2222_3333_4444, 0x5555_6666_7777_8888);
    let err = recovery.recover(&outputs(seed, 2), &SolveBudget::unbounded()).unwrap_err();
    match err {
        RecoveryError::AmbiguousModel { candidate, free_bits } => {
            assert!(free_bits.unwrap() >= 24);
            // The candidate still explains what was observed.
            assert_eq!(outputs(candidate, 2), outputs(seed, 2));
        }
        other => panic!("expected ambiguity, got {other:?}"),
    }
}

#[rstest]
#[case(1, 76)]
#[case(2, 24)]
#[case(3, 12)]
fn fewer_than_four_observations_leave_free_bits(recovery: Recovery<LinearSolver>, #[case] n: usize, #[case] expected: u32) {
    let seed = GeneratorState::new(0x2545_F491_4F6C_DD1D, 0x9E37_79B9_7F4A_7C15);
    match recovery.recover(&outputs(seed, n), &SolveBudget::unbounded()) {
        Err(RecoveryError::AmbiguousModel { free_bits, .. }) => assert_eq!(free_bits, Some(expected)),
        other => panic!("expected ambiguity for {n} observations, got {other:?}"),
    }
}

#[rstest]
fn independent_recoveries_agree(recovery: Recovery<LinearSolver>) {
    let seed = GeneratorState::new(0xC0FF_EE00_1234_5678, 0x0BAD_CAFE_8765_4321);
    let obs = outputs(seed, 5);
    let a = recovery.predictor(&obs, &SolveBudget::unbounded()).unwrap();
    let b = Recovery::new(LinearSolver::new()).predictor(&obs, &SolveBudget::unbounded()).unwrap();
    assert!(a.iter().zip(b.iter()).take(1000).all(|(x, y)| x.to_bits() == y.to_bits()));
}

#[rstest]
fn concurrent_recoveries_share_nothing() {
    let seeds: Vec<GeneratorState> = (1..=4u64).map(|i| GeneratorState::new(i * 0x1_0001, !i)).collect();
    let recovered: Vec<GeneratorState> = thread::scope(|s| {
        let handles: Vec<_> = seeds
            .iter()
            .map(|&seed| s.spawn(move || Recovery::new(LinearSolver::new()).recover(&outputs(seed, 6), &SolveBudget::unbounded())))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect()
    });
    for (seed, got) in seeds.iter().zip(&recovered) {
        assert_eq!(outputs(*seed, 20), outputs(*got, 20));
    }
}

#[rstest]
#[case(&[])]
#[case(&[0.3, 1.0])]
#[case(&[f64::NAN])]
fn malformed_input_is_rejected(recovery: Recovery<LinearSolver>, #[case] obs: &[f64]) {
    let err = recovery.recover(obs, &SolveBudget::unbounded()).unwrap_err();
    assert!(matches!(err, RecoveryError::NoObservations | RecoveryError::MalformedObservation { .. }));
}

#[rstest]
fn cancelled_budget_reports_timeout(recovery: Recovery<LinearSolver>) {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let budget = SolveBudget::new(Some(Duration::from_secs(5)), cancel);
    let err = recovery.recover(&outputs(GeneratorState::new(3, 4), 5), &budget).unwrap_err();
    assert!(matches!(err, RecoveryError::SolverTimeout { attempts: 1 }));
}
