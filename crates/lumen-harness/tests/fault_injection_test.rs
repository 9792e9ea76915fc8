//! Fault injection tests.
//!
//! Every run uses a fixed seed, so a failure reproduces by re-running the
//! same seed. The property under test: a damaged transaction either fails
//! cleanly at the caller or applies completely at the service, never
//! partially, and never panics either side.

use std::sync::Arc;

use lumen_core::{CallError, ComposerProxy, ComposerStub, DISPLAY_ID_MAIN};
use lumen_harness::{FakeCompositor, FaultConfig, FaultyTransport, LoopbackTransport};
use lumen_proto::{ComposerState, LayerChange, LayerState, MethodCode, TransactionFlags};

type Loopback = Arc<LoopbackTransport<Arc<FakeCompositor>>>;

struct Rig {
    compositor: Arc<FakeCompositor>,
    clean: ComposerProxy<Loopback>,
    faulty: ComposerProxy<FaultyTransport<Loopback>>,
}

fn rig(config: FaultConfig, seed: u64) -> Rig {
    let compositor = Arc::new(FakeCompositor::new());
    let stub = Arc::new(ComposerStub::new(Arc::clone(&compositor)));
    let loopback = Arc::new(LoopbackTransport::new(stub));
    Rig {
        compositor,
        clean: ComposerProxy::new(Arc::clone(&loopback)),
        faulty: ComposerProxy::new(FaultyTransport::new(loopback, config, seed)),
    }
}

/// Submit one single-layer batch per surface and report which calls succeeded
fn submit_layers(rig: &Rig, surfaces: i32) -> Vec<bool> {
    let client = rig.clean.create_connection().unwrap();
    (0..surfaces)
        .map(|surface| {
            let mut state = LayerState::new(surface);
            state.what = LayerChange::POSITION;
            state.x = surface as f32;
            let batch = [ComposerState { client: Some(client.clone()), state }];
            rig.faulty.set_transaction_state(&batch, &[], TransactionFlags::empty()).is_ok()
        })
        .collect()
}

#[test]
fn damaged_batches_never_apply_partially() {
    for seed in 0..8 {
        let rig = rig(FaultConfig::uniform(0.1), seed);
        let client = rig.clean.create_connection().unwrap();

        let mut applied = 0;
        for surface in 0..100 {
            let mut state = LayerState::new(surface);
            state.what = LayerChange::POSITION | LayerChange::ALPHA;
            state.x = 1.0;
            state.alpha = 0.5;
            let batch = [ComposerState { client: Some(client.clone()), state }];
            let result = rig.faulty.set_transaction_state(&batch, &[], TransactionFlags::empty());

            match rig.compositor.layer(&client, surface) {
                Some(layer) => {
                    applied += 1;
                    assert_eq!((layer.x, layer.alpha), (1.0, 0.5), "seed {seed}");
                },
                None => assert!(result.is_err(), "seed {seed}: success without effect"),
            }
        }

        let stats = rig.faulty.transport().stats();
        assert_eq!(
            rig.compositor.call_count(MethodCode::SetTransactionState),
            applied,
            "seed {seed}"
        );
        // Damaged replies happen after the service ran
        assert_eq!(applied as u64, stats.clean + stats.truncated_replies, "seed {seed}");
    }
}

#[test]
fn only_clean_transactions_succeed() {
    let rig = rig(FaultConfig::uniform(0.15), 7);
    let outcomes = submit_layers(&rig, 200);

    let stats = rig.faulty.transport().stats();
    let succeeded = outcomes.iter().filter(|ok| **ok).count() as u64;
    assert_eq!(succeeded, stats.clean);
    assert!(stats.dropped > 0 && stats.truncated_requests > 0 && stats.truncated_replies > 0);
}

#[test]
fn same_seed_same_outcomes() {
    let config = FaultConfig::uniform(0.2);
    let first = submit_layers(&rig(config, 42), 100);
    let second = submit_layers(&rig(config, 42), 100);
    assert_eq!(first, second);

    let other = submit_layers(&rig(config, 43), 100);
    assert_ne!(first, other);
}

#[test]
fn faults_are_reported_as_errors_not_panics() {
    let config =
        FaultConfig { drop_rate: 0.1, truncate_request_rate: 0.3, truncate_reply_rate: 0.3 };
    let rig = rig(config, 99);
    let main = rig.clean.get_built_in_display(DISPLAY_ID_MAIN).unwrap().unwrap();
    let texture = rig.compositor.create_surface_texture();

    for _ in 0..50 {
        let results = [
            rig.faulty.get_display_info(&main).map(|_| ()),
            rig.faulty.capture_screen(&main, 64, 64, 0, 10).map(|_| ()),
            rig.faulty.create_display("virtual", false).map(|_| ()),
            rig.faulty.get_built_in_display(DISPLAY_ID_MAIN).map(|_| ()),
            rig.faulty.get_control_block().map(|_| ()),
            rig.faulty.blank(&main),
            rig.faulty.interface_descriptor().map(|_| ()),
        ];
        for result in results {
            if let Err(err) = result {
                assert!(
                    matches!(
                        err,
                        CallError::Transport(_)
                            | CallError::Malformed(_)
                            | CallError::Rejected(_)
                            | CallError::ProtocolMismatch
                            | CallError::Reference(_)
                    ),
                    "unexpected error: {err}"
                );
            }
        }
        // Failures of this call surface as `false`
        let _ = rig.faulty.authenticate_surface_texture(&texture);
    }

    // Nothing leaked: only the test and the compositor hold the main display
    assert_eq!(rig.compositor.table().strong_count(main.id()), 2);
}

#[test]
fn transient_errors_are_retryable() {
    let rig = rig(FaultConfig { drop_rate: 0.5, ..FaultConfig::NONE }, 3);

    let mut attempts = 0;
    let connection = loop {
        attempts += 1;
        match rig.faulty.create_connection() {
            Ok(connection) => break connection,
            Err(err) => assert!(err.is_transient(), "drops are transient: {err}"),
        }
    };

    assert!(connection.is_alive());
    assert_eq!(rig.faulty.transport().stats().dropped, attempts - 1);
}
