//! Many clients sharing one proxy and one compositor.

use std::sync::Arc;

use lumen_core::{ComposerProxy, ComposerStub, DISPLAY_ID_MAIN};
use lumen_harness::{FakeCompositor, LoopbackTransport};
use lumen_proto::{ComposerState, LayerChange, LayerState, MethodCode, TransactionFlags};

const TASKS: usize = 8;
const ROUNDS: usize = 50;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_clients_keep_refcounts_balanced() {
    let compositor = Arc::new(FakeCompositor::new());
    let stub = Arc::new(ComposerStub::new(Arc::clone(&compositor)));
    let proxy = Arc::new(ComposerProxy::new(LoopbackTransport::new(stub)));
    let main = proxy.get_built_in_display(DISPLAY_ID_MAIN).unwrap().unwrap();
    let control = proxy.get_control_block().unwrap().unwrap();

    let handles: Vec<_> = (0..TASKS)
        .map(|task| {
            let proxy = Arc::clone(&proxy);
            let main = main.clone();
            tokio::task::spawn_blocking(move || {
                let client = proxy.create_connection().unwrap();
                for round in 0..ROUNDS {
                    let mut state = LayerState::new(round as i32);
                    state.what = LayerChange::POSITION;
                    state.x = task as f32;
                    let batch = [ComposerState { client: Some(client.clone()), state }];
                    proxy.set_transaction_state(&batch, &[], TransactionFlags::empty()).unwrap();

                    proxy.get_control_block().unwrap().unwrap();
                    proxy.get_display_info(&main).unwrap();
                    proxy.capture_screen(&main, 32, 32, 0, 0).unwrap();
                }
                client
            })
        })
        .collect();

    let mut clients = Vec::new();
    for handle in handles {
        clients.push(handle.await.unwrap());
    }

    for (task, client) in clients.iter().enumerate() {
        for round in 0..ROUNDS {
            let layer = compositor.layer(client, round as i32).unwrap();
            assert_eq!(layer.x, task as f32);
        }
    }

    assert_eq!(compositor.call_count(MethodCode::SetTransactionState), TASKS * ROUNDS);
    assert_eq!(compositor.call_count(MethodCode::CreateConnection), TASKS);

    let table = compositor.table();
    assert_eq!(table.strong_count(main.id()), 2);
    assert_eq!(table.strong_count(control.id()), 2);
    for client in &clients {
        assert_eq!(table.strong_count(client.id()), 1);
    }

    drop(clients);
    // Connections and capture heaps are gone; the allocator, the control
    // block and the main display remain.
    assert_eq!(table.len(), 3);
}
