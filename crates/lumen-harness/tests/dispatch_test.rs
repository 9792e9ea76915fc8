//! Dispatch tests: every method code reaches exactly its handler, and requests
//! without the right interface token never reach the service.

use std::sync::Arc;

use lumen_core::{
    CallError, ComposerProxy, ComposerStub, DISPLAY_ID_MAIN, Transaction, Transport, TransportError,
};
use lumen_harness::{FakeCompositor, LoopbackTransport};
use lumen_proto::{
    CodecLimits, MethodCode, Parcel, SURFACE_COMPOSER_DESCRIPTOR, Status, TransactFlags,
    TransactionFlags,
    codes::{INTERFACE_TRANSACTION, PING_TRANSACTION},
};
use proptest::prelude::*;

type Loopback = Arc<LoopbackTransport<Arc<FakeCompositor>>>;

fn connect() -> (Arc<FakeCompositor>, Loopback, ComposerProxy<Loopback>) {
    let compositor = Arc::new(FakeCompositor::new());
    let stub = Arc::new(ComposerStub::new(Arc::clone(&compositor)));
    let loopback = Arc::new(LoopbackTransport::new(stub));
    let proxy = ComposerProxy::new(Arc::clone(&loopback));
    (compositor, loopback, proxy)
}

fn reply_status(reply: &Parcel) -> Status {
    reply.reader().read_status().unwrap()
}

#[test]
fn every_code_reaches_its_handler() {
    let (compositor, _, proxy) = connect();
    let main = proxy.get_built_in_display(DISPLAY_ID_MAIN).unwrap().unwrap();
    let texture = compositor.create_surface_texture();

    proxy.create_connection().unwrap();
    proxy.create_graphic_buffer_allocator().unwrap();
    proxy.get_control_block().unwrap().unwrap();
    proxy.set_transaction_state(&[], &[], TransactionFlags::empty()).unwrap();
    proxy.boot_finished().unwrap();
    proxy.capture_screen(&main, 0, 0, 0, u32::MAX).unwrap();
    assert!(proxy.authenticate_surface_texture(&texture));
    proxy.create_display_event_connection().unwrap();
    proxy.create_display("virtual", false).unwrap().unwrap();
    proxy.blank(&main).unwrap();
    proxy.unblank(&main).unwrap();
    proxy.get_display_info(&main).unwrap();

    for method in MethodCode::ALL {
        assert_eq!(compositor.call_count(method), 1, "{} should run exactly once", method.name());
    }
    assert_eq!(compositor.total_calls(), MethodCode::ALL.len());
}

#[test]
fn wrong_token_never_reaches_service() {
    let (compositor, loopback, _) = connect();

    for method in MethodCode::ALL {
        let mut data = Parcel::new();
        data.write_interface_token("android.ui.ISurfaceComposerClient").unwrap();
        data.write_i32(0).unwrap();

        let reply = loopback.transact(Transaction::new(method.to_u32(), data)).unwrap();
        assert_eq!(reply_status(&reply), Status::PERMISSION_DENIED, "{}", method.name());
    }

    assert_eq!(compositor.total_calls(), 0);
}

#[test]
fn missing_token_never_reaches_service() {
    let (compositor, loopback, _) = connect();

    for method in MethodCode::ALL {
        let reply = loopback.transact(Transaction::new(method.to_u32(), Parcel::new())).unwrap();
        assert_eq!(reply_status(&reply), Status::PERMISSION_DENIED, "{}", method.name());
    }

    assert_eq!(compositor.total_calls(), 0);
}

#[test]
fn unknown_codes_have_no_side_effects() {
    let (compositor, loopback, _) = connect();

    for code in [13, 14, 1000, 0x5F00_0000, u32::MAX] {
        let mut data = Parcel::new();
        data.write_interface_token(SURFACE_COMPOSER_DESCRIPTOR).unwrap();

        let reply = loopback.transact(Transaction::new(code, data)).unwrap();
        assert_eq!(reply_status(&reply), Status::UNKNOWN_TRANSACTION, "code {code}");
    }

    assert_eq!(compositor.total_calls(), 0);
}

#[test]
fn base_transactions_answer_without_token() {
    let (compositor, loopback, proxy) = connect();

    proxy.ping().unwrap();
    assert_eq!(proxy.interface_descriptor().unwrap(), SURFACE_COMPOSER_DESCRIPTOR);

    let reply = loopback.transact(Transaction::new(PING_TRANSACTION, Parcel::new())).unwrap();
    assert_eq!(reply_status(&reply), Status::OK);

    let reply = loopback.transact(Transaction::new(INTERFACE_TRANSACTION, Parcel::new())).unwrap();
    let mut reader = reply.reader();
    assert_eq!(reader.read_status().unwrap(), Status::OK);
    assert_eq!(reader.read_string().unwrap(), SURFACE_COMPOSER_DESCRIPTOR);

    assert_eq!(compositor.total_calls(), 0);
}

#[test]
fn one_way_boot_finished_returns_empty_reply() {
    let (compositor, loopback, _) = connect();

    let mut data = Parcel::new();
    data.write_interface_token(SURFACE_COMPOSER_DESCRIPTOR).unwrap();
    let txn = Transaction {
        code: MethodCode::BootFinished.to_u32(),
        flags: TransactFlags::ONE_WAY,
        data,
    };

    let reply = loopback.transact(txn).unwrap();
    assert!(reply.is_empty());
    assert!(compositor.is_booted());
}

#[test]
fn null_texture_is_not_authentic() {
    let (compositor, loopback, _) = connect();

    let mut data = Parcel::new();
    data.write_interface_token(SURFACE_COMPOSER_DESCRIPTOR).unwrap();
    data.write_object(None).unwrap();

    let code = MethodCode::AuthenticateSurfaceTexture.to_u32();
    let reply = loopback.transact(Transaction::new(code, data)).unwrap();
    let mut reader = reply.reader();
    assert_eq!(reader.read_status().unwrap(), Status::OK);
    assert!(!reader.read_bool().unwrap());
    assert_eq!(reader.remaining(), 0);

    assert_eq!(compositor.call_count(MethodCode::AuthenticateSurfaceTexture), 1);
}

#[test]
fn proxy_surfaces_token_rejection() {
    // A service speaking a different interface rejects our token
    struct Renamed<T>(T);

    impl<T: Transport> Transport for Renamed<T> {
        fn transact(&self, txn: Transaction) -> Result<Parcel, TransportError> {
            let mut data = Parcel::new();
            data.write_interface_token("android.gui.IOtherService").unwrap();
            self.0.transact(Transaction { data, ..txn })
        }
    }

    let (compositor, loopback, _) = connect();
    let proxy = ComposerProxy::new(Renamed(loopback));

    assert_eq!(proxy.create_connection(), Err(CallError::ProtocolMismatch));
    assert_eq!(proxy.get_control_block(), Err(CallError::ProtocolMismatch));
    assert_eq!(compositor.total_calls(), 0);
}

proptest! {
    #[test]
    fn arbitrary_requests_always_get_a_status(
        code in 0u32..16,
        bytes in prop::collection::vec(any::<u8>(), 0..256),
    ) {
        let stub = ComposerStub::new(FakeCompositor::new());
        let data = Parcel::from_parts(&bytes, Vec::new(), CodecLimits::default()).unwrap();

        let reply = stub.on_transact(code, &data, TransactFlags::empty());
        let status = reply.reader().read_status();
        prop_assert!(status.is_ok());

        // Random bytes essentially never spell the token, so nothing runs
        if status.unwrap() != Status::OK {
            prop_assert_eq!(reply.len(), 4);
            prop_assert_eq!(stub.service().total_calls(), 0);
        }
    }
}
