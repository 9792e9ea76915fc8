//! Stub dispatch fuzzer
//!
//! Feeds arbitrary request bodies to every method code, both raw and behind a
//! valid interface token so the fuzzer reaches argument decoding.
//!
//! Invariants:
//! - the stub never panics
//! - every reply starts with a readable status
//! - a request without the token never reaches the service

#![no_main]

use lumen_core::ComposerStub;
use lumen_harness::FakeCompositor;
use lumen_proto::{
    CodecLimits, MethodCode, Parcel, SURFACE_COMPOSER_DESCRIPTOR, Status, TransactFlags,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&selector, body)) = data.split_first() else {
        return;
    };
    let code = u32::from(selector) % (MethodCode::ALL.len() as u32 + 2);
    let flags = if selector & 0x80 != 0 { TransactFlags::ONE_WAY } else { TransactFlags::empty() };
    let limits = CodecLimits { max_parcel_bytes: 4096, max_sequence_len: 64 };

    let stub = ComposerStub::with_limits(FakeCompositor::new(), limits);

    // INVARIANT 1: raw bytes are answered with a status, and only an exact
    // token lets the call through
    if let Ok(raw) = Parcel::from_parts(body, Vec::new(), limits) {
        let reply = stub.on_transact(code, &raw, flags);
        let status = reply.reader().read_status().expect("reply must start with a status");
        if status != Status::OK {
            assert_eq!(stub.service().total_calls(), 0);
        }
    }

    // INVARIANT 2: behind a valid token, argument decoding never panics
    let mut tokened = Parcel::with_limits(limits);
    if tokened.write_interface_token(SURFACE_COMPOSER_DESCRIPTOR).is_err() {
        return;
    }
    let (prefix, _) = tokened.into_parts();
    let mut bytes = prefix.to_vec();
    bytes.extend_from_slice(body);

    if let Ok(request) = Parcel::from_parts(&bytes, Vec::new(), limits) {
        let reply = stub.on_transact(code, &request, flags);
        assert!(reply.reader().read_status().is_ok(), "reply must start with a status");
    }
});
