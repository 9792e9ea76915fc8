//! Record decoding fuzzer
//!
//! Decodes arbitrary bytes as each wire record type, against an object table
//! holding a couple of live references.
//!
//! Invariants:
//! - decoding never panics
//! - a failed decode leaves the cursor where it was
//! - a failed decode releases every reference it took

#![no_main]

use std::sync::Arc;

use lumen_harness::objects::{Connection, DisplayToken};
use lumen_proto::{
    CodecLimits, ComposerState, DisplayInfo, DisplayState, HandleTable, LayerState, Parcel,
    ParcelReader, Rect, Region, WireRecord,
};
use libfuzzer_sys::fuzz_target;

fn decode<T: WireRecord>(reader: &mut ParcelReader<'_>) {
    let start = reader.position();
    while reader.remaining() > 0 {
        let before = reader.position();
        match reader.read_record::<T>() {
            Ok(_) => assert!(reader.position() > before, "successful decode must consume bytes"),
            Err(_) => {
                assert_eq!(reader.position(), before, "failed decode must not move the cursor");
                break;
            },
        }
    }
    assert!(reader.position() >= start);
}

fuzz_target!(|data: &[u8]| {
    let Some((&selector, body)) = data.split_first() else {
        return;
    };
    let limits = CodecLimits { max_parcel_bytes: 4096, max_sequence_len: 64 };

    let table = HandleTable::new();
    let connection = table.register(Arc::new(Connection { serial: 1 }));
    let display = table.register(Arc::new(DisplayToken { name: "fuzz".to_string() }));

    {
        let objects = vec![connection.clone(), display.clone()];
        let Ok(parcel) = Parcel::from_parts(body, objects, limits) else {
            return;
        };
        let mut reader = parcel.reader().with_limits(limits);

        match selector % 6 {
            0 => decode::<Rect>(&mut reader),
            1 => decode::<Region>(&mut reader),
            2 => decode::<LayerState>(&mut reader),
            3 => decode::<ComposerState>(&mut reader),
            4 => decode::<DisplayState>(&mut reader),
            _ => decode::<DisplayInfo>(&mut reader),
        }
    }

    // Everything decoded above has been dropped with the parcel
    assert_eq!(table.strong_count(connection.id()), 1);
    assert_eq!(table.strong_count(display.id()), 1);
});
