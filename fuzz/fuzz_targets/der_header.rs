//! Header parsing and value splitting on arbitrary input.
//!
//! Any header that parses must describe itself consistently, and walking a
//! buffer value by value must consume exactly the bytes it reports.

#![no_main]

use bytes::Bytes;
use derview_proto::{Values, parse_header};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(header) = parse_header(data) {
        assert!(header.header_length >= 2 && header.header_length <= 6);
        assert!(header.header_length <= data.len());
    }

    let mut values = Values::new(Bytes::copy_from_slice(data));
    let mut consumed = 0;
    while let Some(Ok((header, value))) = values.next() {
        assert_eq!(Some(value.len()), header.total_length());
        consumed += value.len();
    }
    assert_eq!(consumed + values.remainder().len(), data.len());
});
