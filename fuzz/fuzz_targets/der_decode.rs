//! Decoding arbitrary DER with arbitrary packer descriptors.
//!
//! The first input byte gives the descriptor length; the descriptor follows,
//! then the DER. Whatever decodes must encode again, and an encoding that
//! reproduces the input must decode to the same cursors.

#![no_main]

use bytes::Bytes;
use derview_proto::{Codec, DerCodec, PackerDescriptor};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&len, rest)) = data.split_first() else {
        return;
    };
    let len = usize::from(len).min(rest.len());
    let (program, der) = rest.split_at(len);

    let Ok(packer) = PackerDescriptor::parse(program.to_vec()) else {
        return;
    };
    let codec = DerCodec::new();
    let Ok(cursors) = codec.decode(&packer, &Bytes::copy_from_slice(der), packer.cursor_count())
    else {
        return;
    };
    assert_eq!(cursors.len(), packer.cursor_count());

    let encoded = codec.encode(&packer, &cursors).expect("decoded cursors must encode");
    if let Ok(again) = codec.decode(&packer, &encoded, packer.cursor_count())
        && encoded == der
    {
        assert_eq!(again, cursors);
    }
});
