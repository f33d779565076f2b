#![no_main]

use libfuzzer_sys::fuzz_target;
use namemap::{RawChunks, StreamingDecoder, TableBuilder, TableScanner};

/// Verifies that scanning an arbitrary record stream never panics.
///
/// This covers corrupt tables whose deflate layer happens to be valid.
///
/// # Invariant
/// Both lookup directions return `Ok(_)` or `Err(_)` for any bytes, and the
/// answer does not depend on how the stream is split into chunks.
fn verify_scan_robustness(data: &[u8]) {
    let whole = TableScanner::new(RawChunks::new(data, data.len().max(1))).find_name(0x41);
    let split = TableScanner::new(RawChunks::new(data, 3)).find_name(0x41);
    match (whole, split) {
        (Ok(a), Ok(b)) => assert_eq!(a, b, "chunking changed the answer"),
        (Err(_), Err(_)) => {}
        (a, b) => panic!("chunking changed the outcome: {a:?} vs {b:?}"),
    }
    let _ = TableScanner::new(RawChunks::new(data, 7)).find_code("A");
}

/// Verifies that arbitrary bytes offered as a compressed table never panic
/// the decoder or the scanner on top of it.
///
/// # Invariant
/// Inflate errors and truncation surface as `Err(_)`.
fn verify_decoder_robustness(data: &[u8]) {
    let _ = TableScanner::new(StreamingDecoder::new(data)).find_code("FUZZ");
    let _ = TableScanner::new(StreamingDecoder::new(data)).find_name(0x10FFFF);
}

/// Verifies that names built into a table are found again.
///
/// Each input byte becomes a codepoint gap and a short name.
///
/// # Panics
/// If a built table does not return a name it was given.
fn verify_built_lookup(data: &[u8]) {
    let mut builder = TableBuilder::new();
    let mut code = 0u32;
    for (i, &byte) in data.iter().enumerate().take(256) {
        code += u32::from(byte) * 97 + 1;
        if builder.insert(code, format!("FUZZ {i}")).is_err() {
            return;
        }
    }
    let encoded = builder.encode();
    for i in (0..data.len().min(256)).step_by(17) {
        let name = format!("FUZZ {i}");
        let found = TableScanner::new(RawChunks::new(&encoded, 5)).find_code(&name);
        assert!(matches!(found, Ok(Some(_))), "{name} not found");
    }
}

fuzz_target!(|data: &[u8]| {
    verify_scan_robustness(data);
    verify_decoder_robustness(data);
    verify_built_lookup(data);
});
