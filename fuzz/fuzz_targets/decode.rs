#![no_main]

use libfuzzer_sys::fuzz_target;
use pescodec::EmbroideryFile;

// Arbitrary input must decode or fail with an error, never panic. Re-encoding what
// decoded must not panic either.
fuzz_target!(|data: &[u8]| {
    if let Ok(file) = EmbroideryFile::from_bytes(data) {
        let _ = file.to_bytes();
    }
});
