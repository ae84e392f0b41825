#![no_main]

use libfuzzer_sys::fuzz_target;
use rgssfs::{MemorySource, RgssArchive};

// Hostile input must be declined with an error, never a panic or a runaway
// allocation.
fuzz_target!(|data: &[u8]| {
    if let Ok(archive) = RgssArchive::open(Box::new(MemorySource::new(data.to_vec())), false) {
        for entry in archive.entries("") {
            let _ = entry;
        }
    }
});
