#![no_main]

use libfuzzer_sys::fuzz_target;

use tidy_csv::{ReaderBuilder, Row};

fuzz_target!(|data: &[u8]| {
    for strict in [false, true] {
        let mut reader = ReaderBuilder::with_capacity(7)
            .strict(strict)
            .from_reader(data);
        let mut row = Row::new();

        // Errors are expected on arbitrary bytes, panics are not
        while let Ok(true) = reader.read_row(&mut row) {}
    }
});
