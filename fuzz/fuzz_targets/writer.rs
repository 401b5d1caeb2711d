#![no_main]

use libfuzzer_sys::fuzz_target;

use tidy_csv::{ReaderBuilder, Row, Writer};

fuzz_target!(|data: &[u8]| {
    let Ok(field) = std::str::from_utf8(data) else {
        return;
    };

    let mut row = Row::new();
    row.push_field(field);
    row.push_field(field);

    let mut writer = Writer::from_writer(Vec::<u8>::new());
    writer.write_row(&row).unwrap();

    let written = writer.into_inner().unwrap();
    let read = ReaderBuilder::new()
        .strict(true)
        .from_reader(written.as_slice())
        .collect_rows()
        .unwrap();

    assert_eq!(read, vec![row]);
});
