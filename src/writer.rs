use std::io::{self, BufWriter, IntoInnerError, Write};

use memchr::{memchr, memchr3};

use crate::records::Row;
use crate::utils::{trimmed_range, DELIMITER, QUOTE};

/// Builds a [`Writer`] with given configuration.
#[derive(Clone)]
pub struct WriterBuilder {
    buffer_capacity: usize,
}

impl Default for WriterBuilder {
    fn default() -> Self {
        Self {
            buffer_capacity: 8192,
        }
    }
}

impl WriterBuilder {
    /// Create a new [`WriterBuilder`] with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new [`WriterBuilder`] with provided `capacity`.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut writer = Self::default();
        writer.buffer_capacity(capacity);
        writer
    }

    /// Set the capacity of the created [`Writer`]'s buffered writer.
    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Create a new [`Writer`] using the provided writer implementing
    /// [`std::io::Write`].
    pub fn from_writer<W: Write>(&self, writer: W) -> Writer<W> {
        Writer {
            buffer: BufWriter::with_capacity(self.buffer_capacity, writer),
        }
    }
}

/// A CSV writer quoting fields so that a default [`Reader`](crate::Reader)
/// reads them back unchanged.
///
/// Rows are terminated by a single `\n`.
pub struct Writer<W: Write> {
    buffer: BufWriter<W>,
}

impl<W: Write> Writer<W> {
    pub fn from_writer(writer: W) -> Self {
        WriterBuilder::new().from_writer(writer)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.buffer.flush()
    }

    fn must_quote(field: &[u8]) -> bool {
        if memchr3(DELIMITER, b'\n', b'\r', field).is_some() || memchr(QUOTE, field).is_some() {
            return true;
        }

        // A BOM would be dropped if it started the data
        if field.starts_with(b"\xef\xbb\xbf") {
            return true;
        }

        // Whitespace would be trimmed otherwise
        trimmed_range(field) != (0, field.len())
    }

    fn write_quoted(&mut self, field: &[u8]) -> io::Result<()> {
        self.buffer.write_all(&[QUOTE])?;

        let mut rest = field;

        while let Some(offset) = memchr(QUOTE, rest) {
            self.buffer.write_all(&rest[..=offset])?;
            self.buffer.write_all(&[QUOTE])?;
            rest = &rest[offset + 1..];
        }

        self.buffer.write_all(rest)?;
        self.buffer.write_all(&[QUOTE])
    }

    /// Write a row made of the given fields.
    pub fn write_fields<I, T>(&mut self, fields: I) -> io::Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut count: usize = 0;
        let mut last_was_empty = false;

        for field in fields {
            let field = field.as_ref().as_bytes();

            if count > 0 {
                self.buffer.write_all(&[DELIMITER])?;
            }

            if Self::must_quote(field) {
                self.write_quoted(field)?;
            } else {
                self.buffer.write_all(field)?;
            }

            last_was_empty = field.is_empty();
            count += 1;
        }

        // A single empty field would be written as an empty line otherwise
        if count == 1 && last_was_empty {
            self.buffer.write_all(&[QUOTE, QUOTE])?;
        }

        self.buffer.write_all(b"\n")
    }

    pub fn write_row(&mut self, row: &Row) -> io::Result<()> {
        self.write_fields(row.iter())
    }

    pub fn into_inner(self) -> Result<W, IntoInnerError<BufWriter<W>>> {
        self.buffer.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    use crate::reader::ReaderBuilder;

    fn write(rows: &[Row]) -> io::Result<String> {
        let output = Cursor::new(Vec::<u8>::new());
        let mut writer = WriterBuilder::with_capacity(32).from_writer(output);

        for row in rows {
            writer.write_row(row)?;
        }

        Ok(String::from_utf8(writer.into_inner()?.into_inner()).unwrap())
    }

    #[test]
    fn test_write_row() -> io::Result<()> {
        let rows = vec![
            row!["name", "surname", "age"],
            row!["john,", "landis", "45"],
            row!["lucy", "get\ngot", "\"te,\"st\""],
            row![" padded", "", "cr\r"],
            row![""],
        ];

        assert_eq!(
            write(&rows)?,
            "name,surname,age\n\"john,\",landis,45\nlucy,\"get\ngot\",\"\"\"te,\"\"st\"\"\"\n\" padded\",,\"cr\r\"\n\"\"\n",
        );

        Ok(())
    }

    #[test]
    fn test_write_then_read() -> anyhow::Result<()> {
        let rows = vec![
            row!["She said \"hi\"", "veni, vidi, vici", ""],
            row!["  spaced  ", "multi\r\nline", "\""],
            row![""],
            row!["", ""],
            row!["béatrice\u{a0}", "\t"],
        ];

        let written = write(&rows)?;

        for capacity in [32usize, 3, 1] {
            let read = ReaderBuilder::with_capacity(capacity)
                .from_reader(Cursor::new(written.as_bytes()))
                .collect_rows()?;

            assert_eq!(read, rows);
        }

        Ok(())
    }
}
