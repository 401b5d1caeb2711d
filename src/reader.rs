use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::mem;
use std::path::Path;

use log::warn;

use crate::core::{CoreReader, Malformed, ReadResult};
use crate::error::{self, Error, ErrorKind, Position};
use crate::records::{Row, RowBuilder};
use crate::utils::trim_bom;

/// Builds a [`Reader`] with given configuration.
#[derive(Clone)]
pub struct ReaderBuilder {
    buffer_capacity: usize,
    trim: bool,
    strict: bool,
    skip_empty_lines: bool,
    blanks_before_quotes: bool,
}

impl Default for ReaderBuilder {
    fn default() -> Self {
        Self {
            buffer_capacity: 8192,
            trim: true,
            strict: false,
            skip_empty_lines: false,
            blanks_before_quotes: false,
        }
    }
}

impl ReaderBuilder {
    /// Create a new [`ReaderBuilder`] with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new [`ReaderBuilder`] with provided `capacity`.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut reader = Self::default();
        reader.buffer_capacity(capacity);
        reader
    }

    /// Set the capacity of the created [`Reader`]'s buffered reader.
    ///
    /// A capacity of `0` is raised to `1`, since an empty buffer cannot be
    /// told apart from the end of input.
    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut Self {
        self.buffer_capacity = capacity.max(1);
        self
    }

    /// Indicate whether leading & trailing whitespace of unquoted fields
    /// should be trimmed. Quoted content is never trimmed.
    ///
    /// Will default to `true`.
    pub fn trim(&mut self, yes: bool) -> &mut Self {
        self.trim = yes;
        self
    }

    /// Indicate whether malformed quoting should be reported as an error
    /// instead of being repaired.
    ///
    /// When `false`, a quote in the middle of an unquoted field is kept
    /// literally, characters following a closing quote are appended to the
    /// field, and a quoted field still open at the end of input is closed
    /// implicitly.
    ///
    /// Will default to `false`.
    pub fn strict(&mut self, yes: bool) -> &mut Self {
        self.strict = yes;
        self
    }

    /// Indicate whether empty lines should be skipped instead of being read as
    /// a row containing a single empty field. Skipped lines are not numbered.
    ///
    /// Will default to `false`.
    pub fn skip_empty_lines(&mut self, yes: bool) -> &mut Self {
        self.skip_empty_lines = yes;
        self
    }

    /// Indicate whether blanks (space, tab) preceding an opening quote should
    /// be skipped so that `a, "b, c"` still reads a quoted second field. Only
    /// has an effect when trimming.
    ///
    /// When `false`, such blanks start an unquoted field in which the quote
    /// is malformed.
    ///
    /// Will default to `false`.
    pub fn blanks_before_quotes(&mut self, yes: bool) -> &mut Self {
        self.blanks_before_quotes = yes;
        self
    }

    /// Create a new [`Reader`] using the provided reader implementing
    /// [`std::io::Read`].
    pub fn from_reader<R: Read>(&self, reader: R) -> Reader<R> {
        Reader {
            buffer: BufReader::with_capacity(self.buffer_capacity, reader),
            inner: CoreReader::new(
                self.trim,
                self.strict,
                self.skip_empty_lines,
                self.blanks_before_quotes,
            ),
            has_read: false,
            byte: 0,
            row_start: 0,
            index: 0,
        }
    }

    /// Create a new [`Reader`] reading the file at `path`.
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> error::Result<Reader<File>> {
        Ok(self.from_reader(File::open(path)?))
    }
}

/// An already configured CSV row reader.
///
/// Rows are numbered from 1 in order of appearance, without any notion of
/// header.
///
/// # Configuration
///
/// To configure a [`Reader`], if you need to disable trimming or to report
/// malformed quoting as errors for instance, check out the [`ReaderBuilder`].
pub struct Reader<R> {
    buffer: BufReader<R>,
    inner: CoreReader,
    has_read: bool,
    byte: u64,
    row_start: u64,
    index: u64,
}

impl<R: Read> Reader<R> {
    pub fn from_reader(reader: R) -> Self {
        ReaderBuilder::new().from_reader(reader)
    }

    #[inline]
    fn on_first_read(&mut self) -> error::Result<()> {
        if self.has_read {
            return Ok(());
        }

        // Trimming BOM
        let input = self.buffer.fill_buf()?;
        let bom_len = trim_bom(input);
        self.buffer.consume(bom_len);
        self.byte = bom_len as u64;

        self.has_read = true;

        Ok(())
    }

    // Rows start after the LF of a CRLF split across two reads
    #[inline]
    fn skip_pending_lf(&mut self) -> error::Result<()> {
        if !self.inner.pending_lf {
            return Ok(());
        }

        let input = self.buffer.fill_buf()?;
        let pos = self.inner.skip_pending_lf(input);

        self.buffer.consume(pos);
        self.byte += pos as u64;

        Ok(())
    }

    #[inline]
    fn malformed(&self, kind: Malformed, byte: u64) -> Error {
        let pos = Position {
            byte,
            row: self.index + 1,
        };

        Error::new(match kind {
            Malformed::UnexpectedQuote => ErrorKind::UnexpectedQuote { pos },
            Malformed::TrailingCharacters => ErrorKind::TrailingCharacters { pos },
            Malformed::UnterminatedQuote => ErrorKind::UnterminatedQuote { pos },
        })
    }

    /// Read the next row into `row`, reusing its allocations.
    ///
    /// Returns `false` when the input is exhausted, in which case `row` is left
    /// empty. Errors are not recoverable: the reader should not be used after
    /// one.
    pub fn read_row(&mut self, row: &mut Row) -> error::Result<bool> {
        use ReadResult::*;

        self.on_first_read()?;

        // NOTE: the row's string buffer is recycled as raw bytes while the
        // state machine fills it, then validated as UTF-8 once complete.
        let mut data = mem::take(&mut row.data).into_bytes();

        let mut record_builder = RowBuilder::wrap(&mut data, &mut row.bounds, self.inner.trim);

        self.skip_pending_lf()?;
        self.row_start = self.byte;

        let found = loop {
            let input = self.buffer.fill_buf()?;

            let (result, pos) = self.inner.read_record(input, &mut record_builder);

            self.buffer.consume(pos);
            self.byte += pos as u64;

            match result {
                End => break false,
                InputEmpty => continue,
                Skip => {
                    self.skip_pending_lf()?;
                    self.row_start = self.byte;
                    continue;
                }
                Record => break true,
                ReadResult::Malformed(kind) => {
                    return Err(self.malformed(kind, self.byte));
                }
            }
        };

        if !found {
            return Ok(false);
        }

        self.index += 1;

        if let Some(kind) = self.inner.take_repaired() {
            warn!(
                "row {} (byte: {}): repaired malformed quoting ({:?})",
                self.index, self.row_start, kind
            );
        }

        match String::from_utf8(data) {
            Ok(string) => {
                row.data = string;
                Ok(true)
            }
            Err(_) => {
                row.bounds.clear();

                Err(Error::new(ErrorKind::Utf8 {
                    pos: Position {
                        byte: self.row_start,
                        row: self.index,
                    },
                }))
            }
        }
    }

    /// Returns the position reached so far: the byte offset right after the
    /// last row read, and its number.
    pub fn position(&self) -> Position {
        Position {
            byte: self.byte,
            row: self.index,
        }
    }

    /// Read every remaining row into memory.
    pub fn collect_rows(&mut self) -> error::Result<Vec<Row>> {
        self.rows().collect()
    }

    pub fn rows(&mut self) -> RowsIter<'_, R> {
        RowsIter {
            reader: self,
            row: Row::new(),
        }
    }

    pub fn into_rows(self) -> RowsIntoIter<R> {
        RowsIntoIter {
            reader: self,
            row: Row::new(),
        }
    }

    pub fn get_ref(&self) -> &R {
        self.buffer.get_ref()
    }

    pub fn into_inner(self) -> BufReader<R> {
        self.buffer
    }
}

impl Reader<File> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> error::Result<Self> {
        ReaderBuilder::new().from_path(path)
    }
}

pub struct RowsIter<'r, R> {
    reader: &'r mut Reader<R>,
    row: Row,
}

impl<R: Read> Iterator for RowsIter<'_, R> {
    type Item = error::Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        // NOTE: cloning the row will not carry over excess capacity
        // because the row only contains `String` & `Vec` currently.
        match self.reader.read_row(&mut self.row) {
            Err(err) => Some(Err(err)),
            Ok(true) => Some(Ok(self.row.clone())),
            Ok(false) => None,
        }
    }
}

pub struct RowsIntoIter<R> {
    reader: Reader<R>,
    row: Row,
}

impl<R: Read> Iterator for RowsIntoIter<R> {
    type Item = error::Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_row(&mut self.row) {
            Err(err) => Some(Err(err)),
            Ok(true) => Some(Ok(self.row.clone())),
            Ok(false) => None,
        }
    }
}
