use memchr::{memchr, memchr3};

use crate::records::RowBuilder;
use crate::utils::{is_blank, DELIMITER, QUOTE};

/// Malformed quoting, only reported by strict readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Malformed {
    UnexpectedQuote,
    TrailingCharacters,
    UnterminatedQuote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadResult {
    InputEmpty,
    Skip,
    Record,
    End,
    // NOTE: the offending byte is at the returned position.
    Malformed(Malformed),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    FieldStart,
    Unquoted,
    Quoted,
    Quote,
    // After the closing quote of a field
    Closed,
}

pub(crate) struct CoreReader {
    pub(crate) trim: bool,
    pub(crate) strict: bool,
    pub(crate) skip_empty_lines: bool,
    // Blanks before an opening quote are skipped instead of starting an
    // unquoted field
    blanks_before_quotes: bool,
    state: ReadState,
    // Whether some byte of the current row was consumed already
    row_started: bool,
    // A CR ended the last chunk, so a leading LF belongs to the same separator
    pub(crate) pending_lf: bool,
    // Lenient repairs on the current row, used for diagnostics only
    repaired: Option<Malformed>,
}

impl CoreReader {
    pub(crate) fn new(
        trim: bool,
        strict: bool,
        skip_empty_lines: bool,
        blanks_before_quotes: bool,
    ) -> Self {
        Self {
            trim,
            strict,
            skip_empty_lines,
            blanks_before_quotes,
            state: ReadState::FieldStart,
            row_started: false,
            pending_lf: false,
            repaired: None,
        }
    }

    /// Returns the kind of malformed quoting silently fixed while reading the
    /// last row, if any.
    pub(crate) fn take_repaired(&mut self) -> Option<Malformed> {
        self.repaired.take()
    }

    /// Consumes the LF completing a CRLF split across two chunks, if any.
    ///
    /// Returns the number of bytes consumed.
    #[inline]
    pub(crate) fn skip_pending_lf(&mut self, input: &[u8]) -> usize {
        if !self.pending_lf || input.is_empty() {
            return 0;
        }

        self.pending_lf = false;

        usize::from(input[0] == b'\n')
    }

    #[inline]
    fn end_row(&mut self, record_builder: &mut RowBuilder) -> ReadResult {
        record_builder.finalize_field();

        self.state = ReadState::FieldStart;
        self.row_started = false;

        if self.skip_empty_lines && record_builder.is_empty_line() {
            record_builder.clear();
            self.repaired = None;
            return ReadResult::Skip;
        }

        ReadResult::Record
    }

    #[inline]
    fn repair(&mut self, kind: Malformed) -> bool {
        if self.strict {
            return false;
        }

        self.repaired.get_or_insert(kind);

        true
    }

    /// Feeds the next chunk of input to the state machine. An empty `input`
    /// signals the end of the stream.
    ///
    /// Returns what happened along with the number of bytes consumed.
    pub(crate) fn read_record(
        &mut self,
        input: &[u8],
        record_builder: &mut RowBuilder,
    ) -> (ReadResult, usize) {
        use ReadState::*;

        let input_len = input.len();

        if input_len == 0 {
            self.pending_lf = false;

            if !self.row_started {
                return (ReadResult::End, 0);
            }

            match self.state {
                Quoted => {
                    if !self.repair(Malformed::UnterminatedQuote) {
                        return (ReadResult::Malformed(Malformed::UnterminatedQuote), 0);
                    }

                    record_builder.close_quote();
                }
                Quote => record_builder.close_quote(),
                _ => (),
            }

            // NOTE: this is required to handle streams not ending with a newline
            return (self.end_row(record_builder), 0);
        }

        let mut pos = self.skip_pending_lf(input);

        while pos < input_len {
            match self.state {
                FieldStart => {
                    self.row_started = true;

                    let byte = input[pos];

                    if byte == QUOTE {
                        record_builder.open_quote();
                        self.state = Quoted;
                        pos += 1;
                    } else if self.trim && self.blanks_before_quotes && is_blank(byte) {
                        pos += 1;
                    } else {
                        self.state = Unquoted;
                    }
                }
                Unquoted => {
                    // Here we are moving to next delimiter or end of line
                    let offset = memchr3(DELIMITER, b'\n', b'\r', &input[pos..]);
                    let end = offset.map(|o| pos + o).unwrap_or(input_len);

                    if let Some(o) = memchr(QUOTE, &input[pos..end]) {
                        if !self.repair(Malformed::UnexpectedQuote) {
                            return (ReadResult::Malformed(Malformed::UnexpectedQuote), pos + o);
                        }
                    }

                    record_builder.extend_from_slice(&input[pos..end]);

                    if offset.is_none() {
                        pos = end;
                        break;
                    }

                    let byte = input[end];
                    pos = end + 1;

                    if byte == DELIMITER {
                        record_builder.finalize_field();
                        self.state = FieldStart;
                        continue;
                    }

                    return (self.end_line(byte, input, &mut pos, record_builder), pos);
                }
                Quoted => {
                    // Here we moving to next quote, newlines included
                    if let Some(offset) = memchr(QUOTE, &input[pos..]) {
                        record_builder.extend_from_slice(&input[pos..pos + offset]);
                        pos += offset + 1;
                        self.state = Quote;
                    } else {
                        record_builder.extend_from_slice(&input[pos..]);
                        pos = input_len;
                    }
                }
                Quote => {
                    let byte = input[pos];

                    if byte == QUOTE {
                        record_builder.push_byte(byte);
                        self.state = Quoted;
                        pos += 1;
                        continue;
                    }

                    record_builder.close_quote();
                    self.state = Closed;
                }
                Closed => {
                    let byte = input[pos];

                    pos += 1;

                    if byte == DELIMITER {
                        record_builder.finalize_field();
                        self.state = FieldStart;
                    } else if byte == b'\n' || byte == b'\r' {
                        return (self.end_line(byte, input, &mut pos, record_builder), pos);
                    } else if self.trim && is_blank(byte) {
                        // Kept in the buffer, but trimmed away with the field
                        record_builder.push_byte(byte);
                    } else {
                        if !self.repair(Malformed::TrailingCharacters) {
                            return (
                                ReadResult::Malformed(Malformed::TrailingCharacters),
                                pos - 1,
                            );
                        }

                        record_builder.push_byte(byte);
                        self.state = Unquoted;
                    }
                }
            }
        }

        (ReadResult::InputEmpty, input_len)
    }

    #[inline]
    fn end_line(
        &mut self,
        byte: u8,
        input: &[u8],
        pos: &mut usize,
        record_builder: &mut RowBuilder,
    ) -> ReadResult {
        if byte == b'\r' {
            if *pos < input.len() {
                if input[*pos] == b'\n' {
                    *pos += 1;
                }
            } else {
                self.pending_lf = true;
            }
        }

        self.end_row(record_builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::records::Row;

    fn read_all(
        data: &[u8],
        chunk: usize,
        core: &mut CoreReader,
    ) -> Result<Vec<Row>, (Malformed, usize)> {
        let mut rows = Vec::new();
        let mut offset: usize = 0;

        loop {
            let mut bytes = Vec::new();
            let mut bounds = Vec::new();
            let mut builder = RowBuilder::wrap(&mut bytes, &mut bounds, core.trim);

            let done = loop {
                let end = (offset + chunk).min(data.len());
                let (result, pos) = core.read_record(&data[offset..end], &mut builder);

                match result {
                    ReadResult::End => break true,
                    ReadResult::InputEmpty | ReadResult::Skip => {
                        offset += pos;
                    }
                    ReadResult::Record => {
                        offset += pos;
                        break false;
                    }
                    ReadResult::Malformed(kind) => return Err((kind, offset + pos)),
                }
            };

            if done {
                return Ok(rows);
            }

            rows.push(Row {
                data: String::from_utf8(bytes).unwrap(),
                bounds,
            });
        }
    }

    fn lenient(data: &str) -> Vec<Vec<String>> {
        let mut outputs = Vec::new();

        for chunk in [1024usize, 4, 3, 2, 1] {
            let mut core = CoreReader::new(true, false, false, false);
            let rows = read_all(data.as_bytes(), chunk, &mut core).unwrap();
            outputs.push(rows.iter().map(|row| row.to_vec()).collect::<Vec<_>>());
        }

        for output in outputs.iter().skip(1) {
            assert_eq!(output, &outputs[0], "chunk boundaries changed the output");
        }

        outputs.swap_remove(0)
    }

    fn strict(data: &str) -> Result<Vec<Vec<String>>, (Malformed, usize)> {
        let mut core = CoreReader::new(true, true, false, false);
        read_all(data.as_bytes(), 3, &mut core)
            .map(|rows| rows.iter().map(|row| row.to_vec()).collect())
    }

    #[test]
    fn test_unquoted() {
        assert_eq!(
            lenient("a,b,c,d\n1,2,,4\n5,,,\n"),
            vec![
                vec!["a", "b", "c", "d"],
                vec!["1", "2", "", "4"],
                vec!["5", "", "", ""]
            ]
        );

        assert_eq!(lenient(" a , b\t,c "), vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn test_empty_input() {
        assert!(lenient("").is_empty());
        assert_eq!(lenient("\n"), vec![vec![""]]);
        assert_eq!(lenient("name\n\njohn"), vec![vec!["name"], vec![""], vec!["john"]]);
    }

    #[test]
    fn test_line_separators() {
        let expected = vec![vec!["name", "age"], vec!["john", "45"], vec!["lucy", "67"]];

        assert_eq!(lenient("name,age\njohn,45\nlucy,67"), expected);
        assert_eq!(lenient("name,age\r\njohn,45\r\nlucy,67\r\n"), expected);
        assert_eq!(lenient("name,age\rjohn,45\rlucy,67\r"), expected);
        assert_eq!(lenient("name,age\r\njohn,45\nlucy,67\r"), expected);
        assert_eq!(
            lenient("\"name\",\"age\"\r\n\"john\",45\r\"lucy\",\"67\"\r\n"),
            expected
        );
    }

    #[test]
    fn test_quoted() {
        assert_eq!(
            lenient("first,notes\nCaesar,\"veni, vidi, vici\"\n"),
            vec![vec!["first", "notes"], vec!["Caesar", "veni, vidi, vici"]]
        );

        assert_eq!(
            lenient("quote,age\n\"She said \"\"hi\"\"\",42\n"),
            vec![vec!["quote", "age"], vec!["She said \"hi\"", "42"]]
        );

        assert_eq!(
            lenient("\"\"\"ok\"\"\",\"\",\"multi\r\nline\nfield\"\nnext"),
            vec![vec!["\"ok\"", "", "multi\r\nline\nfield"], vec!["next"]]
        );
    }

    #[test]
    fn test_quoted_whitespace() {
        assert_eq!(
            lenient("\"  padded  \",\" inner\" ,x"),
            vec![vec!["  padded  ", " inner", "x"]]
        );

        // A quote after leading blanks is literal
        assert_eq!(
            lenient("a, \"b, c\"\n"),
            vec![vec!["a", "\"b", "c\""]]
        );

        let mut core = CoreReader::new(true, false, false, false);
        read_all(b"a, \"b\"", 1024, &mut core).unwrap();
        assert_eq!(core.take_repaired(), Some(Malformed::UnexpectedQuote));

        let mut core = CoreReader::new(true, true, false, false);
        assert_eq!(
            read_all(b"a, \"b\"", 3, &mut core),
            Err((Malformed::UnexpectedQuote, 3))
        );

        let mut core = CoreReader::new(false, false, false, false);
        let rows = read_all(b" a , \"b\"", 2, &mut core).unwrap();
        assert_eq!(rows, vec![Row::from([" a ", " \"b\""])]);
    }

    #[test]
    fn test_blanks_before_quotes() {
        for chunk in [1024usize, 4, 3, 2, 1] {
            let mut core = CoreReader::new(true, false, false, true);
            let rows = read_all(b"a, \"b, c\"\n\t\" inner\" ,x", chunk, &mut core).unwrap();

            assert_eq!(
                rows,
                vec![Row::from(["a", "b, c"]), Row::from([" inner", "x"])]
            );
            assert_eq!(core.take_repaired(), None);
        }

        // Without trimming, blanks always start an unquoted field
        let mut core = CoreReader::new(false, false, false, true);
        let rows = read_all(b"a, \"b\"", 2, &mut core).unwrap();
        assert_eq!(rows, vec![Row::from(["a", " \"b\""])]);
    }

    #[test]
    fn test_skip_pending_lf() {
        let mut core = CoreReader::new(true, false, false, false);

        assert_eq!(core.skip_pending_lf(b"\nx"), 0);

        core.pending_lf = true;
        assert_eq!(core.skip_pending_lf(b""), 0);
        assert!(core.pending_lf);
        assert_eq!(core.skip_pending_lf(b"\nx"), 1);
        assert!(!core.pending_lf);

        core.pending_lf = true;
        assert_eq!(core.skip_pending_lf(b"x"), 0);
        assert!(!core.pending_lf);
    }

    #[test]
    fn test_lenient_repairs() {
        // Unterminated quoted field is closed by the end of input
        assert_eq!(lenient("a,\"open\nfield"), vec![vec!["a", "open\nfield"]]);

        // Stray quote in an unquoted field is literal
        assert_eq!(lenient("joh\"n,landis\nb,c"), vec![vec!["joh\"n", "landis"], vec!["b", "c"]]);

        // Characters after a closing quote are kept
        assert_eq!(lenient("\"a\"b,c"), vec![vec!["ab", "c"]]);

        let mut core = CoreReader::new(true, false, false, false);
        read_all(b"x\"y", 1024, &mut core).unwrap();
        assert_eq!(core.take_repaired(), Some(Malformed::UnexpectedQuote));
        assert_eq!(core.take_repaired(), None);
    }

    #[test]
    fn test_strict() {
        assert_eq!(
            strict("a,b\n\"c\" ,d\n").unwrap(),
            vec![vec!["a", "b"], vec!["c", "d"]]
        );

        assert_eq!(strict("a,b\njo\"hn,d"), Err((Malformed::UnexpectedQuote, 6)));
        assert_eq!(strict("\"a\"b,c"), Err((Malformed::TrailingCharacters, 3)));
        assert_eq!(strict("\"a\"  b,c"), Err((Malformed::TrailingCharacters, 5)));
        assert_eq!(strict("a,\"open"), Err((Malformed::UnterminatedQuote, 7)));
    }

    #[test]
    fn test_skip_empty_lines() {
        let mut core = CoreReader::new(true, false, true, false);
        let rows = read_all(b"\n\nname\n  \n\"\"\r\n\r\njohn\n\n", 2, &mut core).unwrap();

        assert_eq!(
            rows,
            vec![Row::from(["name"]), Row::from([""]), Row::from(["john"])]
        );
    }
}
