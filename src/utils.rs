pub(crate) const DELIMITER: u8 = b',';
pub(crate) const QUOTE: u8 = b'"';

#[inline]
pub fn trim_bom(slice: &[u8]) -> usize {
    if slice.len() >= 3 && &slice[..3] == b"\xef\xbb\xbf" {
        3
    } else {
        0
    }
}

/// Blanks skipped before a field's opening quote or tolerated after its
/// closing quote.
#[inline(always)]
pub fn is_blank(byte: u8) -> bool {
    byte == b' ' || byte == b'\t'
}

#[inline(always)]
fn is_plain(byte: Option<&u8>) -> bool {
    byte.map_or(true, |b| b.is_ascii_graphic())
}

/// Returns the `(start, end)` range of `field` once leading & trailing
/// whitespace is removed.
///
/// Whitespace is understood the same way as [`str::trim`]. Invalid UTF-8 only
/// gets ASCII whitespace trimmed: decoding will fail later anyway.
pub fn trimmed_range(field: &[u8]) -> (usize, usize) {
    if is_plain(field.first()) && is_plain(field.last()) {
        return (0, field.len());
    }

    match std::str::from_utf8(field) {
        Ok(string) => {
            let start = string.len() - string.trim_start().len();
            let end = start + string[start..].trim_end().len();

            (start, end)
        }
        Err(_) => {
            let start = field.len() - field.trim_ascii_start().len();
            let end = start + field[start..].trim_ascii_end().len();

            (start, end)
        }
    }
}

/// Returns the length of `field` once trailing whitespace is removed.
pub fn trimmed_end(field: &[u8]) -> usize {
    if is_plain(field.last()) {
        return field.len();
    }

    match std::str::from_utf8(field) {
        Ok(string) => string.trim_end().len(),
        Err(_) => field.trim_ascii_end().len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trimmed_range() {
        assert_eq!(trimmed_range(b""), (0, 0));
        assert_eq!(trimmed_range(b"john"), (0, 4));
        assert_eq!(trimmed_range(b"  john \t"), (2, 6));
        assert_eq!(trimmed_range(b"   "), (3, 3));
        assert_eq!(trimmed_range("\u{a0}béa\u{a0}".as_bytes()), (2, 6));
        assert_eq!(trimmed_range(b" \xff "), (1, 2));
    }

    #[test]
    fn test_trimmed_end() {
        assert_eq!(trimmed_end(b""), 0);
        assert_eq!(trimmed_end(b" x "), 2);
        assert_eq!(trimmed_end(b"x"), 1);
    }

    #[test]
    fn test_trim_bom() {
        assert_eq!(trim_bom(b"\xef\xbb\xbfname"), 3);
        assert_eq!(trim_bom(b"name"), 0);
        assert_eq!(trim_bom(b"\xef"), 0);
    }
}
