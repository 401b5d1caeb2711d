use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Index;

use crate::utils::{trimmed_end, trimmed_range};

/// An owned, unescaped representation of a CSV row.
///
/// Fields are stored in a single string buffer and delimited by ranges over
/// it, so a [`Row`] can be reused across reads without reallocating (see
/// [`Reader::read_row`](crate::Reader::read_row)).
#[derive(Default, Clone, Eq)]
pub struct Row {
    pub(crate) data: String,
    pub(crate) bounds: Vec<(usize, usize)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fields of the row.
    #[inline]
    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn clear(&mut self) {
        self.data.clear();
        self.bounds.clear();
    }

    #[inline]
    pub fn iter(&self) -> RowIter<'_> {
        RowIter {
            row: self,
            current_forward: 0,
            current_backward: self.len(),
        }
    }

    #[inline]
    pub fn push_field(&mut self, field: &str) {
        let start = self.data.len();
        self.data.push_str(field);
        self.bounds.push((start, self.data.len()));
    }

    /// Returns the nth field of the row, if it is not out-of-bounds.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.bounds
            .get(index)
            .copied()
            .map(|(start, end)| &self.data[start..end])
    }

    /// Copies the fields into a vector of owned strings.
    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(String::from).collect()
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        if self.bounds.len() != other.bounds.len() {
            return false;
        }

        self.iter()
            .zip(other.iter())
            .all(|(self_field, other_field)| self_field == other_field)
    }
}

impl<S: AsRef<str>> PartialEq<[S]> for Row {
    fn eq(&self, other: &[S]) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|(field, other_field)| field == other_field.as_ref())
    }
}

impl<S: AsRef<str>> PartialEq<Vec<S>> for Row {
    fn eq(&self, other: &Vec<S>) -> bool {
        self == other.as_slice()
    }
}

impl Hash for Row {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());

        for field in self.iter() {
            field.hash(state);
        }
    }
}

impl Index<usize> for Row {
    type Output = str;

    #[inline]
    fn index(&self, i: usize) -> &str {
        let (start, end) = self.bounds[i];
        &self.data[start..end]
    }
}

impl<T: AsRef<str>> Extend<T> for Row {
    #[inline]
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for x in iter {
            self.push_field(x.as_ref());
        }
    }
}

impl<T: AsRef<str>> FromIterator<T> for Row {
    #[inline]
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut row = Self::new();
        row.extend(iter);
        row
    }
}

impl<I, T> From<I> for Row
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    fn from(value: I) -> Self {
        value.into_iter().collect()
    }
}

impl<'r> IntoIterator for &'r Row {
    type IntoIter = RowIter<'r>;
    type Item = &'r str;

    #[inline]
    fn into_iter(self) -> RowIter<'r> {
        self.iter()
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Row(")?;
        f.debug_list().entries(self.iter()).finish()?;
        write!(f, ")")?;
        Ok(())
    }
}

pub struct RowIter<'a> {
    row: &'a Row,
    current_forward: usize,
    current_backward: usize,
}

impl ExactSizeIterator for RowIter<'_> {}

impl<'a> Iterator for RowIter<'a> {
    type Item = &'a str;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.current_forward == self.current_backward {
            None
        } else {
            let (start, end) = self.row.bounds[self.current_forward];

            self.current_forward += 1;

            Some(&self.row.data[start..end])
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let size = self.current_backward - self.current_forward;

        (size, Some(size))
    }

    #[inline]
    fn count(self) -> usize
    where
        Self: Sized,
    {
        self.len()
    }
}

impl DoubleEndedIterator for RowIter<'_> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.current_forward == self.current_backward {
            None
        } else {
            self.current_backward -= 1;

            let (start, end) = self.row.bounds[self.current_backward];

            Some(&self.row.data[start..end])
        }
    }
}

/// Accumulates the raw bytes of a row being tokenized.
///
/// Trimmed whitespace stays in the underlying buffer: only the field bounds
/// skip it.
pub(crate) struct RowBuilder<'r> {
    data: &'r mut Vec<u8>,
    bounds: &'r mut Vec<(usize, usize)>,
    trim: bool,
    start: usize,
    // Set while the current field was opened with a quote.
    quoted: bool,
    // Where the quoted content of the current field ends, once closed.
    quoted_end: Option<usize>,
    // Whether any field of the row was quoted.
    had_quotes: bool,
}

impl<'r> RowBuilder<'r> {
    #[inline]
    pub(crate) fn wrap(
        data: &'r mut Vec<u8>,
        bounds: &'r mut Vec<(usize, usize)>,
        trim: bool,
    ) -> Self {
        data.clear();
        bounds.clear();

        Self {
            data,
            bounds,
            trim,
            start: 0,
            quoted: false,
            quoted_end: None,
            had_quotes: false,
        }
    }

    #[inline(always)]
    pub(crate) fn extend_from_slice(&mut self, slice: &[u8]) {
        self.data.extend_from_slice(slice);
    }

    #[inline(always)]
    pub(crate) fn push_byte(&mut self, byte: u8) {
        self.data.push(byte);
    }

    #[inline]
    pub(crate) fn open_quote(&mut self) {
        self.quoted = true;
        self.had_quotes = true;
    }

    #[inline]
    pub(crate) fn close_quote(&mut self) {
        if self.quoted && self.quoted_end.is_none() {
            self.quoted_end = Some(self.data.len());
        }
    }

    pub(crate) fn finalize_field(&mut self) {
        let start = self.start;
        let end = self.data.len();

        let bounds = if !self.trim {
            (start, end)
        } else if self.quoted {
            let protected = self.quoted_end.unwrap_or(end);
            (start, protected + trimmed_end(&self.data[protected..end]))
        } else {
            let (s, e) = trimmed_range(&self.data[start..end]);
            (start + s, start + e)
        };

        self.bounds.push(bounds);

        self.start = end;
        self.quoted = false;
        self.quoted_end = None;
    }

    /// Whether the finalized row is what an empty physical line produces,
    /// i.e. a single empty unquoted field.
    #[inline]
    pub(crate) fn is_empty_line(&self) -> bool {
        !self.had_quotes && self.bounds.len() == 1 && self.bounds[0].0 == self.bounds[0].1
    }

    #[inline]
    pub(crate) fn clear(&mut self) {
        self.data.clear();
        self.bounds.clear();
        self.start = 0;
        self.quoted = false;
        self.quoted_end = None;
        self.had_quotes = false;
    }
}
