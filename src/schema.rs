use std::fmt;
use std::str::FromStr;

use log::trace;

use crate::records::Row;

/// Validates a raw [`Row`] and turns it into a typed value.
///
/// On failure, a schema returns human-readable messages explaining why the
/// row was rejected, in the order it found the problems.
///
/// Any closure `Fn(&Row) -> Result<T, Vec<String>>` is a schema:
///
/// ```ignore
/// let schema = |row: &Row| match row.get(1).map(str::parse::<u32>) {
///     Some(Ok(age)) => Ok((row[0].to_string(), age)),
///     _ => Err(vec!["expected an age".to_string()]),
/// };
/// ```
pub trait Schema {
    type Output;

    fn validate(&self, row: &Row) -> Result<Self::Output, Vec<String>>;
}

impl<F, T> Schema for F
where
    F: Fn(&Row) -> Result<T, Vec<String>>,
{
    type Output = T;

    #[inline]
    fn validate(&self, row: &Row) -> Result<T, Vec<String>> {
        self(row)
    }
}

/// A row rejected by a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    row: u64,
    messages: Vec<String>,
    raw: Row,
}

impl RowError {
    /// 1-based number of the rejected row.
    pub fn row(&self) -> u64 {
        self.row
    }

    /// Messages given by the schema. Never empty.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// The rejected row, as read.
    pub fn raw(&self) -> &Row {
        &self.raw
    }

    pub fn into_raw(self) -> Row {
        self.raw
    }
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "row {}: {}", self.row, self.messages.join("; "))
    }
}

/// Outcome of validating rows against a [`Schema`].
///
/// Both `rows` & `errors` follow the source order, and every validated row
/// ends up in exactly one of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed<T> {
    pub rows: Vec<T>,
    pub errors: Vec<RowError>,
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl<T> Parsed<T> {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Row numbers of the rejected rows.
    pub fn error_rows(&self) -> Vec<u64> {
        self.errors.iter().map(|error| error.row).collect()
    }
}

const UNKNOWN_FAILURE: &str = "row rejected by schema";

/// Applies `schema` to every row, in order.
///
/// A rejected row never stops the process: it is recorded as a [`RowError`]
/// numbered after its position in `rows`, starting at 1.
pub fn validate<S: Schema>(rows: Vec<Row>, schema: &S) -> Parsed<S::Output> {
    let mut parsed = Parsed {
        rows: Vec::with_capacity(rows.len()),
        errors: Vec::new(),
    };

    for (i, raw) in rows.into_iter().enumerate() {
        match schema.validate(&raw) {
            Ok(value) => parsed.rows.push(value),
            Err(mut messages) => {
                let row = i as u64 + 1;

                if messages.is_empty() {
                    messages.push(UNKNOWN_FAILURE.to_string());
                }

                trace!("row {} rejected: {}", row, messages.join("; "));

                parsed.errors.push(RowError { row, messages, raw });
            }
        }
    }

    parsed
}

/// Helper to write schemas by hand, collecting a message for every field that
/// fails instead of stopping at the first one.
///
/// ```ignore
/// let person = |row: &Row| {
///     let mut fields = Fields::new(row);
///     fields.expect_len(2);
///
///     let name = fields.str(0).map(String::from);
///     let age = fields.parse::<u32>(1);
///
///     fields.finish(|| Person { name: name.unwrap(), age: age.unwrap() })
/// };
/// ```
pub struct Fields<'r> {
    row: &'r Row,
    messages: Vec<String>,
}

impl<'r> Fields<'r> {
    pub fn new(row: &'r Row) -> Self {
        Self {
            row,
            messages: Vec::new(),
        }
    }

    /// Record a failure if the row does not have exactly `len` fields.
    pub fn expect_len(&mut self, len: usize) -> &mut Self {
        if self.row.len() != len {
            self.messages.push(format!(
                "expected {} fields, found {}",
                len,
                self.row.len()
            ));
        }

        self
    }

    /// Returns the nth field, recording a failure if it is missing.
    ///
    /// Missing fields are only reported once [`Self::expect_len`] did not
    /// report anything, so the same problem is not described twice.
    pub fn str(&mut self, index: usize) -> Option<&'r str> {
        let field = self.row.get(index);

        if field.is_none() && self.messages.is_empty() {
            self.messages.push(format!("missing field {}", index + 1));
        }

        field
    }

    /// Parses the nth field, recording a failure if it is missing or if
    /// parsing fails.
    pub fn parse<T>(&mut self, index: usize) -> Option<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let field = self.str(index)?;

        match field.parse::<T>() {
            Ok(value) => Some(value),
            Err(err) => {
                self.messages
                    .push(format!("field {} ({:?}): {}", index + 1, field, err));
                None
            }
        }
    }

    /// Records a custom failure.
    pub fn fail<M: Into<String>>(&mut self, message: M) {
        self.messages.push(message.into());
    }

    /// Builds the value with `build` if no failure was recorded.
    ///
    /// `build` is never called when a failure was recorded, so it can
    /// safely unwrap what [`Self::str`] & [`Self::parse`] returned.
    pub fn finish<T, F>(self, build: F) -> Result<T, Vec<String>>
    where
        F: FnOnce() -> T,
    {
        if self.messages.is_empty() {
            Ok(build())
        } else {
            Err(self.messages)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Person {
        name: String,
        age: u32,
    }

    fn person(row: &Row) -> Result<Person, Vec<String>> {
        let mut fields = Fields::new(row);
        fields.expect_len(2);

        let name = fields.str(0);
        let age = fields.parse::<u32>(1);

        fields.finish(|| Person {
            name: name.unwrap().to_string(),
            age: age.unwrap(),
        })
    }

    fn people() -> Vec<Row> {
        vec![
            row!["name", "age"],
            row!["Alice", "23"],
            row!["Bob", "thirty"],
            row!["Charlie", "25"],
            row!["Nim", "22"],
        ]
    }

    #[test]
    fn test_validate() {
        let parsed = validate(people(), &person);

        assert_eq!(
            parsed.rows,
            vec![
                Person {
                    name: "Alice".to_string(),
                    age: 23
                },
                Person {
                    name: "Charlie".to_string(),
                    age: 25
                },
                Person {
                    name: "Nim".to_string(),
                    age: 22
                },
            ]
        );

        assert_eq!(parsed.error_rows(), vec![1, 3]);
        assert!(!parsed.is_valid());

        let bob = &parsed.errors[1];
        assert_eq!(bob.raw(), &row!["Bob", "thirty"]);
        assert_eq!(
            bob.messages(),
            &["field 2 (\"thirty\"): invalid digit found in string".to_string()]
        );
        assert_eq!(
            bob.to_string(),
            "row 3: field 2 (\"thirty\"): invalid digit found in string"
        );
    }

    #[test]
    fn test_field_count_mismatch() {
        let parsed = validate(vec![row!["Alice"], row!["Bob", "x", "extra"]], &person);

        assert!(parsed.rows.is_empty());
        assert_eq!(
            parsed.errors[0].messages(),
            &["expected 2 fields, found 1".to_string()]
        );
        assert_eq!(
            parsed.errors[1].messages(),
            &[
                "expected 2 fields, found 3".to_string(),
                "field 2 (\"x\"): invalid digit found in string".to_string()
            ]
        );
    }

    #[test]
    fn test_custom_failure() {
        let range = |row: &Row| -> Result<(u32, u32), Vec<String>> {
            let mut fields = Fields::new(row);
            fields.expect_len(2);

            let low = fields.parse::<u32>(0);
            let high = fields.parse::<u32>(1);

            if let (Some(l), Some(h)) = (low, high) {
                if l > h {
                    fields.fail(format!("{} is greater than {}", l, h));
                }
            }

            fields.finish(|| (low.unwrap(), high.unwrap()))
        };

        let parsed = validate(vec![row!["1", "5"], row!["7", "2"], row!["x", "3"]], &range);

        assert_eq!(parsed.rows, vec![(1, 5)]);
        assert_eq!(parsed.error_rows(), vec![2, 3]);
        assert_eq!(
            parsed.errors[0].messages(),
            &["7 is greater than 2".to_string()]
        );
        assert_eq!(parsed.errors[1].messages().len(), 1);
    }

    #[test]
    fn test_empty_messages() {
        let reject = |_: &Row| -> Result<(), Vec<String>> { Err(vec![]) };
        let parsed = validate(vec![row!["a"]], &reject);

        assert_eq!(parsed.errors[0].messages(), &[UNKNOWN_FAILURE.to_string()]);
    }

    #[test]
    fn test_closure_schema() {
        let lengths = |row: &Row| -> Result<usize, Vec<String>> {
            if row.is_empty() {
                Err(vec!["empty".to_string()])
            } else {
                Ok(row.iter().map(str::len).sum())
            }
        };

        let parsed = validate(vec![row!["ab", "c"], Row::new(), row![""]], &lengths);

        assert_eq!(parsed.rows, vec![3, 0]);
        assert_eq!(parsed.error_rows(), vec![2]);
        assert_eq!(parsed.errors[0].raw(), &Row::new());
    }
}
