/*!
The `tidy-csv` crate reads comma-separated data into rows of string fields and,
optionally, validates every row against a schema of your own, collecting the
rows that fail instead of stopping at the first one.

It has been designed to replace naive `line.split(",")` parsing without
surprising its users: on data that contains no quotes at all, it returns
exactly what splitting every line on commas and trimming every piece would.
On top of this, it correctly handles quoted fields, i.e. fields containing
commas, line breaks or doubled quotes.

# Examples

*Reading raw rows*

```
use std::fs::File;
use tidy_csv::parse_raw;

let rows = parse_raw(File::open("people.csv")?)?;

for row in rows.iter() {
    dbg!(row.get(0));
}
```

*Validating rows against a schema*

```
use tidy_csv::{parse_path_with_schema, Fields, Row};

struct Person {
    name: String,
    age: u32,
}

let schema = |row: &Row| {
    let mut fields = Fields::new(row);
    fields.expect_len(2);

    let name = fields.str(0);
    let age = fields.parse::<u32>(1);

    fields.finish(|| Person { name: name.unwrap().to_string(), age: age.unwrap() })
};

let parsed = parse_path_with_schema("people.csv", &schema)?;

for error in parsed.errors.iter() {
    eprintln!("{}", error);
}
```

*Using a builder to configure your reader*

```
use std::fs::File;
use tidy_csv::{ReaderBuilder, Row};

let mut reader = ReaderBuilder::new()
    .strict(true)
    .skip_empty_lines(true)
    .from_reader(File::open("people.csv")?);

let mut row = Row::new();

while reader.read_row(&mut row)? {
    dbg!(&row);
}
```

# Format

- Fields are separated by commas. Rows are separated by LF, CRLF or a lone
  CR, which can be mixed in a single file.
- A field starting with a double quote is quoted: commas & line breaks are
  literal inside of it, and a doubled double quote stands for a single one.
  A quote preceded by blanks does not open a quoted field, unless
  [`ReaderBuilder::blanks_before_quotes`] is used.
- Unquoted fields are trimmed of leading & trailing whitespace. The content of
  quoted fields is kept as is.
- Consecutive or trailing commas produce empty fields: a row always has as
  many fields as it has commas, plus one.
- An empty line produces a row with a single empty field, unless
  [`ReaderBuilder::skip_empty_lines`] is used. A final line break does not
  produce any additional row.
- A UTF-8 BOM at the very beginning of the data is ignored. Data must be
  valid UTF-8.

# Malformed quoting

By default, the reader is lenient and never fails because of quotes:

- a quote in the middle of an unquoted field is kept as a literal character,
  e.g. `joh"n` is read as `joh"n` and `a, "b"` as `a` then `"b"`.
- characters following the closing quote of a field are appended to it, e.g.
  `"john"ny` is read as `johnny`.
- a quoted field still open when the data ends is closed implicitly.

Every repair is reported through the [`log`](https://docs.rs/log) facade as a
warning. Use [`ReaderBuilder::strict`] to get an error instead.

# Schemas

A [`Schema`] turns a [`Row`] into a value of your own type, or rejects it with
a list of messages. Any `Fn(&Row) -> Result<T, Vec<String>>` closure is a
schema, and the [`Fields`] helper makes writing one by hand easier.

Validation never fails as a whole: [`parse_with_schema`] returns a [`Parsed`]
holding both the accepted values and a [`RowError`] for every rejected row,
with its 1-based number. There is no notion of header: if the data has one,
it is validated like every other row (and will probably be rejected, which
can be expected).
*/
#[allow(unused_macros)]
macro_rules! row {
    () => {{
        $crate::records::Row::new()
    }};

    ($($x: expr),*) => {{
        let mut r = $crate::records::Row::new();

        $(
            r.push_field($x);
        )*

        r
    }};
}

mod core;
mod error;
mod reader;
mod records;
mod schema;
mod utils;
mod writer;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::debug;

pub use error::{Error, ErrorKind, Position, Result};
pub use reader::{Reader, ReaderBuilder, RowsIntoIter, RowsIter};
pub use records::{Row, RowIter};
pub use schema::{validate, Fields, Parsed, RowError, Schema};
pub use writer::{Writer, WriterBuilder};

/// Read every row of `source` with the default configuration.
pub fn parse_raw<R: Read>(source: R) -> Result<Vec<Row>> {
    let rows = Reader::from_reader(source).collect_rows()?;

    debug!("read {} rows", rows.len());

    Ok(rows)
}

/// Read every row of `source` with the default configuration, then validate
/// them against `schema`.
///
/// Only a failure to read `source` is an error: rejected rows are reported in
/// [`Parsed::errors`].
pub fn parse_with_schema<R, S>(source: R, schema: &S) -> Result<Parsed<S::Output>>
where
    R: Read,
    S: Schema,
{
    let rows = parse_raw(source)?;
    let parsed = validate(rows, schema);

    debug!(
        "validated rows: {} accepted, {} rejected",
        parsed.rows.len(),
        parsed.errors.len()
    );

    Ok(parsed)
}

/// Same as [`parse_raw`], reading the file at `path`.
pub fn parse_raw_path<P: AsRef<Path>>(path: P) -> Result<Vec<Row>> {
    let path = path.as_ref();

    debug!("reading {}", path.display());

    parse_raw(File::open(path)?)
}

/// Same as [`parse_with_schema`], reading the file at `path`.
pub fn parse_path_with_schema<P, S>(path: P, schema: &S) -> Result<Parsed<S::Output>>
where
    P: AsRef<Path>,
    S: Schema,
{
    let path = path.as_ref();

    debug!("reading {}", path.display());

    parse_with_schema(File::open(path)?, schema)
}
