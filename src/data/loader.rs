use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use arrow::array::{Array, AsArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use log::debug;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Row, Table};
use crate::error::{BridgeError, Result};

// ---------------------------------------------------------------------------
// Loader capability
// ---------------------------------------------------------------------------

/// Turns the resource bound at construction into a [`Table`].
///
/// `load` only reads the resource: it is repeatable and never touches the
/// registry that produced the loader.
pub trait Loader: fmt::Debug + Send {
    /// The resource this loader reads.
    fn filename(&self) -> &Path;

    /// Short human-readable format name, e.g. `"delimited text"`.
    fn format_name(&self) -> &'static str;

    fn load(&self) -> Result<Table>;
}

/// A loader that announces the extension tokens it serves, so it can be
/// registered with [`FormatRegistry::register_format`].
///
/// [`FormatRegistry::register_format`]: super::registry::FormatRegistry::register_format
pub trait LoaderFormat: Loader + Sized + 'static {
    /// Extension tokens, leading dot included (`".csv"`).
    const EXTENSIONS: &'static [&'static str];

    fn open(path: PathBuf) -> Self;
}

/// Open a resource for reading. The handle is released when it goes out of
/// scope, on success and on every error path.
fn open_resource(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| BridgeError::from_io(path, e))
}

fn decode_error(path: &Path, message: impl Into<String>) -> BridgeError {
    BridgeError::Decode {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Delimited text (.csv / .tsv)
// ---------------------------------------------------------------------------

/// One row per input line, fields split on a single delimiter byte.
///
/// Quotes are not interpreted; a field is exactly the bytes between two
/// delimiters. Blank lines produce no row.
#[derive(Debug, Clone)]
pub struct DelimitedLoader {
    path: PathBuf,
    delimiter: u8,
}

impl DelimitedLoader {
    pub const DEFAULT_DELIMITER: u8 = b',';

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: Self::DEFAULT_DELIMITER,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }
}

impl Loader for DelimitedLoader {
    fn filename(&self) -> &Path {
        &self.path
    }

    fn format_name(&self) -> &'static str {
        "delimited text"
    }

    fn load(&self) -> Result<Table> {
        let file = open_resource(&self.path)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .delimiter(self.delimiter)
            .from_reader(file);

        let mut table = Table::new();
        for result in reader.records() {
            let record = result.map_err(|e| csv_read_error(&self.path, e))?;
            table.push_row(record.iter().map(str::to_string).collect());
        }

        debug!(
            "loaded {} rows from {} (delimiter {:?})",
            table.len(),
            self.path.display(),
            self.delimiter as char
        );
        Ok(table)
    }
}

impl LoaderFormat for DelimitedLoader {
    const EXTENSIONS: &'static [&'static str] = &[".csv"];

    fn open(path: PathBuf) -> Self {
        Self::new(path)
    }
}

fn csv_read_error(path: &Path, err: csv::Error) -> BridgeError {
    match err.into_kind() {
        csv::ErrorKind::Io(source) => BridgeError::from_io(path, source),
        csv::ErrorKind::Utf8 { pos, err } => {
            let line = pos.map(|p| p.line()).unwrap_or_default();
            decode_error(path, format!("line {line}: {err}"))
        }
        other => decode_error(path, format!("{other:?}")),
    }
}

/// Write `table` as delimited text, one line per row, without quoting.
pub fn write_delimited(path: &Path, table: &Table, delimiter: u8) -> Result<()> {
    let to_error = |err: csv::Error| match err.into_kind() {
        csv::ErrorKind::Io(source) => BridgeError::from_io(path, source),
        other => BridgeError::Serialization {
            message: format!("{other:?}"),
        },
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quote_style(csv::QuoteStyle::Never)
        .delimiter(delimiter)
        .from_path(path)
        .map_err(to_error)?;

    for row in table.rows() {
        writer.write_record(row).map_err(to_error)?;
    }
    writer.flush().map_err(|e| BridgeError::from_io(path, e))
}

// ---------------------------------------------------------------------------
// Plain text (.txt)
// ---------------------------------------------------------------------------

/// Single-column table: one row per line, the whole line as its only field.
#[derive(Debug, Clone)]
pub struct PlainTextLoader {
    path: PathBuf,
}

impl PlainTextLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Loader for PlainTextLoader {
    fn filename(&self) -> &Path {
        &self.path
    }

    fn format_name(&self) -> &'static str {
        "plain text"
    }

    fn load(&self) -> Result<Table> {
        let bytes = std::fs::read(&self.path).map_err(|e| BridgeError::from_io(&self.path, e))?;
        let text = String::from_utf8(bytes).map_err(|e| {
            decode_error(
                &self.path,
                format!("invalid UTF-8 at byte {}", e.utf8_error().valid_up_to()),
            )
        })?;

        let table: Table = text.lines().map(|line| [line]).collect();
        debug!("loaded {} lines from {}", table.len(), self.path.display());
        Ok(table)
    }
}

impl LoaderFormat for PlainTextLoader {
    const EXTENSIONS: &'static [&'static str] = &[".txt"];

    fn open(path: PathBuf) -> Self {
        Self::new(path)
    }
}

// ---------------------------------------------------------------------------
// Binary-serialized table (.pckl / .pkl)
// ---------------------------------------------------------------------------

/// Header written in front of every binary table.
pub const BINARY_MAGIC: [u8; 4] = *b"RBT1";

/// Upper bound on what a single payload may claim while decoding, so a
/// corrupt length prefix fails instead of allocating.
const MAX_DECODE_BYTES: usize = 1 << 30;

fn binary_config() -> impl bincode::config::Config {
    bincode::config::standard().with_limit::<MAX_DECODE_BYTES>()
}

/// Serialize a table: [`BINARY_MAGIC`] followed by the bincode body.
pub fn encode_table(table: &Table) -> Result<Vec<u8>> {
    let body = bincode::encode_to_vec(table, binary_config()).map_err(|e| {
        BridgeError::Serialization {
            message: e.to_string(),
        }
    })?;

    let mut out = Vec::with_capacity(BINARY_MAGIC.len() + body.len());
    out.extend_from_slice(&BINARY_MAGIC);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Inverse of [`encode_table`]. Rejects a wrong header, a truncated body and
/// trailing bytes.
pub fn decode_table(bytes: &[u8]) -> Result<Table> {
    let body = bytes
        .strip_prefix(&BINARY_MAGIC[..])
        .ok_or_else(|| BridgeError::Deserialization {
            message: "missing table header".to_string(),
        })?;

    let (table, read): (Table, usize) = bincode::decode_from_slice(body, binary_config())
        .map_err(|e| BridgeError::Deserialization {
            message: e.to_string(),
        })?;

    if read != body.len() {
        return Err(BridgeError::Deserialization {
            message: format!("{} trailing bytes after table", body.len() - read),
        });
    }
    Ok(table)
}

/// Store `table` at `path` in the format [`BinaryLoader`] reads.
pub fn write_binary(path: &Path, table: &Table) -> Result<()> {
    let bytes = encode_table(table)?;
    let file = File::create(path).map_err(|e| BridgeError::from_io(path, e))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(&bytes)
        .and_then(|()| writer.flush())
        .map_err(|e| BridgeError::from_io(path, e))
}

/// Reads a table previously stored with [`write_binary`].
#[derive(Debug, Clone)]
pub struct BinaryLoader {
    path: PathBuf,
}

impl BinaryLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Loader for BinaryLoader {
    fn filename(&self) -> &Path {
        &self.path
    }

    fn format_name(&self) -> &'static str {
        "binary table"
    }

    fn load(&self) -> Result<Table> {
        let bytes = std::fs::read(&self.path).map_err(|e| BridgeError::from_io(&self.path, e))?;
        let table = decode_table(&bytes)?;
        debug!("decoded {} rows from {}", table.len(), self.path.display());
        Ok(table)
    }
}

impl LoaderFormat for BinaryLoader {
    const EXTENSIONS: &'static [&'static str] = &[".pckl", ".pkl"];

    fn open(path: PathBuf) -> Self {
        Self::new(path)
    }
}

// ---------------------------------------------------------------------------
// JSON (.json)
// ---------------------------------------------------------------------------

/// Expected layout: an array of rows, each an array of scalars.
///
/// ```json
/// [
///   ["Chisme", "algo"],
///   ["cOsA", 42, true, null]
/// ]
/// ```
///
/// Numbers and booleans are rendered as text, `null` as the empty string.
#[derive(Debug, Clone)]
pub struct JsonLoader {
    path: PathBuf,
}

impl JsonLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Loader for JsonLoader {
    fn filename(&self) -> &Path {
        &self.path
    }

    fn format_name(&self) -> &'static str {
        "JSON"
    }

    fn load(&self) -> Result<Table> {
        let file = open_resource(&self.path)?;
        let root: JsonValue = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| decode_error(&self.path, format!("parsing JSON: {e}")))?;

        let records = root
            .as_array()
            .ok_or_else(|| decode_error(&self.path, "expected top-level JSON array"))?;

        let mut table = Table::new();
        for (i, rec) in records.iter().enumerate() {
            let fields = rec
                .as_array()
                .ok_or_else(|| decode_error(&self.path, format!("row {i} is not a JSON array")))?;

            let row = fields
                .iter()
                .enumerate()
                .map(|(j, val)| {
                    json_to_field(val).ok_or_else(|| {
                        decode_error(&self.path, format!("row {i}, field {j}: not a scalar"))
                    })
                })
                .collect::<Result<Row>>()?;
            table.push_row(row);
        }

        debug!("loaded {} rows from {}", table.len(), self.path.display());
        Ok(table)
    }
}

impl LoaderFormat for JsonLoader {
    const EXTENSIONS: &'static [&'static str] = &[".json"];

    fn open(path: PathBuf) -> Self {
        Self::new(path)
    }
}

fn json_to_field(val: &JsonValue) -> Option<String> {
    match val {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        JsonValue::Null => Some(String::new()),
        JsonValue::Array(_) | JsonValue::Object(_) => None,
    }
}

// ---------------------------------------------------------------------------
// Parquet (.parquet / .pq)
// ---------------------------------------------------------------------------

/// Every column is cast to UTF-8 text; rows are emitted in file order and
/// nulls become empty fields.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
#[derive(Debug, Clone)]
pub struct ParquetLoader {
    path: PathBuf,
}

impl ParquetLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Loader for ParquetLoader {
    fn filename(&self) -> &Path {
        &self.path
    }

    fn format_name(&self) -> &'static str {
        "Parquet"
    }

    fn load(&self) -> Result<Table> {
        let file = open_resource(&self.path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)
            .map_err(|e| decode_error(&self.path, format!("reading parquet metadata: {e}")))?;
        let reader = builder
            .build()
            .map_err(|e| decode_error(&self.path, format!("building parquet reader: {e}")))?;

        let mut table = Table::new();

        for batch_result in reader {
            let batch = batch_result
                .map_err(|e| decode_error(&self.path, format!("reading record batch: {e}")))?;
            let schema = batch.schema();

            let columns = batch
                .columns()
                .iter()
                .zip(schema.fields())
                .map(|(col, field)| {
                    cast(col, &DataType::Utf8).map_err(|e| {
                        decode_error(
                            &self.path,
                            format!("column '{}' cannot be read as text: {e}", field.name()),
                        )
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let text_columns: Vec<_> = columns.iter().map(|col| col.as_string::<i32>()).collect();

            for row in 0..batch.num_rows() {
                table.push_row(
                    text_columns
                        .iter()
                        .map(|col| {
                            if col.is_null(row) {
                                String::new()
                            } else {
                                col.value(row).to_string()
                            }
                        })
                        .collect(),
                );
            }
        }

        debug!("loaded {} rows from {}", table.len(), self.path.display());
        Ok(table)
    }
}

impl LoaderFormat for ParquetLoader {
    const EXTENSIONS: &'static [&'static str] = &[".parquet", ".pq"];

    fn open(path: PathBuf) -> Self {
        Self::new(path)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{Int64Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;
    use proptest::prelude::*;
    use tempfile::TempDir;

    use super::*;

    fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn table(rows: &[&[&str]]) -> Table {
        rows.iter().map(|r| r.iter().copied()).collect()
    }

    #[test]
    fn delimited_splits_lines_and_fields() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "data.csv", b"Foo,Bar\nbaz,,qux\n");

        let loaded = DelimitedLoader::new(&path).load().unwrap();
        assert_eq!(loaded, table(&[&["Foo", "Bar"], &["baz", "", "qux"]]));
    }

    #[test]
    fn delimited_keeps_quotes_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "quoted.csv", b"\"a\",b\r\n");

        let loaded = DelimitedLoader::new(&path).load().unwrap();
        assert_eq!(loaded, table(&[&["\"a\"", "b"]]));
    }

    #[test]
    fn delimited_honours_custom_delimiter() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "data.tsv", b"a\tb,c\n");

        let loaded = DelimitedLoader::new(&path).with_delimiter(b'\t').load().unwrap();
        assert_eq!(loaded, table(&[&["a", "b,c"]]));
    }

    #[test]
    fn delimited_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = DelimitedLoader::new(dir.path().join("absent.csv"))
            .load()
            .unwrap_err();
        assert!(matches!(err, BridgeError::ResourceNotFound { .. }));
    }

    #[test]
    fn delimited_invalid_utf8_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "bad.csv", b"ok,\xff\xfe\n");

        let err = DelimitedLoader::new(&path).load().unwrap_err();
        assert!(matches!(err, BridgeError::Decode { .. }), "{err}");
    }

    #[test]
    fn delimited_write_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let original = table(&[&["x", "y"], &["1"]]);

        write_delimited(&path, &original, b',').unwrap();
        assert_eq!(DelimitedLoader::new(&path).load().unwrap(), original);
    }

    #[test]
    fn plain_text_is_single_column() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "notes.txt", b"first, line\nsecond\n");

        let loaded = PlainTextLoader::new(&path).load().unwrap();
        assert_eq!(loaded, table(&[&["first, line"], &["second"]]));
    }

    #[test]
    fn plain_text_empty_file_has_no_rows() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "empty.txt", b"");
        assert!(PlainTextLoader::new(&path).load().unwrap().is_empty());
    }

    #[test]
    fn plain_text_invalid_utf8_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "bad.txt", b"abc\xc3\x28");

        let err = PlainTextLoader::new(&path).load().unwrap_err();
        assert!(matches!(err, BridgeError::Decode { .. }));
    }

    #[test]
    fn binary_loader_reads_written_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table.pckl");
        let original = table(&[&["Chisme", "algo"], &["cOsA", "TRASTO"]]);

        write_binary(&path, &original).unwrap();
        assert_eq!(BinaryLoader::new(&path).load().unwrap(), original);
    }

    #[test]
    fn binary_rejects_foreign_payload() {
        let err = decode_table(b"\x80\x04\x95pickle").unwrap_err();
        assert!(matches!(err, BridgeError::Deserialization { .. }));
    }

    #[test]
    fn binary_rejects_truncated_and_padded_payloads() {
        let bytes = encode_table(&table(&[&["abc", "def"]])).unwrap();

        let truncated = decode_table(&bytes[..bytes.len() - 2]).unwrap_err();
        assert!(matches!(truncated, BridgeError::Deserialization { .. }));

        let mut padded = bytes.clone();
        padded.push(0);
        let padded = decode_table(&padded).unwrap_err();
        assert!(matches!(padded, BridgeError::Deserialization { .. }));
    }

    #[test]
    fn json_renders_scalars_as_text() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "data.json", br#"[["a", 1, true, null], []]"#);

        let loaded = JsonLoader::new(&path).load().unwrap();
        assert_eq!(loaded, table(&[&["a", "1", "true", ""], &[]]));
    }

    #[test]
    fn json_rejects_nested_values_and_objects() {
        let dir = TempDir::new().unwrap();
        let nested = write_file(&dir, "nested.json", br#"[["a", ["b"]]]"#);
        let object = write_file(&dir, "object.json", br#"{"rows": []}"#);

        for path in [nested, object] {
            let err = JsonLoader::new(&path).load().unwrap_err();
            assert!(matches!(err, BridgeError::Decode { .. }), "{err}");
        }
    }

    #[test]
    fn parquet_columns_are_read_as_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.parquet");

        let schema = Arc::new(Schema::new(vec![
            Field::new("name", DataType::Utf8, true),
            Field::new("count", DataType::Int64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec![Some("Foo"), None])),
                Arc::new(Int64Array::from(vec![7, 8])),
            ],
        )
        .unwrap();
        let file = File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let loaded = ParquetLoader::new(&path).load().unwrap();
        assert_eq!(loaded, table(&[&["Foo", "7"], &["", "8"]]));
    }

    #[test]
    fn parquet_garbage_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "junk.parquet", b"not a parquet file");

        let err = ParquetLoader::new(&path).load().unwrap_err();
        assert!(matches!(err, BridgeError::Decode { .. }));
    }

    proptest! {
        #[test]
        fn binary_round_trip(rows in prop::collection::vec(
            prop::collection::vec(".*", 0..6),
            0..12,
        )) {
            let original = Table::from_rows(rows);
            let bytes = encode_table(&original).unwrap();
            prop_assert_eq!(decode_table(&bytes).unwrap(), original);
        }
    }
}
