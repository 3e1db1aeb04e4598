//! CSV parser with encoding and delimiter auto-detection.
//!
//! Turns delimited text into [`Record`]s keyed by the header row. Fully empty
//! lines are skipped; quoting follows RFC 4180 through the `csv` crate.

use encoding_rs::{Encoding, WINDOWS_1252};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use crate::error::{CsvError, CsvResult};
use crate::models::Record;

/// What to do with a data row whose field count differs from the header's.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowLengthPolicy {
    /// Fail with [`CsvError::RowLength`].
    #[default]
    Strict,
    /// Pad short rows with empty strings and drop extra fields.
    Lenient,
}

/// Parser settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Field delimiter; `None` auto-detects it from the header line.
    pub delimiter: Option<char>,
    pub row_length: RowLengthPolicy,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            delimiter: Some(','),
            row_length: RowLengthPolicy::Strict,
        }
    }
}

impl ParseOptions {
    pub fn with_delimiter(mut self, delimiter: Option<char>) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_row_length(mut self, policy: RowLengthPolicy) -> Self {
        self.row_length = policy;
        self
    }
}

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub records: Vec<Record>,
    pub headers: Vec<String>,
    /// Detected or assumed encoding
    pub encoding: String,
    /// Detected or configured delimiter
    pub delimiter: char,
}

/// Detect the encoding of raw bytes.
///
/// Valid UTF-8 is always reported as `utf-8`. Anything else is one of the
/// Latin encodings: chardet picks between ISO-8859-1 and ISO-8859-15, and every
/// other guess falls back to `windows-1252`.
pub fn detect_encoding(bytes: &[u8]) -> String {
    if std::str::from_utf8(bytes).is_ok() {
        return "utf-8".to_string();
    }

    let charset = chardet::detect(bytes).0.to_lowercase();
    match charset.as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => "iso-8859-1",
        "iso-8859-15" | "latin-9" => "iso-8859-15",
        _ => "windows-1252",
    }
    .to_string()
}

/// Decode bytes to a string using the given encoding label.
///
/// UTF-8 labels require valid UTF-8. Other labels are resolved by
/// `encoding_rs`; unknown ones decode as Windows-1252.
pub fn decode_content(bytes: &[u8], encoding: &str) -> CsvResult<String> {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => return Err(CsvError::Encoding(encoding.to_string())),
        },
        label => Encoding::for_label(label.as_bytes())
            .unwrap_or(WINDOWS_1252)
            .decode(bytes)
            .0
            .into_owned(),
    };

    Ok(decoded.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(decoded))
}

/// Detect the delimiter by counting occurrences in the first non-empty line.
///
/// Falls back to `,` when no candidate occurs.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content
        .lines()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("");

    let mut best_sep = ',';
    let mut best_count = 0;

    for sep in [',', ';', '\t', '|'] {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse a CSV file.
///
/// The file is read fully in one call; failing to open or read it yields
/// [`CsvError::SourceNotFound`].
pub fn parse_file<P: AsRef<Path>>(path: P, options: &ParseOptions) -> CsvResult<ParseResult> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| CsvError::SourceNotFound {
        path: path.to_path_buf(),
        source,
    })?;

    parse_bytes(&bytes, options)
}

/// Parse raw bytes, detecting their encoding first.
pub fn parse_bytes(bytes: &[u8], options: &ParseOptions) -> CsvResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    parse_with_encoding(&content, options, encoding)
}

/// Parse already-decoded text.
pub fn parse_str(content: &str, options: &ParseOptions) -> CsvResult<ParseResult> {
    parse_with_encoding(content, options, "utf-8".to_string())
}

fn parse_with_encoding(
    content: &str,
    options: &ParseOptions,
    encoding: String,
) -> CsvResult<ParseResult> {
    let delimiter = options
        .delimiter
        .unwrap_or_else(|| detect_delimiter(content));
    let delimiter_byte = u8::try_from(delimiter).map_err(|_| CsvError::Parse {
        line: 0,
        message: format!("delimiter '{}' is not a single-byte character", delimiter),
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_byte)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let mut seen = HashSet::new();
    if let Some(dup) = headers.iter().find(|h| !seen.insert(h.as_str())) {
        return Err(CsvError::DuplicateHeader(dup.clone()));
    }

    let shared: Arc<[String]> = headers.clone().into();
    let mut records = Vec::new();

    for row in reader.records() {
        let row = row.map_err(csv_error)?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);

        if row.len() != shared.len() && options.row_length == RowLengthPolicy::Strict {
            return Err(CsvError::RowLength {
                line,
                expected: shared.len(),
                found: row.len(),
            });
        }

        let values: Vec<String> = (0..shared.len())
            .map(|i| row.get(i).unwrap_or("").to_string())
            .collect();

        records.push(Record::new(Arc::clone(&shared), values));
    }

    Ok(ParseResult {
        records,
        headers,
        encoding,
        delimiter,
    })
}

fn csv_error(err: csv::Error) -> CsvError {
    CsvError::Parse {
        line: err.position().map(|p| p.line()).unwrap_or(0),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(csv: &str) -> CsvResult<ParseResult> {
        parse_str(csv, &ParseOptions::default())
    }

    #[test]
    fn test_simple_csv() {
        let result = parse("PLU,name,SKU,size\n1,Shoe,S1,20\n1,Shoe,S2,21").unwrap();

        assert_eq!(result.headers, vec!["PLU", "name", "SKU", "size"]);
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[0].get("SKU"), Some("S1"));
        assert_eq!(result.records[1].get("size"), Some("21"));
    }

    #[test]
    fn test_quoted_values() {
        let result = parse("name,desc\n\"Boot, tall\",\"says \"\"hi\"\"\"").unwrap();

        assert_eq!(result.records[0].get("name"), Some("Boot, tall"));
        assert_eq!(result.records[0].get("desc"), Some("says \"hi\""));
    }

    #[test]
    fn test_empty_lines_skipped() {
        let result = parse("\na,b\n1,2\n\n3,4\n\n").unwrap();

        assert_eq!(result.headers, vec!["a", "b"]);
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[1].get("a"), Some("3"));
    }

    #[test]
    fn test_strict_row_length() {
        let err = parse("a,b,c\n1,2,3\n1,2").unwrap_err();
        assert!(matches!(err, CsvError::RowLength { line: 3, expected: 3, found: 2 }));
    }

    #[test]
    fn test_lenient_row_length() {
        let options = ParseOptions::default().with_row_length(RowLengthPolicy::Lenient);
        let result = parse_str("a,b,c\n1,2\n1,2,3,4", &options).unwrap();

        assert_eq!(result.records[0].get("c"), Some(""));
        assert_eq!(result.records[1].values(), ["1", "2", "3"]);
    }

    #[test]
    fn test_empty_csv_error() {
        assert!(matches!(parse(""), Err(CsvError::EmptyFile)));
        assert!(matches!(parse("\n\n"), Err(CsvError::EmptyFile)));
    }

    #[test]
    fn test_duplicate_header() {
        let err = parse("a,b,a\n1,2,3").unwrap_err();
        assert!(matches!(err, CsvError::DuplicateHeader(ref h) if h == "a"));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
        assert_eq!(detect_delimiter("single"), ',');
    }

    #[test]
    fn test_auto_delimiter() {
        let options = ParseOptions::default().with_delimiter(None);
        let result = parse_str("name;age\nAlice;30", &options).unwrap();

        assert_eq!(result.delimiter, ';');
        assert_eq!(result.records[0].get("age"), Some("30"));
    }

    #[test]
    fn test_bom_stripped() {
        let bytes = "\u{feff}PLU,name\n1,Shoe".as_bytes();
        let result = parse_bytes(bytes, &ParseOptions::default()).unwrap();
        assert_eq!(result.headers[0], "PLU");
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1").unwrap();
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_windows_1252_decoding() {
        let decoded = decode_content(b"\x80 5, caf\xe9", "windows-1252").unwrap();
        assert_eq!(decoded, "€ 5, café");
    }

    #[test]
    fn test_other_labels_resolved_by_encoding_rs() {
        // 0xC1 is Cyrillic small a in KOI8-R
        assert_eq!(decode_content(b"\xc1", "koi8-r").unwrap(), "а");
        assert_eq!(decode_content(b"Caf\xe9", "no-such-charset").unwrap(), "Café");
    }

    #[test]
    fn test_invalid_utf8_label_rejected() {
        let err = decode_content(b"Caf\xe9", "utf-8").unwrap_err();
        assert!(matches!(err, CsvError::Encoding(ref e) if e == "utf-8"));
    }

    #[test]
    fn test_latin_input_not_replaced() {
        let bytes: &[u8] = b"PLU,name\n1,Gr\xf6\xdfe\n";
        assert_ne!(detect_encoding(bytes), "utf-8");

        let result = parse_bytes(bytes, &ParseOptions::default()).unwrap();
        assert_eq!(result.records[0].get("name"), Some("Größe"));
    }

    #[test]
    fn test_parse_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "PLU,name\n1,Shoe\n2,Shirt\n").unwrap();

        let result = parse_file(file.path(), &ParseOptions::default()).unwrap();
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.encoding, "utf-8");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = parse_file(dir.path().join("nope.csv"), &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, CsvError::SourceNotFound { .. }));
    }
}
