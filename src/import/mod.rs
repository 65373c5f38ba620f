use std::io::Read;
use std::path::Path;

use crate::db::Entry;
use crate::error::{Error, Result};

mod sparkasse;

/// A bank specific CSV export format, recognized by its exact header row.
pub trait Dialect {
    fn name(&self) -> &'static str;

    fn header(&self) -> &'static [&'static str];

    /// Converts one data row. `line` is the 1-based line number in the source file.
    fn parse_row(&self, row: &[String], line: usize) -> Result<Entry>;

    fn matches(&self, header: &[String]) -> bool {
        header.len() == self.header().len()
            && header
                .iter()
                .zip(self.header())
                .all(|(actual, expected)| actual.as_str() == *expected)
    }
}

/// Checked in order, the first dialect whose header matches is used.
const DIALECTS: &[&dyn Dialect] = &[&sparkasse::SparkasseCsv];

pub fn parse_file(path: &Path) -> Result<Vec<Entry>> {
    let file = std::fs::File::open(path).map_err(|source| Error::Io {
        op: "open CSV file",
        path: path.to_path_buf(),
        source,
    })?;
    parse(file)
}

/// Parses a `;` delimited bank export. Fails on the first invalid row.
pub fn parse(input: impl Read) -> Result<Vec<Entry>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_reader(input);
    let mut records = reader.byte_records();

    let header = match records.next() {
        Some(record) => {
            let mut header = decode_record(&record?);
            if let Some(first) = header.first_mut() {
                *first = remove_byte_order_mark(first);
            }
            header
        }
        None => vec![],
    };
    let dialect = DIALECTS
        .iter()
        .find(|dialect| dialect.matches(&header))
        .ok_or_else(|| Error::UnrecognizedFormat {
            header: header.clone(),
        })?;
    log::debug!("Recognized {} format", dialect.name());

    let mut entries = Vec::new();
    for (index, record) in records.enumerate() {
        let record = record?;
        // +1 for the header, +1 because lines are 1-based
        let line = record
            .position()
            .map(|position| position.line() as usize)
            .unwrap_or(index + 2);
        let row = decode_record(&record);
        if row.len() != dialect.header().len() {
            return Err(Error::MalformedRow {
                line,
                expected: dialect.header().len(),
                found: row.len(),
            });
        }
        entries.push(dialect.parse_row(&row, line)?);
    }
    Ok(entries)
}

fn decode_record(record: &csv::ByteRecord) -> Vec<String> {
    record.iter().map(decode_field).collect()
}

/// Bank exports are often ISO-8859-1, so fall back to that if a field isn't valid UTF-8.
fn decode_field(field: &[u8]) -> String {
    match std::str::from_utf8(field) {
        Ok(field) => field.to_string(),
        Err(_) => field.iter().map(|&byte| char::from(byte)).collect(),
    }
}

fn remove_byte_order_mark(field: &str) -> String {
    field.strip_prefix('\u{FEFF}').unwrap_or(field).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Money;

    const SPARKASSE_HEADER: &str = "\"Auftragskonto\";\"Buchungstag\";\"Valutadatum\";\"Buchungstext\";\"Verwendungszweck\";\"Glaeubiger ID\";\"Mandatsreferenz\";\"Kundenreferenz (End-to-End)\";\"Sammlerreferenz\";\"Lastschrift Ursprungsbetrag\";\"Auslagenersatz Ruecklastschrift\";\"Beguenstigter/Zahlungspflichtiger\";\"Kontonummer/IBAN\";\"BIC (SWIFT-Code)\";\"Betrag\";\"Waehrung\";\"Info\"";

    const ROW: &str = "\"DE11520513735120710131\";\"15.2.22\";\"15.2.22\";\"LASTSCHRIFT\";\"Miete\";\"\";\"\";\"\";\"\";\"\";\"\";\"Vermieter GmbH\";\"DE02120300000000202051\";\"BYLADEM1001\";\"-3074,48\";\"EUR\";\"Umsatz gebucht\"";

    #[test]
    fn empty_input_is_unrecognized() {
        let err = parse("".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::UnrecognizedFormat { header } if header.is_empty()));
    }

    #[test]
    fn unknown_header_is_unrecognized() {
        let err = parse("Datum;Betrag\n1.1.22;5\n".as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            Error::UnrecognizedFormat { header } if header == vec!["Datum", "Betrag"]
        ));
    }

    #[test]
    fn header_with_missing_column_is_unrecognized() {
        let header = SPARKASSE_HEADER.trim_end_matches(";\"Info\"");
        let err = parse(header.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::UnrecognizedFormat { .. }));
    }

    #[test]
    fn header_only_has_no_entries() {
        assert_eq!(Vec::<Entry>::new(), parse(SPARKASSE_HEADER.as_bytes()).unwrap());
    }

    #[test]
    fn parses_rows() {
        let input = format!("{SPARKASSE_HEADER}\n{ROW}\n");
        let entries = parse(input.as_bytes()).unwrap();
        assert_eq!(1, entries.len());
        assert_eq!(Money::from_cents(-307448), entries[0].amount_cents);
    }

    #[test]
    fn ignores_byte_order_mark() {
        let input = format!("\u{FEFF}{SPARKASSE_HEADER}\r\n{ROW}\r\n");
        assert_eq!(1, parse(input.as_bytes()).unwrap().len());
    }

    #[test]
    fn decodes_latin1() {
        let mut input = format!("{SPARKASSE_HEADER}\n").into_bytes();
        // ISO-8859-1 maps the first 256 code points to single bytes
        input.extend(ROW.replace("Miete", "Gebühr").chars().map(|c| c as u32 as u8));

        let entries = parse(input.as_slice()).unwrap();
        assert_eq!("Gebühr", entries[0].message);
    }

    #[test]
    fn row_with_wrong_column_count_is_malformed() {
        let input = format!("{SPARKASSE_HEADER}\n{ROW}\n\"DE11520513735120710131\";\"15.2.22\"\n");
        let err = parse(input.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedRow {
                line: 3,
                expected: 17,
                found: 2
            }
        ));
    }

    #[test]
    fn reports_line_of_invalid_row() {
        let bad_row = ROW.replace("15.2.22", "15.13.22");
        let input = format!("{SPARKASSE_HEADER}\n{ROW}\n{ROW}\n{bad_row}\n");
        let err = parse(input.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::InvalidDate { line: 4, value } if value == "15.13.22"));
    }

    #[test]
    fn parse_file_nonexisting() {
        let tempdir = tempfile::tempdir().unwrap();
        let err = parse_file(&tempdir.path().join("missing.csv")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
