use chrono::NaiveDate;

use super::Dialect;
use crate::db::{Counterparty, Entry, EntryHash, Iban, Money};
use crate::error::{Error, Result};

const HEADER: &[&str] = &[
    "Auftragskonto",
    "Buchungstag",
    "Valutadatum",
    "Buchungstext",
    "Verwendungszweck",
    "Glaeubiger ID",
    "Mandatsreferenz",
    "Kundenreferenz (End-to-End)",
    "Sammlerreferenz",
    "Lastschrift Ursprungsbetrag",
    "Auslagenersatz Ruecklastschrift",
    "Beguenstigter/Zahlungspflichtiger",
    "Kontonummer/IBAN",
    "BIC (SWIFT-Code)",
    "Betrag",
    "Waehrung",
    "Info",
];

const INDEX_IBAN: usize = 0;
const INDEX_DATE: usize = 1;
const INDEX_TYPE: usize = 3;
const INDEX_MESSAGE: usize = 4;
const INDEX_MANDATE_REFERENCE: usize = 6;
const INDEX_CUSTOMER_REFERENCE: usize = 7;
const INDEX_COLLECTION_REFERENCE: usize = 8;
const INDEX_OTHER_NAME: usize = 11;
const INDEX_OTHER_IBAN: usize = 12;
const INDEX_AMOUNT: usize = 14;

/// Sparkasse puts this in the counterparty account column of entries without a
/// counterparty, e.g. account fees.
const NO_COUNTERPARTY_ACCOUNT: &str = "0000000000";

/// Two digit years in booking dates are relative to this year
const CENTURY: i32 = 2000;

const HASH_TAG: &str = "sparkasse-csv";

/// CSV-CAMT export of the German Sparkasse online banking.
pub struct SparkasseCsv;

impl Dialect for SparkasseCsv {
    fn name(&self) -> &'static str {
        "Sparkasse CSV"
    }

    fn header(&self) -> &'static [&'static str] {
        HEADER
    }

    fn parse_row(&self, row: &[String], line: usize) -> Result<Entry> {
        let field = |index: usize| row[index].as_str();

        // The hash is computed from the raw fields so that parsing changes don't affect it
        let hash = EntryHash::of_raw_fields(
            HASH_TAG,
            [
                INDEX_IBAN,
                INDEX_DATE,
                INDEX_TYPE,
                INDEX_MESSAGE,
                INDEX_AMOUNT,
                INDEX_OTHER_NAME,
                INDEX_OTHER_IBAN,
                INDEX_MANDATE_REFERENCE,
                INDEX_CUSTOMER_REFERENCE,
                INDEX_COLLECTION_REFERENCE,
            ]
            .map(field),
        );

        let iban = parse_iban(field(INDEX_IBAN), line)?;
        let date = parse_date(field(INDEX_DATE)).ok_or_else(|| Error::InvalidDate {
            line,
            value: field(INDEX_DATE).to_string(),
        })?;
        let amount = field(INDEX_AMOUNT)
            .parse::<Money>()
            .map_err(|source| Error::InvalidAmount {
                line,
                value: field(INDEX_AMOUNT).to_string(),
                source,
            })?;
        let other_name = field(INDEX_OTHER_NAME);
        let other_iban = field(INDEX_OTHER_IBAN);
        let other = if other_name.is_empty() || other_iban == NO_COUNTERPARTY_ACCOUNT {
            None
        } else {
            Some(Counterparty {
                name: other_name.to_string(),
                iban: parse_iban(other_iban, line)?,
            })
        };

        Ok(Entry {
            hash,
            group_id: None,
            iban,
            date,
            entry_type: field(INDEX_TYPE).to_string(),
            message: field(INDEX_MESSAGE).to_string(),
            amount_cents: amount,
            other,
        })
    }
}

fn parse_iban(value: &str, line: usize) -> Result<Iban> {
    value.parse().map_err(|source| Error::InvalidIban {
        line,
        value: value.to_string(),
        source,
    })
}

/// Parses `D.M.YY`, day and month may have leading zeros.
fn parse_date(value: &str) -> Option<NaiveDate> {
    let mut parts = value.trim().split('.');
    let day = parse_number(parts.next()?, 2)?;
    let month = parse_number(parts.next()?, 2)?;
    let short_year = parse_number(parts.next()?, 2)?;
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(CENTURY + short_year as i32, month, day)
}

fn parse_number(digits: &str, max_len: usize) -> Option<u32> {
    if digits.is_empty() || digits.len() > max_len || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    digits.parse().ok()
}
