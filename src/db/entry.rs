use chrono::{Datelike as _, NaiveDate};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use super::{ChunkKey, GroupId, Iban, Money};

/// Content hash of the raw source fields an entry was imported from. Used to
/// recognize entries that were already imported.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryHash(pub String);

impl EntryHash {
    /// Hashes `source_tag|field1|field2|...` with SHA-256.
    pub fn of_raw_fields<'a>(source_tag: &str, fields: impl IntoIterator<Item = &'a str>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(source_tag.as_bytes());
        for field in fields {
            hasher.update(b"|");
            hasher.update(field.as_bytes());
        }
        Self(hex::encode(hasher.finalize()))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Counterparty {
    pub name: String,
    pub iban: Iban,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub hash: EntryHash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<GroupId>,
    pub iban: Iban,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub message: String,
    pub amount_cents: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other: Option<Counterparty>,
}

impl Entry {
    pub fn chunk_key(&self) -> ChunkKey {
        ChunkKey {
            iban: self.iban.clone(),
            year: self.date.year(),
            month: self.date.month(),
        }
    }
}
