use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

use super::file;
use super::{Entry, EntryHash, Iban};
use crate::error::{Error, Result};

const DATA_DIR: &str = "data";
const CHUNKS_DIR: &str = "chunks";

/// Partition key of a chunk: all entries of one account in one month.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkKey {
    pub iban: Iban,
    pub year: i32,
    pub month: u32,
}

impl ChunkKey {
    fn file_name(&self) -> String {
        format!("{:04}-{:02}.json", self.year, self.month)
    }

    /// Inverse of [ChunkKey::file_name]
    fn from_file_name(iban: Iban, file_name: &str) -> Option<Self> {
        let (year, month) = file_name.strip_suffix(".json")?.split_once('-')?;
        if year.len() != 4 || month.len() != 2 {
            return None;
        }
        let month: u32 = month.parse().ok()?;
        if !(1..=12).contains(&month) {
            return None;
        }
        Some(Self {
            iban,
            year: year.parse().ok()?,
            month,
        })
    }
}

impl Display for ChunkKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02} [{}]", self.year, self.month, self.iban)
    }
}

#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeResult {
    Added,
    AlreadyPresent,
}

/// On-disk representation of a chunk. The key isn't stored, it follows from the path.
#[derive(Serialize, Deserialize)]
struct ChunkFile {
    entries: Vec<Entry>,
}

#[derive(Debug, Clone)]
pub struct Chunk {
    key: ChunkKey,
    entries: Vec<Entry>,
    hashes: HashSet<EntryHash>,
}

impl Chunk {
    pub fn new_empty(key: ChunkKey) -> Self {
        Self {
            key,
            entries: vec![],
            hashes: HashSet::new(),
        }
    }

    fn from_file(key: ChunkKey, file: ChunkFile) -> Result<Self> {
        let mut chunk = Self::new_empty(key);
        for entry in file.entries {
            if entry.chunk_key() != chunk.key {
                return Err(Error::PartitionMismatch {
                    chunk: chunk.key,
                    entry: entry.chunk_key(),
                });
            }
            chunk.hashes.insert(entry.hash.clone());
            chunk.entries.push(entry);
        }
        // `merge` relies on the entries being sorted
        if chunk.entries.windows(2).any(|pair| pair[0].date > pair[1].date) {
            log::warn!("Entries of chunk {} weren't sorted by date, sorting them", chunk.key);
            chunk.entries.sort_by_key(|entry| entry.date);
        }
        Ok(chunk)
    }

    pub fn key(&self) -> &ChunkKey {
        &self.key
    }

    /// Entries sorted by date. Entries with the same date keep their insertion order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds the entry unless an entry with the same hash is already in the chunk.
    pub fn merge(&mut self, entry: Entry) -> Result<MergeResult> {
        let entry_key = entry.chunk_key();
        if entry_key != self.key {
            return Err(Error::PartitionMismatch {
                chunk: self.key.clone(),
                entry: entry_key,
            });
        }
        if self.hashes.contains(&entry.hash) {
            return Ok(MergeResult::AlreadyPresent);
        }

        // Same position a stable sort by date would put an appended entry at
        let position = self.entries.partition_point(|e| e.date <= entry.date);
        self.hashes.insert(entry.hash.clone());
        self.entries.insert(position, entry);
        Ok(MergeResult::Added)
    }
}

/// Stores chunks as `data/<IBAN>/chunks/<YYYY>-<MM>.json` below the database directory.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    data_dir: PathBuf,
}

impl ChunkStore {
    pub fn new(db_dir: &Path) -> Self {
        Self {
            data_dir: db_dir.join(DATA_DIR),
        }
    }

    pub fn path(&self, key: &ChunkKey) -> PathBuf {
        self.data_dir
            .join(key.iban.as_str())
            .join(CHUNKS_DIR)
            .join(key.file_name())
    }

    /// Returns an empty chunk if there is no file for this key yet
    pub fn load(&self, key: &ChunkKey) -> Result<Chunk> {
        let path = self.path(key);
        log::debug!("Loading chunk {key} from {}", path.display());
        match file::load::<ChunkFile>(&path) {
            Ok(Some(file)) => Chunk::from_file(key.clone(), file),
            Ok(None) => Ok(Chunk::new_empty(key.clone())),
            Err(source) => Err(Error::CorruptChunk { path, source }),
        }
    }

    pub fn save(&self, chunk: &Chunk) -> Result<()> {
        let path = self.path(&chunk.key);
        log::debug!(
            "Saving chunk {} with {} entries to {}",
            chunk.key,
            chunk.len(),
            path.display()
        );
        let file = ChunkFile {
            entries: chunk.entries.clone(),
        };
        file::save(&file, &path).map_err(|source| Error::Io {
            op: "write chunk",
            path,
            source,
        })
    }

    /// Keys of all chunks that exist on disk, sorted by account and month.
    pub fn list(&self) -> Result<Vec<ChunkKey>> {
        let mut keys = Vec::new();
        for account_dir in read_dir_or_empty(&self.data_dir)? {
            let account_name = account_dir.file_name();
            let Some(iban) = account_name
                .to_str()
                .and_then(|name| name.parse::<Iban>().ok())
            else {
                log::warn!("Skipping unexpected directory {}", account_dir.path().display());
                continue;
            };
            for chunk_file in read_dir_or_empty(&account_dir.path().join(CHUNKS_DIR))? {
                let file_name = chunk_file.file_name();
                match file_name
                    .to_str()
                    .and_then(|name| ChunkKey::from_file_name(iban.clone(), name))
                {
                    Some(key) => keys.push(key),
                    None => {
                        log::warn!("Skipping unexpected file {}", chunk_file.path().display())
                    }
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

fn read_dir_or_empty(dir: &Path) -> Result<Vec<std::fs::DirEntry>> {
    let to_error = |source: std::io::Error| Error::Io {
        op: "list directory",
        path: dir.to_path_buf(),
        source,
    };
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.collect::<std::io::Result<_>>().map_err(to_error),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(vec![]),
        Err(err) => Err(to_error(err)),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::db::Money;

    const IBAN: &str = "DE11520513735120710131";

    fn key(year: i32, month: u32) -> ChunkKey {
        ChunkKey {
            iban: IBAN.parse().unwrap(),
            year,
            month,
        }
    }

    fn entry(hash: &str, date: (i32, u32, u32)) -> Entry {
        Entry {
            hash: EntryHash(hash.to_string()),
            group_id: None,
            iban: IBAN.parse().unwrap(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            entry_type: "GUTSCHRIFT".to_string(),
            message: format!("Message {hash}"),
            amount_cents: Money::from_cents(100),
            other: None,
        }
    }

    fn hashes(chunk: &Chunk) -> Vec<&str> {
        chunk.entries().iter().map(|e| e.hash.0.as_str()).collect()
    }

    #[test]
    fn merge_keeps_entries_sorted_and_stable() {
        let mut chunk = Chunk::new_empty(key(2022, 3));
        assert_eq!(MergeResult::Added, chunk.merge(entry("c", (2022, 3, 20))).unwrap());
        assert_eq!(MergeResult::Added, chunk.merge(entry("a", (2022, 3, 5))).unwrap());
        assert_eq!(MergeResult::Added, chunk.merge(entry("d", (2022, 3, 20))).unwrap());
        assert_eq!(MergeResult::Added, chunk.merge(entry("b", (2022, 3, 5))).unwrap());
        assert_eq!(MergeResult::Added, chunk.merge(entry("e", (2022, 3, 1))).unwrap());
        assert_eq!(vec!["e", "a", "b", "c", "d"], hashes(&chunk));
    }

    #[test]
    fn merge_skips_known_hash() {
        let mut chunk = Chunk::new_empty(key(2022, 3));
        assert_eq!(MergeResult::Added, chunk.merge(entry("a", (2022, 3, 5))).unwrap());
        let mut duplicate = entry("a", (2022, 3, 6));
        duplicate.message = "changed".to_string();
        assert_eq!(MergeResult::AlreadyPresent, chunk.merge(duplicate).unwrap());
        assert_eq!(1, chunk.len());
        assert_eq!("Message a", chunk.entries()[0].message);
    }

    #[test]
    fn merge_rejects_other_partition() {
        let mut chunk = Chunk::new_empty(key(2022, 3));
        let err = chunk.merge(entry("a", (2022, 4, 1))).unwrap_err();
        assert!(matches!(
            err,
            Error::PartitionMismatch { chunk, entry } if chunk == key(2022, 3) && entry == key(2022, 4)
        ));
        assert!(chunk.is_empty());
    }

    #[test]
    fn load_nonexisting_is_empty() {
        let tempdir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(tempdir.path());
        let chunk = store.load(&key(2022, 3)).unwrap();
        assert_eq!(&key(2022, 3), chunk.key());
        assert!(chunk.is_empty());
    }

    #[test]
    fn save_and_load() {
        let tempdir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(tempdir.path());
        let mut chunk = Chunk::new_empty(key(2022, 3));
        for (hash, day) in [("x", 9), ("y", 2), ("z", 9)] {
            assert_eq!(MergeResult::Added, chunk.merge(entry(hash, (2022, 3, day))).unwrap());
        }
        store.save(&chunk).unwrap();

        assert!(tempdir
            .path()
            .join("data/DE11520513735120710131/chunks/2022-03.json")
            .is_file());
        let loaded = store.load(&key(2022, 3)).unwrap();
        assert_eq!(chunk.entries(), loaded.entries());
        assert_eq!(vec!["y", "x", "z"], hashes(&loaded));
    }

    #[test]
    fn loaded_chunk_still_deduplicates() {
        let tempdir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(tempdir.path());
        let mut chunk = Chunk::new_empty(key(2022, 3));
        assert_eq!(MergeResult::Added, chunk.merge(entry("a", (2022, 3, 1))).unwrap());
        store.save(&chunk).unwrap();

        let mut loaded = store.load(&key(2022, 3)).unwrap();
        assert_eq!(MergeResult::AlreadyPresent, loaded.merge(entry("a", (2022, 3, 1))).unwrap());
    }

    #[test]
    fn load_malformed_is_corrupt() {
        let tempdir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(tempdir.path());
        let path = store.path(&key(2022, 3));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"entries": [{"hash": 5}]}"#).unwrap();

        let err = store.load(&key(2022, 3)).unwrap_err();
        assert!(matches!(err, Error::CorruptChunk { path: p, .. } if p == path));
    }

    #[test]
    fn load_entry_from_other_month_is_mismatch() {
        let tempdir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(tempdir.path());
        let mut chunk = Chunk::new_empty(key(2022, 4));
        assert_eq!(MergeResult::Added, chunk.merge(entry("a", (2022, 4, 1))).unwrap());
        store.save(&chunk).unwrap();
        std::fs::rename(store.path(&key(2022, 4)), store.path(&key(2022, 3))).unwrap();

        let err = store.load(&key(2022, 3)).unwrap_err();
        assert!(matches!(err, Error::PartitionMismatch { .. }));
    }

    #[test]
    fn load_sorts_unsorted_file() {
        let tempdir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(tempdir.path());
        let unsorted = ChunkFile {
            entries: vec![
                entry("c", (2022, 3, 20)),
                entry("a", (2022, 3, 5)),
                entry("d", (2022, 3, 20)),
                entry("b", (2022, 3, 5)),
            ],
        };
        file::save(&unsorted, &store.path(&key(2022, 3))).unwrap();

        let mut chunk = store.load(&key(2022, 3)).unwrap();
        assert_eq!(vec!["a", "b", "c", "d"], hashes(&chunk));

        assert_eq!(MergeResult::Added, chunk.merge(entry("e", (2022, 3, 10))).unwrap());
        assert_eq!(vec!["a", "b", "e", "c", "d"], hashes(&chunk));
    }

    #[test]
    fn list_finds_saved_chunks() {
        let tempdir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(tempdir.path());
        assert_eq!(Vec::<ChunkKey>::new(), store.list().unwrap());

        for (year, month) in [(2022, 4), (2021, 12), (2022, 3)] {
            let mut chunk = Chunk::new_empty(key(year, month));
            assert_eq!(MergeResult::Added, chunk.merge(entry("a", (year, month, 1))).unwrap());
            store.save(&chunk).unwrap();
        }
        std::fs::write(
            tempdir.path().join("data/DE11520513735120710131/chunks/notes.txt"),
            "",
        )
        .unwrap();
        std::fs::create_dir_all(tempdir.path().join("data/not-an-iban")).unwrap();

        assert_eq!(
            vec![key(2021, 12), key(2022, 3), key(2022, 4)],
            store.list().unwrap()
        );
    }

    #[test]
    fn file_name_roundtrip() {
        let iban: Iban = IBAN.parse().unwrap();
        assert_eq!("2022-02.json", key(2022, 2).file_name());
        assert_eq!(
            Some(key(2022, 2)),
            ChunkKey::from_file_name(iban.clone(), "2022-02.json")
        );
        assert_eq!(None, ChunkKey::from_file_name(iban.clone(), "2022-13.json"));
        assert_eq!(None, ChunkKey::from_file_name(iban.clone(), "2022-02.json.tmp"));
        assert_eq!(None, ChunkKey::from_file_name(iban, "22-2.json"));
    }

    #[test]
    fn display() {
        assert_eq!("2022-02 [DE11520513735120710131]", key(2022, 2).to_string());
    }
}
