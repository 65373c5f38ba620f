use serde::{Deserialize, Serialize};
use std::collections::{btree_map, BTreeMap};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use super::chunk::{ChunkKey, ChunkStore, MergeResult};
use super::{file, Entry, FileError, Group};
use crate::error::{Error, Result};
use crate::import;

const METADATA_FILE: &str = "moneydb.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub name: String,
    pub groups: Vec<Group>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub added: usize,
    pub total: usize,
}

/// A ledger stored in a directory. There must only be one `Database` per directory at a time.
///
/// All mutating operations hold the write lock for their whole duration, so they are
/// serialized against each other and against readers.
#[derive(Debug)]
pub struct Database {
    dir: PathBuf,
    chunks: ChunkStore,
    metadata: RwLock<Metadata>,
}

impl Database {
    pub fn exists_in(dir: &Path) -> Result<bool> {
        let path = dir.join(METADATA_FILE);
        match std::fs::metadata(&path) {
            Ok(metadata) => Ok(!metadata.is_dir()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(Error::Io {
                op: "check for existing database",
                path,
                source,
            }),
        }
    }

    pub fn create(dir: &Path, name: &str) -> Result<Self> {
        if Self::exists_in(dir)? {
            return Err(Error::AlreadyExists {
                path: dir.to_path_buf(),
            });
        }
        log::info!("Creating database {name:?} in {}...", dir.display());
        let db = Self::new(
            dir,
            Metadata {
                name: name.to_string(),
                groups: vec![],
            },
        );
        save_metadata(&db.dir, &db.read())?;
        log::info!("Creating database...done");
        Ok(db)
    }

    pub fn open(dir: &Path) -> Result<Self> {
        log::info!("Loading database from {}...", dir.display());
        let path = dir.join(METADATA_FILE);
        let metadata = match file::load::<Metadata>(&path) {
            Ok(Some(metadata)) => metadata,
            Ok(None) => {
                return Err(Error::Io {
                    op: "read metadata",
                    path,
                    source: std::io::ErrorKind::NotFound.into(),
                })
            }
            Err(FileError::Io(source)) => {
                return Err(Error::Io {
                    op: "read metadata",
                    path,
                    source,
                })
            }
            Err(FileError::Json(source)) => return Err(Error::CorruptMetadata { path, source }),
        };
        log::info!("Loading database...done");
        Ok(Self::new(dir, metadata))
    }

    /// Opens the database in `dir` and renames it to `name` if needed, or creates a new one.
    pub fn open_or_create(dir: &Path, name: &str) -> Result<Self> {
        if !Self::exists_in(dir)? {
            return Self::create(dir, name);
        }
        let db = Self::open(dir)?;
        db.set_name(name)?;
        Ok(db)
    }

    fn new(dir: &Path, metadata: Metadata) -> Self {
        Self {
            dir: dir.to_path_buf(),
            chunks: ChunkStore::new(dir),
            metadata: RwLock::new(metadata),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn name(&self) -> String {
        self.read().name.clone()
    }

    pub fn groups(&self) -> Vec<Group> {
        self.read().groups.clone()
    }

    /// Persists the metadata if the name actually changed
    pub fn set_name(&self, name: &str) -> Result<()> {
        let mut metadata = self.write();
        if metadata.name == name {
            return Ok(());
        }
        log::info!("Renaming database from {:?} to {name:?}", metadata.name);
        let mut updated = metadata.clone();
        updated.name = name.to_string();
        save_metadata(&self.dir, &updated)?;
        *metadata = updated;
        Ok(())
    }

    pub fn add_group(&self, group: Group) -> Result<()> {
        let mut metadata = self.write();
        let mut updated = metadata.clone();
        updated.groups.push(group);
        save_metadata(&self.dir, &updated)?;
        *metadata = updated;
        Ok(())
    }

    /// Keys of all stored chunks, sorted by account and month
    pub fn list_chunks(&self) -> Result<Vec<ChunkKey>> {
        let _guard = self.read();
        self.chunks.list()
    }

    /// Entries of one account and month, sorted by date
    pub fn entries(&self, key: &ChunkKey) -> Result<Vec<Entry>> {
        let _guard = self.read();
        Ok(self.chunks.load(key)?.into_entries())
    }

    /// Parses the CSV file and adds all entries that aren't stored yet.
    ///
    /// Nothing is written if the file can't be parsed. If loading or saving a chunk fails,
    /// chunks saved before the failure stay saved.
    pub fn import_csv(&self, path: &Path) -> Result<ImportSummary> {
        let _guard = self.write();
        log::info!("Importing {}...", path.display());

        let begin = Instant::now();
        let entries = import::parse_file(path)?;
        log::debug!("Reading csv file took {:?}", begin.elapsed());

        let summary = self.add_entries(entries)?;
        log::info!("Importing...done");
        Ok(summary)
    }

    /// Caller must hold the write lock
    fn add_entries(&self, entries: Vec<Entry>) -> Result<ImportSummary> {
        let begin = Instant::now();

        let total = entries.len();
        let mut added = 0;
        let mut chunks = BTreeMap::new();
        for entry in entries {
            let chunk = match chunks.entry(entry.chunk_key()) {
                btree_map::Entry::Occupied(chunk) => chunk.into_mut(),
                btree_map::Entry::Vacant(vacant) => {
                    let chunk = self.chunks.load(vacant.key())?;
                    vacant.insert(chunk)
                }
            };
            match chunk.merge(entry)? {
                MergeResult::Added => added += 1,
                MergeResult::AlreadyPresent => {}
            }
        }

        log::info!("Added {added} of {total} new entries");

        for chunk in chunks.values() {
            self.chunks.save(chunk)?;
        }

        log::debug!("Adding and writing entries took {:?}", begin.elapsed());
        Ok(ImportSummary { added, total })
    }

    // Metadata is only replaced after it was persisted, so a poisoned lock still holds valid data.
    fn read(&self) -> RwLockReadGuard<'_, Metadata> {
        self.metadata.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Metadata> {
        self.metadata.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn save_metadata(dir: &Path, metadata: &Metadata) -> Result<()> {
    let path = dir.join(METADATA_FILE);
    file::save(metadata, &path).map_err(|source| Error::Io {
        op: "write metadata",
        path,
        source,
    })
}
