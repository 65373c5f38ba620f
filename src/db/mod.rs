mod chunk;
mod database;
mod entry;
mod file;
mod group;
mod iban;
mod money;

pub use chunk::{Chunk, ChunkKey, ChunkStore, MergeResult};
pub use database::{Database, ImportSummary, Metadata};
pub use entry::{Counterparty, Entry, EntryHash};
pub use file::FileError;
pub use group::{Group, GroupId, GroupMember};
pub use iban::{Iban, IbanError};
pub use money::{Money, MoneyError};
