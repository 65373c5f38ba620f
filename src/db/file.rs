use serde::{de::DeserializeOwned, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Returns Ok(None) if the file doesn't exist
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, FileError> {
    let content = match std::fs::read(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    Ok(Some(serde_json::from_slice(&content)?))
}

/// Writes `value` as pretty printed JSON, creating parent directories as needed.
pub fn save<T: Serialize>(value: &T, path: &Path) -> io::Result<()> {
    let content = serde_json::to_vec_pretty(value)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // First write to temporary file so we don't lose data if writing fails halfway
    let filename = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Path has no filename"))?;
    let mut tmp_filename = filename.to_os_string();
    tmp_filename.push(".tmp");
    let tmppath = path.with_file_name(tmp_filename);
    std::fs::write(&tmppath, content)?;

    // Ok, writing succeeded, let's now replace the real file with the tmpfile
    std::fs::rename(&tmppath, path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
    struct Content {
        values: Vec<u32>,
    }

    #[test]
    fn load_nonexisting() {
        let tempdir = tempfile::tempdir().unwrap();
        let loaded = load::<Content>(&tempdir.path().join("file.json")).unwrap();
        assert_eq!(None, loaded);
    }

    #[test]
    fn save_new_file_and_load() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("nested").join("dir").join("file.json");

        let content = Content {
            values: vec![1, 2, 3],
        };
        save(&content, &path).unwrap();
        assert_eq!(Some(content), load(&path).unwrap());
        assert!(!path.with_file_name("file.json.tmp").exists());
    }

    #[test]
    fn overwrite_existing_file_and_load() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("file.json");

        save(&Content { values: vec![1] }, &path).unwrap();
        save(&Content { values: vec![2, 3] }, &path).unwrap();
        assert_eq!(
            Some(Content { values: vec![2, 3] }),
            load(&path).unwrap()
        );
    }

    #[test]
    fn load_malformed() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("file.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load::<Content>(&path).unwrap_err();
        assert!(matches!(err, FileError::Json(_)));
    }

    #[test]
    fn load_directory_is_io_error() {
        let tempdir = tempfile::tempdir().unwrap();

        let err = load::<Content>(tempdir.path()).unwrap_err();
        assert!(matches!(err, FileError::Io(_)));
    }
}
