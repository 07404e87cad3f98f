use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::Path;

use zip::read::ZipArchive;

/// Result alias for archive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Errors surfaced while loading an APK archive.
#[derive(Debug)]
pub enum ArchiveError {
    Io(io::Error),
    Zip(zip::result::ZipError),
}

impl std::fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArchiveError::Io(err) => write!(f, "I/O error: {err}"),
            ArchiveError::Zip(err) => write!(f, "ZIP error: {err}"),
        }
    }
}

impl std::error::Error for ArchiveError {}

impl From<io::Error> for ArchiveError {
    fn from(value: io::Error) -> Self {
        ArchiveError::Io(value)
    }
}

impl From<zip::result::ZipError> for ArchiveError {
    fn from(value: zip::result::ZipError) -> Self {
        ArchiveError::Zip(value)
    }
}

/// A read-only, in-memory view of an APK (ZIP) file.
///
/// Entries are stored in a deterministic `BTreeMap` keyed by their archive
/// name, so repeated scans visit entries in a stable order.
pub struct ApkArchive {
    entries: BTreeMap<String, Vec<u8>>,
}

impl ApkArchive {
    /// Load an APK from disk into memory.
    pub fn from_path(path: impl AsRef<Path>) -> ArchiveResult<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    /// Load an APK already held in memory.
    pub fn from_bytes(bytes: &[u8]) -> ArchiveResult<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    fn from_reader<R: Read + io::Seek>(reader: R) -> ArchiveResult<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut entries = BTreeMap::new();
        for idx in 0..archive.len() {
            let mut entry = archive.by_index(idx)?;
            if entry.name().ends_with('/') {
                continue;
            }
            let name = entry.name().to_string();
            let mut data = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut data)?;
            entries.insert(name, data);
        }
        Ok(ApkArchive { entries })
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// All entries in archive-name order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries
            .iter()
            .map(|(name, data)| (name.as_str(), data.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn from_entries(entries: Vec<(&str, Vec<u8>)>) -> Self {
        ApkArchive {
            entries: entries
                .into_iter()
                .map(|(name, data)| (name.to_string(), data))
                .collect(),
        }
    }
}
