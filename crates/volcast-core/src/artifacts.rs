//! Versioned, write-once storage of fitted models.
//!
//! Artifact ids are `{TICKER}_{YYYYMMDDTHHMMSS.nnnnnnnnnZ}`. Tickers never
//! contain `_` and the timestamp is fixed-width UTC, so for one ticker the
//! lexicographic order of ids is their creation order.

use std::fmt::{Display, Formatter};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::ARTIFACT_ID_SEPARATOR;
use crate::{Symbol, UtcDateTime, ValidationError, VolatilityError};

const ARTIFACT_EXTENSION: &str = "json";

/// Sortable identifier of one persisted model.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactId(String);

impl ArtifactId {
    pub fn new(symbol: &Symbol, created_at: UtcDateTime) -> Result<Self, ValidationError> {
        let timestamp = created_at.format_compact()?;
        Ok(Self(format!(
            "{}{ARTIFACT_ID_SEPARATOR}{timestamp}",
            symbol.as_str()
        )))
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidArtifactId {
            value: input.to_owned(),
        };

        let (ticker, timestamp) = input.split_once(ARTIFACT_ID_SEPARATOR).ok_or_else(invalid)?;
        let symbol = Symbol::parse(ticker).map_err(|_| invalid())?;
        if symbol.as_str() != ticker {
            return Err(invalid());
        }
        UtcDateTime::parse_compact(timestamp).map_err(|_| invalid())?;
        Ok(Self(input.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn ticker(&self) -> &str {
        self.0.split_once(ARTIFACT_ID_SEPARATOR).map_or(self.0.as_str(), |(ticker, _)| ticker)
    }

    pub fn created_at(&self) -> Result<UtcDateTime, ValidationError> {
        let (_, timestamp) = self
            .0
            .split_once(ARTIFACT_ID_SEPARATOR)
            .ok_or_else(|| ValidationError::InvalidArtifactId {
                value: self.0.clone(),
            })?;
        UtcDateTime::parse_compact(timestamp)
    }

    pub fn belongs_to(&self, symbol: &Symbol) -> bool {
        self.ticker() == symbol.as_str()
    }

    fn file_name(&self) -> String {
        format!("{}.{ARTIFACT_EXTENSION}", self.0)
    }
}

impl Display for ArtifactId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ArtifactId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ArtifactId> for String {
    fn from(value: ArtifactId) -> Self {
        value.0
    }
}

/// A persisted fitted model. Identity is `(ticker, created_at)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifact {
    pub id: ArtifactId,
    pub ticker: Symbol,
    pub created_at: UtcDateTime,
    pub serialized_model: Vec<u8>,
}

/// Persistence contract for fitted-model artifacts.
///
/// Implementations are synchronous; the lifecycle runs them on the blocking
/// pool under its storage timeout.
pub trait ArtifactStore: Send + Sync {
    /// Persist `bytes` as a new artifact. Never overwrites an existing one.
    fn save(&self, symbol: &Symbol, bytes: &[u8]) -> Result<ArtifactId, VolatilityError>;

    /// Ids for `symbol`, ascending by creation time.
    fn list_artifacts(&self, symbol: &Symbol) -> Result<Vec<ArtifactId>, VolatilityError>;

    fn load_bytes(&self, id: &ArtifactId) -> Result<Vec<u8>, VolatilityError>;

    /// The artifact with the greatest creation time, if any.
    fn latest(&self, symbol: &Symbol) -> Result<Option<ModelArtifact>, VolatilityError> {
        let Some(id) = self.list_artifacts(symbol)?.into_iter().max() else {
            return Ok(None);
        };

        let serialized_model = self.load_bytes(&id)?;
        let created_at = id
            .created_at()
            .map_err(|error| VolatilityError::Persistence(error.to_string()))?;
        Ok(Some(ModelArtifact {
            id,
            ticker: symbol.clone(),
            created_at,
            serialized_model,
        }))
    }
}

/// One file per artifact: `<dir>/<id>.json`.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    dir: PathBuf,
}

impl FsArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &ArtifactId) -> PathBuf {
        self.dir.join(id.file_name())
    }

    fn write_staging_file(&self, bytes: &[u8]) -> Result<PathBuf, VolatilityError> {
        static SEQUENCE: AtomicU64 = AtomicU64::new(0);
        let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let staging = self
            .dir
            .join(format!(".staging-{}-{sequence}.tmp", std::process::id()));

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&staging)
            .map_err(|error| io_failure("create staging file", &staging, error))?;
        file.write_all(bytes)
            .and_then(|()| file.sync_all())
            .map_err(|error| {
                let _ = fs::remove_file(&staging);
                io_failure("write staging file", &staging, error)
            })?;
        Ok(staging)
    }
}

impl ArtifactStore for FsArtifactStore {
    fn save(&self, symbol: &Symbol, bytes: &[u8]) -> Result<ArtifactId, VolatilityError> {
        fs::create_dir_all(&self.dir)
            .map_err(|error| io_failure("create model directory", &self.dir, error))?;

        let staging = self.write_staging_file(bytes)?;
        let mut created_at = next_creation_time();
        let result = loop {
            let id = match ArtifactId::new(symbol, created_at) {
                Ok(id) => id,
                Err(error) => break Err(VolatilityError::Persistence(error.to_string())),
            };
            let target = self.path_for(&id);
            // A hard link fails instead of replacing an existing file.
            match fs::hard_link(&staging, &target) {
                Ok(()) => break Ok(id),
                Err(error) if error.kind() == ErrorKind::AlreadyExists => {
                    created_at = created_at.plus_nanos(1);
                }
                Err(error) => break Err(io_failure("publish artifact", &target, error)),
            }
        };
        let _ = fs::remove_file(&staging);

        let id = result?;
        if let Ok(directory) = File::open(&self.dir) {
            let _ = directory.sync_all();
        }
        debug!(artifact_id = %id, bytes = bytes.len(), "artifact written");
        Ok(id)
    }

    fn list_artifacts(&self, symbol: &Symbol) -> Result<Vec<ArtifactId>, VolatilityError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(io_failure("list model directory", &self.dir, error)),
        };

        let prefix = format!("{}{ARTIFACT_ID_SEPARATOR}", symbol.as_str());
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|error| io_failure("list model directory", &self.dir, error))?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let Some(stem) = file_name
                .strip_suffix(ARTIFACT_EXTENSION)
                .and_then(|rest| rest.strip_suffix('.'))
            else {
                continue;
            };
            if !stem.starts_with(&prefix) {
                continue;
            }
            if let Ok(id) = ArtifactId::parse(stem) {
                ids.push(id);
            }
        }

        ids.sort();
        Ok(ids)
    }

    fn load_bytes(&self, id: &ArtifactId) -> Result<Vec<u8>, VolatilityError> {
        let path = self.path_for(id);
        fs::read(&path).map_err(|error| io_failure("read artifact", &path, error))
    }
}

/// Wall-clock UTC, forced strictly increasing across the whole process.
fn next_creation_time() -> UtcDateTime {
    static LAST_ISSUED: Mutex<Option<UtcDateTime>> = Mutex::new(None);

    let now = UtcDateTime::now();
    let mut last = match LAST_ISSUED.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    let issued = match *last {
        Some(previous) if previous >= now => previous.plus_nanos(1),
        _ => now,
    };
    *last = Some(issued);
    issued
}

fn io_failure(action: &str, path: &Path, error: std::io::Error) -> VolatilityError {
    VolatilityError::Persistence(format!("{action} '{}': {error}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn symbol(value: &str) -> Symbol {
        Symbol::parse(value).expect("valid symbol")
    }

    #[test]
    fn artifact_id_embeds_ticker_and_sorts_chronologically() {
        let earlier = UtcDateTime::parse("2024-03-08T09:00:00Z").expect("timestamp");
        let later = UtcDateTime::parse("2024-03-08T10:00:00Z").expect("timestamp");
        let first = ArtifactId::new(&symbol("TEST"), earlier).expect("id");
        let second = ArtifactId::new(&symbol("TEST"), later).expect("id");

        assert_eq!(first.as_str(), "TEST_20240308T090000.000000000Z");
        assert_eq!(first.ticker(), "TEST");
        assert!(first < second);
        assert_eq!(second.created_at().expect("timestamp"), later);
    }

    #[test]
    fn artifact_id_rejects_foreign_names() {
        assert!(ArtifactId::parse("TEST").is_err());
        assert!(ArtifactId::parse("test_20240308T090000.000000000Z").is_err());
        assert!(ArtifactId::parse("TEST_2024-03-08").is_err());
        assert!(ArtifactId::parse("TEST_20240308T090000.000000000").is_err());
        assert!(ArtifactId::parse("TEST_20240308T090000.42Z").is_err());
    }

    #[test]
    fn parsed_id_keeps_its_canonical_spelling() {
        let id = ArtifactId::parse("TEST_20240308T090000.000000007Z").expect("id");
        assert_eq!(id.as_str(), "TEST_20240308T090000.000000007Z");
        assert_eq!(
            id.created_at().expect("timestamp"),
            UtcDateTime::parse("2024-03-08T09:00:00.000000007Z").expect("timestamp")
        );
    }

    #[test]
    fn consecutive_saves_produce_distinct_increasing_ids() {
        let temp = tempdir().expect("tempdir");
        let store = FsArtifactStore::new(temp.path().join("models"));
        let ticker = symbol("TEST");

        let first = store.save(&ticker, b"first").expect("save");
        let second = store.save(&ticker, b"second").expect("save");

        assert_ne!(first, second);
        assert!(first < second);
        assert_eq!(store.load_bytes(&first).expect("load"), b"first");
        assert_eq!(store.load_bytes(&second).expect("load"), b"second");
        assert_eq!(store.list_artifacts(&ticker).expect("list"), vec![first, second]);
    }

    #[test]
    fn listing_filters_by_ticker_and_ignores_stray_files() {
        let temp = tempdir().expect("tempdir");
        let store = FsArtifactStore::new(temp.path());
        let ibm = store.save(&symbol("IBM"), b"ibm").expect("save");
        store.save(&symbol("IB"), b"ib").expect("save");
        fs::write(temp.path().join("IBM_notes.json"), b"{}").expect("write");
        fs::write(temp.path().join("README"), b"hi").expect("write");

        assert_eq!(store.list_artifacts(&symbol("IBM")).expect("list"), vec![ibm]);
    }

    #[test]
    fn missing_directory_lists_nothing() {
        let temp = tempdir().expect("tempdir");
        let store = FsArtifactStore::new(temp.path().join("absent"));
        assert!(store.list_artifacts(&symbol("TEST")).expect("list").is_empty());
        assert!(store.latest(&symbol("TEST")).expect("latest").is_none());
    }

    #[test]
    fn latest_is_chosen_by_creation_time_not_directory_order() {
        let temp = tempdir().expect("tempdir");
        let store = FsArtifactStore::new(temp.path());
        let ticker = symbol("TSLA");

        let newer = ArtifactId::new(
            &ticker,
            UtcDateTime::parse("2025-01-01T00:00:00Z").expect("timestamp"),
        )
        .expect("id");
        let older = ArtifactId::new(
            &ticker,
            UtcDateTime::parse("2019-01-01T00:00:00Z").expect("timestamp"),
        )
        .expect("id");
        fs::write(store.path_for(&newer), b"newer").expect("write");
        fs::write(store.path_for(&older), b"older").expect("write");

        let latest = store.latest(&ticker).expect("latest").expect("present");
        assert_eq!(latest.id, newer);
        assert_eq!(latest.serialized_model, b"newer");
    }

    #[test]
    fn existing_artifact_is_never_overwritten() {
        let temp = tempdir().expect("tempdir");
        let store = FsArtifactStore::new(temp.path());
        let ticker = symbol("TEST");

        let first = store.save(&ticker, b"original").expect("save");
        for _ in 0..20 {
            store.save(&ticker, b"later").expect("save");
        }

        assert_eq!(store.load_bytes(&first).expect("load"), b"original");
        assert_eq!(store.list_artifacts(&ticker).expect("list").len(), 21);
    }

    #[test]
    fn loading_unknown_id_is_a_persistence_error() {
        let temp = tempdir().expect("tempdir");
        let store = FsArtifactStore::new(temp.path());
        let id = ArtifactId::new(&symbol("TEST"), UtcDateTime::now()).expect("id");
        let err = store.load_bytes(&id).expect_err("must fail");
        assert_eq!(err.kind(), crate::VolatilityErrorKind::Persistence);
    }
}
