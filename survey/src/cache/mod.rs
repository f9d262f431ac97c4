//! Survey cache and JSON dumps.
//!
//! Ingesting a large workbook is slow, so the parsed survey is written next
//! to it (or into the configured cache directory) as
//! `_<stem>.cache.json.gz`. The cache carries the BLAKE3 digest of the
//! workbook it was built from; a cache whose digest no longer matches is
//! rebuilt.

pub mod atomic;

use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::ingest;
use crate::schema::SurveyData;
use crate::{Error, Result};

/// Bumped whenever the cached data layout changes.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// On-disk cache file contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEnvelope {
    pub version: u32,
    /// BLAKE3 hex digest of the source workbook.
    pub source_digest: String,
    pub created_at: DateTime<Utc>,
    pub data: SurveyData,
}

/// How [`load_survey`] treats the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Cache directory; `None` puts the cache next to the source.
    pub cache_dir: Option<PathBuf>,
    pub compress: bool,
    pub use_cache: bool,
    /// Ignore any existing cache and re-ingest the workbook.
    pub rebuild: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            cache_dir: None,
            compress: true,
            use_cache: true,
            rebuild: false,
        }
    }
}

impl From<&Config> for LoadOptions {
    fn from(config: &Config) -> Self {
        Self {
            cache_dir: config.cache_dir.clone(),
            compress: config.compress_cache,
            use_cache: config.use_cache,
            rebuild: false,
        }
    }
}

/// Where loaded survey data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOrigin {
    Cache,
    Workbook,
    Dump,
}

impl DataOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataOrigin::Cache => "cache",
            DataOrigin::Workbook => "workbook",
            DataOrigin::Dump => "dump",
        }
    }
}

/// Survey data plus the file it was read from.
#[derive(Debug, Clone)]
pub struct LoadedSurvey {
    pub data: SurveyData,
    pub origin: DataOrigin,
    pub path: PathBuf,
}

/// Metadata about an existing cache file.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheInfo {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub questions: usize,
    pub responses: usize,
    /// Whether the cache was built from the current source file.
    /// `None` when the source is gone.
    pub fresh: Option<bool>,
}

/// Cache file path for a source workbook.
pub fn cache_path(source: &Path, cache_dir: Option<&Path>, compress: bool) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = if compress { "cache.json.gz" } else { "cache.json" };
    let name = format!("_{}.{}", stem, ext);

    match cache_dir {
        Some(dir) => dir.join(name),
        None => source.with_file_name(name),
    }
}

/// Check if a path names a plain JSON dump rather than a workbook.
pub fn is_dump(path: &Path) -> bool {
    let name = path.to_string_lossy();
    name.ends_with(".json") || name.ends_with(".json.gz")
}

fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

/// Load a survey from a dump, a valid cache, or the workbook itself.
///
/// A freshly ingested workbook is written back to the cache; a failed write
/// is logged and otherwise ignored.
pub fn load_survey(source: &Path, options: &LoadOptions) -> Result<LoadedSurvey> {
    if is_dump(source) {
        let data = read_dump(source)?;
        return Ok(LoadedSurvey {
            data,
            origin: DataOrigin::Dump,
            path: source.to_path_buf(),
        });
    }

    let cache = cache_path(source, options.cache_dir.as_deref(), options.compress);
    let source_exists = source.exists();

    if options.use_cache && !options.rebuild {
        if let Some(data) = read_valid_cache(&cache, source, source_exists) {
            return Ok(LoadedSurvey {
                data,
                origin: DataOrigin::Cache,
                path: cache,
            });
        }
    }

    if !source_exists {
        return Err(Error::NoData {
            cache,
            workbook: source.to_path_buf(),
        });
    }

    let data = ingest::read_workbook(source)?;

    if options.use_cache {
        if let Err(e) = write_cache(&cache, source, &data) {
            tracing::warn!(path = %cache.display(), "failed to write cache: {}", e);
        }
    }

    Ok(LoadedSurvey {
        data,
        origin: DataOrigin::Workbook,
        path: source.to_path_buf(),
    })
}

/// Read the cache if it exists, has the current format and matches the source.
fn read_valid_cache(cache: &Path, source: &Path, source_exists: bool) -> Option<SurveyData> {
    if !cache.exists() {
        tracing::debug!(path = %cache.display(), "no cache file");
        return None;
    }

    let envelope: CacheEnvelope = match read_json(cache) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(path = %cache.display(), "ignoring unreadable cache: {}", e);
            return None;
        }
    };

    if envelope.version != CACHE_FORMAT_VERSION {
        tracing::info!(
            found = envelope.version,
            expected = CACHE_FORMAT_VERSION,
            "cache format changed, rebuilding"
        );
        return None;
    }

    if source_exists {
        match source_digest(source) {
            Ok(digest) if digest == envelope.source_digest => {}
            Ok(_) => {
                tracing::info!(path = %source.display(), "source changed since cache was built");
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %source.display(), "failed to hash source: {}", e);
                return None;
            }
        }
    }

    tracing::info!(
        path = %cache.display(),
        created_at = %envelope.created_at,
        "loaded survey from cache"
    );
    Some(envelope.data)
}

/// Ingest the workbook and (re)write its cache unconditionally.
pub fn build_cache(source: &Path, options: &LoadOptions) -> Result<PathBuf> {
    let data = ingest::read_workbook(source)?;
    let cache = cache_path(source, options.cache_dir.as_deref(), options.compress);
    write_cache(&cache, source, &data)?;
    Ok(cache)
}

fn write_cache(cache: &Path, source: &Path, data: &SurveyData) -> Result<()> {
    let envelope = CacheEnvelope {
        version: CACHE_FORMAT_VERSION,
        source_digest: source_digest(source)?,
        created_at: Utc::now(),
        data: data.clone(),
    };
    write_json(cache, &envelope)?;
    tracing::info!(path = %cache.display(), "wrote survey cache");
    Ok(())
}

/// Remove the cache file for a source. Returns false if there was none.
pub fn clear_cache(source: &Path, options: &LoadOptions) -> Result<bool> {
    let cache = cache_path(source, options.cache_dir.as_deref(), options.compress);
    match fs::remove_file(&cache) {
        Ok(()) => {
            tracing::info!(path = %cache.display(), "removed survey cache");
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Describe the cache file for a source, if one exists.
pub fn cache_info(source: &Path, options: &LoadOptions) -> Result<Option<CacheInfo>> {
    let cache = cache_path(source, options.cache_dir.as_deref(), options.compress);
    if !cache.exists() {
        return Ok(None);
    }

    let size_bytes = fs::metadata(&cache)?.len();
    let envelope: CacheEnvelope = read_json(&cache)?;
    let fresh = if source.exists() {
        Some(source_digest(source)? == envelope.source_digest)
    } else {
        None
    };

    Ok(Some(CacheInfo {
        path: cache,
        size_bytes,
        version: envelope.version,
        created_at: envelope.created_at,
        questions: envelope.data.schema.len(),
        responses: envelope.data.responses.len(),
        fresh,
    }))
}

/// Write survey data as plain JSON, gzipped when the path ends in `.gz`.
pub fn write_dump(path: &Path, data: &SurveyData) -> Result<()> {
    write_json(path, data)
}

/// Read a plain JSON survey dump.
pub fn read_dump(path: &Path) -> Result<SurveyData> {
    if !path.exists() {
        return Err(Error::NotFound(format!("data file {}", path.display())));
    }
    read_json(path)
}

/// BLAKE3 hex digest of a file's contents.
fn source_digest(path: &Path) -> Result<String> {
    let content = fs::read(path)?;
    Ok(blake3::hash(&content).to_hex().to_string())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = BufReader::new(File::open(path)?);
    let reader: Box<dyn Read> = if is_gzip(path) {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(serde_json::from_reader(reader)?)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = if is_gzip(path) {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        serde_json::to_writer(&mut encoder, value)?;
        encoder.finish()?
    } else {
        serde_json::to_vec(value)?
    };
    atomic::write_file(path, &content)?;
    Ok(())
}
