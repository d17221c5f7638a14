//! Filesystem ownership for raw sources and derived HLS directories.
//!
//! Every read and mutation of the two storage roots goes through an
//! [`AssetStore`]. The engine, ingestion, deletion, and startup sweep never
//! build paths or call `std::fs` themselves.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::TempPath;
use tokio::io::{AsyncRead, AsyncWriteExt};

use hf_core::config::StorageConfig;
use hf_core::{Error, Result, VideoName, PLAYLIST_FILE, STAGING_PLAYLIST_FILE, SUBTITLE_FILE};

/// Storage backend for raw uploads and derived output.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Names with a committed playlist. Order is unspecified.
    async fn list_ready(&self) -> Result<Vec<VideoName>>;

    /// Names with a raw source of an accepted extension. Order is unspecified.
    async fn list_raw(&self) -> Result<Vec<VideoName>>;

    /// Location of the raw source for `name`, if one exists.
    fn raw_path(&self, name: &VideoName) -> Option<PathBuf>;

    fn raw_exists(&self, name: &VideoName) -> bool {
        self.raw_path(name).is_some()
    }

    /// Whether the commit marker (playlist) exists for `name`.
    fn ready_exists(&self, name: &VideoName) -> bool;

    /// Directory holding the playlist, subtitle track, and segments.
    fn derived_dir(&self, name: &VideoName) -> PathBuf;

    fn playlist_path(&self, name: &VideoName) -> PathBuf {
        self.derived_dir(name).join(PLAYLIST_FILE)
    }

    /// Where the encoder writes the playlist before it is committed.
    fn staging_playlist_path(&self, name: &VideoName) -> PathBuf {
        self.derived_dir(name).join(STAGING_PLAYLIST_FILE)
    }

    fn subtitle_path(&self, name: &VideoName) -> PathBuf {
        self.derived_dir(name).join(SUBTITLE_FILE)
    }

    /// Create the derived directory if missing. Idempotent.
    fn ensure_derived_dir(&self, name: &VideoName) -> Result<PathBuf>;

    /// Move the staging playlist onto the commit marker.
    fn commit_playlist(&self, name: &VideoName) -> Result<()>;

    /// Remove every raw source for `name`. Returns whether anything was removed.
    fn remove_raw(&self, name: &VideoName) -> Result<bool>;

    /// Recursively remove the derived directory. Returns whether it existed.
    async fn remove_derived(&self, name: &VideoName) -> Result<bool>;

    /// Stream `body` into a fresh hidden file in the raw root.
    ///
    /// Each call gets its own file, so concurrent uploads of one name never
    /// share bytes. Nothing is visible as a raw source until
    /// [`install_raw`](Self::install_raw).
    async fn stage_upload(
        &self,
        extension: &str,
        body: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<StagedUpload>;

    /// Replace every raw source for `name` with `staged`, as
    /// `<name>.<extension>`. Call with the name's lock held.
    fn install_raw(&self, name: &VideoName, staged: StagedUpload) -> Result<PathBuf>;
}

/// Upload bytes on disk that are not yet a raw source.
///
/// Dropping it without [`AssetStore::install_raw`] removes the file.
#[derive(Debug)]
pub struct StagedUpload {
    path: TempPath,
    extension: String,
    bytes: u64,
}

impl StagedUpload {
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Run blocking filesystem work off the async workers.
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::Internal(format!("spawn_blocking join error: {e}")))?
}

// ---------------------------------------------------------------------------
// FsAssetStore
// ---------------------------------------------------------------------------

/// [`AssetStore`] over two local directories.
#[derive(Debug, Clone)]
pub struct FsAssetStore {
    raw_dir: PathBuf,
    derived_dir: PathBuf,
    extensions: Vec<String>,
}

impl FsAssetStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            raw_dir: config.raw_dir.clone(),
            derived_dir: config.derived_dir.clone(),
            extensions: config.normalized_extensions(),
        }
    }

    /// Create both storage roots.
    pub fn init(&self) -> Result<()> {
        std::fs::create_dir_all(&self.raw_dir)?;
        std::fs::create_dir_all(&self.derived_dir)?;
        Ok(())
    }

    pub fn raw_root(&self) -> &Path {
        &self.raw_dir
    }

    pub fn derived_root(&self) -> &Path {
        &self.derived_dir
    }

    fn accepts(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }

    /// Split a raw-root filename into a video name if it is a raw source.
    fn raw_name_of(&self, path: &Path) -> Option<VideoName> {
        let ext = path.extension()?.to_str()?;
        if !self.accepts(ext) {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        VideoName::new(stem).ok()
    }

    /// Files in the raw root, or nothing if the root is absent.
    fn raw_files(&self) -> Result<Vec<PathBuf>> {
        let entries = match std::fs::read_dir(&self.raw_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        Ok(files)
    }
}

fn remove_file_if_present(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

impl FsAssetStore {
    fn scan_ready(&self) -> Result<Vec<VideoName>> {
        let entries = match std::fs::read_dir(&self.derived_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = entry
                .file_name()
                .to_str()
                .and_then(|s| VideoName::new(s).ok())
            else {
                continue;
            };
            if entry.path().join(PLAYLIST_FILE).is_file() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    fn scan_raw(&self) -> Result<Vec<VideoName>> {
        let names: BTreeSet<VideoName> = self
            .raw_files()?
            .iter()
            .filter_map(|p| self.raw_name_of(p))
            .collect();
        Ok(names.into_iter().collect())
    }
}

fn remove_dir_if_present(path: &Path) -> Result<bool> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl AssetStore for FsAssetStore {
    async fn list_ready(&self) -> Result<Vec<VideoName>> {
        let store = self.clone();
        blocking(move || store.scan_ready()).await
    }

    async fn list_raw(&self) -> Result<Vec<VideoName>> {
        let store = self.clone();
        blocking(move || store.scan_raw()).await
    }

    fn raw_path(&self, name: &VideoName) -> Option<PathBuf> {
        for ext in &self.extensions {
            let candidate = self.raw_dir.join(format!("{name}.{ext}"));
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        // Files dropped in by hand may carry an upper-case extension.
        self.raw_files()
            .ok()?
            .into_iter()
            .find(|p| self.raw_name_of(p).as_ref() == Some(name))
    }

    fn ready_exists(&self, name: &VideoName) -> bool {
        self.playlist_path(name).is_file()
    }

    fn derived_dir(&self, name: &VideoName) -> PathBuf {
        self.derived_dir.join(name.as_str())
    }

    fn ensure_derived_dir(&self, name: &VideoName) -> Result<PathBuf> {
        let dir = self.derived_dir(name);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    fn commit_playlist(&self, name: &VideoName) -> Result<()> {
        std::fs::rename(self.staging_playlist_path(name), self.playlist_path(name))?;
        Ok(())
    }

    fn remove_raw(&self, name: &VideoName) -> Result<bool> {
        let mut removed = false;
        while let Some(path) = self.raw_path(name) {
            removed |= remove_file_if_present(&path)?;
        }
        Ok(removed)
    }

    async fn remove_derived(&self, name: &VideoName) -> Result<bool> {
        let dir = self.derived_dir(name);
        blocking(move || remove_dir_if_present(&dir)).await
    }

    async fn stage_upload(
        &self,
        extension: &str,
        body: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<StagedUpload> {
        tokio::fs::create_dir_all(&self.raw_dir).await?;

        // Hidden and ending in `.upload`: never listed as a raw source.
        let raw_dir = self.raw_dir.clone();
        let suffix = format!(".{extension}.upload");
        let staged = blocking(move || {
            Ok(tempfile::Builder::new()
                .prefix(".")
                .suffix(&suffix)
                .tempfile_in(&raw_dir)?)
        })
        .await?;

        let (file, path) = staged.into_parts();
        let mut file = tokio::fs::File::from_std(file);
        let bytes = tokio::io::copy(body, &mut file).await?;
        file.flush().await?;
        file.sync_all().await?;

        tracing::debug!(bytes, path = %path.display(), "Upload staged");
        Ok(StagedUpload {
            path,
            extension: extension.to_string(),
            bytes,
        })
    }

    fn install_raw(&self, name: &VideoName, staged: StagedUpload) -> Result<PathBuf> {
        self.remove_raw(name)?;
        let target = self.raw_dir.join(format!("{name}.{}", staged.extension));
        staged.path.persist(&target).map_err(|e| e.error)?;

        tracing::debug!(name = %name, bytes = staged.bytes, path = %target.display(), "Raw source installed");
        Ok(target)
    }
}
