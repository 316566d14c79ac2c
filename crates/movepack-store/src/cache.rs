use crate::{write_atomic, StoreError};
use movepack_schema::DependencyDescriptor;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Local cache of dependency artifacts, keyed by their sha256.
///
/// Artifacts live at `<root>/<sha256>/<file name>` with the descriptor they
/// were fetched for next to them in `<root>/<sha256>.toml`. Every hit is
/// re-hashed before it is handed out; a corrupt entry is treated as a miss.
pub struct DependencyCache {
    download_root: PathBuf,
    preloaded: Vec<PathBuf>,
    offline: bool,
    agent: ureq::Agent,
}

impl DependencyCache {
    pub fn new(download_root: impl Into<PathBuf>) -> Self {
        Self {
            download_root: download_root.into(),
            preloaded: Vec::new(),
            offline: false,
            agent: ureq::Agent::new_with_defaults(),
        }
    }

    /// Add a read-only directory with the same layout, consulted before the
    /// download root (e.g. dependencies shipped inside the buildpack).
    #[must_use]
    pub fn with_preloaded(mut self, dir: impl Into<PathBuf>) -> Self {
        self.preloaded.push(dir.into());
        self
    }

    /// Forbid network access: only cached artifacts can be returned.
    #[must_use]
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Return a local path to the verified artifact for `dep`, fetching it if
    /// no cached copy exists.
    pub fn artifact(&self, dep: &DependencyDescriptor) -> Result<PathBuf, StoreError> {
        for root in self.preloaded.iter().chain(std::iter::once(&self.download_root)) {
            if let Some(path) = cached_artifact(root, dep)? {
                info!("using cached {} {} from {}", dep.id, dep.version, path.display());
                return Ok(path);
            }
        }

        if self.offline {
            return Err(StoreError::Offline(format!("{} {}", dep.id, dep.version)));
        }
        self.download(dep)
    }

    fn download(&self, dep: &DependencyDescriptor) -> Result<PathBuf, StoreError> {
        let dir = self.download_root.join(dep.sha256.as_str());
        fs::create_dir_all(&dir)?;

        info!("downloading {} {} from {}", dep.id, dep.version, dep.uri);
        let mut tmp = NamedTempFile::new_in(&dir)?;
        self.fetch(&dep.uri, tmp.as_file_mut())?;
        tmp.as_file().sync_all()?;

        let actual = sha256_file(tmp.path())?;
        if actual != dep.sha256.as_str() {
            return Err(StoreError::ChecksumMismatch {
                uri: dep.uri.clone(),
                expected: dep.sha256.to_string(),
                actual,
            });
        }

        let dest = dir.join(dep.artifact_name());
        tmp.persist(&dest).map_err(|e| StoreError::Io(e.error))?;

        let sidecar = self.download_root.join(format!("{}.toml", dep.sha256));
        write_atomic(&sidecar, toml::to_string(dep)?.as_bytes())?;
        debug!("cached {} at {}", dep.uri, dest.display());
        Ok(dest)
    }

    fn fetch(&self, uri: &str, out: &mut File) -> Result<(), StoreError> {
        if let Some(path) = uri.strip_prefix("file://") {
            let mut src = File::open(path).map_err(|e| StoreError::Download {
                uri: uri.to_owned(),
                reason: e.to_string(),
            })?;
            io::copy(&mut src, out)?;
            return Ok(());
        }

        if uri.starts_with("http://") || uri.starts_with("https://") {
            let resp = match self.agent.get(uri).call() {
                Ok(r) => r,
                Err(ureq::Error::StatusCode(code)) => {
                    return Err(StoreError::Download {
                        uri: uri.to_owned(),
                        reason: format!("HTTP {code}"),
                    });
                }
                Err(e) => {
                    return Err(StoreError::Download {
                        uri: uri.to_owned(),
                        reason: e.to_string(),
                    });
                }
            };
            let mut reader = resp.into_body().into_reader();
            io::copy(&mut reader, out).map_err(|e| StoreError::Download {
                uri: uri.to_owned(),
                reason: e.to_string(),
            })?;
            out.flush()?;
            return Ok(());
        }

        Err(StoreError::UnsupportedUri(uri.to_owned()))
    }
}

fn cached_artifact(
    root: &Path,
    dep: &DependencyDescriptor,
) -> Result<Option<PathBuf>, StoreError> {
    let path = root.join(dep.sha256.as_str()).join(dep.artifact_name());
    if !path.is_file() {
        return Ok(None);
    }
    let actual = sha256_file(&path)?;
    if actual == dep.sha256.as_str() {
        Ok(Some(path))
    } else {
        warn!(
            "ignoring cached {}: sha256 {actual} does not match {}",
            path.display(),
            dep.sha256
        );
        Ok(None)
    }
}

/// Lowercase hex sha256 of a file's content.
pub fn sha256_file(path: &Path) -> Result<String, StoreError> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}
