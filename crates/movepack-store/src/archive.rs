use crate::StoreError;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::os::unix::fs::PermissionsExt;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const ZIP_MAGIC: [u8; 4] = *b"PK\x03\x04";
const USTAR_MAGIC: &[u8] = b"ustar";
const USTAR_OFFSET: u64 = 257;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    TarGz,
    Tar,
    Zip,
}

impl ArchiveKind {
    /// Classify by file name, falling back to the leading bytes.
    pub fn detect(path: &Path) -> Result<Self, StoreError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            return Ok(Self::TarGz);
        }
        if name.ends_with(".tar") {
            return Ok(Self::Tar);
        }
        if name.ends_with(".zip") {
            return Ok(Self::Zip);
        }
        Self::sniff(path)
    }

    fn sniff(path: &Path) -> Result<Self, StoreError> {
        let mut file = File::open(path)?;
        let mut head = [0u8; 4];
        let n = file.read(&mut head)?;
        if n >= 2 && head[..2] == GZIP_MAGIC {
            return Ok(Self::TarGz);
        }
        if n == 4 && head == ZIP_MAGIC {
            return Ok(Self::Zip);
        }
        let mut magic = [0u8; 5];
        if file.seek(SeekFrom::Start(USTAR_OFFSET)).is_ok()
            && file.read_exact(&mut magic).is_ok()
            && magic == USTAR_MAGIC
        {
            return Ok(Self::Tar);
        }
        Err(StoreError::UnsupportedArchive(path.display().to_string()))
    }
}

/// Expand `artifact` into `dest`, dropping the first `strip_components`
/// path components of every entry.
pub fn extract(artifact: &Path, dest: &Path, strip_components: usize) -> Result<(), StoreError> {
    fs::create_dir_all(dest)?;
    let kind = ArchiveKind::detect(artifact)?;
    debug!("extracting {} ({kind:?}) into {}", artifact.display(), dest.display());
    match kind {
        ArchiveKind::TarGz => {
            let reader = GzDecoder::new(BufReader::new(File::open(artifact)?));
            unpack_tar(tar::Archive::new(reader), dest, strip_components)
        }
        ArchiveKind::Tar => {
            let reader = BufReader::new(File::open(artifact)?);
            unpack_tar(tar::Archive::new(reader), dest, strip_components)
        }
        ArchiveKind::Zip => {
            let reader = BufReader::new(File::open(artifact)?);
            unpack_zip(zip::ZipArchive::new(reader)?, dest, strip_components)
        }
    }
}

fn unpack_tar<R: Read>(
    mut archive: tar::Archive<R>,
    dest: &Path,
    strip_components: usize,
) -> Result<(), StoreError> {
    archive.set_preserve_permissions(true);
    archive.set_preserve_mtime(false);
    archive.set_unpack_xattrs(false);

    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        let Some(relative) = strip_path(&path, strip_components)? else {
            continue;
        };
        let target = dest.join(relative);
        if entry.header().entry_type().is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        entry.unpack(&target)?;
    }
    Ok(())
}

/// Entry path without its leading components, or `None` when nothing is left.
fn strip_path(path: &Path, strip_components: usize) -> Result<Option<PathBuf>, StoreError> {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => {
                return Err(StoreError::Archive(format!(
                    "invalid archive path: {}",
                    path.display()
                )));
            }
        }
    }
    let stripped: PathBuf = clean.components().skip(strip_components).collect();
    if stripped.as_os_str().is_empty() {
        Ok(None)
    } else {
        Ok(Some(stripped))
    }
}

fn unpack_zip<R: Read + Seek>(
    mut archive: zip::ZipArchive<R>,
    dest: &Path,
    strip_components: usize,
) -> Result<(), StoreError> {
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let Some(relative) = strip_path(Path::new(entry.name()), strip_components)? else {
            continue;
        };
        let target = dest.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        io::copy(&mut entry, &mut File::create(&target)?)?;
        if let Some(mode) = entry.unix_mode() {
            fs::set_permissions(&target, fs::Permissions::from_mode(mode & 0o7777))?;
        }
    }
    Ok(())
}
