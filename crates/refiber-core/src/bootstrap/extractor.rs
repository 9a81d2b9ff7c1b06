//! Release archive extraction (.tar.gz) with root folder remapping

use crate::error::ExtractError;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::ffi::OsStr;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use tar::{Archive, EntryType};

/// Extract the `root_folder` directory of a .tar.gz archive into `dest_root`
///
/// Entries are remapped so that `<root_folder>/a/b` lands at `<dest_root>/a/b`.
/// Anything outside `<root_folder>/` (pax headers, top-level license files)
/// is ignored. An entry whose target would fall outside `dest_root` aborts
/// the whole extraction with [`ExtractError::IllegalPath`].
///
/// Nothing is rolled back on failure: entries processed before the error
/// stay on disk.
pub fn extract_tar_gz(
    archive_path: &Path,
    dest_root: &Path,
    root_folder: &str,
) -> Result<(), ExtractError> {
    let file = File::open(archive_path).map_err(|source| ExtractError::Open {
        path: archive_path.to_path_buf(),
        source,
    })?;

    extract_from_reader(GzDecoder::new(file), dest_root, root_folder)
}

/// Same as [`extract_tar_gz`] for an already decompressed tar stream
pub fn extract_from_reader<R: Read>(
    reader: R,
    dest_root: &Path,
    root_folder: &str,
) -> Result<(), ExtractError> {
    let mut archive = Archive::new(reader);
    let prefix = format!("{}/", root_folder).into_bytes();

    let entries = archive.entries().map_err(ExtractError::ReadEntry)?;
    for entry in entries {
        let mut entry = entry.map_err(ExtractError::ReadEntry)?;
        let raw_name = entry.path_bytes().into_owned();
        let name = String::from_utf8_lossy(&raw_name).into_owned();

        let Some(relative) = raw_name.strip_prefix(prefix.as_slice()) else {
            tracing::debug!(entry = %name, "skipping entry outside root folder");
            continue;
        };

        let relative = lexical_relative(relative)
            .ok_or_else(|| ExtractError::NonUtf8Path { name: name.clone() })?;
        let target = dest_root.join(&relative);
        if escapes_root(&relative) {
            return Err(ExtractError::IllegalPath { path: target });
        }

        let entry_type = entry.header().entry_type();
        if entry_type.is_dir() {
            fs::create_dir_all(&target).map_err(|source| ExtractError::CreateDir {
                path: target.clone(),
                source,
            })?;
            continue;
        }

        if !matches!(entry_type, EntryType::Regular | EntryType::Continuous) {
            tracing::debug!(entry = %name, ?entry_type, "skipping non-regular entry");
            continue;
        }

        // The root folder itself ("<root>/") normalizes to the destination
        if relative.as_os_str().is_empty() {
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| ExtractError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mode = entry.header().mode().map_err(ExtractError::ReadEntry)?;

        // Scoped so the output handle is closed before the next entry
        {
            let mut out = File::create(&target).map_err(|source| ExtractError::CreateFile {
                path: target.clone(),
                source,
            })?;
            io::copy(&mut entry, &mut out).map_err(|source| ExtractError::WriteFile {
                path: target.clone(),
                source,
            })?;
            set_mode(&out, mode).map_err(|source| ExtractError::SetPermissions {
                path: target.clone(),
                source,
            })?;
        }

        tracing::debug!(path = %target.display(), mode = format_args!("{:o}", mode), "extracted");
    }

    Ok(())
}

/// Clean a slash-separated archive path without touching the filesystem
///
/// `.` segments vanish, `..` pops the previous segment, and `..` segments
/// that cannot be popped are kept at the front so the caller can see the
/// path climbing out of its root. Leading slashes are dropped: archive
/// names are always relative to the archive root. Segment bytes are kept
/// as-is; `None` only where the platform cannot represent them.
fn lexical_relative(path: &[u8]) -> Option<PathBuf> {
    let mut parts: Vec<&[u8]> = Vec::new();
    for segment in path.split(|&b| b == b'/') {
        match segment {
            b"" | b"." => {}
            b".." => match parts.last() {
                Some(&last) if last != &b".."[..] => {
                    parts.pop();
                }
                _ => parts.push(b".."),
            },
            other => parts.push(other),
        }
    }
    parts.into_iter().map(segment_os_str).collect()
}

#[cfg(unix)]
fn segment_os_str(segment: &[u8]) -> Option<&OsStr> {
    use std::os::unix::ffi::OsStrExt;
    Some(OsStr::from_bytes(segment))
}

#[cfg(not(unix))]
fn segment_os_str(segment: &[u8]) -> Option<&OsStr> {
    std::str::from_utf8(segment).ok().map(OsStr::new)
}

fn escapes_root(relative: &Path) -> bool {
    match relative.components().next() {
        Some(Component::ParentDir) => true,
        // A drive prefix or root would make `join` discard the destination
        Some(Component::Prefix(_)) | Some(Component::RootDir) => true,
        _ => false,
    }
}

#[cfg(unix)]
fn set_mode(file: &File, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(mode & 0o7777))
}

#[cfg(not(unix))]
fn set_mode(_file: &File, _mode: u32) -> io::Result<()> {
    Ok(())
}
