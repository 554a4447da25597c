//! Filesystem helpers: safe names, collision handling, disk checks

use crate::error::{DownloadError, Error, Result};
use std::path::{Path, PathBuf};

/// Maximum number of rename attempts when resolving file collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Characters never allowed in an output filename
const FORBIDDEN: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Sanitize a user- or upstream-supplied title into a filename stem
///
/// Forbidden filesystem characters and control characters become spaces,
/// runs of whitespace collapse, and leading/trailing dots are trimmed so
/// the name cannot hide as a dotfile. An empty result falls back to
/// "video".
pub fn safe_file_stem(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if FORBIDDEN.contains(&c) || c.is_control() {
                ' '
            } else {
                c
            }
        })
        .collect();

    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_matches('.').trim();

    if trimmed.is_empty() {
        "video".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Find a non-colliding path by appending " (1)", " (2)", ...
///
/// Returns the original path untouched when it is free. The suffix goes
/// before the last extension ("clip (1).mp4").
pub fn unique_path(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Ok(path.to_path_buf());
    }

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::Other(format!("cannot extract file stem from {}", path.display())))?;
    let extension = path.extension().and_then(|e| e.to_str());
    let parent = path
        .parent()
        .ok_or_else(|| Error::Other(format!("path {} has no parent directory", path.display())))?;

    for i in 1..=MAX_RENAME_ATTEMPTS {
        let candidate = match extension {
            Some(ext) => parent.join(format!("{stem} ({i}).{ext}")),
            None => parent.join(format!("{stem} ({i})")),
        };
        if !candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(Error::Other(format!(
        "could not find unique filename for {} after {MAX_RENAME_ATTEMPTS} attempts",
        path.display()
    )))
}

/// Verify a target folder exists, is a directory, and accepts writes
///
/// The write probe creates and removes a temp file in the folder, which is
/// the only check that catches read-only mounts and ACL denials before a
/// download is accepted.
pub fn ensure_writable_dir(path: &Path) -> Result<()> {
    let meta = std::fs::metadata(path)
        .map_err(|e| classify_io(e, path, "stat download folder"))?;
    if !meta.is_dir() {
        return Err(DownloadError::PermissionDenied {
            path: path.to_path_buf(),
        }
        .into());
    }

    let probe = tempfile::Builder::new()
        .prefix(".write-probe-")
        .tempfile_in(path)
        .map_err(|e| classify_io(e, path, "probe download folder"))?;
    drop(probe);
    Ok(())
}

/// Map an I/O error to the download taxonomy based on its OS kind
///
/// `ENOSPC` becomes [`DownloadError::DiskFull`], permission kinds become
/// [`DownloadError::PermissionDenied`], everything else stays an I/O error.
pub fn classify_io(err: std::io::Error, path: &Path, operation: &str) -> Error {
    match err.kind() {
        std::io::ErrorKind::PermissionDenied => DownloadError::PermissionDenied {
            path: path.to_path_buf(),
        }
        .into(),
        std::io::ErrorKind::StorageFull => DownloadError::DiskFull {
            path: path.to_path_buf(),
        }
        .into(),
        _ => {
            // Older kernels/libc may surface ENOSPC under a generic kind
            if err.raw_os_error() == Some(enospc()) {
                DownloadError::DiskFull {
                    path: path.to_path_buf(),
                }
                .into()
            } else {
                tracing::debug!(path = %path.display(), operation, error = %err, "unclassified io error");
                Error::Io(err)
            }
        }
    }
}

#[cfg(unix)]
fn enospc() -> i32 {
    libc::ENOSPC
}

#[cfg(not(unix))]
fn enospc() -> i32 {
    112 // ERROR_DISK_FULL
}

/// Get available disk space for a given path
///
/// Uses platform-specific APIs to query filesystem statistics:
/// - Linux/macOS: statvfs
/// - Windows: GetDiskFreeSpaceExW
pub fn get_available_space(path: &Path) -> std::io::Result<u64> {
    #[cfg(unix)]
    {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        // SAFETY: c_path is a valid null-terminated C string, stat is zeroed
        // before the call, and the struct is only read on success.
        unsafe {
            let mut stat: libc::statvfs = std::mem::zeroed();
            if libc::statvfs(c_path.as_ptr(), &mut stat) != 0 {
                return Err(std::io::Error::last_os_error());
            }

            // f_bavail is blocks available to unprivileged users;
            // f_frsize is the fragment size (preferred over f_bsize)
            Ok(stat.f_bavail.saturating_mul(stat.f_frsize))
        }
    }

    #[cfg(windows)]
    {
        use std::os::windows::ffi::OsStrExt;
        use winapi::um::fileapi::GetDiskFreeSpaceExW;

        let wide_path: Vec<u16> = path
            .as_os_str()
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();

        // SAFETY: wide_path is null-terminated and the output pointers are
        // valid aligned u64s, read only after a successful call.
        unsafe {
            let mut free_bytes_available: u64 = 0;
            let mut _total_bytes: u64 = 0;
            let mut _total_free_bytes: u64 = 0;

            if GetDiskFreeSpaceExW(
                wide_path.as_ptr(),
                &mut free_bytes_available as *mut u64 as *mut _,
                &mut _total_bytes as *mut u64 as *mut _,
                &mut _total_free_bytes as *mut u64 as *mut _,
            ) == 0
            {
                return Err(std::io::Error::last_os_error());
            }

            Ok(free_bytes_available)
        }
    }

    #[cfg(not(any(unix, windows)))]
    {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "Disk space checking is not supported on this platform",
        ))
    }
}
