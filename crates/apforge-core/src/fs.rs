//! Flag and value files, and atomic document writes.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{ProvisionError, Result};

/// A flag is on when its file exists, whatever it contains.
pub fn read_flag(path: &Path) -> bool {
    path.exists()
}

/// Trimmed contents of a value file.
///
/// `None` when the file is missing, unreadable or blank; read failures other
/// than "not found" are logged.
pub fn read_value(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(contents) => {
            let value = contents.trim();
            if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            }
        }
        Err(err) if err.kind() == ErrorKind::NotFound => None,
        Err(err) => {
            tracing::warn!("Ignoring unreadable {}: {}", path.display(), err);
            None
        }
    }
}

/// Radio channel from `path`, or `default` when missing or not a positive
/// number.
pub fn read_channel(path: &Path, default: u16) -> u16 {
    let Some(raw) = read_value(path) else {
        return default;
    };
    match raw.parse::<u16>() {
        Ok(channel) if channel > 0 => channel,
        _ => {
            tracing::warn!(
                "Invalid channel '{}' in {}, using {}",
                raw,
                path.display(),
                default
            );
            default
        }
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    PathBuf::from(tmp_name)
}

fn discard(tmp_path: &Path) {
    if let Err(err) = fs::remove_file(tmp_path) {
        if err.kind() != ErrorKind::NotFound {
            tracing::warn!("Failed to remove {}: {}", tmp_path.display(), err);
        }
    }
}

/// Write and fsync `contents` to `<path>.tmp`, returning the tmp path.
///
/// The tmp file is removed again if any step fails.
fn stage(path: &Path, contents: &str) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            ProvisionError::io_error(format!("creating {}", parent.display()), e)
        })?;
    }

    let tmp_path = tmp_path_for(path);
    let mut options = fs::OpenOptions::new();
    options.create(true).write(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(&tmp_path)
        .map_err(|e| ProvisionError::io_error(format!("opening {}", tmp_path.display()), e))?;

    let written = file
        .write_all(contents.as_bytes())
        .map_err(|e| ProvisionError::io_error(format!("writing {}", tmp_path.display()), e))
        .and_then(|()| {
            file.sync_all().map_err(|e| {
                ProvisionError::io_error(format!("syncing {}", tmp_path.display()), e)
            })
        });
    drop(file);
    if let Err(err) = written {
        discard(&tmp_path);
        return Err(err);
    }
    Ok(tmp_path)
}

fn commit(tmp_path: &Path, path: &Path) -> Result<()> {
    fs::rename(tmp_path, path).map_err(|e| {
        discard(tmp_path);
        ProvisionError::io_error(
            format!("renaming {} -> {}", tmp_path.display(), path.display()),
            e,
        )
    })
}

/// Write `contents` to `<path>.tmp`, fsync, then rename over `path`.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let tmp_path = stage(path, contents)?;
    commit(&tmp_path, path)
}

/// Replace a set of documents together.
///
/// Every document is staged and fsynced before the first rename, so a
/// failure while staging leaves all targets untouched and no tmp files
/// behind.
pub fn write_all_atomic<'a, I>(documents: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator<Item = (PathBuf, &'a str)>,
{
    let mut staged: Vec<(PathBuf, PathBuf)> = Vec::new();
    for (path, contents) in documents {
        match stage(&path, contents) {
            Ok(tmp_path) => staged.push((tmp_path, path)),
            Err(err) => {
                for (tmp_path, _) in &staged {
                    discard(tmp_path);
                }
                return Err(err);
            }
        }
    }

    let mut written = Vec::with_capacity(staged.len());
    let mut pending = staged.into_iter();
    while let Some((tmp_path, path)) = pending.next() {
        if let Err(err) = commit(&tmp_path, &path) {
            for (tmp_path, _) in pending {
                discard(&tmp_path);
            }
            return Err(err);
        }
        written.push(path);
    }
    Ok(written)
}

/// Remove `path` if it exists. Returns whether a file was removed.
pub fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(ProvisionError::io_error(
            format!("removing {}", path.display()),
            err,
        )),
    }
}
