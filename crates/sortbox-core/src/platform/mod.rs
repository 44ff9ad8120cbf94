#[cfg(target_os = "windows")]
pub mod windows;

use std::fs::Metadata;
use std::io;
use std::path::Path;

/// Stable identity of a directory, used to refuse walking into the same
/// directory twice through links or junctions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileIdentity {
    Inode { dev: u64, ino: u64 },
    Path(String),
}

#[cfg(unix)]
pub fn file_identity(_path: &Path, metadata: &Metadata) -> Option<FileIdentity> {
    use std::os::unix::fs::MetadataExt;
    Some(FileIdentity::Inode {
        dev: metadata.dev(),
        ino: metadata.ino(),
    })
}

#[cfg(not(unix))]
pub fn file_identity(path: &Path, _metadata: &Metadata) -> Option<FileIdentity> {
    std::fs::canonicalize(path)
        .ok()
        .map(|p| FileIdentity::Path(p.to_string_lossy().to_lowercase()))
}

/// True when a rename failed only because source and destination live on
/// different devices/volumes, so copy-then-delete is the way to move it.
pub fn is_cross_device(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::Unsupported {
        return true;
    }
    match err.raw_os_error() {
        #[cfg(unix)]
        Some(code) => code == 18, // EXDEV
        #[cfg(target_os = "windows")]
        Some(code) => windows::is_not_same_device(code),
        #[cfg(not(any(unix, target_os = "windows")))]
        Some(_) => false,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_counts_as_cross_device() {
        let err = io::Error::new(io::ErrorKind::Unsupported, "no rename");
        assert!(is_cross_device(&err));
    }

    #[test]
    fn not_found_is_not_cross_device() {
        let err = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert!(!is_cross_device(&err));
    }

    #[cfg(unix)]
    #[test]
    fn exdev_is_cross_device() {
        assert!(is_cross_device(&io::Error::from_raw_os_error(18)));
    }
}
