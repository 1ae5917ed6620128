//! Atomic file output: write to a temporary file in the destination's own
//! directory, then rename over the final path. A reader never observes a
//! partially-written file, and a crash mid-write leaves the original
//! untouched.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{Error, ErrorContext, Result};

/// Write `contents` to `path` atomically.
///
/// The temporary file is created in `path`'s parent directory (falling
/// back to `.` if `path` has none) so the final rename is same-filesystem
/// and therefore atomic on every platform this tool targets.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    let context = ErrorContext::path(path);

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::io(context.clone(), e))?;
    tmp.write_all(contents).map_err(|e| Error::io(context.clone(), e))?;
    tmp.flush().map_err(|e| Error::io(context.clone(), e))?;
    tmp.persist(path)
        .map_err(|e| Error::io(context.clone(), e.error))?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    #[test]
    fn writes_full_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        write_atomic(&path, b"hello world").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"hello world");
    }

    #[test]
    fn overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        fs::write(&path, b"stale").unwrap();
        write_atomic(&path, b"fresh").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"fresh");
    }
}
