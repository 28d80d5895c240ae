use std::{io::Write, path::Path};

use tempfile::NamedTempFile;

use crate::Result;

/// Write `data` to `path` through a sibling temporary file that is persisted over the target
/// only once fully written and flushed.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(data)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|error| error.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaces_existing_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out.dwm");
        std::fs::write(&path, b"old")?;

        write_atomic(&path, b"new contents")?;
        assert_eq!(std::fs::read(&path)?, b"new contents");
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }

    #[test]
    fn test_missing_directory_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("out.dwm");
        assert!(write_atomic(&path, b"x").is_err());
        assert!(!path.exists());
    }
}
