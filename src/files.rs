use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Replaces `path` with `contents` through a sibling temporary file and a rename,
/// so readers see either the old or the new file and never a partial one.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|why| why.error)?;

    Ok(())
}

/// [`write_atomic`] off the async runtime.
pub async fn write_atomic_async(path: &Path, contents: Vec<u8>) -> io::Result<()> {
    let path = path.to_path_buf();

    tokio::task::spawn_blocking(move || write_atomic(&path, &contents))
        .await
        .map_err(|why| io::Error::new(io::ErrorKind::Other, why))?
}
