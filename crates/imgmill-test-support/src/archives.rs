//! In-memory zip fixtures.

use std::io::{Cursor, Write};

use anyhow::Result;
use zip::CompressionMethod;
use zip::write::{FileOptions, ZipWriter};

/// Build a zip archive in memory from `(entry name, payload)` pairs.
///
/// Entry names may include directory separators; directory entries are
/// created implicitly by the archive format.
///
/// # Errors
///
/// Returns an error if the archive cannot be serialized.
pub fn build_zip(entries: &[(&str, &[u8])]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, payload) in entries {
        writer.start_file(*name, options)?;
        writer.write_all(payload)?;
    }
    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn archive_round_trips_entries() -> Result<()> {
        let bytes = build_zip(&[("one.txt", b"hello"), ("dir/two.txt", b"world")])?;
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
        assert_eq!(archive.len(), 2);
        let mut contents = String::new();
        archive.by_name("one.txt")?.read_to_string(&mut contents)?;
        assert_eq!(contents, "hello");
        Ok(())
    }
}
