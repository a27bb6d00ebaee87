//! Output packager.
//!
//! Serializes the output area into a single in-memory zip archive. Files are
//! visited depth-first in filename order so the archive is deterministic;
//! directories contribute no explicit entries.

use std::fs::File;
use std::io::{self, Cursor};
use std::path::Path;

use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::{FileOptions, ZipWriter};

use crate::error::{PipelineError, PipelineResult};

/// Pack every regular file under `output_dir` into a zip archive.
///
/// Entry paths are relative to `output_dir` with forward-slash separators.
///
/// # Errors
///
/// Returns an error when traversal, reads, or archive serialization fail.
pub fn pack(output_dir: &Path) -> PipelineResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(output_dir).sort_by_file_name() {
        let entry =
            entry.map_err(|source| PipelineError::walkdir("pack.walk", output_dir, source))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(output_dir).map_err(|_| {
            PipelineError::InvalidInput {
                field: "output_entry",
                reason: "outside_output_dir",
                value: Some(path.to_string_lossy().into_owned()),
            }
        })?;
        let name = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        writer
            .start_file(name.as_str(), options)
            .map_err(|source| PipelineError::zip("pack.start_entry", path, source))?;
        let mut file =
            File::open(path).map_err(|source| PipelineError::io("pack.open", path, source))?;
        io::copy(&mut file, &mut writer)
            .map_err(|source| PipelineError::io("pack.copy", path, source))?;
    }

    let cursor = writer
        .finish()
        .map_err(|source| PipelineError::zip("pack.finish", output_dir, source))?;
    Ok(cursor.into_inner())
}

/// List `(path, bytes)` pairs of an in-memory archive, for tests and tooling.
///
/// # Errors
///
/// Returns an error when the archive cannot be decoded.
pub fn list_entries(archive: &[u8]) -> PipelineResult<Vec<(String, Vec<u8>)>> {
    let mut reader = zip::ZipArchive::new(Cursor::new(archive))
        .map_err(|source| PipelineError::zip("list_entries.decode", "<memory>", source))?;
    let mut entries = Vec::new();
    for index in 0..reader.len() {
        let mut entry = reader
            .by_index(index)
            .map_err(|source| PipelineError::zip("list_entries.read", "<memory>", source))?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let mut data = Vec::new();
        io::copy(&mut entry, &mut data)
            .map_err(|source| PipelineError::io("list_entries.copy", &name, source))?;
        entries.push((name, data));
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn pack_preserves_paths_and_bytes() -> Result<()> {
        let dir = TempDir::new()?;
        fs::create_dir_all(dir.path().join("photo"))?;
        fs::write(dir.path().join("photo/photo-xl.webp"), b"XL")?;
        fs::write(dir.path().join("photo/photo-sm.webp"), b"SM")?;

        let archive = pack(dir.path())?;
        let mut entries = list_entries(&archive)?;
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "photo/photo-sm.webp");
        assert_eq!(entries[0].1, b"SM");
        assert_eq!(entries[1].0, "photo/photo-xl.webp");
        Ok(())
    }

    #[test]
    fn empty_output_area_packs_to_an_empty_archive() -> Result<()> {
        let dir = TempDir::new()?;
        let archive = pack(dir.path())?;
        assert!(list_entries(&archive)?.is_empty());
        Ok(())
    }

    #[test]
    fn packing_is_deterministic() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("b.webp"), b"B")?;
        fs::write(dir.path().join("a.webp"), b"A")?;
        let first = pack(dir.path())?;
        let second = pack(dir.path())?;
        assert_eq!(
            list_entries(&first)?
                .iter()
                .map(|(name, _)| name.clone())
                .collect::<Vec<_>>(),
            vec!["a.webp".to_string(), "b.webp".to_string()]
        );
        assert_eq!(list_entries(&first)?, list_entries(&second)?);
        Ok(())
    }
}
