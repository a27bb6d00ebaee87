//! Input materializer.
//!
//! Writes decoded file parts into the request's input directory. Parts named
//! `*.zip` are treated as complete archives and expanded in place, preserving
//! their internal directory structure; everything else is written verbatim.
//! Filenames are reduced to their final normal path component before any
//! write, and archive entry paths are sanitized against absolute paths and
//! parent segments.

use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::{Component, Path, PathBuf};

use zip::ZipArchive;

use crate::error::{PipelineError, PipelineResult};
use crate::multipart::FilePart;

/// Write every part into `input_dir`, expanding zip archives.
///
/// Returns the list of file names written, in processing order. Parts whose
/// filename sanitizes to nothing are skipped with a warning. Later parts
/// overwrite earlier ones on name collision.
///
/// # Errors
///
/// Returns an error on filesystem failures or malformed archives.
pub fn materialize(parts: &[FilePart], input_dir: &Path) -> PipelineResult<Vec<String>> {
    let mut written = Vec::new();

    for part in parts {
        let Some(filename) = sanitize_filename(&part.filename) else {
            tracing::warn!(filename = %part.filename, "skipping part with unusable filename");
            continue;
        };

        if Path::new(&filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
        {
            let entries = expand_zip(&part.data, input_dir)?;
            written.extend(entries);
        } else {
            let destination = input_dir.join(&filename);
            fs::write(&destination, &part.data)
                .map_err(|source| PipelineError::io("materialize.write", &destination, source))?;
            written.push(filename);
        }
    }

    Ok(written)
}

/// Reduce an upload filename to its final normal path component.
fn sanitize_filename(filename: &str) -> Option<String> {
    Path::new(filename)
        .components()
        .filter_map(|component| match component {
            Component::Normal(segment) => segment.to_str(),
            _ => None,
        })
        .next_back()
        .map(str::to_string)
}

/// Expand an in-memory zip archive into `target`, returning entry names.
fn expand_zip(data: &[u8], target: &Path) -> PipelineResult<Vec<String>> {
    let mut archive = ZipArchive::new(Cursor::new(data))
        .map_err(|source| PipelineError::zip("expand_zip.decode", target, source))?;

    let mut written = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|source| PipelineError::zip("expand_zip.read_entry", target, source))?;
        let entry_path = sanitize_archive_path(entry.name())?;
        if entry_path.as_os_str().is_empty() {
            continue;
        }
        let destination = target.join(&entry_path);

        if entry.name().ends_with('/') {
            fs::create_dir_all(&destination).map_err(|source| {
                PipelineError::io("expand_zip.create_dir", &destination, source)
            })?;
            continue;
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| PipelineError::io("expand_zip.create_parent", parent, source))?;
        }

        let mut output = File::create(&destination)
            .map_err(|source| PipelineError::io("expand_zip.create_file", &destination, source))?;
        io::copy(&mut entry, &mut output)
            .map_err(|source| PipelineError::io("expand_zip.copy", &destination, source))?;
        written.push(entry_path.to_string_lossy().into_owned());
    }

    Ok(written)
}

/// Reject absolute paths and non-normal segments in archive entry names.
fn sanitize_archive_path(entry: &str) -> PipelineResult<PathBuf> {
    let path = Path::new(entry);
    if path.is_absolute() {
        return Err(PipelineError::InvalidInput {
            field: "archive_entry",
            reason: "absolute_path",
            value: Some(entry.to_string()),
        });
    }

    let mut sanitized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(segment) => sanitized.push(segment),
            Component::CurDir => {}
            _ => {
                return Err(PipelineError::InvalidInput {
                    field: "archive_entry",
                    reason: "invalid_segment",
                    value: Some(entry.to_string()),
                });
            }
        }
    }

    Ok(sanitized)
}
