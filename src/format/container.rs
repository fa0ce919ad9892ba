//! Zip container transport.

use std::fs;
use std::io::{self, Cursor, Read};
use std::path::Path;
use std::sync::Arc;

use zip::ZipArchive;
use zip::result::ZipError;

use super::header::GLYPH_MAGIC;
use super::layout::CellLayout;
use crate::progress::{ProgressSink, ProgressStages, StageProgress};

/// Chunk size used while decompressing so progress can be reported.
const READ_CHUNK: usize = 64 * 1024;
/// Upper bound on the buffer reserved from an entry's declared size.
const MAX_RESERVE: usize = 64 * 1024 * 1024;

/// Errors opening the archive or locating the movie entry.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Unreadable archive: {0}")]
    Archive(#[from] ZipError),

    #[error("Invalid MRV file: none of {expected:?} found in archive")]
    MissingEntry { expected: Vec<String> },

    #[error("Entry {name} is too large to load ({size} bytes)")]
    EntryTooLarge { name: String, size: u64 },
}

/// The movie's binary stream, extracted and immutable.
#[derive(Debug, Clone)]
pub struct Container {
    data: Arc<[u8]>,
    entry: String,
    layout: CellLayout,
}

impl Container {
    /// Read a zip archive from disk and extract the movie entry.
    pub fn open<P: AsRef<Path>>(
        path: P,
        entry_names: &[String],
        stages: &ProgressStages,
        progress: &mut dyn ProgressSink,
    ) -> Result<Self, ContainerError> {
        let bytes = fs::read(path)?;
        Self::from_archive(&bytes, entry_names, stages, progress)
    }

    /// Extract the first entry of `entry_names` present in the archive.
    ///
    /// Reports the unzip stage at its band start and the decompression of the
    /// entry across the read band.
    pub fn from_archive(
        archive: &[u8],
        entry_names: &[String],
        stages: &ProgressStages,
        progress: &mut dyn ProgressSink,
    ) -> Result<Self, ContainerError> {
        progress.report(stages.unzip.map(0.0), "Unzipping MRV file...");
        let mut zip = ZipArchive::new(Cursor::new(archive))?;

        let Some(name) = entry_names
            .iter()
            .find(|name| zip.file_names().any(|n| n == name.as_str()))
            .cloned()
        else {
            return Err(ContainerError::MissingEntry {
                expected: entry_names.to_vec(),
            });
        };

        let mut entry = zip.by_name(&name)?;
        let size = entry.size();
        let capacity =
            usize::try_from(size).map_err(|_| ContainerError::EntryTooLarge {
                name: name.clone(),
                size,
            })?;

        let mut stage = StageProgress::new(progress, stages.read);
        stage.report(0.0, "Reading compressed data...");

        let mut data = Vec::with_capacity(initial_capacity(capacity));
        let mut chunk = vec![0u8; READ_CHUNK];
        loop {
            let n = entry.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            data.extend_from_slice(&chunk[..n]);
            if size > 0 {
                let percent = (data.len() as f32 / size as f32 * 100.0).min(100.0);
                stage.report(percent, "Reading compressed data...");
            }
        }
        stage.report(100.0, "Reading compressed data...");

        let layout = CellLayout::for_entry(&name, &data);
        log::debug!(
            "extracted {} ({} bytes, {} layout)",
            name,
            data.len(),
            layout.name()
        );

        Ok(Self {
            data: data.into(),
            entry: name,
            layout,
        })
    }

    /// Wrap an already-extracted stream.
    pub fn from_stream(data: impl Into<Arc<[u8]>>, layout: CellLayout) -> Self {
        Self {
            data: data.into(),
            entry: String::new(),
            layout,
        }
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Shared handle to the stream bytes.
    pub fn data(&self) -> Arc<[u8]> {
        Arc::clone(&self.data)
    }

    /// Archive entry the stream came from; empty for bare streams.
    pub fn entry(&self) -> &str {
        &self.entry
    }

    #[inline]
    pub fn layout(&self) -> CellLayout {
        self.layout
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl CellLayout {
    /// Layout for an archive entry: `.abin` entries and streams opening with
    /// the glyph magic use the glyph layout.
    pub fn for_entry(name: &str, data: &[u8]) -> Self {
        if name.ends_with(".abin") || data.starts_with(GLYPH_MAGIC) {
            CellLayout::Glyph
        } else {
            CellLayout::Pixel
        }
    }
}

/// Buffer to reserve for an entry declaring `declared` bytes.
///
/// The declared size comes from the archive and is not trusted; the buffer
/// grows past this as data is actually read.
fn initial_capacity(declared: usize) -> usize {
    declared.min(MAX_RESERVE)
}
