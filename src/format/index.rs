//! Frame index: one forward scan over the stream recording where each record
//! starts.

use std::fmt;

use super::frame::{FrameKind, ReadStop, read_record};
use super::header::StreamHeader;

/// Why a scan or decode pass stopped before the declared end of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruncationReason {
    /// Fewer bytes than a marker byte remained.
    MissingMarker,
    /// The marker byte is not a frame marker.
    UnknownMarker(u8),
    /// The frame's declared payload runs past the end of the data.
    ShortPayload { needed: usize, available: usize },
}

impl fmt::Display for TruncationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TruncationReason::MissingMarker => write!(f, "stream ended before the next marker"),
            TruncationReason::UnknownMarker(m) => write!(f, "unknown marker 0x{m:02x}"),
            TruncationReason::ShortPayload { needed, available } => write!(
                f,
                "frame needs {needed} payload bytes but only {available} remain"
            ),
        }
    }
}

/// Non-fatal warning: the stream holds fewer usable frames than it declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamTruncation {
    /// Offset of the marker byte where reading stopped.
    pub offset: usize,
    /// Frames successfully indexed before the stop.
    pub frames_indexed: usize,
    /// Frame count declared by the header, if any.
    pub declared: Option<u32>,
    pub reason: TruncationReason,
}

impl fmt::Display for StreamTruncation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stream truncated at offset {} after {} frames: {}",
            self.offset, self.frames_indexed, self.reason
        )?;
        if let Some(declared) = self.declared {
            write!(f, " (header declares {declared})")?;
        }
        Ok(())
    }
}

/// Byte offsets of every usable frame record.
///
/// Offsets point at marker bytes and are strictly increasing. The index is only
/// meaningful for the container it was built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameIndex {
    offsets: Vec<usize>,
    /// Frame numbers of keyframes, ascending.
    keyframes: Vec<usize>,
    /// Offset one past the last indexed record.
    end: usize,
}

impl FrameIndex {
    /// Scan `bytes` once, starting right after the header.
    ///
    /// Stops at the first marker that cannot be read completely, or at the
    /// header's declared frame count. A stop before the declared count (or,
    /// without a declared count, before the end of the data) is reported as a
    /// [`StreamTruncation`].
    pub fn scan(bytes: &[u8], header: &StreamHeader) -> (Self, Option<StreamTruncation>) {
        let limit = header
            .declared_frames
            .map_or(usize::MAX, |declared| declared as usize);
        let mut index = Self {
            offsets: Vec::new(),
            keyframes: Vec::new(),
            end: header.size(),
        };
        let mut offset = header.size();

        while index.offsets.len() < limit {
            match read_record(bytes, offset, header) {
                Ok((record, next)) => {
                    if record.is_keyframe() {
                        index.keyframes.push(index.offsets.len());
                    }
                    index.offsets.push(offset);
                    offset = next;
                    index.end = next;
                }
                Err(ReadStop::EndOfData) if header.declared_frames.is_none() => break,
                Err(stop) => {
                    let truncation = StreamTruncation {
                        offset,
                        frames_indexed: index.offsets.len(),
                        declared: header.declared_frames,
                        reason: stop.into(),
                    };
                    log::warn!("{truncation}");
                    return (index, Some(truncation));
                }
            }
        }

        log::debug!(
            "indexed {} frames ({} keyframes), {} trailing bytes",
            index.offsets.len(),
            index.keyframes.len(),
            bytes.len().saturating_sub(index.end)
        );
        (index, None)
    }

    /// Number of indexed frames.
    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Offset of frame `frame`'s marker byte.
    #[inline]
    pub fn offset(&self, frame: usize) -> Option<usize> {
        self.offsets.get(frame).copied()
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Offset one past the last indexed record.
    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Byte range `[start, end)` occupied by frame `frame`.
    pub fn span(&self, frame: usize) -> Option<(usize, usize)> {
        let start = self.offset(frame)?;
        let end = self.offset(frame + 1).unwrap_or(self.end);
        Some((start, end))
    }

    pub fn kind(&self, frame: usize) -> Option<FrameKind> {
        if frame >= self.len() {
            return None;
        }
        Some(match self.keyframes.binary_search(&frame) {
            Ok(_) => FrameKind::Keyframe,
            Err(_) => FrameKind::Delta,
        })
    }

    pub fn keyframes(&self) -> &[usize] {
        &self.keyframes
    }

    /// Latest keyframe at or before `frame`, if any.
    pub fn keyframe_at_or_before(&self, frame: usize) -> Option<usize> {
        match self.keyframes.binary_search(&frame) {
            Ok(pos) => Some(self.keyframes[pos]),
            Err(0) => None,
            Err(pos) => Some(self.keyframes[pos - 1]),
        }
    }
}

impl From<ReadStop> for TruncationReason {
    fn from(stop: ReadStop) -> Self {
        match stop {
            ReadStop::EndOfData => TruncationReason::MissingMarker,
            ReadStop::UnknownMarker(m) => TruncationReason::UnknownMarker(m),
            ReadStop::ShortPayload { needed, available } => {
                TruncationReason::ShortPayload { needed, available }
            }
        }
    }
}
