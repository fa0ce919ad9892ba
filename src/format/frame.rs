//! Frame records: borrowed views into the container bytes.

use super::header::{StreamHeader, read_u32};
use super::layout::{CellLayout, EDIT_COUNT_BYTES, Edit, Marker, PALETTE_BYTES};

/// Full palette and cell raster.
#[derive(Debug, Clone, Copy)]
pub struct Keyframe<'a> {
    /// 256 RGB triples.
    pub palette: &'a [u8],
    /// `width * height * cell_stride` raw cell bytes.
    pub cells: &'a [u8],
}

/// Ordered list of cell edits against the previous frame.
#[derive(Debug, Clone, Copy)]
pub struct DeltaFrame<'a> {
    layout: CellLayout,
    edits: &'a [u8],
}

impl<'a> DeltaFrame<'a> {
    /// Number of edits in this frame.
    #[inline]
    pub fn len(&self) -> usize {
        self.edits.len() / self.layout.edit_stride()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Edits in stream order; later edits to the same index win.
    pub fn edits(&self) -> impl ExactSizeIterator<Item = Edit> + use<'a> {
        let layout = self.layout;
        self.edits
            .chunks_exact(layout.edit_stride())
            .map(move |chunk| layout.read_edit(chunk))
    }
}

/// One decoded frame record.
#[derive(Debug, Clone, Copy)]
pub enum FrameRecord<'a> {
    Keyframe(Keyframe<'a>),
    Delta(DeltaFrame<'a>),
}

impl FrameRecord<'_> {
    #[inline]
    pub fn is_keyframe(&self) -> bool {
        matches!(self, FrameRecord::Keyframe(_))
    }

    /// Short label used by progress messages and debug output.
    pub fn kind(&self) -> FrameKind {
        match self {
            FrameRecord::Keyframe(_) => FrameKind::Keyframe,
            FrameRecord::Delta(_) => FrameKind::Delta,
        }
    }
}

/// Kind of a frame record without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    Keyframe,
    Delta,
}

/// Why a record could not be read at some offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStop {
    /// No bytes left for a marker.
    EndOfData,
    /// Marker byte is not a frame marker.
    UnknownMarker(u8),
    /// The declared payload runs past the end of the data.
    ShortPayload { needed: usize, available: usize },
}

/// Read the record whose marker byte sits at `offset`.
///
/// Returns the record and the offset of the next marker.
pub fn read_record<'a>(
    bytes: &'a [u8],
    offset: usize,
    header: &StreamHeader,
) -> Result<(FrameRecord<'a>, usize), ReadStop> {
    let layout = header.layout;
    let Some(&marker) = bytes.get(offset) else {
        return Err(ReadStop::EndOfData);
    };
    let body = offset + 1;
    let available = bytes.len() - body;

    match layout.classify(marker) {
        Marker::End => Err(ReadStop::UnknownMarker(marker)),
        Marker::Keyframe => {
            let needed = layout.keyframe_payload(header.cell_count());
            if needed > available {
                return Err(ReadStop::ShortPayload { needed, available });
            }
            let palette = &bytes[body..body + PALETTE_BYTES];
            let cells = &bytes[body + PALETTE_BYTES..body + needed];
            Ok((FrameRecord::Keyframe(Keyframe { palette, cells }), body + needed))
        }
        Marker::Delta => {
            if EDIT_COUNT_BYTES > available {
                return Err(ReadStop::ShortPayload {
                    needed: EDIT_COUNT_BYTES,
                    available,
                });
            }
            let count = read_u32(bytes, body) as usize;
            let edits_start = body + EDIT_COUNT_BYTES;
            let needed = count
                .checked_mul(layout.edit_stride())
                .and_then(|n| n.checked_add(EDIT_COUNT_BYTES))
                .unwrap_or(usize::MAX);
            if needed > available {
                return Err(ReadStop::ShortPayload { needed, available });
            }
            let end = body + needed;
            let edits = &bytes[edits_start..end];
            Ok((FrameRecord::Delta(DeltaFrame { layout, edits }), end))
        }
    }
}
