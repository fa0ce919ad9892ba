//! Frame decoder over an indexed container.

use super::container::Container;
use super::frame::{FrameKind, FrameRecord, read_record};
use super::header::StreamHeader;
use super::index::{FrameIndex, StreamTruncation};
use super::FormatError;
use crate::cells::CellBuffer;
use crate::progress::{ProgressSink, frame_percent};

/// Decoder for one loaded movie.
///
/// Owns the container bytes and the frame index built from them. Decoding
/// mutates a caller-owned [`CellBuffer`]; delta frames are cumulative, so the
/// buffer must reflect every frame before the one being decoded.
///
/// Usage:
/// ```ignore
/// let decoder = FrameDecoder::new(container, &mut progress)?;
/// let mut cells = CellBuffer::new(decoder.header());
/// decoder.seek(120, &mut cells)?;
/// decoder.decode_frame(121, &mut cells)?;
/// ```
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    container: Container,
    header: StreamHeader,
    index: FrameIndex,
    truncation: Option<StreamTruncation>,
}

impl FrameDecoder {
    /// Parse the header and index the stream.
    ///
    /// Progress is reported on the parse stage's own 0-100 scale.
    pub fn new(
        container: Container,
        progress: &mut dyn ProgressSink,
    ) -> Result<Self, FormatError> {
        progress.report(0.0, "Reading header (width, height, fps)...");
        let header = StreamHeader::parse(container.bytes(), container.layout())?;

        progress.report(0.5, "Counting total frames...");
        let (index, truncation) = FrameIndex::scan(container.bytes(), &header);
        if index.is_empty() {
            let reason = truncation.map_or(
                super::TruncationReason::MissingMarker,
                |truncation| truncation.reason,
            );
            return Err(FormatError::NoFrames(reason));
        }
        if index.kind(0) != Some(FrameKind::Keyframe) {
            log::warn!("stream does not open with a keyframe; decoding against a blank buffer");
        }

        progress.report(
            1.0,
            &format!(
                "Total frames: {}. Starting frame parsing.",
                index.len()
            ),
        );

        Ok(Self {
            container,
            header,
            index,
            truncation,
        })
    }

    #[inline]
    pub fn header(&self) -> &StreamHeader {
        &self.header
    }

    #[inline]
    pub fn index(&self) -> &FrameIndex {
        &self.index
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Truncation found while indexing, if any.
    pub fn truncation(&self) -> Option<&StreamTruncation> {
        self.truncation.as_ref()
    }

    /// Number of playable frames.
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.index.len()
    }

    /// Borrow frame `frame`'s record.
    pub fn record(&self, frame: usize) -> Result<FrameRecord<'_>, FormatError> {
        let offset = self
            .index
            .offset(frame)
            .ok_or(FormatError::FrameOutOfRange {
                frame,
                total: self.index.len(),
            })?;
        // The index only holds offsets of records that read completely.
        let (record, _) = read_record(self.container.bytes(), offset, &self.header)
            .map_err(|stop| FormatError::NoFrames(stop.into()))?;
        Ok(record)
    }

    /// Decode exactly one record into `cells`.
    ///
    /// Only correct when `cells` already reflects frame `frame - 1`.
    pub fn decode_frame(
        &self,
        frame: usize,
        cells: &mut CellBuffer,
    ) -> Result<FrameKind, FormatError> {
        let record = self.record(frame)?;
        let applied = cells.apply(&record);
        log::trace!(
            "frame {frame}: {:?}, {} cells written",
            applied.kind,
            applied.cells_written
        );
        Ok(applied.kind)
    }

    /// Decode frames `from..=to` in order.
    pub fn decode_range(
        &self,
        from: usize,
        to: usize,
        cells: &mut CellBuffer,
    ) -> Result<(), FormatError> {
        for frame in from..=to {
            self.decode_frame(frame, cells)?;
        }
        Ok(())
    }

    /// Bring `cells` to the exact state of frame `frame` from any prior state.
    ///
    /// Replays from the nearest keyframe at or before `frame`. Without one,
    /// the buffer is reset and replayed from frame 0.
    pub fn seek(&self, frame: usize, cells: &mut CellBuffer) -> Result<FrameKind, FormatError> {
        if frame >= self.index.len() {
            return Err(FormatError::FrameOutOfRange {
                frame,
                total: self.index.len(),
            });
        }
        let start = match self.index.keyframe_at_or_before(frame) {
            Some(keyframe) => keyframe,
            None => {
                cells.reset();
                0
            }
        };
        log::trace!("seek to {frame}: replaying from {start}");
        self.decode_range(start, frame, cells)?;
        Ok(cells.last_kind().unwrap_or(FrameKind::Delta))
    }

    /// Decode the whole stream once from the header, in order.
    ///
    /// Calls `on_frame` after each record is applied and reports per-frame
    /// progress against the indexed frame count, ending with exactly 100.
    pub fn decode_stream<F>(
        &self,
        cells: &mut CellBuffer,
        progress: &mut dyn ProgressSink,
        mut on_frame: F,
    ) -> Result<usize, FormatError>
    where
        F: FnMut(usize, &FrameRecord<'_>, &CellBuffer),
    {
        let total = self.index.len();
        let bytes = self.container.bytes();
        let mut offset = self.header.size();
        let mut decoded = 0;

        while decoded < total {
            let record = match read_record(bytes, offset, &self.header) {
                Ok((record, next)) => {
                    offset = next;
                    record
                }
                Err(stop) => {
                    if decoded == 0 {
                        return Err(FormatError::NoFrames(stop.into()));
                    }
                    let reason: super::TruncationReason = stop.into();
                    log::warn!("stream decode stopped at frame {decoded}: {reason}");
                    progress.report(
                        frame_percent(decoded, total),
                        &format!("Error: {reason}! Stopping."),
                    );
                    break;
                }
            };

            let percent = frame_percent(decoded, total);
            match &record {
                FrameRecord::Keyframe(_) => progress.report(
                    percent,
                    &format!(
                        "Processing I-frame {decoded}/{total} (palette & {} cells)...",
                        self.header.cell_count()
                    ),
                ),
                FrameRecord::Delta(delta) => progress.report(
                    percent,
                    &format!(
                        "Processing P-frame {decoded}/{total} ({} deltas)...",
                        delta.len()
                    ),
                ),
            }

            cells.apply(&record);
            on_frame(decoded, &record, cells);
            decoded += 1;
        }

        progress.report(100.0, "Binary parsing complete.");
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{CellLayout, GLYPH_MAGIC, PALETTE_BYTES, TruncationReason};
    use crate::progress::NoProgress;

    fn keyframe(fill: u8, cells: usize) -> Vec<u8> {
        let mut frame = vec![0xFF];
        frame.extend(std::iter::repeat_n(fill, PALETTE_BYTES));
        frame.extend(std::iter::repeat_n(fill, cells));
        frame
    }

    fn delta(edits: &[(u8, u32)]) -> Vec<u8> {
        let mut frame = vec![0xFE];
        frame.extend_from_slice(&(edits.len() as u32).to_le_bytes());
        for (value, index) in edits {
            frame.push(*value);
            frame.extend_from_slice(&index.to_le_bytes());
        }
        frame
    }

    fn pixel_decoder(frames: &[Vec<u8>]) -> FrameDecoder {
        let mut bytes = vec![4, 0, 2, 0, 10];
        for frame in frames {
            bytes.extend_from_slice(frame);
        }
        FrameDecoder::new(Container::from_stream(bytes, CellLayout::Pixel), &mut NoProgress)
            .unwrap()
    }

    fn sample_frames() -> Vec<Vec<u8>> {
        vec![
            keyframe(7, 8),
            delta(&[(9, 5)]),
            delta(&[(1, 0), (2, 7)]),
            keyframe(3, 8),
            delta(&[(4, 4)]),
        ]
    }

    #[test]
    fn test_decode_stream_progress() {
        let decoder = pixel_decoder(&sample_frames());
        let mut cells = CellBuffer::new(decoder.header());
        let mut reports = Vec::new();
        let mut seen = Vec::new();

        let decoded = decoder
            .decode_stream(
                &mut cells,
                &mut |p: f32, m: &str| reports.push((p, m.to_string())),
                |n, record, _| seen.push((n, record.kind())),
            )
            .unwrap();

        assert_eq!(decoded, 5);
        assert_eq!(seen[3], (3, FrameKind::Keyframe));
        assert_eq!(reports.last().unwrap(), &(100.0, "Binary parsing complete.".to_string()));
        assert!(reports[..reports.len() - 1].iter().all(|(p, _)| *p < 100.0));
        assert!(reports[1].1.starts_with("Processing P-frame 1/5 (1 deltas)"));
    }

    #[test]
    fn test_seek_replays_from_keyframe() {
        let decoder = pixel_decoder(&sample_frames());

        let mut sequential = CellBuffer::new(decoder.header());
        decoder.decode_range(0, 2, &mut sequential).unwrap();

        // Jump from an unrelated state straight to frame 2.
        let mut jumped = CellBuffer::new(decoder.header());
        decoder.decode_range(0, 4, &mut jumped).unwrap();
        decoder.seek(2, &mut jumped).unwrap();

        assert_eq!(jumped, sequential);
        assert_eq!(jumped.cell(5).unwrap().palette, 9);
        assert_eq!(jumped.cell(7).unwrap().palette, 2);
    }

    #[test]
    fn test_seek_without_keyframe_resets() {
        let decoder = pixel_decoder(&[delta(&[(5, 1)]), delta(&[(6, 2)])]);
        let mut cells = CellBuffer::new(decoder.header());
        decoder.decode_range(0, 1, &mut cells).unwrap();
        decoder.seek(0, &mut cells).unwrap();

        assert_eq!(cells.cell(1).unwrap().palette, 5);
        assert_eq!(cells.cell(2).unwrap().palette, 0);
    }

    #[test]
    fn test_keyframe_decode_is_idempotent() {
        let decoder = pixel_decoder(&sample_frames());
        let mut first = CellBuffer::new(decoder.header());
        decoder.decode_frame(3, &mut first).unwrap();
        let snapshot = first.clone();
        decoder.decode_frame(4, &mut first).unwrap();
        decoder.decode_frame(3, &mut first).unwrap();

        assert!(first.same_image(&snapshot));
        assert_eq!(first.dirty(), snapshot.dirty());
    }

    #[test]
    fn test_out_of_range_frame() {
        let decoder = pixel_decoder(&sample_frames());
        let mut cells = CellBuffer::new(decoder.header());
        assert!(matches!(
            decoder.decode_frame(5, &mut cells),
            Err(FormatError::FrameOutOfRange { frame: 5, total: 5 })
        ));
    }

    #[test]
    fn test_unknown_first_marker_is_fatal() {
        let bytes = vec![4, 0, 2, 0, 10, 0x33, 0, 0];
        let err = FrameDecoder::new(Container::from_stream(bytes, CellLayout::Pixel), &mut NoProgress)
            .unwrap_err();
        assert!(matches!(
            err,
            FormatError::NoFrames(TruncationReason::UnknownMarker(0x33))
        ));
    }

    #[test]
    fn test_glyph_stream_truncated_to_available_frames() {
        let (width, height) = (3u16, 2u16);
        let cells = (width * height) as usize;
        let mut bytes = GLYPH_MAGIC.to_vec();
        bytes.extend_from_slice(&[0, 0]);
        bytes.extend_from_slice(&width.to_le_bytes());
        bytes.extend_from_slice(&height.to_le_bytes());
        bytes.extend_from_slice(&24u16.to_le_bytes());
        bytes.extend_from_slice(&100u32.to_le_bytes());

        // Keyframe followed by 39 single-edit deltas, then a cut-off delta.
        bytes.push(0x00);
        bytes.extend(std::iter::repeat_n(0x10, PALETTE_BYTES));
        for i in 0..cells {
            bytes.extend_from_slice(&[b'#', i as u8]);
        }
        for i in 0..39u32 {
            bytes.push(0x01);
            bytes.extend_from_slice(&1u32.to_le_bytes());
            bytes.extend_from_slice(&[b'.', 2]);
            bytes.extend_from_slice(&(i % cells as u32).to_le_bytes());
        }
        bytes.extend_from_slice(&[0x01, 5, 0, 0, 0, b'x']);

        let decoder =
            FrameDecoder::new(Container::from_stream(bytes, CellLayout::Glyph), &mut NoProgress)
                .unwrap();
        assert_eq!(decoder.frame_count(), 40);
        let truncation = decoder.truncation().unwrap();
        assert_eq!(truncation.declared, Some(100));
        assert_eq!(truncation.frames_indexed, 40);

        let mut buffer = CellBuffer::new(decoder.header());
        decoder.seek(39, &mut buffer).unwrap();
        assert_eq!(buffer.cell(0).unwrap().glyph, b'.');
        assert_eq!(buffer.cell(0).unwrap().palette, 2);
    }
}
