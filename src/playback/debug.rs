//! Debug views of a playback session: the variable snapshot and the listing
//! of the current frame's edits.

use std::fmt;

use serde::Serialize;

use super::clock::PlaybackState;
use crate::cells::CellBuffer;
use crate::format::{CellLayout, FrameRecord};

/// Human-readable playback variables, formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DebugSnapshot {
    /// `"current / total"`.
    pub frame: String,
    pub playing: bool,
    pub scale: String,
    pub translate_x: String,
    pub translate_y: String,
    pub rotation: String,
    pub rate: String,
}

impl DebugSnapshot {
    pub fn capture(state: &PlaybackState, total_frames: usize) -> Self {
        let view = &state.transform;
        Self {
            frame: format!("{} / {}", state.current_frame, total_frames),
            playing: state.is_playing(),
            scale: format!("{:.2}", view.scale),
            translate_x: format!("{:.0}px", view.translate_x),
            translate_y: format!("{:.0}px", view.translate_y),
            rotation: format!("{}°", view.rotation),
            rate: format!("{:.1}x", state.rate),
        }
    }

    /// `(key, value)` pairs in display order.
    pub fn entries(&self) -> [(&'static str, String); 7] {
        [
            ("Frame", self.frame.clone()),
            ("Playing", self.playing.to_string()),
            ("Scale", self.scale.clone()),
            ("TranslateX", self.translate_x.clone()),
            ("TranslateY", self.translate_y.clone()),
            ("Rotation", self.rotation.clone()),
            ("Rate", self.rate.clone()),
        ]
    }

    /// Keys whose value differs from `previous`; every key when there is none.
    pub fn changed_keys(&self, previous: Option<&DebugSnapshot>) -> Vec<&'static str> {
        let current = self.entries();
        match previous {
            None => current.iter().map(|(key, _)| *key).collect(),
            Some(previous) => current
                .iter()
                .zip(previous.entries().iter())
                .filter(|((_, now), (_, before))| now != before)
                .map(|((key, _), _)| *key)
                .collect(),
        }
    }
}

impl fmt::Display for DebugSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in self.entries() {
            writeln!(f, "{key:<12}{value}")?;
        }
        Ok(())
    }
}

/// One listed edit, resolved through the live palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeltaSample {
    pub x: u32,
    pub y: u32,
    /// Glyph byte, for the glyph layout.
    pub glyph: Option<u8>,
    pub color: [u8; 3],
}

impl DeltaSample {
    pub fn hex(&self) -> String {
        let [r, g, b] = self.color;
        format!("#{r:02x}{g:02x}{b:02x}")
    }
}

impl fmt::Display for DeltaSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@({}, {}) → {}", self.x, self.y, self.hex())?;
        if let Some(glyph) = self.glyph {
            write!(f, " '{}'", glyph as char)?;
        }
        Ok(())
    }
}

/// Summary of what the current frame changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeltaListing {
    FullRefresh,
    Changed {
        /// Total edits in the frame, including repeats.
        count: usize,
        /// The first `limit` edits.
        samples: Vec<DeltaSample>,
    },
}

impl DeltaListing {
    /// Describe `record`, with colors taken from `cells` after it was applied.
    pub fn build(record: &FrameRecord<'_>, cells: &CellBuffer, limit: usize) -> Self {
        let delta = match record {
            FrameRecord::Keyframe(_) => return DeltaListing::FullRefresh,
            FrameRecord::Delta(delta) => delta,
        };
        let width = cells.width() as u32;
        let samples = delta
            .edits()
            .take(limit)
            .map(|edit| DeltaSample {
                x: edit.index % width,
                y: edit.index / width,
                glyph: match cells.layout() {
                    CellLayout::Pixel => None,
                    CellLayout::Glyph => Some(edit.cell.glyph),
                },
                color: cells.color(edit.cell.palette),
            })
            .collect();
        DeltaListing::Changed {
            count: delta.len(),
            samples,
        }
    }

    /// Header line of the listing.
    pub fn title(&self) -> String {
        match self {
            DeltaListing::FullRefresh => "I-FRAME: Full Refresh".to_string(),
            DeltaListing::Changed { count, .. } => format!("P-FRAME: {count} pixels changed"),
        }
    }
}

impl fmt::Display for DeltaListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title())?;
        if let DeltaListing::Changed { samples, .. } = self {
            for sample in samples {
                writeln!(f, "  {sample}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{StreamHeader, read_record};
    use crate::playback::PlayState;

    #[test]
    fn test_snapshot_format_and_diff() {
        let mut state = PlaybackState::default();
        state.current_frame = 3;
        state.transform.scale = 1.256;
        state.transform.translate_x = -12.4;
        let first = DebugSnapshot::capture(&state, 40);
        assert_eq!(first.frame, "3 / 40");
        assert_eq!(first.scale, "1.26");
        assert_eq!(first.translate_x, "-12px");
        assert_eq!(first.rate, "1.0x");
        assert_eq!(first.changed_keys(None).len(), 7);

        state.current_frame = 4;
        state.play_state = PlayState::Playing;
        let second = DebugSnapshot::capture(&state, 40);
        assert_eq!(second.changed_keys(Some(&first)), ["Frame", "Playing"]);
    }

    #[test]
    fn test_delta_listing_samples() {
        let header = StreamHeader::parse(&[4, 0, 2, 0, 10], CellLayout::Pixel).unwrap();
        let mut cells = CellBuffer::new(&header);

        let mut key = vec![0xFF];
        for i in 0..256u32 {
            key.extend_from_slice(&[i as u8, 0x10, 0xab]);
        }
        key.extend([0u8; 8]);
        let (record, _) = read_record(&key, 0, &header).unwrap();
        cells.apply(&record);
        assert_eq!(DeltaListing::build(&record, &cells, 100), DeltaListing::FullRefresh);

        let mut delta = vec![0xFE];
        delta.extend_from_slice(&3u32.to_le_bytes());
        for (value, index) in [(9u8, 5u32), (1, 2), (2, 7)] {
            delta.push(value);
            delta.extend_from_slice(&index.to_le_bytes());
        }
        let (record, _) = read_record(&delta, 0, &header).unwrap();
        cells.apply(&record);

        let listing = DeltaListing::build(&record, &cells, 2);
        assert_eq!(listing.title(), "P-FRAME: 3 pixels changed");
        let DeltaListing::Changed { samples, .. } = &listing else {
            panic!("expected delta listing");
        };
        assert_eq!(samples.len(), 2);
        assert_eq!((samples[0].x, samples[0].y), (1, 1));
        assert_eq!(samples[0].to_string(), "@(1, 1) → #0910ab");
    }
}
