//! Builders for synthetic MRV streams and archives.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use mrv_player::format::CellLayout;
use zip::write::{SimpleFileOptions, ZipWriter};

/// One frame of a synthetic stream.
#[derive(Debug, Clone)]
pub enum Frame {
    /// Palette entry `i` is `(i * seed, i, 255 - i)`; every cell is `fill`.
    Key { seed: u8, fill: u8 },
    /// `(glyph, palette, index)` edits; the glyph is ignored for pixel streams.
    Delta(Vec<(u8, u8, u32)>),
}

pub struct StreamBuilder {
    layout: CellLayout,
    width: u16,
    height: u16,
    fps: u16,
    declared_frames: Option<u32>,
    frames: Vec<Frame>,
}

impl StreamBuilder {
    pub fn pixel(width: u16, height: u16, fps: u8) -> Self {
        Self {
            layout: CellLayout::Pixel,
            width,
            height,
            fps: fps as u16,
            declared_frames: None,
            frames: Vec::new(),
        }
    }

    pub fn glyph(width: u16, height: u16, fps: u16) -> Self {
        Self {
            layout: CellLayout::Glyph,
            width,
            height,
            fps,
            declared_frames: None,
            frames: Vec::new(),
        }
    }

    pub fn declare_frames(mut self, frames: u32) -> Self {
        self.declared_frames = Some(frames);
        self
    }

    pub fn frame(mut self, frame: Frame) -> Self {
        self.frames.push(frame);
        self
    }

    pub fn frames(mut self, frames: impl IntoIterator<Item = Frame>) -> Self {
        self.frames.extend(frames);
        self
    }

    pub fn layout(&self) -> CellLayout {
        self.layout
    }

    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn build(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        match self.layout {
            CellLayout::Pixel => {
                bytes.extend_from_slice(&self.width.to_le_bytes());
                bytes.extend_from_slice(&self.height.to_le_bytes());
                bytes.push(self.fps as u8);
            }
            CellLayout::Glyph => {
                bytes.extend_from_slice(b"ASCI");
                bytes.extend_from_slice(&[0, 0]);
                bytes.extend_from_slice(&self.width.to_le_bytes());
                bytes.extend_from_slice(&self.height.to_le_bytes());
                bytes.extend_from_slice(&self.fps.to_le_bytes());
                let declared = self.declared_frames.unwrap_or(self.frames.len() as u32);
                bytes.extend_from_slice(&declared.to_le_bytes());
            }
        }

        for frame in &self.frames {
            match frame {
                Frame::Key { seed, fill } => {
                    bytes.push(match self.layout {
                        CellLayout::Pixel => 0xFF,
                        CellLayout::Glyph => 0x00,
                    });
                    for i in 0..=u8::MAX {
                        bytes.extend_from_slice(&[i.wrapping_mul(*seed), i, 255 - i]);
                    }
                    for _ in 0..self.cell_count() {
                        if self.layout == CellLayout::Glyph {
                            bytes.push(b'#');
                        }
                        bytes.push(*fill);
                    }
                }
                Frame::Delta(edits) => {
                    bytes.push(match self.layout {
                        CellLayout::Pixel => 0xFE,
                        CellLayout::Glyph => 0x01,
                    });
                    bytes.extend_from_slice(&(edits.len() as u32).to_le_bytes());
                    for (glyph, palette, index) in edits {
                        if self.layout == CellLayout::Glyph {
                            bytes.push(*glyph);
                        }
                        bytes.push(*palette);
                        bytes.extend_from_slice(&index.to_le_bytes());
                    }
                }
            }
        }
        bytes
    }

    /// The stream wrapped in a zip archive under the layout's entry name.
    pub fn archive(&self) -> Vec<u8> {
        let name = match self.layout {
            CellLayout::Pixel => "data.bin",
            CellLayout::Glyph => "movie.abin",
        };
        archive(&[(name, &self.build())])
    }
}

pub fn archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, data) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}
