//! Benchmarks for MRV stream indexing and decoding.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use mrv_player::{
    CellBuffer, CellLayout, Container, FrameDecoder, NoProgress,
    format::{FrameIndex, PALETTE_BYTES},
    render::cpu,
};

/// Pixel stream of `frames` frames with a keyframe every `gop` frames and
/// `edits` pseudo-random edits per delta.
fn pixel_stream(size: u16, frames: usize, gop: usize, edits: usize) -> Vec<u8> {
    let cells = size as usize * size as usize;
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&size.to_le_bytes());
    bytes.extend_from_slice(&size.to_le_bytes());
    bytes.push(30);

    let mut state = 0x2545_f491_u32;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        state
    };

    for frame in 0..frames {
        if frame % gop == 0 {
            bytes.push(0xFF);
            bytes.extend((0..PALETTE_BYTES).map(|i| (i * 7) as u8));
            bytes.extend((0..cells).map(|_| next() as u8));
        } else {
            bytes.push(0xFE);
            bytes.extend_from_slice(&(edits as u32).to_le_bytes());
            for _ in 0..edits {
                bytes.push(next() as u8);
                bytes.extend_from_slice(&(next() % cells as u32).to_le_bytes());
            }
        }
    }
    bytes
}

fn decoder(size: u16) -> FrameDecoder {
    let container = Container::from_stream(pixel_stream(size, 120, 30, 500), CellLayout::Pixel);
    FrameDecoder::new(container, &mut NoProgress).unwrap()
}

fn bench_index_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_scan");

    for size in [64, 256, 512] {
        let decoder = decoder(size);
        let bytes = decoder.container().bytes();
        let header = *decoder.header();

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", size, size)),
            &size,
            |b, _| {
                b.iter(|| FrameIndex::scan(black_box(bytes), &header));
            },
        );
    }

    group.finish();
}

fn bench_decode_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_stream");

    for size in [64, 256, 512] {
        let decoder = decoder(size);
        let mut cells = CellBuffer::new(decoder.header());

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", size, size)),
            &size,
            |b, _| {
                b.iter(|| {
                    decoder
                        .decode_stream(black_box(&mut cells), &mut NoProgress, |_, _, _| {})
                        .unwrap()
                });
            },
        );
    }

    group.finish();
}

fn bench_seek(c: &mut Criterion) {
    let mut group = c.benchmark_group("seek");
    let decoder = decoder(256);
    let mut cells = CellBuffer::new(decoder.header());

    for target in [0, 29, 119] {
        group.bench_with_input(BenchmarkId::from_parameter(target), &target, |b, &target| {
            b.iter(|| decoder.seek(black_box(target), &mut cells).unwrap());
        });
    }

    group.finish();
}

fn bench_cpu_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_resolve");

    for size in [64, 256, 512] {
        let decoder = decoder(size);
        let mut cells = CellBuffer::new(decoder.header());
        decoder.seek(0, &mut cells).unwrap();

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", size, size)),
            &size,
            |b, _| {
                b.iter(|| cpu::resolve(black_box(&cells), None));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_index_scan,
    bench_decode_stream,
    bench_seek,
    bench_cpu_resolve
);
criterion_main!(benches);
