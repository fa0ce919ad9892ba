//! GPU Presenter - draws the cell buffer through palette and coverage lookups.

use std::ops::Range;

use super::GpuError;
use crate::cells::CellBuffer;
use crate::format::StreamHeader;
use crate::playback::ViewTransform;
use crate::render::upload::{CELL_TEXEL_BYTES, UploadPlan, encode_rows, palette_texels};
use crate::render::{FrameView, PresentError, Presenter};

// Embed shader source at compile time
const PRESENT_SHADER: &str = include_str!("shaders/present.wgsl");

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Uniform buffer struct for the present shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct PresentParams {
    grid: [f32; 2],
    translate: [f32; 2],
    scale: f32,
    rotation: f32,
    highlight: u32,
    _pad: u32,
    highlight_color: [f32; 4],
}

impl PresentParams {
    fn new(width: u32, height: u32, view: &ViewTransform, highlight: Option<[u8; 3]>) -> Self {
        let [r, g, b] = highlight.unwrap_or_default();
        Self {
            grid: [width as f32, height as f32],
            translate: [view.translate_x, view.translate_y],
            scale: view.scale,
            rotation: view.radians(),
            highlight: u32::from(highlight.is_some()),
            _pad: 0,
            highlight_color: [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0],
        }
    }
}

/// Resources whose size follows the cell grid.
struct GridTargets {
    cell_texture: wgpu::Texture,
    target: wgpu::Texture,
    target_view: wgpu::TextureView,
    readback_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
    padded_bytes_per_row: u32,
}

/// Offscreen wgpu presenter sized to one stream's cell grid.
///
/// Keeps GPU copies of the palette and cell raster and refreshes only the
/// rows each [`FrameView`] reports stale. One draw call per present.
/// [`Presenter::resize`] rebuilds the grid-sized resources for a new stream.
pub struct GpuPresenter {
    device: wgpu::Device,
    queue: wgpu::Queue,

    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,

    palette_texture: wgpu::Texture,
    coverage_texture: wgpu::Texture,
    grid: GridTargets,

    /// Rows whose highlight flag is set on the GPU side.
    highlighted_rows: Option<Range<u32>>,
    /// Scratch buffer for encoded cell rows.
    staging: Vec<u8>,
    last_plan: UploadPlan,
    draws: u64,
}

impl GpuPresenter {
    /// Create a presenter for a stream with `header`'s grid and cell layout.
    pub async fn new(header: &StreamHeader) -> Result<Self, GpuError> {
        let width = header.width as u32;
        let height = header.height as u32;

        // 1. Create wgpu instance
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // 2. Request adapter
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| GpuError::NoAdapter)?;

        // 3. Request device and queue
        let (device, queue): (wgpu::Device, wgpu::Queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("MRV Player GPU"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            })
            .await?;

        check_grid(&device, width, height)?;

        // 4. Create shader module
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Present Shader"),
            source: wgpu::ShaderSource::Wgsl(PRESENT_SHADER.into()),
        });
        let info = shader.get_compilation_info().await;
        let errors: Vec<String> = info
            .messages
            .iter()
            .filter(|m| matches!(m.message_type, wgpu::CompilationMessageType::Error))
            .map(|m| m.message.clone())
            .collect();
        if !errors.is_empty() {
            return Err(GpuError::ShaderCompile(errors.join("\n")));
        }

        // 5. Create lookup textures
        let palette_texture = create_texture(
            &device,
            "Palette Texture",
            256,
            1,
            wgpu::TextureFormat::Rgba8Unorm,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );
        let coverage_texture = create_texture(
            &device,
            "Coverage Texture",
            256,
            1,
            wgpu::TextureFormat::R8Unorm,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );
        write_coverage(&queue, &coverage_texture, header);

        // 6. Create buffers
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Present Uniforms"),
            size: std::mem::size_of::<PresentParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // 7. Create pipeline
        let bind_group_layout = create_present_bind_group_layout(&device);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Present Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            ..Default::default()
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Present Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: TARGET_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        // 8. Grid-sized textures and bindings
        let grid = create_grid(
            &device,
            &bind_group_layout,
            &uniform_buffer,
            &palette_texture,
            &coverage_texture,
            width,
            height,
        );

        log::debug!(
            "GPU presenter ready: {}x{} {} grid on {}",
            width,
            height,
            header.layout.name(),
            adapter.get_info().name
        );

        Ok(Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
            uniform_buffer,
            palette_texture,
            coverage_texture,
            grid,
            highlighted_rows: None,
            staging: Vec::new(),
            last_plan: UploadPlan::default(),
            draws: 0,
        })
    }

    /// Rebuild the grid-sized resources for `header`'s stream.
    ///
    /// The pipeline and device are kept. The next present must carry a full
    /// stale region, which a freshly decoded cell buffer does.
    pub fn resize_to(&mut self, header: &StreamHeader) -> Result<(), GpuError> {
        let width = header.width as u32;
        let height = header.height as u32;
        check_grid(&self.device, width, height)?;

        write_coverage(&self.queue, &self.coverage_texture, header);
        if (width, height) != self.size() {
            self.grid = create_grid(
                &self.device,
                &self.bind_group_layout,
                &self.uniform_buffer,
                &self.palette_texture,
                &self.coverage_texture,
                width,
                height,
            );
            log::debug!("GPU presenter resized to {}x{}", width, height);
        }
        self.highlighted_rows = None;
        self.last_plan = UploadPlan::default();
        Ok(())
    }

    /// Grid size the presenter is currently sized for.
    pub fn size(&self) -> (u32, u32) {
        (self.grid.width, self.grid.height)
    }

    /// Upload plan executed by the most recent present.
    pub fn last_plan(&self) -> &UploadPlan {
        &self.last_plan
    }

    /// Number of draw calls issued.
    pub fn draws(&self) -> u64 {
        self.draws
    }

    fn upload(&mut self, cells: &CellBuffer, plan: &UploadPlan, highlight: bool) {
        if plan.palette {
            write_rows(
                &self.queue,
                &self.palette_texture,
                0,
                256,
                1,
                4,
                &palette_texels(cells),
            );
        }
        if let Some(rows) = plan.rows.clone() {
            let origin = rows.start;
            let count = rows.len() as u32;
            encode_rows(cells, rows, highlight, &mut self.staging);
            write_rows(
                &self.queue,
                &self.grid.cell_texture,
                origin,
                self.grid.width,
                count,
                CELL_TEXEL_BYTES as u32,
                &self.staging,
            );
        }
    }

    fn draw(&mut self) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Present Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Present Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.grid.target_view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.grid.bind_group, &[]);
            pass.draw(0..4, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        self.draws += 1;
    }

    /// Queue a copy of the presented image into the readback buffer.
    fn copy_to_readback(&self) {
        let grid = &self.grid;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &grid.target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &grid.readback_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(grid.padded_bytes_per_row),
                    rows_per_image: Some(grid.height),
                },
            },
            wgpu::Extent3d {
                width: grid.width,
                height: grid.height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Strip row padding from the mapped readback buffer, then unmap it.
    fn unpack_readback(&self) -> Vec<u8> {
        let grid = &self.grid;
        let row_bytes = (grid.width * 4) as usize;
        let mut pixels = Vec::with_capacity(row_bytes * grid.height as usize);
        {
            let data = grid.readback_buffer.slice(..).get_mapped_range();
            for row in data.chunks_exact(grid.padded_bytes_per_row as usize) {
                pixels.extend_from_slice(&row[..row_bytes]);
            }
        }
        grid.readback_buffer.unmap();
        pixels
    }

    /// Read the presented image back as tightly packed RGBA8 rows.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn read_pixels(&self) -> Result<Vec<u8>, GpuError> {
        self.copy_to_readback();

        let (tx, rx) = std::sync::mpsc::channel();
        self.grid
            .readback_buffer
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |result| {
                let _ = tx.send(result);
            });
        self.device.poll(wgpu::PollType::wait_indefinitely()).ok();
        rx.recv().unwrap_or(Err(wgpu::BufferAsyncError))?;

        Ok(self.unpack_readback())
    }

    /// Async readback for WASM; the browser drives the mapping.
    #[cfg(target_arch = "wasm32")]
    pub async fn read_pixels_async(&self) -> Result<Vec<u8>, GpuError> {
        self.copy_to_readback();

        let (sender, receiver) = futures_channel::oneshot::channel();
        self.grid
            .readback_buffer
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |result| {
                let _ = sender.send(result);
            });
        receiver.await.unwrap_or(Err(wgpu::BufferAsyncError))?;

        Ok(self.unpack_readback())
    }
}

impl Presenter for GpuPresenter {
    fn resize(&mut self, header: &StreamHeader) -> Result<(), PresentError> {
        Ok(self.resize_to(header)?)
    }

    fn present(&mut self, frame: FrameView<'_>) -> Result<(), PresentError> {
        let cells = frame.cells;
        let (width, height) = self.size();
        let actual = (cells.width() as u32, cells.height() as u32);
        if actual != (width, height) {
            return Err(PresentError::SizeMismatch {
                expected: (width, height),
                actual,
            });
        }

        let highlight_rows = frame
            .highlight
            .and_then(|_| cells.dirty().rows(width, height));
        let plan = UploadPlan::new(frame.stale, self.highlighted_rows.take(), highlight_rows);
        self.upload(cells, &plan, frame.highlight.is_some());
        self.highlighted_rows = plan.highlight_rows.clone();

        let params = PresentParams::new(width, height, &frame.transform, frame.highlight);
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&params));
        self.draw();

        log::trace!(
            "present: palette={} rows={:?}",
            plan.palette,
            plan.rows
        );
        self.last_plan = plan;
        Ok(())
    }
}

fn check_grid(device: &wgpu::Device, width: u32, height: u32) -> Result<(), GpuError> {
    let max = device.limits().max_texture_dimension_2d;
    if width > max || height > max {
        return Err(GpuError::GridTooLarge { width, height, max });
    }
    Ok(())
}

/// The coverage table is fixed per cell layout.
fn write_coverage(queue: &wgpu::Queue, texture: &wgpu::Texture, header: &StreamHeader) {
    write_rows(queue, texture, 0, 256, 1, 1, &header.layout.coverage_table());
}

fn create_grid(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniform_buffer: &wgpu::Buffer,
    palette_texture: &wgpu::Texture,
    coverage_texture: &wgpu::Texture,
    width: u32,
    height: u32,
) -> GridTargets {
    let cell_texture = create_texture(
        device,
        "Cell Texture",
        width,
        height,
        wgpu::TextureFormat::Rgba8Uint,
        wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
    );
    let target = create_texture(
        device,
        "Present Target",
        width,
        height,
        TARGET_FORMAT,
        wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
    );
    let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());

    let padded_bytes_per_row = align_to(width * 4, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
    let readback_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Buffer"),
        size: padded_bytes_per_row as u64 * height as u64,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let cell_view = cell_texture.create_view(&wgpu::TextureViewDescriptor::default());
    let palette_view = palette_texture.create_view(&wgpu::TextureViewDescriptor::default());
    let coverage_view = coverage_texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Present Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&cell_view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(&palette_view),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::TextureView(&coverage_view),
            },
        ],
    });

    GridTargets {
        cell_texture,
        target,
        target_view,
        readback_buffer,
        bind_group,
        width,
        height,
        padded_bytes_per_row,
    }
}

fn align_to(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}

fn create_texture(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    })
}

/// Write `rows` full-width rows starting at row `origin_y`.
fn write_rows(
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    origin_y: u32,
    width: u32,
    rows: u32,
    bytes_per_texel: u32,
    data: &[u8],
) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d {
                x: 0,
                y: origin_y,
                z: 0,
            },
            aspect: wgpu::TextureAspect::All,
        },
        data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * bytes_per_texel),
            rows_per_image: Some(rows),
        },
        wgpu::Extent3d {
            width,
            height: rows,
            depth_or_array_layers: 1,
        },
    );
}

fn create_present_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let lookup_texture = |binding, sample_type| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type,
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Present Bind Group Layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            lookup_texture(1, wgpu::TextureSampleType::Uint),
            lookup_texture(2, wgpu::TextureSampleType::Float { filterable: false }),
            lookup_texture(3, wgpu::TextureSampleType::Float { filterable: false }),
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cells::StaleRegion;
    use crate::format::{CellLayout, read_record};
    use crate::render::cpu;

    fn pixel_header(width: u16, height: u16) -> StreamHeader {
        StreamHeader {
            layout: CellLayout::Pixel,
            width,
            height,
            fps: 10,
            declared_frames: None,
        }
    }

    fn keyframe(width: u16, height: u16) -> Vec<u8> {
        let mut frame = vec![0xFF];
        for i in 0..256u32 {
            frame.extend_from_slice(&[i as u8, (255 - i) as u8, (i * 7) as u8]);
        }
        frame.extend((0..width as u32 * height as u32).map(|i| (i * 13) as u8));
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

    fn apply(cells: &mut CellBuffer, header: &StreamHeader, bytes: &[u8]) {
        let (record, _) = read_record(bytes, 0, header).unwrap();
        cells.apply(&record);
    }

    fn present(presenter: &mut GpuPresenter, cells: &mut CellBuffer, highlight: Option<[u8; 3]>) {
        let stale = cells.take_stale();
        presenter
            .present(FrameView {
                cells,
                stale,
                transform: ViewTransform::default(),
                highlight,
            })
            .unwrap();
    }

    fn assert_close(gpu: &[u8], cpu: &[u8]) {
        assert_eq!(gpu.len(), cpu.len());
        for (i, (g, c)) in gpu.iter().zip(cpu).enumerate() {
            assert!(
                g.abs_diff(*c) <= 1,
                "byte {} differs: gpu {} vs cpu {}",
                i,
                g,
                c
            );
        }
    }

    fn presenter_for(header: &StreamHeader) -> Option<GpuPresenter> {
        match pollster::block_on(GpuPresenter::new(header)) {
            Ok(p) => Some(p),
            Err(GpuError::NoAdapter) => {
                eprintln!("Skipping GPU test: no adapter available");
                None
            }
            Err(e) => panic!("Failed to create GPU presenter: {:?}", e),
        }
    }

    #[test]
    fn test_gpu_presenter_creation() {
        let result = pollster::block_on(GpuPresenter::new(&pixel_header(8, 4)));

        // Skip test if no GPU available
        if let Err(GpuError::NoAdapter) = &result {
            eprintln!("Skipping GPU test: no adapter available");
            return;
        }

        assert!(result.is_ok(), "Failed to create GPU presenter");
    }

    #[test]
    fn test_gpu_matches_cpu_after_keyframe() {
        let header = pixel_header(70, 5);
        let Some(mut presenter) = presenter_for(&header) else {
            return;
        };
        let mut cells = CellBuffer::new(&header);
        apply(&mut cells, &header, &keyframe(70, 5));

        present(&mut presenter, &mut cells, None);
        assert!(presenter.last_plan().palette);
        assert_eq!(presenter.last_plan().rows, Some(0..5));
        assert_close(&presenter.read_pixels().unwrap(), &cpu::resolve(&cells, None));
    }

    #[test]
    fn test_coalesced_deltas_upload_union() {
        let header = pixel_header(16, 8);
        let Some(mut presenter) = presenter_for(&header) else {
            return;
        };
        let mut cells = CellBuffer::new(&header);
        apply(&mut cells, &header, &keyframe(16, 8));
        present(&mut presenter, &mut cells, None);

        // Three frames decoded, one present.
        apply(&mut cells, &header, &delta(&[(1, 17)]));
        apply(&mut cells, &header, &delta(&[(2, 100)]));
        apply(&mut cells, &header, &delta(&[(3, 40)]));
        present(&mut presenter, &mut cells, None);

        assert!(!presenter.last_plan().palette);
        assert_eq!(presenter.last_plan().rows, Some(1..7));
        assert_close(&presenter.read_pixels().unwrap(), &cpu::resolve(&cells, None));
        assert_eq!(presenter.draws(), 2);
    }

    #[test]
    fn test_highlight_is_cleared_when_turned_off() {
        let header = pixel_header(8, 8);
        let Some(mut presenter) = presenter_for(&header) else {
            return;
        };
        let magenta = Some([255, 0, 255]);
        let mut cells = CellBuffer::new(&header);
        apply(&mut cells, &header, &keyframe(8, 8));
        present(&mut presenter, &mut cells, None);

        apply(&mut cells, &header, &delta(&[(9, 3), (9, 60)]));
        present(&mut presenter, &mut cells, magenta);
        assert_close(&presenter.read_pixels().unwrap(), &cpu::resolve(&cells, magenta));

        // Nothing new decoded; highlighted rows must still be refreshed.
        present(&mut presenter, &mut cells, None);
        assert_eq!(presenter.last_plan().rows, Some(0..8));
        assert_close(&presenter.read_pixels().unwrap(), &cpu::resolve(&cells, None));
    }

    #[test]
    fn test_resize_follows_new_stream() {
        let small = pixel_header(4, 2);
        let Some(mut presenter) = presenter_for(&small) else {
            return;
        };
        let mut cells = CellBuffer::new(&small);
        apply(&mut cells, &small, &keyframe(4, 2));
        present(&mut presenter, &mut cells, None);

        let large = pixel_header(8, 8);
        presenter.resize(&large).unwrap();
        assert_eq!(presenter.size(), (8, 8));
        let mut cells = CellBuffer::new(&large);
        apply(&mut cells, &large, &keyframe(8, 8));
        present(&mut presenter, &mut cells, None);

        assert_eq!(presenter.last_plan().rows, Some(0..8));
        assert_close(&presenter.read_pixels().unwrap(), &cpu::resolve(&cells, None));
    }

    #[test]
    fn test_size_mismatch_is_rejected() {
        let Some(mut presenter) = presenter_for(&pixel_header(4, 4)) else {
            return;
        };
        let other = pixel_header(5, 4);
        let cells = CellBuffer::new(&other);
        let result = presenter.present(FrameView {
            cells: &cells,
            stale: StaleRegion::default(),
            transform: ViewTransform::default(),
            highlight: None,
        });
        assert!(matches!(result, Err(PresentError::SizeMismatch { .. })));
    }
}
