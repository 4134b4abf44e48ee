//! Scene rendering: lit sphere billboards for the anchor and the mass, a
//! spring coil between them and a reference grid.

use common::{create_uniform_buffer, create_vertex_buffer, CameraUniform, GraphicsContext, OrbitCamera, Vertex};
use glam::Vec3;
use wgpu::util::DeviceExt;

/// Instance data for one sphere
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SphereInstance {
    pub position: [f32; 3],
    pub radius: f32,
    pub color: [f32; 4],
}

impl SphereInstance {
    const ATTRIBS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        2 => Float32x3,
        3 => Float32,
        4 => Float32x4,
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SphereInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Quad vertex for billboards
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
}

impl QuadVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

const QUAD_VERTICES: &[QuadVertex] = &[
    QuadVertex { position: [-1.0, -1.0] },
    QuadVertex { position: [1.0, -1.0] },
    QuadVertex { position: [1.0, 1.0] },
    QuadVertex { position: [-1.0, -1.0] },
    QuadVertex { position: [1.0, 1.0] },
    QuadVertex { position: [-1.0, 1.0] },
];

const ANCHOR_COLOR: [f32; 4] = [0.6, 0.6, 0.65, 1.0];
const MASS_COLOR: [f32; 4] = [0.95, 0.55, 0.2, 1.0];
const SPRING_COLOR: [f32; 4] = [0.8, 0.85, 0.95, 1.0];
const GRID_COLOR: [f32; 4] = [0.35, 0.35, 0.4, 0.6];

const GRID_HALF_EXTENT: i32 = 10;
const GRID_SPACING: f32 = 0.5;
const GRID_HEIGHT: f32 = -3.0;

const SPRING_TURNS: usize = 12;
const SPRING_RADIUS: f32 = 0.15;
const SEGMENTS_PER_TURN: usize = 16;
const SPRING_VERTICES: usize = 2 * SPRING_TURNS * SEGMENTS_PER_TURN;

/// Line-list vertices of a helical coil from `start` to `end`.
///
/// The coil collapses to a single segment when both ends coincide.
pub fn spring_coil(start: Vec3, end: Vec3, turns: usize, radius: f32) -> Vec<Vertex> {
    let axis = end - start;
    let Some(dir) = axis.try_normalize() else {
        return vec![
            Vertex::new(start.to_array(), SPRING_COLOR),
            Vertex::new(end.to_array(), SPRING_COLOR),
        ];
    };
    let (u, v) = dir.any_orthonormal_pair();
    let steps = turns.max(1) * SEGMENTS_PER_TURN;

    let point = |i: usize| {
        let s = i as f32 / steps as f32;
        // taper the ends so the coil meets both attachment points
        let r = radius * (std::f32::consts::PI * s).sin().min(1.0);
        let angle = std::f32::consts::TAU * turns as f32 * s;
        start + axis * s + (u * angle.cos() + v * angle.sin()) * r
    };

    let mut vertices = Vec::with_capacity(2 * steps);
    for i in 0..steps {
        vertices.push(Vertex::new(point(i).to_array(), SPRING_COLOR));
        vertices.push(Vertex::new(point(i + 1).to_array(), SPRING_COLOR));
    }
    vertices
}

fn grid_vertices() -> Vec<Vertex> {
    let extent = GRID_HALF_EXTENT as f32 * GRID_SPACING;
    let mut vertices = Vec::new();
    for i in -GRID_HALF_EXTENT..=GRID_HALF_EXTENT {
        let offset = i as f32 * GRID_SPACING;
        vertices.push(Vertex::new([offset, -extent, GRID_HEIGHT], GRID_COLOR));
        vertices.push(Vertex::new([offset, extent, GRID_HEIGHT], GRID_COLOR));
        vertices.push(Vertex::new([-extent, offset, GRID_HEIGHT], GRID_COLOR));
        vertices.push(Vertex::new([extent, offset, GRID_HEIGHT], GRID_COLOR));
    }
    vertices
}

pub struct SceneRenderer {
    sphere_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    quad_buffer: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
    spring_buffer: wgpu::Buffer,
    grid_buffer: wgpu::Buffer,
    grid_vertex_count: u32,
    spring_vertex_count: u32,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    depth_texture: wgpu::TextureView,
}

impl SceneRenderer {
    pub fn new(ctx: &GraphicsContext, camera: &OrbitCamera) -> Self {
        let device = &ctx.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/scene.wgsl").into()),
        });

        let camera_buffer = create_uniform_buffer(device, &CameraUniform::from_camera(camera));

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Camera Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&camera_bind_group_layout],
            push_constant_ranges: &[],
        });

        let depth_texture = Self::create_depth_texture(device, ctx.size.width, ctx.size.height);

        let depth_stencil_state = Some(wgpu::DepthStencilState {
            format: wgpu::TextureFormat::Depth32Float,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        });

        let sphere_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Sphere Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_sphere",
                buffers: &[QuadVertex::layout(), SphereInstance::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_sphere",
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: depth_stencil_state.clone(),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let line_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Line Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_line",
                buffers: &[Vertex::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_line",
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                ..Default::default()
            },
            depth_stencil: depth_stencil_state,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let quad_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Buffer"),
            contents: bytemuck::cast_slice(QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Sphere Instance Buffer"),
            size: (std::mem::size_of::<SphereInstance>() * 2) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let grid = grid_vertices();
        let grid_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Grid Buffer"),
            contents: bytemuck::cast_slice(&grid),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let spring_buffer = create_vertex_buffer(device, "Spring Buffer", SPRING_VERTICES);

        Self {
            sphere_pipeline,
            line_pipeline,
            quad_buffer,
            instance_buffer,
            spring_buffer,
            grid_buffer,
            grid_vertex_count: grid.len() as u32,
            spring_vertex_count: 0,
            camera_buffer,
            camera_bind_group,
            depth_texture,
        }
    }

    fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_texture = Self::create_depth_texture(device, width, height);
    }

    pub fn update_camera(&self, queue: &wgpu::Queue, camera: &OrbitCamera) {
        let uniform = CameraUniform::from_camera(camera);
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[uniform]));
    }

    /// Upload the anchor, the mass and the coil joining them.
    pub fn update_scene(&mut self, queue: &wgpu::Queue, anchor: Vec3, mass: Vec3) {
        let instances = [
            SphereInstance {
                position: anchor.to_array(),
                radius: 0.12,
                color: ANCHOR_COLOR,
            },
            SphereInstance {
                position: mass.to_array(),
                radius: 0.35,
                color: MASS_COLOR,
            },
        ];
        queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));

        let coil = spring_coil(anchor, mass, SPRING_TURNS, SPRING_RADIUS);
        queue.write_buffer(&self.spring_buffer, 0, bytemuck::cast_slice(&coil));
        self.spring_vertex_count = coil.len() as u32;
    }

    pub fn render(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView, show_grid: bool) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: 0.08,
                        g: 0.09,
                        b: 0.12,
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_texture,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_bind_group(0, &self.camera_bind_group, &[]);

        render_pass.set_pipeline(&self.line_pipeline);
        if show_grid {
            render_pass.set_vertex_buffer(0, self.grid_buffer.slice(..));
            render_pass.draw(0..self.grid_vertex_count, 0..1);
        }
        if self.spring_vertex_count > 0 {
            render_pass.set_vertex_buffer(0, self.spring_buffer.slice(..));
            render_pass.draw(0..self.spring_vertex_count, 0..1);
        }

        render_pass.set_pipeline(&self.sphere_pipeline);
        render_pass.set_vertex_buffer(0, self.quad_buffer.slice(..));
        render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
        render_pass.draw(0..6, 0..2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coil_joins_both_ends() {
        let start = Vec3::new(0.0, 0.0, 2.0);
        let end = Vec3::new(0.0, 0.0, -0.5);
        let coil = spring_coil(start, end, SPRING_TURNS, SPRING_RADIUS);
        assert_eq!(coil.len(), SPRING_VERTICES);

        let first = Vec3::from(coil[0].position);
        let last = Vec3::from(coil[coil.len() - 1].position);
        assert!(first.distance(start) < 1e-5);
        assert!(last.distance(end) < 1e-5);
        // segments are contiguous
        for pair in coil[1..coil.len() - 1].chunks(2) {
            assert_eq!(pair[0].position, pair[1].position);
        }
    }

    #[test]
    fn coil_stays_within_radius_of_axis() {
        let coil = spring_coil(Vec3::ZERO, Vec3::new(1.0, 2.0, 3.0), 5, 0.2);
        let dir = Vec3::new(1.0, 2.0, 3.0).normalize();
        for v in &coil {
            let p = Vec3::from(v.position);
            let off_axis = p - dir * p.dot(dir);
            assert!(off_axis.length() <= 0.2 + 1e-5);
        }
    }

    #[test]
    fn degenerate_coil_is_a_single_segment() {
        let p = Vec3::new(1.0, 1.0, 1.0);
        assert_eq!(spring_coil(p, p, 8, 0.1).len(), 2);
    }

    #[test]
    fn grid_is_symmetric() {
        let grid = grid_vertices();
        assert_eq!(grid.len(), 4 * (2 * GRID_HALF_EXTENT as usize + 1));
        assert!(grid.iter().all(|v| v.position[2] == GRID_HEIGHT));
    }
}
