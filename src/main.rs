// Valentine Oyster: unscrew, pry open, cut and lift an oyster, then feed it to a dachshund.
// Instanced wgpu renderer + egui HUD around the phase controller in `game`.

mod config;
mod engine;
mod error;
mod game;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use glam::Vec3;
use wgpu::util::DeviceExt;
use winit::{
    event::{ElementState, Event as WinitEvent, KeyEvent, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use config::{CliArgs, GameConfig};
use engine::components::{MeshShape, hex_to_rgb};
use engine::input::{Gesture, InputMapper};
use engine::mesh::{self, GpuVertex};
use engine::scene::DrawItem;
use error::AppError;
use game::controller::GameController;
use game::factory::palette;
use game::hud::{DebugStats, Hud, HudAction, HudFrame};
use game::phase::GamePhase;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const MAX_INSTANCES: usize = 10000;

// ============================================================================
// GPU DATA
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    eye: [f32; 4],
    light_dir: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct InstanceData {
    model: [[f32; 4]; 4],
    color: [f32; 4],
    emissive: [f32; 4],
}

impl InstanceData {
    const ATTRIBUTES: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
        2 => Float32x4,
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x4,
        6 => Float32x4,
        7 => Float32x4,
    ];

    fn from_item(item: &DrawItem) -> Self {
        let m = item.material;
        Self {
            model: item.model.to_cols_array_2d(),
            color: [m.color.x, m.color.y, m.color.z, m.opacity],
            emissive: [m.emissive.x, m.emissive.y, m.emissive.z, m.emissive_intensity],
        }
    }

    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceData>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

struct ShapeBuffers {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    index_count: u32,
}

/// A run of instances that share one unit mesh.
struct Batch {
    shape: MeshShape,
    instances: std::ops::Range<u32>,
}

/// Opaque items grouped by shape, then transparent items back to front.
fn build_batches(items: &[DrawItem], eye: Vec3) -> (Vec<InstanceData>, Vec<Batch>, Vec<Batch>) {
    let mut instances = Vec::with_capacity(items.len());
    let mut opaque = Vec::new();

    for shape in MeshShape::ALL {
        let start = instances.len() as u32;
        instances.extend(
            items
                .iter()
                .filter(|i| i.shape == shape && !i.material.is_transparent())
                .map(InstanceData::from_item),
        );
        let end = instances.len() as u32;
        if end > start {
            opaque.push(Batch { shape, instances: start..end });
        }
    }

    let mut see_through: Vec<&DrawItem> = items
        .iter()
        .filter(|i| i.material.is_transparent() && i.material.opacity > 0.0)
        .collect();
    let depth = |i: &DrawItem| i.model.w_axis.truncate().distance_squared(eye);
    see_through.sort_by(|a, b| depth(b).total_cmp(&depth(a)));

    let mut transparent = Vec::with_capacity(see_through.len());
    for item in see_through {
        let index = instances.len() as u32;
        instances.push(InstanceData::from_item(item));
        transparent.push(Batch { shape: item.shape, instances: index..index + 1 });
    }

    (instances, opaque, transparent)
}

fn depth_view(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

// ============================================================================
// STATE
// ============================================================================

struct State {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    opaque_pipeline: wgpu::RenderPipeline,
    transparent_pipeline: wgpu::RenderPipeline,
    shapes: HashMap<MeshShape, ShapeBuffers>,
    instance_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    depth_view: wgpu::TextureView,

    game: GameController,
    input: InputMapper,
    hud: Hud,
    clock: Instant,
    frame_time_ms: f32,
    fps: u32,
}

impl State {
    async fn new(window: Arc<Window>, game_config: &GameConfig) -> Result<State, AppError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(AppError::NoAdapter)?;
        log::info!("adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Uniform Buffer"),
            size: std::mem::size_of::<Uniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
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
                label: Some("uniform_bind_group_layout"),
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("uniform_bind_group"),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = |label: &str, blend: wgpu::BlendState, depth_write: bool| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[GpuVertex::desc(), InstanceData::desc()],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: config.format,
                        blend: Some(blend),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    // Shell halves are open domes, so both faces are visible
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: depth_write,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
                cache: None,
            })
        };
        let opaque_pipeline = pipeline("Opaque Pipeline", wgpu::BlendState::REPLACE, true);
        let transparent_pipeline =
            pipeline("Transparent Pipeline", wgpu::BlendState::ALPHA_BLENDING, false);

        let shapes = MeshShape::ALL
            .into_iter()
            .map(|shape| {
                let mesh = mesh::build(shape);
                let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Vertex Buffer"),
                    contents: mesh.vertex_bytes(),
                    usage: wgpu::BufferUsages::VERTEX,
                });
                let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Index Buffer"),
                    contents: mesh.index_bytes(),
                    usage: wgpu::BufferUsages::INDEX,
                });
                let index_count = mesh.index_count() as u32;
                let buffers = ShapeBuffers { vertex, index, index_count };
                (shape, buffers)
            })
            .collect();

        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Instance Buffer"),
            size: (MAX_INSTANCES * std::mem::size_of::<InstanceData>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let depth_view = depth_view(&device, &config);
        let hud = Hud::new(&window, &device, surface_format, game_config.debug.show_stats);

        let seed = game_config.seed.unwrap_or_else(rand::random);
        log::info!("seed {}", seed);
        let audio = game::audio::open_output(&game_config.audio);
        let mut game = GameController::new(game_config, audio, seed);
        game.on_resize(config.width, config.height);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            opaque_pipeline,
            transparent_pipeline,
            shapes,
            instance_buffer,
            uniform_buffer,
            uniform_bind_group,
            depth_view,
            game,
            input: InputMapper::new(),
            hud,
            clock: Instant::now(),
            frame_time_ms: 0.0,
            fps: 0,
        })
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_view = depth_view(&self.device, &self.config);
            self.game.on_resize(new_size.width, new_size.height);
        }
    }

    fn now_ms(&self) -> f64 {
        self.clock.elapsed().as_secs_f64() * 1000.0
    }

    /// Route one window event: HUD first, then gestures into the game.
    fn input(&mut self, event: &WindowEvent) {
        let response = self.hud.handle_window_event(&self.window, event);
        let gestures = self.input.process_event(event);
        for gesture in gestures {
            // Releases always reach the game so drags can't get stuck under a panel
            let release = matches!(gesture, Gesture::PointerUp { .. } | Gesture::PinchEnd);
            if !response.consumed || release {
                self.game.handle_gesture(gesture);
            }
        }
    }

    fn update(&mut self) {
        let now = self.now_ms();
        self.game.tick(now);
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let frame_start = Instant::now();
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let camera = self.game.camera();
        let eye = camera.position;
        let uniforms = Uniforms {
            view_proj: camera.view_projection().to_cols_array_2d(),
            eye: eye.extend(1.0).to_array(),
            light_dir: Vec3::new(5.0, 10.0, 7.0).normalize().extend(0.0).to_array(),
        };
        self.queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let items = self.game.scene_mut().draw_list();
        let (mut instances, opaque, transparent) = build_batches(&items, eye);
        if instances.len() > MAX_INSTANCES {
            log::warn!("{} instances, drawing the first {}", instances.len(), MAX_INSTANCES);
            instances.truncate(MAX_INSTANCES);
        }
        if !instances.is_empty() {
            self.queue
                .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));
        }
        let drawable = instances.len() as u32;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let bg = hex_to_rgb(palette::BACKGROUND);
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: (bg.x as f64).powf(2.2),
                            g: (bg.y as f64).powf(2.2),
                            b: (bg.z as f64).powf(2.2),
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));

            for (pipeline, batches) in [
                (&self.opaque_pipeline, &opaque),
                (&self.transparent_pipeline, &transparent),
            ] {
                render_pass.set_pipeline(pipeline);
                for batch in batches.iter() {
                    if batch.instances.end > drawable {
                        continue;
                    }
                    let Some(buffers) = self.shapes.get(&batch.shape) else {
                        continue;
                    };
                    render_pass.set_vertex_buffer(0, buffers.vertex.slice(..));
                    render_pass
                        .set_index_buffer(buffers.index.slice(..), wgpu::IndexFormat::Uint32);
                    render_pass.draw_indexed(0..buffers.index_count, 0, batch.instances.clone());
                }
            }
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: self.window.scale_factor() as f32,
        };
        let stats = DebugStats {
            fps: self.fps,
            frame_time_ms: self.frame_time_ms,
            phase: self.game.phase().label(),
            zoom: self.game.camera().zoom(),
            entity_count: self.game.scene().entity_count(),
            running_sequences: self.game.running_sequences(),
            pending_timers: self.game.pending_timers(),
            screws_removed: self.game.screws_removed(),
            cut_percent: self.game.ui().cut_progress_percent,
        };
        let ui_state = self.game.ui().clone();
        let hud_frame = HudFrame {
            ui: &ui_state,
            show_cut_progress: self.game.phase() == GamePhase::Cut,
            revealing: self.game.phase() == GamePhase::Reveal,
            now: self.now_ms(),
            stats: Some(&stats),
        };
        let actions = self.hud.render(
            &self.device,
            &self.queue,
            &mut encoder,
            &self.window,
            &view,
            &screen_descriptor,
            &hud_frame,
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        for action in actions {
            match action {
                HudAction::Start => self.game.start(),
                HudAction::SelectKnife => {
                    self.game.select_knife();
                }
            }
        }

        self.frame_time_ms = frame_start.elapsed().as_secs_f32() * 1000.0;
        Ok(())
    }
}

// ============================================================================
// MAIN
// ============================================================================

fn main() -> Result<(), AppError> {
    let args = CliArgs::parse();
    let loaded = GameConfig::load(&args.config);
    let mut game_config = loaded.as_ref().cloned().unwrap_or_default();
    game_config.apply_cli_overrides(&args);

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(game_config.debug.log_level.as_str()),
    )
    .init();

    match loaded {
        Ok(_) => log::info!("loaded config from {}", args.config.display()),
        Err(ref e) if GameConfig::is_missing_file(e) => {
            log::debug!("no config at {}, using defaults", args.config.display())
        }
        Err(e) => log::warn!("{e}; using defaults"),
    }

    let event_loop = EventLoop::new()?;

    let window_attributes = Window::default_attributes()
        .with_title(game_config.window.title.clone())
        .with_inner_size(winit::dpi::LogicalSize::new(
            game_config.window.width,
            game_config.window.height,
        ));

    let window = Arc::new(event_loop.create_window(window_attributes)?);

    let mut state = pollster::block_on(State::new(window.clone(), &game_config))?;
    let mut frame_count = 0;
    let mut last_fps_update = Instant::now();

    event_loop.run(move |event, control_flow| {
        match event {
            WinitEvent::WindowEvent {
                ref event,
                window_id,
            } if window_id == window.id() => match event {
                WindowEvent::CloseRequested
                | WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            state: ElementState::Pressed,
                            physical_key: PhysicalKey::Code(KeyCode::Escape),
                            ..
                        },
                    ..
                } => control_flow.exit(),
                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            state: ElementState::Pressed,
                            physical_key: PhysicalKey::Code(KeyCode::F3),
                            repeat: false,
                            ..
                        },
                    ..
                } => state.hud.toggle_stats(),
                WindowEvent::Resized(physical_size) => {
                    state.resize(*physical_size);
                }
                WindowEvent::RedrawRequested => {
                    state.update();
                    match state.render() {
                        Ok(_) => {}
                        Err(wgpu::SurfaceError::Lost) => state.resize(state.size),
                        Err(wgpu::SurfaceError::OutOfMemory) => control_flow.exit(),
                        Err(e) => log::warn!("surface: {:?}", e),
                    }

                    frame_count += 1;
                    let now = Instant::now();
                    if (now - last_fps_update).as_secs_f32() >= 1.0 {
                        state.fps = frame_count;
                        log::trace!(
                            "FPS: {} | Entities: {} | Phase: {}",
                            frame_count,
                            state.game.scene().entity_count(),
                            state.game.phase().label()
                        );
                        frame_count = 0;
                        last_fps_update = now;
                    }
                }
                other => state.input(other),
            },
            WinitEvent::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::components::Material;
    use glam::Mat4;

    fn item(shape: MeshShape, at: Vec3, opacity: f32) -> DrawItem {
        DrawItem {
            shape,
            model: Mat4::from_translation(at),
            material: Material::from_hex(0xffffff).with_opacity(opacity),
        }
    }

    #[test]
    fn opaque_batches_share_a_shape_and_transparent_sort_far_to_near() {
        let items = vec![
            item(MeshShape::Sphere, Vec3::ZERO, 1.0),
            item(MeshShape::Cube, Vec3::ZERO, 1.0),
            item(MeshShape::Sphere, Vec3::X, 1.0),
            item(MeshShape::Sphere, Vec3::new(0.0, 0.0, 1.0), 0.5),
            item(MeshShape::Sphere, Vec3::new(0.0, 0.0, -5.0), 0.5),
            item(MeshShape::Heart, Vec3::ZERO, 0.0),
        ];
        let eye = Vec3::new(0.0, 0.0, 10.0);
        let (instances, opaque, transparent) = build_batches(&items, eye);

        assert_eq!(instances.len(), 5);
        assert_eq!(opaque.len(), 2);
        assert_eq!(opaque[0].shape, MeshShape::Cube);
        assert_eq!(opaque[1].instances, 1..3);
        assert_eq!(transparent.len(), 2);
        // Farther bubble first
        let first = transparent[0].instances.start as usize;
        assert_eq!(instances[first].model[3][2], -5.0);
    }
}
