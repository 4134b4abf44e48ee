//! Damped Spring Visualizer
//!
//! A mass hanging from a damped spring under constant forcing, integrated one
//! frame at a time by an adaptive implicit Runge–Kutta session.
//!
//! Usage: `spring_sim [config.yaml]`
//!
//! Controls:
//! - Left mouse drag: Orbit camera
//! - Scroll: Zoom in/out
//! - Space: Pause/resume
//! - R: Restart physics
//! - C: Reset camera
//! - G: Toggle grid
//! - B: Switch binding policy (position / velocity delta)
//! - Shift+F: Toggle full screen
//! - Shift+V: Log camera frame and view matrices

mod equations_ui;
mod renderer;

use common::{FpsCounter, GraphicsContext, OrbitCamera};
use equations_ui::{draw_equations_sidebar, draw_status_window, SPRING_EQUATIONS, SPRING_VARIABLES};
use glam::Vec3;
use renderer::SceneRenderer;
use spring_sim::{SimConfig, SpringSimulation};
use winit::{
    event::{ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::ControlFlow,
    keyboard::{KeyCode, ModifiersState, PhysicalKey},
};

const CAMERA_TARGET: Vec3 = Vec3::new(0.0, 0.0, 0.5);
const CAMERA_DISTANCE: f32 = 9.0;

struct EguiState {
    ctx: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
}

struct App {
    ctx: GraphicsContext,
    renderer: SceneRenderer,
    simulation: SpringSimulation,
    camera: OrbitCamera,
    fps: FpsCounter,
    title: String,
    paused: bool,
    show_grid: bool,
    modifiers: ModifiersState,
    mouse_pressed: bool,
    last_mouse_pos: Option<(f64, f64)>,
    egui: EguiState,
}

impl App {
    fn new(ctx: GraphicsContext, simulation: SpringSimulation, title: String) -> Self {
        let camera = OrbitCamera::new(ctx.aspect_ratio(), CAMERA_TARGET, CAMERA_DISTANCE);
        let mut renderer = SceneRenderer::new(&ctx, &camera);
        renderer.update_scene(&ctx.queue, simulation.anchor(), simulation.translation());

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &ctx.window,
            Some(ctx.window.scale_factor() as f32),
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&ctx.device, ctx.config.format, None, 1);

        Self {
            ctx,
            renderer,
            simulation,
            camera,
            fps: FpsCounter::new(1.0),
            title,
            paused: false,
            show_grid: true,
            modifiers: ModifiersState::empty(),
            mouse_pressed: false,
            last_mouse_pos: None,
            egui: EguiState {
                ctx: egui_ctx,
                state: egui_state,
                renderer: egui_renderer,
            },
        }
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        self.ctx.resize(new_size);
        self.camera.update_aspect_ratio(self.ctx.aspect_ratio());
        self.renderer
            .resize(&self.ctx.device, new_size.width, new_size.height);
    }

    /// One physics frame per rendered frame; the frame index, not the wall
    /// clock, drives simulated time.
    fn update(&mut self, dt: f32) {
        if let Some(fps) = self.fps.update(dt) {
            self.ctx
                .window
                .set_title(&format!("{} - {} fps", self.title, fps));
        }

        if !self.paused {
            self.simulation.step_frame();
        }
        self.renderer.update_scene(
            &self.ctx.queue,
            self.simulation.anchor(),
            self.simulation.translation(),
        );
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.renderer.update_camera(&self.ctx.queue, &self.camera);

        let raw_input = self.egui.state.take_egui_input(&self.ctx.window);
        let full_output = self.egui.ctx.run(raw_input, |ctx| {
            draw_equations_sidebar(ctx, "Damped Spring", SPRING_EQUATIONS, SPRING_VARIABLES);
            draw_status_window(ctx, &self.simulation, self.paused);
        });

        self.egui.state.handle_platform_output(&self.ctx.window, full_output.platform_output);
        let tris = self.egui.ctx.tessellate(full_output.shapes, full_output.pixels_per_point);
        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui.renderer.update_texture(&self.ctx.device, &self.ctx.queue, *id, image_delta);
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.ctx.size.width, self.ctx.size.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        self.renderer.render(&mut encoder, &view, self.show_grid);

        self.egui.renderer.update_buffers(
            &self.ctx.device,
            &self.ctx.queue,
            &mut encoder,
            &tris,
            &screen_descriptor,
        );
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.egui.renderer.render(&mut render_pass, &tris, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui.renderer.free_texture(id);
        }

        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    fn reset_camera(&mut self) {
        self.camera = OrbitCamera::new(self.ctx.aspect_ratio(), CAMERA_TARGET, CAMERA_DISTANCE);
    }

    fn handle_key(&mut self, key: KeyCode, state: ElementState) {
        if state != ElementState::Pressed {
            return;
        }

        let shift = self.modifiers.shift_key();
        match key {
            KeyCode::KeyF if shift => self.ctx.toggle_fullscreen(),
            KeyCode::KeyV if shift => log::info!("{}", self.camera.describe()),
            KeyCode::Space => self.paused = !self.paused,
            KeyCode::KeyG => self.show_grid = !self.show_grid,
            KeyCode::KeyB => self.simulation.toggle_policy(),
            KeyCode::KeyC => self.reset_camera(),
            KeyCode::KeyR => {
                if let Err(e) = self.simulation.restart() {
                    log::error!("restart failed: {}", e);
                }
            }
            _ => {}
        }
    }

    fn handle_mouse_move(&mut self, x: f64, y: f64) {
        if self.mouse_pressed {
            if let Some((last_x, last_y)) = self.last_mouse_pos {
                let dx = (x - last_x) as f32 * 0.01;
                let dy = (y - last_y) as f32 * 0.01;
                self.camera.orbit(-dx, dy);
            }
            self.last_mouse_pos = Some((x, y));
        }
    }

    fn handle_scroll(&mut self, delta: f32) {
        self.camera.zoom(delta * 0.5);
    }

    fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        self.egui.state.on_window_event(&self.ctx.window, event).consumed
    }
}

fn load_config() -> Result<SimConfig, spring_sim::ConfigError> {
    match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading configuration from {}", path);
            SimConfig::load(path)
        }
        None => {
            log::info!("No configuration file given, using defaults");
            Ok(SimConfig::default())
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let simulation = match SpringSimulation::from_config(&config) {
        Ok(simulation) => simulation,
        Err(e) => {
            log::error!("Cannot start simulation: {}", e);
            std::process::exit(1);
        }
    };

    let (ctx, event_loop) = match pollster::block_on(GraphicsContext::new(
        &config.window.title,
        config.window.width,
        config.window.height,
    )) {
        Ok(pair) => pair,
        Err(e) => {
            log::error!("Graphics initialization failed: {}", e);
            std::process::exit(1);
        }
    };

    let mut app = App::new(ctx, simulation, config.window.title.clone());
    let mut last_time = std::time::Instant::now();

    let result = event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { ref event, .. } => {
                if let WindowEvent::ModifiersChanged(modifiers) = event {
                    app.modifiers = modifiers.state();
                }

                let consumed = app.handle_window_event(event);

                if !consumed {
                    match event {
                        WindowEvent::CloseRequested => elwt.exit(),
                        WindowEvent::Resized(size) => app.resize(*size),
                        WindowEvent::MouseInput { state, button, .. } => {
                            if *button == MouseButton::Left {
                                app.mouse_pressed = *state == ElementState::Pressed;
                                if !app.mouse_pressed {
                                    app.last_mouse_pos = None;
                                }
                            }
                        }
                        WindowEvent::CursorMoved { position, .. } => {
                            app.handle_mouse_move(position.x, position.y);
                        }
                        WindowEvent::KeyboardInput {
                            event:
                                KeyEvent {
                                    physical_key: PhysicalKey::Code(key),
                                    state,
                                    ..
                                },
                            ..
                        } => app.handle_key(*key, *state),
                        WindowEvent::MouseWheel { delta, .. } => {
                            let scroll = match delta {
                                MouseScrollDelta::LineDelta(_, y) => *y,
                                MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                            };
                            app.handle_scroll(scroll);
                        }
                        WindowEvent::RedrawRequested => {
                            let now = std::time::Instant::now();
                            let dt = (now - last_time).as_secs_f32();
                            last_time = now;

                            app.update(dt);
                            match app.render() {
                                Ok(_) => {}
                                Err(wgpu::SurfaceError::Lost) => app.resize(app.ctx.size),
                                Err(wgpu::SurfaceError::OutOfMemory) => {
                                    log::error!("GPU out of memory");
                                    elwt.exit();
                                }
                                Err(e) => log::warn!("Render error: {:?}", e),
                            }
                        }
                        _ => {}
                    }
                }
            }
            Event::AboutToWait => {
                app.ctx.window.request_redraw();
            }
            _ => {}
        }
    });

    if let Err(e) = result {
        log::error!("Event loop error: {}", e);
        std::process::exit(1);
    }
}
