mod app;
mod chat;
mod config;
mod constants;
mod events;
mod input;
mod physics;
mod services;
mod sprite_sheet;
mod state;
mod state_machine;
mod tips;
mod ui;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use config::Settings;
use constants::*;
use events::PetEvent;
use glam::Vec2;
use input::{InputState, PointerAction};
use physics::PetBody;
use rand::rngs::ThreadRng;
use serde::Serialize;
use services::{EnvironmentSource, HttpSource, ToolServer};
use state::SpriteLibrary;
use state_machine::{InitialState, PetStateMachine};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tips::{TipInbox, TipProducer};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use ui::{OverlayFrame, OverlayLayout, SpriteTextures};

use glutin::prelude::*;
use glutin::surface::WindowSurface;
use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowId};

use egui_glow::EguiGlow;

const AIR_POLLUTION_FILE: &str = "airPollutionData.json";
const NEWS_FILE: &str = "newsData.json";

#[derive(Debug, Parser)]
#[command(name = "desk-marten", version, about = "A marten that lives on your desktop")]
struct Cli {
    /// Settings file. Defaults to desk-marten.json in the working directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the pet (the default)
    Run,
    /// Serve the environment tools as JSON-RPC on stdin/stdout
    Serve,
    /// Fetch air quality and news once and save them as JSON
    Fetch {
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_overlay(settings, cli.config),
        Command::Serve => serve(settings),
        Command::Fetch { out } => fetch_snapshot(settings, &out),
    }
}

/// Logs go to stderr; stdout belongs to the tool server
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "desk_marten=info".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn serve(settings: Settings) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let tools = tips::connect::local_tools(
        reqwest::Client::new(),
        &settings.api_keys,
        &settings.tips.gemini_model,
    );
    let server = ToolServer::new(Arc::new(tools));
    tracing::info!("serving tools on stdio");
    runtime
        .block_on(server.serve_stdio())
        .context("tool server failed")
}

fn fetch_snapshot(settings: Settings, out: &Path) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let keys = &settings.api_keys;
    let source = HttpSource::new(reqwest::Client::new(), keys.openweather.clone(), keys.news.clone());
    let (air, news) = runtime.block_on(async {
        tokio::join!(source.air_pollution(settings.tips.location), source.news())
    });

    std::fs::create_dir_all(out).with_context(|| format!("failed to create {}", out.display()))?;
    match air {
        Ok(data) => write_json(&out.join(AIR_POLLUTION_FILE), &data)?,
        Err(e) => tracing::warn!(error = %e, "air pollution fetch failed"),
    }
    match news {
        Ok(data) => write_json(&out.join(NEWS_FILE), &data)?,
        Err(e) => tracing::warn!(error = %e, "news fetch failed"),
    }
    Ok(())
}

fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    std::fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "saved");
    Ok(())
}

fn run_overlay(settings: Settings, config_path: Option<PathBuf>) -> Result<()> {
    if settings.profiling {
        puffin::set_scopes_on(true);
    }
    // Held for the whole run; dropping it stops the server
    let _puffin_server = if settings.profiling {
        let addr = format!("127.0.0.1:{}", puffin_http::DEFAULT_PORT);
        match puffin_http::Server::new(&addr) {
            Ok(server) => {
                tracing::info!(%addr, "puffin server listening");
                Some(server)
            }
            Err(e) => {
                tracing::warn!(error = %e, "puffin server unavailable");
                None
            }
        }
    } else {
        None
    };

    let event_loop = EventLoop::new()?;
    let mut app = App::new(settings, config_path);
    event_loop.run_app(&mut app)?;
    match app.error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

struct App {
    settings: Settings,
    config_path: Option<PathBuf>,
    state: Option<AppState>,
    /// Fatal startup error, reported once the loop exits
    error: Option<anyhow::Error>,
}

struct AppState {
    // Window and GL
    window: Window,
    gl_surface: glutin::surface::Surface<WindowSurface>,
    gl_context: glutin::context::PossiblyCurrentContext,
    gl: Arc<glow::Context>,
    egui_glow: EguiGlow,
    textures: Option<SpriteTextures>,

    // Pet
    pet: PetStateMachine,
    tips: TipInbox,
    producer: Option<TipProducer>,
    input: InputState,
    rng: ThreadRng,

    /// Layout the window currently has
    layout: OverlayLayout,
    tick_interval: Duration,
    next_tick: Instant,
}

impl App {
    fn new(settings: Settings, config_path: Option<PathBuf>) -> Self {
        Self {
            settings,
            config_path,
            state: None,
            error: None,
        }
    }

    fn init_state(&self, event_loop: &ActiveEventLoop) -> Result<AppState> {
        let sprites = SpriteLibrary::load(
            &self.settings.sleep_sheet_path(),
            &self.settings.awake_sheet_path(),
            self.settings.sheet_layout(),
        )
        .context("failed to load sprite sheets")?;

        let screen = app::screen_bounds(event_loop);
        let body = PetBody::new(Vec2::splat(self.settings.display_size as f32), screen)
            .with_tap_threshold(self.settings.tap_threshold());
        let initial = if self.settings.start_asleep {
            InitialState::Sleep
        } else {
            InitialState::Idle
        };
        let now = Instant::now();
        let mut rng = rand::thread_rng();
        let pet = PetStateMachine::new(sprites, self.settings.timings, body, initial, now, &mut rng)
            .with_frame_interval(self.settings.frame_interval())
            .with_move_speed(self.settings.move_speed);

        let layout = pet_layout(&pet);
        let app::WindowContext {
            window,
            gl_surface,
            gl_context,
            gl,
            egui_glow,
        } = app::create_window(event_loop, window_position(&layout), window_size(&layout))?;

        let (tips, producer) = self.start_tips();

        Ok(AppState {
            window,
            gl_surface,
            gl_context,
            gl,
            egui_glow,
            textures: None,
            pet,
            tips,
            producer,
            input: InputState::new(),
            rng,
            layout,
            tick_interval: Duration::from_millis(TICK_INTERVAL_MS),
            next_tick: now,
        })
    }

    /// Start the producer thread, or hand back an empty inbox if tips are off
    fn start_tips(&self) -> (TipInbox, Option<TipProducer>) {
        let tip_settings = &self.settings.tips;
        if !tip_settings.enabled {
            tracing::info!("tips disabled");
            return (TipInbox::disconnected(), None);
        }
        let (tx, rx) = tips::tip_queue();
        let keys = self.settings.api_keys.clone();
        let connect_settings = tip_settings.clone();
        let config_path = self.config_path.clone();
        match TipProducer::start(
            move || tips::connect_pipeline(keys, connect_settings, config_path),
            tx,
            tip_settings.producer_config(),
        ) {
            Ok(producer) => (TipInbox::new(rx, tip_settings.poll_interval()), Some(producer)),
            Err(e) => {
                tracing::error!(error = %e, "failed to start tip producer");
                (TipInbox::disconnected(), None)
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        match self.init_state(event_loop) {
            Ok(state) => self.state = Some(state),
            Err(e) => {
                tracing::error!(error = %format!("{e:#}"), "startup failed");
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let state = match &mut self.state {
            Some(s) => s,
            None => return,
        };

        // egui only paints here; it never claims input
        let _ = state.egui_glow.on_window_event(&state.window, &event);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                app::resize_surface(&state.gl_surface, &state.gl_context, size.width, size.height);
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                // Usually a monitor change; re-read the screen the pet lives on
                state.pet.body_mut().set_screen(app::screen_bounds(event_loop));
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    if event.state == ElementState::Pressed && input::is_quit_key(key) {
                        event_loop.exit();
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let local = Vec2::new(position.x as f32, position.y as f32);
                if let Some(action) = state.input.cursor_moved(local, state.window_origin()) {
                    state.handle_pointer(action);
                }
            }
            WindowEvent::MouseInput {
                state: button_state,
                button,
                ..
            } => {
                let origin = state.window_origin();
                if let Some(action) = state.input.mouse_input(button, button_state, origin) {
                    state.handle_pointer(action);
                }
            }
            WindowEvent::RedrawRequested => {
                state.render();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(state) = &mut self.state else {
            return;
        };
        let now = Instant::now();
        if now >= state.next_tick {
            state.tick(now);
            state.next_tick = now + state.tick_interval;
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(state.next_tick));
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &mut self.state {
            if let Some(mut producer) = state.producer.take() {
                producer.stop(Duration::from_secs(PRODUCER_STOP_TIMEOUT_SECS));
            }
            state.egui_glow.destroy();
        }
    }
}

fn pet_layout(pet: &PetStateMachine) -> OverlayLayout {
    let body = pet.body();
    ui::overlay_layout(
        body.position,
        body.size,
        pet.bubble().map(|b| &b.message),
        body.screen(),
    )
}

fn window_position(layout: &OverlayLayout) -> PhysicalPosition<i32> {
    PhysicalPosition::new(layout.origin.x as i32, layout.origin.y as i32)
}

fn window_size(layout: &OverlayLayout) -> PhysicalSize<u32> {
    PhysicalSize::new(layout.size.x as u32, layout.size.y as u32)
}

impl AppState {
    fn window_origin(&self) -> Vec2 {
        Vec2::new(self.layout.origin.x, self.layout.origin.y)
    }

    fn handle_pointer(&mut self, action: PointerAction) {
        let now = Instant::now();
        match action {
            PointerAction::Press(pointer) => {
                self.pet.press(pointer, now);
            }
            PointerAction::Move(pointer) => self.pet.pointer_moved(pointer),
            PointerAction::Release => {
                if let Some(release) = self.pet.release(now, &mut self.tips, &mut self.rng) {
                    tracing::debug!(?release, state = %self.pet.state_name(), "pointer released");
                }
            }
        }
        self.after_update();
    }

    fn tick(&mut self, now: Instant) {
        self.pet.tick(now, &mut self.tips, &mut self.rng);
        self.after_update();
    }

    /// React to pet events and move the window along with the pet
    fn after_update(&mut self) {
        for event in self.pet.events().drain() {
            match event {
                PetEvent::StateChanged { from, to } => tracing::trace!(%from, %to, "pet state"),
                PetEvent::BubbleShown { source } => tracing::info!(?source, "bubble shown"),
                PetEvent::BubbleDismissed => tracing::debug!("bubble dismissed"),
                PetEvent::DragStarted => tracing::debug!("drag started"),
            }
        }
        self.sync_window();
        self.window.request_redraw();
    }

    fn sync_window(&mut self) {
        let layout = pet_layout(&self.pet);
        if layout.origin != self.layout.origin {
            self.window.set_outer_position(window_position(&layout));
        }
        if layout.size != self.layout.size {
            let size = window_size(&layout);
            if let Some(actual) = self.window.request_inner_size(size) {
                app::resize_surface(&self.gl_surface, &self.gl_context, actual.width, actual.height);
            }
        }
        self.layout = layout;
    }

    fn render(&mut self) {
        puffin::GlobalProfiler::lock().new_frame();
        puffin::profile_function!();

        let pet = &self.pet;
        let layout = self.layout;
        let textures = &mut self.textures;
        self.egui_glow.run(&self.window, |ctx| {
            let textures = textures.get_or_insert_with(|| SpriteTextures::upload(ctx, pet.sprites()));
            let frame = OverlayFrame {
                pet: layout.pet,
                texture: textures.frame(&pet.state().frames, pet.anim_index()),
                mirrored: pet.is_mirrored(),
                bubble: layout.bubble.zip(pet.bubble().map(|b| &b.message)),
            };
            ui::draw_overlay(ctx, &frame);
        });

        unsafe {
            use glow::HasContext;
            self.gl.clear_color(0.0, 0.0, 0.0, 0.0);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }
        self.egui_glow.paint(&self.window);

        if let Err(e) = self.gl_surface.swap_buffers(&self.gl_context) {
            tracing::error!(error = %e, "swap_buffers failed");
        }
    }
}
