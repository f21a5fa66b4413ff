//! Overlay window and OpenGL context management.
//!
//! The window is borderless, transparent and always on top. It is moved
//! and resized every tick to wrap the pet and its bubble, so everything
//! outside it stays clickable.

use std::ffi::CString;
use std::num::NonZeroU32;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use glutin::config::{Config, ConfigTemplateBuilder};
use glutin::context::{ContextApi, ContextAttributesBuilder, Version};
use glutin::display::{Display, DisplayApiPreference, GetGlDisplay};
use glutin::prelude::*;
use glutin::surface::{SurfaceAttributesBuilder, WindowSurface};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowAttributes, WindowLevel};

use egui_glow::EguiGlow;

use crate::constants::*;
use crate::physics::ScreenBounds;

/// Result of window and GL context creation.
pub struct WindowContext {
    pub window: Window,
    pub gl_surface: glutin::surface::Surface<WindowSurface>,
    pub gl_context: glutin::context::PossiblyCurrentContext,
    pub gl: Arc<glow::Context>,
    pub egui_glow: EguiGlow,
}

/// Size of the primary monitor, or a common desktop size if none is reported
pub fn screen_bounds(event_loop: &ActiveEventLoop) -> ScreenBounds {
    let monitor = event_loop
        .primary_monitor()
        .or_else(|| event_loop.available_monitors().next());
    match monitor {
        Some(m) if m.size().width > 0 && m.size().height > 0 => ScreenBounds {
            width: m.size().width as f32,
            height: m.size().height as f32,
        },
        _ => {
            tracing::warn!("no monitor size available, assuming 1920x1080");
            ScreenBounds {
                width: FALLBACK_SCREEN_WIDTH,
                height: FALLBACK_SCREEN_HEIGHT,
            }
        }
    }
}

/// Create the transparent overlay window with an OpenGL context and egui.
pub fn create_window(
    event_loop: &ActiveEventLoop,
    position: PhysicalPosition<i32>,
    size: PhysicalSize<u32>,
) -> Result<WindowContext> {
    let window_attrs = WindowAttributes::default()
        .with_title("Desk Marten")
        .with_inner_size(size)
        .with_position(position)
        .with_resizable(false)
        .with_decorations(false)
        .with_transparent(true)
        .with_window_level(WindowLevel::AlwaysOnTop);

    let template = ConfigTemplateBuilder::new()
        .with_alpha_size(8)
        .with_transparency(true);
    let (window, gl_config) = window_with_config(event_loop, window_attrs, template)?;
    if !gl_config.supports_transparency().unwrap_or(false) {
        tracing::warn!("GL config has no transparency; the overlay may draw a solid background");
    }
    let window_handle = window.window_handle().context("window has no handle")?;
    let gl_display = gl_config.display();

    let context_attrs = ContextAttributesBuilder::new()
        .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
        .build(Some(window_handle.as_raw()));

    let gl_context = unsafe { gl_display.create_context(&gl_config, &context_attrs) }
        .context("failed to create OpenGL context")?;

    let inner = window.inner_size();
    let surface_attrs = SurfaceAttributesBuilder::<WindowSurface>::new().build(
        window_handle.as_raw(),
        NonZeroU32::new(inner.width).context("window has zero width")?,
        NonZeroU32::new(inner.height).context("window has zero height")?,
    );

    let gl_surface = unsafe { gl_display.create_window_surface(&gl_config, &surface_attrs) }
        .context("failed to create surface")?;

    let gl_context = gl_context
        .make_current(&gl_surface)
        .context("failed to make context current")?;

    let gl = Arc::new(unsafe {
        glow::Context::from_loader_function(|s| match CString::new(s) {
            Ok(s) => gl_display.get_proc_address(&s) as *const _,
            Err(_) => std::ptr::null(),
        })
    });

    let egui_glow = EguiGlow::new(event_loop, gl.clone(), None, None, false);
    egui_glow.egui_ctx.set_style(crate::ui::style::overlay_style());

    tracing::info!(
        x = position.x,
        y = position.y,
        width = inner.width,
        height = inner.height,
        "overlay window created"
    );

    Ok(WindowContext {
        window,
        gl_surface,
        gl_context,
        gl,
        egui_glow,
    })
}

/// Open the GL display, pick a config and create the window that matches it.
/// WGL needs the window before the display, everything else the other way round.
fn window_with_config(
    event_loop: &ActiveEventLoop,
    window_attrs: WindowAttributes,
    template: ConfigTemplateBuilder,
) -> Result<(Window, Config)> {
    #[cfg(target_os = "windows")]
    {
        let window = event_loop
            .create_window(window_attrs)
            .context("failed to create window")?;
        let raw = window.window_handle().context("window has no handle")?.as_raw();
        let display = open_display(event_loop, DisplayApiPreference::Wgl(Some(raw)))?;
        let config = choose_config(&display, template.compatible_with_native_window(raw))?;
        Ok((window, config))
    }

    #[cfg(not(target_os = "windows"))]
    {
        #[cfg(target_os = "macos")]
        let preference = DisplayApiPreference::Cgl;
        #[cfg(not(target_os = "macos"))]
        let preference = DisplayApiPreference::Egl;

        let display = open_display(event_loop, preference)?;
        let config = choose_config(&display, template)?;
        let window = glutin_winit::finalize_window(event_loop, window_attrs, &config)
            .context("failed to create window")?;
        Ok((window, config))
    }
}

fn open_display(event_loop: &ActiveEventLoop, preference: DisplayApiPreference) -> Result<Display> {
    let handle = event_loop
        .display_handle()
        .context("event loop has no display handle")?
        .as_raw();
    unsafe { Display::new(handle, preference) }.context("failed to open GL display")
}

fn choose_config(display: &Display, template: ConfigTemplateBuilder) -> Result<Config> {
    let configs = unsafe { display.find_configs(template.build()) }.context("failed to query GL configs")?;
    prefer_transparent(configs, |c| c.supports_transparency().unwrap_or(false))
        .context("display offered no GL configs")
}

/// The first item that can blend with the desktop, else the first item
fn prefer_transparent<T>(items: impl IntoIterator<Item = T>, is_transparent: impl Fn(&T) -> bool) -> Option<T> {
    let mut first = None;
    for item in items {
        if is_transparent(&item) {
            return Some(item);
        }
        first.get_or_insert(item);
    }
    first
}

/// Resize the GL surface to match the window size.
pub fn resize_surface(
    gl_surface: &glutin::surface::Surface<WindowSurface>,
    gl_context: &glutin::context::PossiblyCurrentContext,
    width: u32,
    height: u32,
) {
    if let (Some(w), Some(h)) = (NonZeroU32::new(width), NonZeroU32::new(height)) {
        gl_surface.resize(gl_context, w, h);
    }
}
