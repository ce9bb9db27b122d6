//! GPU backend selection for the dataset renderer.
//!
//! Rendering always asks wgpu for a high-performance adapter. The backend set
//! comes from `WGPU_BACKEND` when it names a known backend, otherwise every
//! primary backend of the platform is allowed and wgpu picks the best one.
//!
//! ```bash
//! WGPU_BACKEND=vulkan cargo run --release
//! ```

use bevy::log::{info, warn};
use bevy::prelude::*;
use bevy::render::renderer::RenderAdapterInfo;
use bevy::render::settings::{Backends, PowerPreference, RenderCreation, WgpuSettings};
use bevy::render::RenderPlugin;
use std::env;

/// Rendering backends wgpu can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderBackend {
    /// Vulkan (Linux, Windows, Android)
    Vulkan,
    /// Metal (macOS, iOS)
    Metal,
    /// Direct3D 12 (Windows)
    DirectX12,
    /// OpenGL / GLES
    OpenGL,
    /// Browser WebGPU
    WebGPU,
    /// Every primary backend
    Auto,
}

impl RenderBackend {
    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            RenderBackend::Vulkan => "Vulkan",
            RenderBackend::Metal => "Metal",
            RenderBackend::DirectX12 => "Direct3D 12",
            RenderBackend::OpenGL => "OpenGL",
            RenderBackend::WebGPU => "WebGPU",
            RenderBackend::Auto => "Auto",
        }
    }

    /// wgpu backend bits
    pub fn backends(&self) -> Backends {
        match self {
            RenderBackend::Vulkan => Backends::VULKAN,
            RenderBackend::Metal => Backends::METAL,
            RenderBackend::DirectX12 => Backends::DX12,
            RenderBackend::OpenGL => Backends::GL,
            RenderBackend::WebGPU => Backends::BROWSER_WEBGPU,
            RenderBackend::Auto => Backends::PRIMARY,
        }
    }
}

/// Configuration for adapter selection.
///
/// Built before the app (and its log subscriber) exists, so nothing is logged
/// here; [`report_adapter`] reports the outcome at startup.
#[derive(Resource, Debug, Clone)]
pub struct BackendConfig {
    /// Backend requested through the environment, if any
    pub preferred: Option<RenderBackend>,
    /// Ask for the discrete GPU over an integrated one
    pub high_performance: bool,
    /// `WGPU_BACKEND` value that named no known backend
    pub unknown_value: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl BackendConfig {
    /// Read `WGPU_BACKEND`; unknown values fall back to automatic selection
    pub fn from_env() -> Self {
        let value = env::var("WGPU_BACKEND").ok();
        Self::from_env_value(value.as_deref())
    }

    /// Build from a raw `WGPU_BACKEND` value
    pub fn from_env_value(value: Option<&str>) -> Self {
        let preferred = value.and_then(parse_backend);
        let unknown_value = match (value, preferred) {
            (Some(v), None) => Some(v.to_string()),
            _ => None,
        };
        Self {
            preferred,
            high_performance: true,
            unknown_value,
        }
    }

    /// The backend that will be requested
    pub fn selected_backend(&self) -> RenderBackend {
        self.preferred.unwrap_or(RenderBackend::Auto)
    }

    /// wgpu settings for the render plugin
    pub fn wgpu_settings(&self) -> WgpuSettings {
        let power_preference = if self.high_performance {
            PowerPreference::HighPerformance
        } else {
            PowerPreference::LowPower
        };
        WgpuSettings {
            backends: Some(self.selected_backend().backends()),
            power_preference,
            ..default()
        }
    }

    /// Render plugin configured with these settings
    pub fn render_plugin(&self) -> RenderPlugin {
        RenderPlugin {
            render_creation: RenderCreation::Automatic(self.wgpu_settings()),
            ..default()
        }
    }
}

/// Parse a backend string from environment variable or user input
fn parse_backend(s: &str) -> Option<RenderBackend> {
    match s.trim().to_lowercase().as_str() {
        "vulkan" => Some(RenderBackend::Vulkan),
        "metal" => Some(RenderBackend::Metal),
        "dx12" | "d3d12" | "directx12" => Some(RenderBackend::DirectX12),
        "gl" | "opengl" | "gles" => Some(RenderBackend::OpenGL),
        "webgpu" | "web" => Some(RenderBackend::WebGPU),
        "auto" | "primary" => Some(RenderBackend::Auto),
        _ => None,
    }
}

/// Whether an adapter is a CPU rasterizer rather than a GPU.
///
/// `device_kind` is the debug name of the wgpu device type.
pub fn is_software_adapter(name: &str, device_kind: &str) -> bool {
    let name = name.to_lowercase();
    device_kind.eq_ignore_ascii_case("cpu")
        || ["llvmpipe", "lavapipe", "swiftshader", "softpipe", "warp"]
            .iter()
            .any(|s| name.contains(s))
}

/// Log line for the adapter check
pub fn gpu_status_message(software: bool) -> &'static str {
    if software {
        "GPU rendering is not enabled."
    } else {
        "GPU rendering is enabled."
    }
}

/// Startup system: report the requested backend and which adapter renders
/// the dataset
pub fn report_adapter(
    backend: Option<Res<BackendConfig>>,
    adapter: Option<Res<RenderAdapterInfo>>,
) {
    if let Some(backend) = backend {
        if let Some(value) = &backend.unknown_value {
            warn!("Ignoring unknown WGPU_BACKEND value: {}", value);
        }
        info!("Requested {} backend", backend.selected_backend().name());
    }
    let Some(adapter) = adapter else {
        warn!("{}", gpu_status_message(true));
        return;
    };
    let device_kind = format!("{:?}", adapter.device_type);
    let software = is_software_adapter(&adapter.name, &device_kind);
    info!(
        "Adapter: {} ({}, {:?})",
        adapter.name, device_kind, adapter.backend
    );
    if software {
        warn!("{}", gpu_status_message(software));
    } else {
        info!("{}", gpu_status_message(software));
    }
}
