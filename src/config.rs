use anyhow::{bail, Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::shader::DEFAULT_RAMP;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "skyglass")]
#[command(about = "Terminal sky viewer: planets, moon, stars and satellites in real time")]
pub(crate) struct Cli {
    /// Observer latitude (decimal degrees). Example: 40.71
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) lat: Option<f64>,

    /// Observer longitude (decimal degrees, east positive). Example: -74.01
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) lon: Option<f64>,

    /// Initial field of view in degrees
    #[arg(long)]
    pub(crate) fov: Option<f64>,

    /// Body to focus on start (Sun, Moon, Mars, ISS, ...)
    #[arg(long)]
    pub(crate) focus: Option<String>,

    /// Extra star catalogue, CSV with name,ra_hours,dec_deg,magnitude
    #[arg(long)]
    pub(crate) stars: Option<PathBuf>,

    /// Frame rate cap
    #[arg(long)]
    pub(crate) fps: Option<u32>,

    /// Monochrome output
    #[arg(long)]
    pub(crate) no_color: bool,

    /// Start with auto-rotate off
    #[arg(long)]
    pub(crate) no_auto_rotate: bool,

    /// Settings file (default: platform config dir)
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,

    /// Write the effective settings back to the settings file
    #[arg(long)]
    pub(crate) save_config: bool,

    /// Log file (default: skyglass.log in the temp dir)
    #[arg(long)]
    pub(crate) log_file: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub(crate) struct ObserverConfig {
    pub(crate) latitude: f64,
    pub(crate) longitude: f64,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            latitude: 40.7128,
            longitude: -74.0060,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub(crate) struct CameraConfig {
    pub(crate) initial_azimuth: f64,
    pub(crate) initial_altitude: f64,
    pub(crate) initial_fov: f64,
    pub(crate) min_fov: f64,
    pub(crate) max_fov: f64,
    /// Field of view at or below which the camera locks onto its focus.
    pub(crate) deep_zoom_fov: f64,
    pub(crate) zoom_in_factor: f64,
    pub(crate) zoom_out_factor: f64,
    pub(crate) pan_step: f64,
    /// Degrees of azimuth per frame.
    pub(crate) auto_rotate_step: f64,
    pub(crate) auto_rotate: bool,
    /// Zooming into deep zoom retargets to whatever is nearest the centre.
    pub(crate) auto_focus_nearest: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            initial_azimuth: 180.0,
            initial_altitude: 30.0,
            initial_fov: 10.0,
            min_fov: 0.001,
            max_fov: 120.0,
            deep_zoom_fov: 0.01,
            zoom_in_factor: 0.9,
            zoom_out_factor: 1.1,
            pan_step: 2.0,
            auto_rotate_step: 0.1,
            auto_rotate: true,
            auto_focus_nearest: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub(crate) struct RenderConfig {
    pub(crate) abbrev_fov: f64,
    pub(crate) preview_radius: i32,
    pub(crate) ramp: String,
    pub(crate) star_mag_limit: f64,
    pub(crate) label_row_radius: i32,
    pub(crate) label_col_radius: i32,
    pub(crate) color: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            abbrev_fov: 5.0,
            preview_radius: 5,
            ramp: DEFAULT_RAMP.to_string(),
            star_mag_limit: 3.5,
            label_row_radius: 1,
            label_col_radius: 2,
            color: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub(crate) struct LoopConfig {
    pub(crate) fps_cap: u32,
    pub(crate) poll_ms: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            fps_cap: 20,
            poll_ms: 30,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) observer: ObserverConfig,
    pub(crate) camera: CameraConfig,
    pub(crate) render: RenderConfig,
    pub(crate) frame: LoopConfig,
    pub(crate) focus: String,
    pub(crate) telemetry_period_ms: u64,
    pub(crate) star_catalog: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            observer: ObserverConfig::default(),
            camera: CameraConfig::default(),
            render: RenderConfig::default(),
            frame: LoopConfig::default(),
            focus: "Moon".to_string(),
            telemetry_period_ms: 1000,
            star_catalog: None,
        }
    }
}

impl Settings {
    /// Pulls hand-edited values back into a usable range.
    pub(crate) fn sanitized(mut self) -> Self {
        let defaults = CameraConfig::default();
        let cam = &mut self.camera;
        if !(cam.min_fov > 0.0) {
            cam.min_fov = defaults.min_fov;
        }
        if !(cam.max_fov >= cam.min_fov) {
            cam.max_fov = defaults.max_fov.max(cam.min_fov);
        }
        if !(cam.zoom_in_factor > 0.0 && cam.zoom_in_factor < 1.0) {
            cam.zoom_in_factor = defaults.zoom_in_factor;
        }
        if !(cam.zoom_out_factor > 1.0) {
            cam.zoom_out_factor = defaults.zoom_out_factor;
        }
        if !cam.initial_fov.is_finite() {
            cam.initial_fov = defaults.initial_fov;
        }
        cam.initial_fov = cam.initial_fov.clamp(cam.min_fov, cam.max_fov);
        cam.initial_altitude = crate::projection::clamp_altitude(cam.initial_altitude);
        cam.initial_azimuth = crate::projection::normalize_azimuth(cam.initial_azimuth);

        if self.render.ramp.chars().count() < 2 {
            self.render.ramp = DEFAULT_RAMP.to_string();
        }
        self.render.preview_radius = self.render.preview_radius.clamp(1, 40);
        self.render.label_row_radius = self.render.label_row_radius.max(0);
        self.render.label_col_radius = self.render.label_col_radius.max(0);
        self.frame.fps_cap = self.frame.fps_cap.clamp(1, 120);
        self.telemetry_period_ms = self.telemetry_period_ms.max(100);
        self
    }

    /// Command-line values win over the settings file.
    pub(crate) fn apply_cli(&mut self, cli: &Cli) -> Result<()> {
        if let Some(lat) = cli.lat {
            if !(-90.0..=90.0).contains(&lat) {
                bail!("--lat must be within -90..=90, got {lat}");
            }
            self.observer.latitude = lat;
        }
        if let Some(lon) = cli.lon {
            if !(-180.0..=180.0).contains(&lon) {
                bail!("--lon must be within -180..=180, got {lon}");
            }
            self.observer.longitude = lon;
        }
        if let Some(fov) = cli.fov {
            if !(fov > 0.0 && fov.is_finite()) {
                bail!("--fov must be a positive number of degrees, got {fov}");
            }
            self.camera.initial_fov = fov;
        }
        if let Some(focus) = &cli.focus {
            self.focus = focus.clone();
        }
        if let Some(stars) = &cli.stars {
            self.star_catalog = Some(stars.clone());
        }
        if let Some(fps) = cli.fps {
            if fps == 0 {
                bail!("--fps must be at least 1");
            }
            self.frame.fps_cap = fps;
        }
        if cli.no_color {
            self.render.color = false;
        }
        if cli.no_auto_rotate {
            self.camera.auto_rotate = false;
        }
        Ok(())
    }
}

pub(crate) fn settings_path(cli: &Cli) -> Result<PathBuf> {
    if let Some(p) = &cli.config {
        return Ok(p.clone());
    }
    let proj = ProjectDirs::from("com", "skyglass", "Skyglass")
        .context("could not resolve project directories")?;
    Ok(proj.config_dir().join("settings.json"))
}

pub(crate) fn default_log_path() -> PathBuf {
    std::env::temp_dir().join("skyglass.log")
}

pub(crate) fn load_settings(path: &Path) -> Settings {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            debug!("no settings at {}: {e}", path.display());
            return Settings::default();
        }
    };
    match serde_json::from_str::<Settings>(&text) {
        Ok(s) => s.sanitized(),
        Err(e) => {
            warn!("ignoring malformed settings {}: {e}", path.display());
            Settings::default()
        }
    }
}

pub(crate) fn save_settings_atomic(path: &Path, s: &Settings) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(s)?;
    fs::write(&tmp, data).with_context(|| format!("writing {}", tmp.display()))?;
    atomic_rename(&tmp, path)?;
    Ok(())
}

fn atomic_rename(from: &Path, to: &Path) -> Result<()> {
    // rename over an existing file fails on some platforms
    if to.exists() {
        let _ = fs::remove_file(to);
    }
    fs::rename(from, to).with_context(|| format!("replacing {}", to.display()))?;
    Ok(())
}
