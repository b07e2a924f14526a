use crate::almanac::{AnalyticSky, Observer};
use crate::camera::{Camera, CameraFrame};
use crate::catalog::{builtin_stars, load_catalog};
use crate::config::{
    default_log_path, load_settings, save_settings_atomic, settings_path, Cli, Settings,
};
use crate::ephemeris::{BodyRegistry, Ephemeris};
use crate::hud::{
    draw_focus_panel, draw_status_bar, draw_target_select, draw_telemetry_panel, draw_too_small,
    status_line, MIN_COLS, MIN_ROWS,
};
use crate::input::{collect_input_nonblocking, map_event_to_action, Action, Scene};
use crate::minimap::{draw_minimap, MiniMapMarker, WorldMap};
use crate::sky::{SkyPainter, SkyReport};
use crate::surface::{Surface, Terminal};
use crate::telemetry::{SimulatedStation, TelemetryFeed, TelemetrySnapshot};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, info, warn, LevelFilter};
use std::fs::OpenOptions;
use std::path::Path;
use std::time::{Duration, Instant};

/// What the loop should do after an action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    EnterMiniMap,
    Quit,
}

/// Everything the sky scene mutates in response to input.
pub(crate) struct ViewState {
    pub(crate) camera: Camera,
    pub(crate) scene: Scene,
    pub(crate) cursor: usize,
    pub(crate) show_telemetry: bool,
    /// Body nearest the screen centre on the last drawn frame.
    pub(crate) nearest: Option<&'static str>,
}

impl ViewState {
    pub(crate) fn new(camera: Camera) -> Self {
        Self {
            camera,
            scene: Scene::Sky,
            cursor: 0,
            show_telemetry: false,
            nearest: None,
        }
    }

    pub(crate) fn apply(&mut self, action: Action, registry: &BodyRegistry) -> Flow {
        match action {
            Action::Quit => return Flow::Quit,
            Action::RotateLeft => {
                self.camera.rotate(registry, -1.0);
            }
            Action::RotateRight => {
                self.camera.rotate(registry, 1.0);
            }
            Action::TiltUp => {
                self.camera.tilt(registry, 1.0);
            }
            Action::TiltDown => {
                self.camera.tilt(registry, -1.0);
            }
            Action::ZoomIn => self.camera.zoom_in(registry, self.nearest),
            Action::ZoomOut => self.camera.zoom_out(),
            Action::ToggleAutoRotate => self.camera.toggle_auto_rotate(),
            Action::FocusNext => self.camera.focus_next(registry),
            Action::FocusPrev => self.camera.focus_prev(registry),
            Action::OpenTargetSelect => {
                self.cursor = registry.index_of(self.camera.focus()).unwrap_or(0);
                self.scene = Scene::TargetSelect;
            }
            Action::MenuMove(d) => {
                if !registry.is_empty() {
                    let n = registry.len() as i32;
                    self.cursor = (self.cursor as i32 + d).rem_euclid(n) as usize;
                }
            }
            Action::MenuSelect => {
                if let Some(body) = registry.at(self.cursor) {
                    let id = body.id;
                    self.camera.select_focus(registry, id);
                }
                self.scene = Scene::Sky;
            }
            Action::Back => self.scene = Scene::Sky,
            Action::ToggleMiniMap => return Flow::EnterMiniMap,
            Action::ToggleTelemetry => self.show_telemetry = !self.show_telemetry,
        }
        Flow::Continue
    }
}

/// Draws one sky frame: sky pass, panels, status bar, overlay.
pub(crate) fn compose_sky_frame<S, E>(
    surface: &mut S,
    painter: &SkyPainter,
    view: &ViewState,
    frame: &CameraFrame,
    registry: &BodyRegistry,
    ephem: &E,
    t: DateTime<Utc>,
    telemetry: Option<&TelemetrySnapshot>,
) -> SkyReport
where
    S: Surface + ?Sized,
    E: Ephemeris + ?Sized,
{
    let (rows, cols) = surface.dimensions();
    if rows < MIN_ROWS || cols < MIN_COLS {
        draw_too_small(surface);
        return SkyReport::default();
    }

    let report = painter.paint(surface, frame, view.camera.focus(), registry, ephem, t);
    if let Some(r) = &report.focus {
        draw_focus_panel(surface, r);
    }
    if let Some(snap) = telemetry {
        draw_telemetry_panel(surface, snap);
    }
    let status = status_line(
        frame.center.azimuth,
        frame.center.altitude,
        frame.fov,
        frame.mode,
        view.camera.auto_rotate(),
    );
    draw_status_bar(surface, &status);
    if view.scene == Scene::TargetSelect {
        draw_target_select(surface, registry, view.cursor, view.camera.focus());
    }
    report
}

/// Current sub-points of every satellite the provider can place.
pub(crate) fn ground_markers<E: Ephemeris + ?Sized>(
    registry: &BodyRegistry,
    ephem: &E,
    t: DateTime<Utc>,
) -> Vec<MiniMapMarker> {
    registry
        .satellites()
        .filter_map(|b| {
            ephem.sub_point(b.id, t).map(|p| MiniMapMarker {
                latitude: p.latitude,
                longitude: p.longitude,
                label: b.id.to_string(),
            })
        })
        .collect()
}

pub(crate) fn init_logging(path: &Path) -> Result<()> {
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    // the terminal belongs to the UI, so logs go to the file only
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .try_init()
        .context("installing logger")?;
    Ok(())
}

pub(crate) struct App {
    settings: Settings,
    registry: BodyRegistry,
    sky: AnalyticSky,
    painter: SkyPainter,
    world: WorldMap,
    telemetry: TelemetryFeed,
    view: ViewState,
    term: Terminal,
    should_quit: bool,
}

impl App {
    fn init(cli: &Cli) -> Result<Self> {
        let log_path = cli.log_file.clone().unwrap_or_else(default_log_path);
        init_logging(&log_path)?;

        let path = settings_path(cli)?;
        let mut settings = load_settings(&path);
        settings.apply_cli(cli)?;
        let settings = settings.sanitized();
        if cli.save_config {
            save_settings_atomic(&path, &settings)?;
            info!("settings written to {}", path.display());
        }
        info!(
            "observer {:.4},{:.4} focus {} fov {} fps {}",
            settings.observer.latitude,
            settings.observer.longitude,
            settings.focus,
            settings.camera.initial_fov,
            settings.frame.fps_cap
        );

        let mut stars = builtin_stars(settings.render.star_mag_limit);
        if let Some(p) = &settings.star_catalog {
            let extra = load_catalog(p, settings.render.star_mag_limit)
                .with_context(|| format!("loading star catalogue {}", p.display()))?;
            info!("loaded {} stars from {}", extra.len(), p.display());
            stars.extend(extra);
        }

        let sky = AnalyticSky::new(
            Observer {
                latitude: settings.observer.latitude,
                longitude: settings.observer.longitude,
            },
            stars,
        );
        let registry = BodyRegistry::default_sky();
        info!("{} stars, {} bodies", sky.star_count(), registry.len());

        let mut camera = Camera::new(settings.camera.clone(), &settings.focus);
        if !registry.contains(&settings.focus) {
            warn!("focus {} is not a known body", settings.focus);
        }
        if let Some(a) = sky.apparent(camera.focus(), Utc::now()) {
            camera.point_at(a.horizontal);
        }

        let painter = SkyPainter::new(settings.render.clone(), settings.camera.deep_zoom_fov);
        let seed = Utc::now().timestamp() as u64;
        let telemetry = TelemetryFeed::spawn(
            SimulatedStation::new(seed),
            Duration::from_millis(settings.telemetry_period_ms),
        );

        let term = Terminal::begin(settings.render.color)?;

        Ok(Self {
            settings,
            registry,
            sky,
            painter,
            world: WorldMap::builtin(),
            telemetry,
            view: ViewState::new(camera),
            term,
            should_quit: false,
        })
    }

    fn frame_budget(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.settings.frame.fps_cap.max(1) as f64)
    }

    fn run(&mut self) -> Result<()> {
        let frame_dt = self.frame_budget();
        let poll = Duration::from_millis(self.settings.frame.poll_ms);

        while !self.should_quit {
            let started = Instant::now();
            self.term.resize_if_needed()?;

            let t = Utc::now();
            let frame = self.view.camera.advance(&self.registry, &self.sky, t);
            self.telemetry.poll();

            self.term.cur.clear();
            let report = compose_sky_frame(
                &mut self.term.cur,
                &self.painter,
                &self.view,
                &frame,
                &self.registry,
                &self.sky,
                t,
                self.view.show_telemetry.then_some(self.telemetry.latest()),
            );
            debug!(
                "{} stars, {} labels, {} labels skipped",
                report.stars_drawn, report.labels_drawn, report.labels_skipped
            );
            self.view.nearest = report.nearest;
            self.term.present()?;

            for ev in collect_input_nonblocking(poll)? {
                let Some(action) = map_event_to_action(self.view.scene, &ev) else {
                    continue;
                };
                match self.view.apply(action, &self.registry) {
                    Flow::Continue => {}
                    Flow::Quit => self.should_quit = true,
                    Flow::EnterMiniMap => {
                        if self.run_minimap()? {
                            self.should_quit = true;
                        }
                    }
                }
                if self.should_quit {
                    break;
                }
            }

            pace(frame_dt, started);
        }
        Ok(())
    }

    /// Modal ground-track view. Returns true when the user asked to quit.
    fn run_minimap(&mut self) -> Result<bool> {
        info!(
            "entering mini-map ({}x{} map)",
            self.world.width(),
            self.world.height()
        );
        let frame_dt = self.frame_budget();
        let poll = Duration::from_millis(self.settings.frame.poll_ms);
        self.term.invalidate();

        let quit = 'modal: loop {
            let started = Instant::now();
            self.term.resize_if_needed()?;

            // keep draining so the channel does not back up while the map is open
            self.telemetry.poll();
            let markers = ground_markers(&self.registry, &self.sky, Utc::now());
            self.term.cur.clear();
            let (rows, cols) = self.term.cur.dimensions();
            if rows < MIN_ROWS || cols < MIN_COLS {
                draw_too_small(&mut self.term.cur);
            } else {
                draw_minimap(&mut self.term.cur, &self.world, &markers);
            }
            self.term.present()?;

            for ev in collect_input_nonblocking(poll)? {
                match map_event_to_action(Scene::MiniMap, &ev) {
                    Some(Action::Quit) => break 'modal true,
                    Some(Action::Back) => break 'modal false,
                    _ => {}
                }
            }
            pace(frame_dt, started);
        };

        self.term.invalidate();
        info!("leaving mini-map");
        Ok(quit)
    }
}

pub(crate) fn run(cli: Cli) -> Result<()> {
    let mut app = App::init(&cli)?;
    let res = app.run();
    // restore the terminal even when the loop failed
    let end = app.term.end();
    info!("exiting");
    res.and(end)
}

/// Sleeps off whatever is left of this frame's budget.
fn pace(budget: Duration, started: Instant) {
    let end = started + budget;
    loop {
        let now = Instant::now();
        if now >= end {
            break;
        }
        let left = end - now;
        if left > Duration::from_millis(2) {
            std::thread::sleep(left - Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraMode;
    use crate::config::{CameraConfig, RenderConfig};
    use crate::ephemeris::{FixedSky, GeoPoint};
    use crate::projection::Horizontal;
    use crate::surface::CellBuffer;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 3, 0, 0).unwrap()
    }

    fn view() -> ViewState {
        ViewState::new(Camera::new(CameraConfig::default(), "Moon"))
    }

    #[test]
    fn target_select_round_trip() {
        let reg = BodyRegistry::default_sky();
        let mut v = view();
        assert_eq!(v.apply(Action::OpenTargetSelect, &reg), Flow::Continue);
        assert_eq!(v.scene, Scene::TargetSelect);
        assert_eq!(v.cursor, 1);
        v.apply(Action::MenuMove(-1), &reg);
        v.apply(Action::MenuMove(-1), &reg);
        assert_eq!(v.cursor, 8);
        v.apply(Action::MenuSelect, &reg);
        assert_eq!(v.camera.focus(), "Hubble");
        assert_eq!(v.scene, Scene::Sky);

        v.apply(Action::OpenTargetSelect, &reg);
        v.apply(Action::MenuMove(1), &reg);
        v.apply(Action::Back, &reg);
        assert_eq!(v.camera.focus(), "Hubble");
        assert_eq!(v.scene, Scene::Sky);
    }

    #[test]
    fn loop_control_actions() {
        let reg = BodyRegistry::default_sky();
        let mut v = view();
        assert_eq!(v.apply(Action::Quit, &reg), Flow::Quit);
        assert_eq!(v.apply(Action::ToggleMiniMap, &reg), Flow::EnterMiniMap);
        v.apply(Action::ToggleTelemetry, &reg);
        assert!(v.show_telemetry);
    }

    #[test]
    fn zoom_in_uses_the_last_nearest_body() {
        let reg = BodyRegistry::default_sky();
        let mut v = view();
        v.camera.set_fov(0.0105);
        v.nearest = Some("Venus");
        v.apply(Action::ZoomIn, &reg);
        assert_eq!(v.camera.focus(), "Venus");
    }

    #[test]
    fn full_frame_locks_and_previews_without_input() {
        let reg = BodyRegistry::default_sky();
        let mut sky = FixedSky::new();
        sky.place("Moon", 180.0, 30.0);
        sky.phases.insert("Moon".into(), 0.5);
        let painter = SkyPainter::new(RenderConfig::default(), 0.01);
        let mut v = view();
        v.camera.toggle_auto_rotate();

        let mut buf = CellBuffer::new(80, 24);
        let frame = v.camera.advance(&reg, &sky, t0());
        let report = compose_sky_frame(&mut buf, &painter, &v, &frame, &reg, &sky, t0(), None);
        assert!(report.focus.is_none());
        assert!(buf.row_text(0).starts_with("Az:180.0 Alt:30.0 Zoom:10.000 |"));

        v.camera.set_fov(0.009);
        let frame = v.camera.advance(&reg, &sky, t0());
        buf.clear();
        let report = compose_sky_frame(&mut buf, &painter, &v, &frame, &reg, &sky, t0(), None);
        assert!(frame.locked());
        assert_eq!(report.focus.unwrap().name, "Moon");
        assert!(buf.row_text(0).contains("[LOCKED]"));
        assert!(buf.row_text(2).contains("--- MOON ---"));
    }

    #[test]
    fn overlays_and_small_terminals() {
        let reg = BodyRegistry::default_sky();
        let sky = FixedSky::new();
        let painter = SkyPainter::new(RenderConfig::default(), 0.01);
        let mut v = view();
        v.scene = Scene::TargetSelect;
        v.show_telemetry = true;
        let frame = v.camera.advance(&reg, &sky, t0());

        let mut buf = CellBuffer::new(80, 24);
        let snap = TelemetrySnapshot::default();
        compose_sky_frame(&mut buf, &painter, &v, &frame, &reg, &sky, t0(), Some(&snap));
        let all: String = (0..24).map(|r| buf.row_text(r)).collect();
        assert!(all.contains("Select target"));
        assert!(all.contains("STATION TELEMETRY"));

        let mut tiny = CellBuffer::new(19, 10);
        compose_sky_frame(&mut tiny, &painter, &v, &frame, &reg, &sky, t0(), None);
        assert!(tiny.row_text(5).contains("Terminal too"));
    }

    #[test]
    fn labels_under_the_status_bar_do_not_block_the_row_below() {
        let reg = BodyRegistry::default_sky();
        let mut sky = FixedSky::new();
        // Sun projects onto row 0, Moon onto row 1
        sky.place("Sun", 180.0, 4.9);
        sky.place("Moon", 180.0, 4.5);
        let painter = SkyPainter::new(RenderConfig::default(), 0.01);
        let v = view();
        let frame = CameraFrame {
            center: Horizontal::new(180.0, 0.0),
            fov: 10.0,
            mode: CameraMode::FreeLook,
            target: None,
        };

        let mut buf = CellBuffer::new(80, 24);
        let report = compose_sky_frame(&mut buf, &painter, &v, &frame, &reg, &sky, t0(), None);
        assert_eq!(report.labels_drawn, 1);
        assert_eq!(report.labels_skipped, 0);
        assert!(buf.row_text(0).starts_with("Az:180.0 Alt:0.0"));
        assert_eq!(buf.get(1, 40).unwrap().ch, 'M');
    }

    #[test]
    fn markers_come_from_satellites_only() {
        let reg = BodyRegistry::default_sky();
        let mut sky = FixedSky::new();
        sky.sub_points.insert("ISS".into(), GeoPoint { latitude: 12.0, longitude: -45.0 });
        sky.sub_points.insert("Moon".into(), GeoPoint { latitude: 1.0, longitude: 1.0 });
        let markers = ground_markers(&reg, &sky, t0());
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].label, "ISS");
        assert_eq!(markers[0].latitude, 12.0);
    }
}
