use crate::config::CameraConfig;
use crate::ephemeris::{Apparent, BodyRegistry, Ephemeris};
use crate::projection::{clamp_altitude, normalize_azimuth, Horizontal};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CameraMode {
    FreeLook,
    Locked,
}

/// True when the camera must follow its focus target. Recomputed every
/// frame, never stored.
pub(crate) fn is_locked(fov: f64, deep_zoom_fov: f64, focus: &str, registry: &BodyRegistry) -> bool {
    fov <= deep_zoom_fov && registry.contains(focus)
}

/// Camera state resolved for one frame.
#[derive(Clone, Copy, Debug)]
pub(crate) struct CameraFrame {
    pub(crate) center: Horizontal,
    pub(crate) fov: f64,
    pub(crate) mode: CameraMode,
    /// Focus target position when locked and available.
    pub(crate) target: Option<Apparent>,
}

impl CameraFrame {
    pub(crate) fn locked(&self) -> bool {
        self.mode == CameraMode::Locked
    }
}

pub(crate) struct Camera {
    cfg: CameraConfig,
    azimuth: f64,
    altitude: f64,
    fov: f64,
    auto_rotate: bool,
    focus: String,
    // last reported mode, used only to log transitions
    reported: CameraMode,
}

impl Camera {
    pub(crate) fn new(cfg: CameraConfig, focus: &str) -> Self {
        let fov = cfg.initial_fov.clamp(cfg.min_fov, cfg.max_fov);
        Self {
            azimuth: normalize_azimuth(cfg.initial_azimuth),
            altitude: clamp_altitude(cfg.initial_altitude),
            fov,
            auto_rotate: cfg.auto_rotate,
            focus: focus.to_string(),
            reported: CameraMode::FreeLook,
            cfg,
        }
    }

    #[cfg(test)]
    pub(crate) fn azimuth(&self) -> f64 {
        self.azimuth
    }

    #[cfg(test)]
    pub(crate) fn altitude(&self) -> f64 {
        self.altitude
    }

    #[cfg(test)]
    pub(crate) fn fov(&self) -> f64 {
        self.fov
    }

    pub(crate) fn auto_rotate(&self) -> bool {
        self.auto_rotate
    }

    pub(crate) fn focus(&self) -> &str {
        &self.focus
    }

    pub(crate) fn mode(&self, registry: &BodyRegistry) -> CameraMode {
        if is_locked(self.fov, self.cfg.deep_zoom_fov, &self.focus, registry) {
            CameraMode::Locked
        } else {
            CameraMode::FreeLook
        }
    }

    pub(crate) fn point_at(&mut self, dir: Horizontal) {
        self.azimuth = normalize_azimuth(dir.azimuth);
        self.altitude = clamp_altitude(dir.altitude);
    }

    /// Resolves orientation for the frame at `t`.
    ///
    /// Locked: orientation is overwritten from the target's current
    /// direction; if the provider has no position this frame the previous
    /// orientation is held. Free: auto-rotate, if on, nudges the azimuth.
    pub(crate) fn advance<E: Ephemeris + ?Sized>(
        &mut self,
        registry: &BodyRegistry,
        ephem: &E,
        t: DateTime<Utc>,
    ) -> CameraFrame {
        let mode = self.mode(registry);
        let mut target = None;
        match mode {
            CameraMode::Locked => match ephem.apparent(&self.focus, t) {
                Some(a) => {
                    self.point_at(a.horizontal);
                    target = Some(a);
                }
                None => debug!("{} has no position, holding orientation", self.focus),
            },
            CameraMode::FreeLook => {
                if self.auto_rotate {
                    self.azimuth = normalize_azimuth(self.azimuth + self.cfg.auto_rotate_step);
                }
            }
        }

        if mode != self.reported {
            info!(
                "camera {:?} -> {:?} (focus {}, fov {:.4})",
                self.reported, mode, self.focus, self.fov
            );
            self.reported = mode;
        }

        CameraFrame {
            center: Horizontal::new(self.azimuth, self.altitude),
            fov: self.fov,
            mode,
            target,
        }
    }

    /// Manual pan; ignored while locked. Returns whether it moved.
    pub(crate) fn rotate(&mut self, registry: &BodyRegistry, dir: f64) -> bool {
        if self.mode(registry) == CameraMode::Locked {
            return false;
        }
        self.azimuth = normalize_azimuth(self.azimuth + dir.signum() * self.cfg.pan_step);
        self.auto_rotate = false;
        true
    }

    /// Manual tilt; ignored while locked. Returns whether it moved.
    pub(crate) fn tilt(&mut self, registry: &BodyRegistry, dir: f64) -> bool {
        if self.mode(registry) == CameraMode::Locked {
            return false;
        }
        self.altitude = clamp_altitude(self.altitude + dir.signum() * self.cfg.pan_step);
        self.auto_rotate = false;
        true
    }

    /// Zooms in one step. When the step crosses into deep zoom and
    /// `nearest` names the body closest to the screen centre, focus moves to
    /// it first (if enabled).
    pub(crate) fn zoom_in(&mut self, registry: &BodyRegistry, nearest: Option<&str>) {
        let before = self.fov;
        self.fov = (self.fov * self.cfg.zoom_in_factor).clamp(self.cfg.min_fov, self.cfg.max_fov);
        let crossed = before > self.cfg.deep_zoom_fov && self.fov <= self.cfg.deep_zoom_fov;
        if crossed && self.cfg.auto_focus_nearest {
            if let Some(id) = nearest {
                if !id.eq_ignore_ascii_case(&self.focus) {
                    self.select_focus(registry, id);
                }
            }
        }
    }

    pub(crate) fn zoom_out(&mut self) {
        self.fov = (self.fov * self.cfg.zoom_out_factor).clamp(self.cfg.min_fov, self.cfg.max_fov);
    }

    pub(crate) fn toggle_auto_rotate(&mut self) {
        self.auto_rotate = !self.auto_rotate;
    }

    /// Focuses `id`. Unknown ids are accepted but can never lock.
    pub(crate) fn select_focus(&mut self, registry: &BodyRegistry, id: &str) {
        match registry.get(id) {
            Some(body) => self.focus = body.id.to_string(),
            None => {
                warn!("focus target {id} is not in the registry");
                self.focus = id.to_string();
            }
        }
        info!("focus -> {}", self.focus);
    }

    pub(crate) fn focus_next(&mut self, registry: &BodyRegistry) {
        self.cycle(registry, 1);
    }

    pub(crate) fn focus_prev(&mut self, registry: &BodyRegistry) {
        self.cycle(registry, -1);
    }

    fn cycle(&mut self, registry: &BodyRegistry, step: isize) {
        if registry.is_empty() {
            return;
        }
        let n = registry.len() as isize;
        let idx = match registry.index_of(&self.focus) {
            Some(i) => (i as isize + step).rem_euclid(n),
            None if step > 0 => 0,
            None => n - 1,
        };
        if let Some(body) = registry.at(idx as usize) {
            let id = body.id;
            self.select_focus(registry, id);
        }
    }

    #[cfg(test)]
    pub(crate) fn set_fov(&mut self, fov: f64) {
        self.fov = fov.clamp(self.cfg.min_fov, self.cfg.max_fov);
    }
}
