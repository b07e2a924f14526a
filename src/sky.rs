use crate::camera::CameraFrame;
use crate::config::RenderConfig;
use crate::declutter::{label_for, LabelOccupancy};
use crate::ephemeris::{Apparent, BodyRegistry, Ephemeris};
use crate::projection::{screen_center, stereographic, to_screen, ScreenPoint};
use crate::shader::{shade_body, BodyShade};
use crate::surface::{Style, Surface};
use chrono::{DateTime, Utc};
use crossterm::style::Color;

/// What the focus panel needs about the previewed body.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FocusReadout {
    pub(crate) name: &'static str,
    pub(crate) apparent: Apparent,
    pub(crate) illumination: f64,
    pub(crate) below_horizon: bool,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct SkyReport {
    pub(crate) focus: Option<FocusReadout>,
    /// On-screen body closest to the screen centre.
    pub(crate) nearest: Option<&'static str>,
    pub(crate) stars_drawn: usize,
    pub(crate) labels_drawn: usize,
    pub(crate) labels_skipped: usize,
}

// row 0 belongs to the status bar
const FIRST_LABEL_ROW: i32 = 1;

pub(crate) fn star_glyph(magnitude: f64) -> (char, Style) {
    if magnitude < 1.0 {
        ('*', Style::fg(Color::White).bold())
    } else if magnitude < 2.0 {
        ('+', Style::fg(Color::White))
    } else {
        ('.', Style::fg(Color::Grey))
    }
}

pub(crate) struct SkyPainter {
    render: RenderConfig,
    ramp: Vec<char>,
    deep_zoom_fov: f64,
}

fn on_screen(p: ScreenPoint, rows: i32, cols: i32) -> bool {
    let (r, c) = p.cell();
    r >= 0 && c >= 0 && r < rows && c < cols
}

impl SkyPainter {
    pub(crate) fn new(render: RenderConfig, deep_zoom_fov: f64) -> Self {
        let ramp = render.ramp.chars().collect();
        Self {
            render,
            ramp,
            deep_zoom_fov,
        }
    }

    pub(crate) fn paint<S, E>(
        &self,
        surface: &mut S,
        frame: &CameraFrame,
        focus: &str,
        registry: &BodyRegistry,
        ephem: &E,
        t: DateTime<Utc>,
    ) -> SkyReport
    where
        S: Surface + ?Sized,
        E: Ephemeris + ?Sized,
    {
        let (rows, cols) = surface.dimensions();
        let mut report = SkyReport::default();

        // under deep zoom the star field is just noise around the preview
        if frame.fov > 2.0 * self.deep_zoom_fov {
            for star in ephem.stars(t) {
                if star.magnitude > self.render.star_mag_limit {
                    continue;
                }
                let plane = stereographic(frame.center, star.direction);
                let Some(p) = to_screen(plane, frame.fov, rows, cols) else {
                    continue;
                };
                if !on_screen(p, rows, cols) {
                    continue;
                }
                let (ch, style) = star_glyph(star.magnitude);
                let (r, c) = p.cell();
                surface.set_cell(r, c, ch, style);
                report.stars_drawn += 1;
            }
        }

        let center = screen_center(rows, cols);
        let mut best = f64::INFINITY;
        let mut labels = LabelOccupancy::new(self.render.label_row_radius, self.render.label_col_radius);

        for body in registry.iter() {
            let is_focus = frame.locked() && body.id.eq_ignore_ascii_case(focus);
            // the camera already resolved the locked target this frame
            let resolved = match frame.target {
                Some(a) if is_focus => Some(a),
                _ => ephem.apparent(body.id, t),
            };
            let Some(apparent) = resolved else {
                continue;
            };
            let plane = stereographic(frame.center, apparent.horizontal);
            let Some(p) = to_screen(plane, frame.fov, rows, cols) else {
                continue;
            };

            if on_screen(p, rows, cols) {
                let d = p.dist_sq(center);
                if d < best {
                    best = d;
                    report.nearest = Some(body.id);
                }
            }

            if is_focus {
                let illumination = ephem
                    .illuminated_fraction(body.id, t)
                    .unwrap_or(1.0)
                    .clamp(0.0, 1.0);
                let shade = BodyShade {
                    radius: self.render.preview_radius,
                    illumination,
                    color: body.color,
                    has_rings: body.has_rings,
                    ring_color: body.ring_color,
                };
                shade_body(surface, p, &shade, &self.ramp);
                report.focus = Some(FocusReadout {
                    name: body.id,
                    apparent,
                    illumination,
                    below_horizon: frame.center.altitude < 0.0,
                });
                continue;
            }

            if !on_screen(p, rows, cols) {
                continue;
            }
            let (r, c) = p.cell();
            if r < FIRST_LABEL_ROW {
                continue;
            }
            if labels.claim(r, c) {
                let text = label_for(body.id, frame.fov, self.render.abbrev_fov);
                surface.draw_text(r, c, &text, Style::fg(body.color).bold());
                report.labels_drawn += 1;
            } else {
                report.labels_skipped += 1;
            }
        }

        report
    }
}
