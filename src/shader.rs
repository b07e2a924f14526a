use crate::projection::ScreenPoint;
use crate::surface::{Style, Surface};
use crossterm::style::Color;

pub(crate) const DEFAULT_RAMP: &str = " .:!+*$#@";

const LIT_EPSILON: f64 = 0.001;
const RING_INNER: f64 = 1.4;
const RING_OUTER: f64 = 2.3;
const RING_SQUASH: f64 = 3.0;

#[derive(Clone, Copy, Debug)]
pub(crate) struct BodyShade {
    pub(crate) radius: i32,
    /// Illuminated fraction, 0 = new, 1 = full.
    pub(crate) illumination: f64,
    pub(crate) color: Color,
    pub(crate) has_rings: bool,
    pub(crate) ring_color: Option<Color>,
}

/// What a single offset from the body centre shows.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Shade {
    /// Sunlit surface with Lambert intensity in `(0, 1]`.
    Lit(f64),
    /// Night side; `limb` marks cells within one unit of the silhouette.
    Dark { limb: bool },
    Ring,
    Empty,
}

/// Light direction `(lx, lz)` for an illuminated fraction.
pub(crate) fn light_vector(illumination: f64) -> (f64, f64) {
    let cos_phase = (2.0 * illumination - 1.0).clamp(-1.0, 1.0);
    ((1.0 - cos_phase * cos_phase).max(0.0).sqrt(), cos_phase)
}

pub(crate) fn classify(dy: i32, dx: i32, shade: &BodyShade, light: (f64, f64)) -> Shade {
    let r = shade.radius as f64;
    let fx = dx as f64 / 2.0;
    let fy = dy as f64;
    let d = (fy * fy + fx * fx).sqrt();

    if d > r {
        if shade.has_rings {
            let ry = fy * RING_SQUASH;
            let ring_d = (ry * ry + fx * fx).sqrt();
            if ring_d > RING_INNER * r && ring_d < RING_OUTER * r {
                return Shade::Ring;
            }
        }
        return Shade::Empty;
    }

    // sample the sphere at the cell centre so the outermost ring of cells
    // still has some depth
    let rn = r + 0.5;
    let px = fx / rn;
    let py = fy / rn;
    let pz = (1.0 - px * px - py * py).max(0.0).sqrt();

    let (lx, lz) = light;
    let b = (px * lx + pz * lz).max(0.0);
    if b > LIT_EPSILON {
        Shade::Lit(b.min(1.0))
    } else {
        Shade::Dark { limb: d > r - 1.0 }
    }
}

fn ramp_glyph(ramp: &[char], b: f64) -> char {
    if ramp.len() < 2 {
        return '@';
    }
    let top = ramp.len() - 1;
    let idx = ((b * top as f64) as usize).clamp(1, top);
    ramp[idx]
}

/// Rasterises the body centred on `center`.
pub(crate) fn shade_body<S: Surface + ?Sized>(
    surface: &mut S,
    center: ScreenPoint,
    shade: &BodyShade,
    ramp: &[char],
) {
    if shade.radius < 0 || !center.row.is_finite() || !center.col.is_finite() {
        return;
    }
    let cy = (center.row + 0.5).floor() as i32;
    let cx = (center.col + 0.5).floor() as i32;
    let r = shade.radius;

    let half_w = if shade.has_rings {
        (2.0 * RING_OUTER * r as f64).ceil() as i32
    } else {
        2 * r
    };

    let light = light_vector(shade.illumination);
    let lit = Style::fg(shade.color).bold();
    let dark = Style::fg(Color::Cyan).bold();
    let ring = Style::fg(shade.ring_color.unwrap_or(shade.color));

    for dy in -r..=r {
        for dx in -half_w..=half_w {
            let row = cy + dy;
            let col = cx + dx;
            match classify(dy, dx, shade, light) {
                Shade::Lit(b) => surface.set_cell(row, col, ramp_glyph(ramp, b), lit),
                Shade::Dark { limb } => {
                    let ch = if limb {
                        ':'
                    } else if row.rem_euclid(2) == 0 && col.rem_euclid(2) == 0 {
                        '.'
                    } else {
                        ' '
                    };
                    surface.set_cell(row, col, ch, dark);
                }
                Shade::Ring => surface.set_cell(row, col, '─', ring),
                Shade::Empty => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::CellBuffer;
    use approx::assert_abs_diff_eq;

    fn body(radius: i32, illumination: f64, has_rings: bool) -> BodyShade {
        BodyShade {
            radius,
            illumination,
            color: Color::White,
            has_rings,
            ring_color: None,
        }
    }

    fn in_disc(dy: i32, dx: i32, r: i32) -> bool {
        let fx = dx as f64 / 2.0;
        ((dy * dy) as f64 + fx * fx).sqrt() <= r as f64
    }

    #[test]
    fn light_vector_spans_the_phase_range() {
        let (lx, lz) = light_vector(1.0);
        assert_abs_diff_eq!(lx, 0.0);
        assert_abs_diff_eq!(lz, 1.0);
        let (lx, lz) = light_vector(0.5);
        assert_abs_diff_eq!(lx, 1.0);
        assert_abs_diff_eq!(lz, 0.0);
        let (lx, lz) = light_vector(0.0);
        assert_abs_diff_eq!(lx, 0.0);
        assert_abs_diff_eq!(lz, -1.0);
        // out of range input is clamped rather than producing NaN
        let (lx, lz) = light_vector(1.7);
        assert!(lx.is_finite() && lz == 1.0);
    }

    #[test]
    fn full_phase_lights_every_disc_cell() {
        for r in [1, 3, 5, 12, 40] {
            let b = body(r, 1.0, false);
            let light = light_vector(1.0);
            for dy in -r..=r {
                for dx in -2 * r..=2 * r {
                    let s = classify(dy, dx, &b, light);
                    if in_disc(dy, dx, r) {
                        assert!(matches!(s, Shade::Lit(_)), "r={r} ({dy},{dx}) -> {s:?}");
                    } else {
                        assert_eq!(s, Shade::Empty);
                    }
                }
            }
        }
    }

    #[test]
    fn new_phase_has_no_lit_cells() {
        let r = 5;
        let b = body(r, 0.0, false);
        let light = light_vector(0.0);
        assert!(matches!(classify(0, 0, &b, light), Shade::Dark { limb: false }));
        for dy in -r..=r {
            for dx in -2 * r..=2 * r {
                assert!(!matches!(classify(dy, dx, &b, light), Shade::Lit(_)));
            }
        }
    }

    #[test]
    fn quarter_phase_lights_one_side() {
        let b = body(5, 0.5, false);
        let light = light_vector(0.5);
        assert!(matches!(classify(0, 6, &b, light), Shade::Lit(_)));
        assert!(matches!(classify(0, -6, &b, light), Shade::Dark { .. }));
        assert!(matches!(classify(0, 0, &b, light), Shade::Dark { .. }));
    }

    #[test]
    fn silhouette_cells_get_the_limb_glyph() {
        let b = body(5, 0.0, false);
        let light = light_vector(0.0);
        assert_eq!(classify(5, 0, &b, light), Shade::Dark { limb: true });
        assert_eq!(classify(0, 10, &b, light), Shade::Dark { limb: true });
        assert_eq!(classify(2, 2, &b, light), Shade::Dark { limb: false });
    }

    #[test]
    fn rings_only_outside_the_disc_and_only_when_flagged() {
        let r = 5;
        let light = light_vector(1.0);
        let ringed = body(r, 1.0, true);
        let plain = body(r, 1.0, false);
        // on the equator the annulus spans 1.4r < |dx|/2 < 2.3r
        assert_eq!(classify(0, 16, &ringed, light), Shade::Ring);
        assert_eq!(classify(0, -20, &ringed, light), Shade::Ring);
        assert_eq!(classify(0, 16, &plain, light), Shade::Empty);
        assert_eq!(classify(0, 13, &ringed, light), Shade::Empty);
        assert_eq!(classify(0, 24, &ringed, light), Shade::Empty);
        // foreshortened: three rows up is already past the outer edge
        assert_eq!(classify(4, 16, &ringed, light), Shade::Empty);
        for dy in -r..=r {
            for dx in -2 * r..=2 * r {
                if in_disc(dy, dx, r) {
                    assert_ne!(classify(dy, dx, &ringed, light), Shade::Ring);
                }
            }
        }
    }

    #[test]
    fn full_disc_is_rasterised_with_ramp_glyphs() {
        let mut buf = CellBuffer::new(40, 20);
        let ramp: Vec<char> = DEFAULT_RAMP.chars().collect();
        let b = body(3, 1.0, false);
        shade_body(&mut buf, ScreenPoint { row: 10.0, col: 20.0 }, &b, &ramp);
        let centre = buf.get(10, 20).unwrap();
        assert_eq!(centre.ch, '@');
        assert!(centre.style.bold);
        for dy in -3..=3 {
            for dx in -6..=6 {
                let c = buf.get(10 + dy, 20 + dx).unwrap();
                if in_disc(dy, dx, 3) {
                    assert!(ramp[1..].contains(&c.ch), "({dy},{dx}) = {:?}", c.ch);
                } else {
                    assert_eq!(c.ch, ' ');
                }
            }
        }
    }

    #[test]
    fn dark_side_uses_a_sparse_checkerboard() {
        let mut buf = CellBuffer::new(40, 20);
        let ramp: Vec<char> = DEFAULT_RAMP.chars().collect();
        shade_body(&mut buf, ScreenPoint { row: 10.0, col: 20.0 }, &body(5, 0.0, false), &ramp);
        assert_eq!(buf.get(10, 20).unwrap().ch, '.');
        assert_eq!(buf.get(10, 21).unwrap().ch, ' ');
        assert_eq!(buf.get(11, 20).unwrap().ch, ' ');
        assert_eq!(buf.get(12, 22).unwrap().ch, '.');
        assert_eq!(buf.get(5, 20).unwrap().ch, ':');
        assert_eq!(buf.get(10, 20).unwrap().style.fg, Color::Cyan);
    }

    #[test]
    fn ring_colour_falls_back_to_body_colour() {
        let mut buf = CellBuffer::new(60, 20);
        let ramp: Vec<char> = DEFAULT_RAMP.chars().collect();
        let mut b = body(5, 1.0, true);
        b.color = Color::Yellow;
        shade_body(&mut buf, ScreenPoint { row: 10.0, col: 30.0 }, &b, &ramp);
        let ring = buf.get(10, 46).unwrap();
        assert_eq!(ring.ch, '─');
        assert_eq!(ring.style.fg, Color::Yellow);

        b.ring_color = Some(Color::DarkYellow);
        shade_body(&mut buf, ScreenPoint { row: 10.0, col: 30.0 }, &b, &ramp);
        assert_eq!(buf.get(10, 46).unwrap().style.fg, Color::DarkYellow);
    }

    #[test]
    fn bodies_partly_off_screen_are_clipped_quietly() {
        let mut buf = CellBuffer::new(10, 5);
        let ramp: Vec<char> = DEFAULT_RAMP.chars().collect();
        shade_body(&mut buf, ScreenPoint { row: -2.0, col: 9.0 }, &body(6, 0.7, true), &ramp);
        shade_body(&mut buf, ScreenPoint { row: f64::NAN, col: 0.0 }, &body(6, 0.7, true), &ramp);
    }
}
