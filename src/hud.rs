use crate::camera::CameraMode;
use crate::ephemeris::BodyRegistry;
use crate::sky::FocusReadout;
use crate::surface::{Style, Surface};
use crate::telemetry::{TelemetrySnapshot, READOUTS, STATUS};
use crossterm::style::Color;

pub(crate) const MIN_COLS: i32 = 20;
pub(crate) const MIN_ROWS: i32 = 8;

const FOCUS_PANEL_WIDTH: i32 = 35;
const KEY_HINTS: &str = "arrows pan, w/s zoom, [/] focus, f select, r rotate, m map, t telemetry, q quit";

pub(crate) fn status_line(azimuth: f64, altitude: f64, fov: f64, mode: CameraMode, auto_rotate: bool) -> String {
    let tag = match mode {
        CameraMode::Locked => " [LOCKED]",
        CameraMode::FreeLook if auto_rotate => " [AUTO]",
        CameraMode::FreeLook => "",
    };
    format!("Az:{azimuth:.1} Alt:{altitude:.1} Zoom:{fov:.3}{tag} | {KEY_HINTS}")
}

/// Reverse-video bar across the top row.
pub(crate) fn draw_status_bar<S: Surface + ?Sized>(surface: &mut S, text: &str) {
    let (_, cols) = surface.dimensions();
    let style = Style::plain().reversed();
    for c in 0..cols {
        surface.set_cell(0, c, ' ', style);
    }
    surface.draw_text(0, 0, text, style);
}

pub(crate) fn focus_panel_lines(r: &FocusReadout) -> Vec<String> {
    let horizon = if r.below_horizon { " [BELOW HORIZON]" } else { "" };
    vec![
        format!("--- {}{} ---", r.name.to_uppercase(), horizon),
        format!("Dist: {:.5} AU", r.apparent.distance_au),
        format!("Phase: {:.1}%", r.illumination * 100.0),
        format!("RA: {:.2}h", r.apparent.equatorial.ra_hours),
        format!("Dec: {:.2}°", r.apparent.equatorial.dec_deg),
    ]
}

pub(crate) fn draw_focus_panel<S: Surface + ?Sized>(surface: &mut S, r: &FocusReadout) {
    let (_, cols) = surface.dimensions();
    let left = (cols - FOCUS_PANEL_WIDTH).max(0);
    let style = Style::fg(Color::Yellow).bold();
    for (i, line) in focus_panel_lines(r).iter().enumerate() {
        surface.draw_text(2 + i as i32, left, line, style);
    }
}

pub(crate) fn telemetry_panel_lines(snap: &TelemetrySnapshot) -> Vec<String> {
    let mut lines = vec!["--- STATION TELEMETRY ---".to_string()];
    for name in READOUTS.iter().chain(std::iter::once(&STATUS)) {
        lines.push(format!("{name}: {}", snap.get(name)));
    }
    lines
}

/// Bottom-left corner, above nothing else.
pub(crate) fn draw_telemetry_panel<S: Surface + ?Sized>(surface: &mut S, snap: &TelemetrySnapshot) {
    let (rows, _) = surface.dimensions();
    let lines = telemetry_panel_lines(snap);
    let top = (rows - lines.len() as i32).max(1);
    let style = Style::fg(Color::Green);
    for (i, line) in lines.iter().enumerate() {
        surface.draw_text(top + i as i32, 1, line, style);
    }
}

fn draw_box<S: Surface + ?Sized>(surface: &mut S, top: i32, left: i32, w: i32, h: i32, style: Style) {
    for x in left..left + w {
        surface.set_cell(top, x, '─', style);
        surface.set_cell(top + h - 1, x, '─', style);
    }
    for y in top..top + h {
        surface.set_cell(y, left, '│', style);
        surface.set_cell(y, left + w - 1, '│', style);
    }
    surface.set_cell(top, left, '┌', style);
    surface.set_cell(top, left + w - 1, '┐', style);
    surface.set_cell(top + h - 1, left, '└', style);
    surface.set_cell(top + h - 1, left + w - 1, '┘', style);
    for y in top + 1..top + h - 1 {
        for x in left + 1..left + w - 1 {
            surface.set_cell(y, x, ' ', Style::plain());
        }
    }
}

/// Centred list of focusable bodies; `cursor` is highlighted and the
/// current focus carries a marker.
pub(crate) fn draw_target_select<S: Surface + ?Sized>(
    surface: &mut S,
    registry: &BodyRegistry,
    cursor: usize,
    focus: &str,
) {
    let (rows, cols) = surface.dimensions();
    let w = 30.min(cols);
    let h = (registry.len() as i32 + 5).min(rows);
    let top = ((rows - h) / 2).max(0);
    let left = ((cols - w) / 2).max(0);
    let frame = Style::fg(Color::White);
    draw_box(surface, top, left, w, h, frame);
    surface.draw_text(top + 1, left + 2, "Select target", frame.bold());

    // short terminals scroll the list so the cursor stays visible
    let visible = (h - 5).max(0) as usize;
    let first = if cursor < visible { 0 } else { cursor + 1 - visible };
    for (i, body) in registry.iter().enumerate().skip(first).take(visible) {
        let marker = if body.id.eq_ignore_ascii_case(focus) { '*' } else { ' ' };
        let text = format!("{marker} {}", body.id);
        let style = if i == cursor {
            Style::fg(body.color).reversed()
        } else {
            Style::fg(body.color)
        };
        surface.draw_text(top + 3 + (i - first) as i32, left + 2, &text, style);
    }
    surface.draw_text(top + h - 2, left + 2, "Enter pick | Esc back", frame);
}

pub(crate) fn draw_too_small<S: Surface + ?Sized>(surface: &mut S) {
    let (rows, cols) = surface.dimensions();
    let msg = "Terminal too small";
    let col = ((cols - msg.len() as i32) / 2).max(0);
    surface.draw_text(rows / 2, col, msg, Style::plain().bold());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::{Apparent, Equatorial};
    use crate::projection::Horizontal;
    use crate::surface::CellBuffer;

    fn readout(below: bool) -> FocusReadout {
        FocusReadout {
            name: "Moon",
            apparent: Apparent {
                horizontal: Horizontal::new(100.0, -3.0),
                equatorial: Equatorial {
                    ra_hours: 12.3456,
                    dec_deg: -5.678,
                },
                distance_au: 0.002_571_23,
            },
            illumination: 0.984,
            below_horizon: below,
        }
    }

    #[test]
    fn status_line_tags_the_mode() {
        let s = status_line(180.0, 30.0, 10.0, CameraMode::FreeLook, true);
        assert!(s.starts_with("Az:180.0 Alt:30.0 Zoom:10.000 [AUTO] |"));
        let s = status_line(12.34, -1.0, 0.005, CameraMode::Locked, true);
        assert!(s.starts_with("Az:12.3 Alt:-1.0 Zoom:0.005 [LOCKED] |"));
        let s = status_line(0.0, 0.0, 1.0, CameraMode::FreeLook, false);
        assert!(s.starts_with("Az:0.0 Alt:0.0 Zoom:1.000 |"));
    }

    #[test]
    fn status_bar_is_reverse_video_and_clipped() {
        let mut buf = CellBuffer::new(20, 3);
        draw_status_bar(&mut buf, &status_line(1.0, 2.0, 3.0, CameraMode::FreeLook, false));
        assert_eq!(buf.row_text(0), "Az:1.0 Alt:2.0 Zoom:");
        assert!((0..20).all(|c| buf.get(0, c).unwrap().style.reverse));
    }

    #[test]
    fn focus_panel_reads_out_the_target() {
        let lines = focus_panel_lines(&readout(true));
        assert_eq!(
            lines,
            [
                "--- MOON [BELOW HORIZON] ---",
                "Dist: 0.00257 AU",
                "Phase: 98.4%",
                "RA: 12.35h",
                "Dec: -5.68°",
            ]
        );
        assert_eq!(focus_panel_lines(&readout(false))[0], "--- MOON ---");

        let mut buf = CellBuffer::new(80, 24);
        draw_focus_panel(&mut buf, &readout(false));
        assert!(buf.row_text(2)[45..].starts_with("--- MOON ---"));
    }

    #[test]
    fn telemetry_panel_shows_placeholders() {
        let mut snap = TelemetrySnapshot::default();
        snap.set("Cabin Temperature", "21.96");
        let lines = telemetry_panel_lines(&snap);
        assert_eq!(lines[1], "Total Mass: --");
        assert_eq!(lines[2], "Cabin Temperature: 22.0°");
        assert_eq!(lines[5], "Status: --");

        let mut buf = CellBuffer::new(40, 10);
        draw_telemetry_panel(&mut buf, &snap);
        assert!(buf.row_text(4).contains("STATION TELEMETRY"));
        assert!(buf.row_text(9).contains("Status: --"));
    }

    #[test]
    fn target_select_lists_every_body() {
        let reg = BodyRegistry::default_sky();
        let mut buf = CellBuffer::new(80, 24);
        draw_target_select(&mut buf, &reg, 2, "Moon");
        let all: String = (0..24).map(|r| buf.row_text(r) + "\n").collect();
        for b in reg.iter() {
            assert!(all.contains(b.id), "{} missing", b.id);
        }
        assert!(all.contains("* Moon"));
        // 14-row box centred on 24 rows, list starts three rows in
        assert!(buf.row_text(10).contains("Mercury"));
        assert!(buf.get(10, 27).unwrap().style.reverse);
        assert!(!buf.get(9, 27).unwrap().style.reverse);
    }

    #[test]
    fn target_select_scrolls_inside_a_short_box() {
        let reg = BodyRegistry::default_sky();
        let mut buf = CellBuffer::new(40, 8);
        draw_target_select(&mut buf, &reg, 8, "Moon");
        assert!(buf.row_text(3).contains("Saturn"));
        assert!(buf.row_text(5).contains("Hubble"));
        assert!(buf.row_text(6).contains("Enter pick | Esc back"));
        assert_eq!(buf.row_text(7).trim(), "└────────────────────────────┘");
        let all: String = (0..8).map(|r| buf.row_text(r)).collect();
        assert!(!all.contains("Sun"));

        let mut buf = CellBuffer::new(40, 8);
        draw_target_select(&mut buf, &reg, 1, "Moon");
        assert!(buf.row_text(3).contains("Sun"));
        assert!(buf.row_text(4).contains("* Moon"));
        assert!(buf.row_text(5).contains("Mercury"));
        assert!(buf.row_text(6).contains("Enter pick"));
    }

    #[test]
    fn tiny_terminal_gets_a_message() {
        let mut buf = CellBuffer::new(18, 5);
        draw_too_small(&mut buf);
        assert_eq!(buf.row_text(2), "Terminal too small");
    }
}
