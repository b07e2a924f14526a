use crate::surface::{Style, Surface};
use crossterm::style::Color;

const WORLD_MAP: &str = r#"
   :::::::::::''  ''::'      '::::::  `:::::::::::::'.:::::::::::::::
   :::::::::' :. :  :         ::::::  :::::::::::.:::':::::::::::::::
   ::::::::::  :   :::.       :::::::::::::..::::'     :::: : :::::::
   ::::::::    :':  "::'     '"::::::::::::: :'           '' ':::::::
   :'        : '   :  ::    .::::::::'    '                    .:
   :               :  .:: .::. ::::'                          :::
   :. .,.        :::  ':::::::::::.: '                     .:...::::
   :::::::.      '     .::::::: '''                         :: :::::.
   ::::::::            ':::::::::  '',            '    '   .:::::::::
   ::::::::.        :::::::::::: '':,:   '    :         ''' :::::::::
   ::::::::::      ::::::::::::'                        :::::::::::::
   : .::::::::.   .:''::::::::    '        ::   :   '::.::::::::::::
   :::::::::::::::. '  '::::::.  '  '     :::::.:.:.:.:.:::::::::::::
   :::::::::::::::: :     ':::::::::   ' ,:::::::::: : :.:'::::::::::
   ::::::::::::::::: '     :::::::::   . :'::::::::::::::' ':::::::::
   ::::::::::::::::::''   :::::::::: :' : ,:::::::::::'      ':::::::
   :::::::::::::::::'   .::::::::::::  ::::::::::::::::       :::::::
   :::::::::::::::::. .::::::::::::::::::::::::::::::::::::.'::::::::
   :::::::::::::::::' :::::::::::::::::::::::::::::::::::::::::::::::
   ::::::::::::::::::.:::::::::::::::::::::::::::::::::::::::::::::::
"#;

/// ln(tan(pi/4 + 85deg/2)), rounded down so the clamp latitude lands on the edge.
const MAX_MERC: f64 = 3.13;
const MAX_LAT: f64 = 85.0;

const MAP_TOP: i32 = 1;
const MAP_LEFT: i32 = 1;

pub(crate) struct WorldMap {
    lines: Vec<Vec<char>>,
    width: i32,
    height: i32,
}

impl WorldMap {
    pub(crate) fn builtin() -> Self {
        Self::from_text(WORLD_MAP)
    }

    pub(crate) fn from_text(text: &str) -> Self {
        let lines: Vec<Vec<char>> = text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.chars().collect())
            .collect();
        let width = lines.iter().map(|l| l.len()).max().unwrap_or(0) as i32;
        let height = lines.len() as i32;
        Self {
            lines,
            width,
            height,
        }
    }

    pub(crate) fn width(&self) -> i32 {
        self.width
    }

    pub(crate) fn height(&self) -> i32 {
        self.height
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct MiniMapMarker {
    pub(crate) latitude: f64,
    pub(crate) longitude: f64,
    pub(crate) label: String,
}

/// Mercator position of `(lat, lon)` on a `width` x `height` map as
/// `(col, row)`, always inside the map.
pub(crate) fn project_mercator(lat: f64, lon: f64, width: i32, height: i32) -> (i32, i32) {
    let w = width.max(1);
    let h = height.max(1);

    let x = (lon + 180.0) * (w as f64 / 360.0);

    let lat = lat.clamp(-MAX_LAT, MAX_LAT).to_radians();
    let merc_y = (std::f64::consts::FRAC_PI_4 + lat / 2.0).tan().ln();
    let y_norm = 1.0 - (merc_y + MAX_MERC) / (2.0 * MAX_MERC);
    let y = y_norm * h as f64;

    // `as` saturates and maps NaN to 0, so the clamp covers every input
    let col = (x.floor() as i32).clamp(0, w - 1);
    let row = (y.floor() as i32).clamp(0, h - 1);
    (col, row)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PanelPlacement {
    Below,
    Beside,
}

/// The panel goes under the map when the screen is tall enough for it.
pub(crate) fn place_panel(map_height: i32, panel_lines: usize, screen_rows: i32) -> PanelPlacement {
    let needed = MAP_TOP + map_height + 1 + panel_lines as i32;
    if needed <= screen_rows {
        PanelPlacement::Below
    } else {
        PanelPlacement::Beside
    }
}

pub(crate) fn panel_lines(markers: &[MiniMapMarker]) -> Vec<String> {
    let mut lines = vec!["--- LIVE POSITION ---".to_string()];
    if markers.is_empty() {
        lines.push("waiting for position data...".to_string());
    }
    for m in markers {
        lines.push(format!(
            "{} LAT: {:.2}° | LON: {:.2}°",
            m.label, m.latitude, m.longitude
        ));
    }
    lines.push(String::new());
    lines.push("Press 'm' to return to telescope".to_string());
    lines
}

/// Draws the map, its markers and the position panel.
pub(crate) fn draw_minimap<S: Surface + ?Sized>(
    surface: &mut S,
    map: &WorldMap,
    markers: &[MiniMapMarker],
) -> PanelPlacement {
    let land = Style::fg(Color::DarkGreen);
    for (i, line) in map.lines.iter().enumerate() {
        for (j, &ch) in line.iter().enumerate() {
            if ch != ' ' {
                surface.set_cell(MAP_TOP + i as i32, MAP_LEFT + j as i32, ch, land);
            }
        }
    }

    let marker_style = Style::fg(Color::Red).bold();
    let single = markers.len() == 1;
    for m in markers {
        let (col, row) = project_mercator(m.latitude, m.longitude, map.width, map.height);
        let glyph = if single {
            '●'
        } else {
            m.label.chars().next().unwrap_or('?')
        };
        surface.set_cell(MAP_TOP + row, MAP_LEFT + col, glyph, marker_style);
    }

    let lines = panel_lines(markers);
    let (rows, _) = surface.dimensions();
    let placement = place_panel(map.height, lines.len(), rows);
    let (top, left) = match placement {
        PanelPlacement::Below => (MAP_TOP + map.height + 1, MAP_LEFT),
        PanelPlacement::Beside => (MAP_TOP, MAP_LEFT + map.width + 2),
    };
    for (i, line) in lines.iter().enumerate() {
        surface.draw_text(top + i as i32, left, line, Style::plain());
    }
    placement
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::CellBuffer;

    fn marker(lat: f64, lon: f64, label: &str) -> MiniMapMarker {
        MiniMapMarker {
            latitude: lat,
            longitude: lon,
            label: label.to_string(),
        }
    }

    #[test]
    fn builtin_map_has_expected_shape() {
        let map = WorldMap::builtin();
        assert_eq!(map.height(), 20);
        assert!(map.width() >= 60);
    }

    #[test]
    fn origin_lands_in_the_middle() {
        let (col, row) = project_mercator(0.0, 0.0, 70, 20);
        assert_eq!(col, 35);
        assert_eq!(row, 10);
    }

    #[test]
    fn extremes_land_in_the_corners() {
        assert_eq!(project_mercator(85.0, 180.0, 70, 20), (69, 0));
        assert_eq!(project_mercator(-85.0, -180.0, 70, 20), (0, 19));
    }

    #[test]
    fn out_of_range_input_stays_on_the_map() {
        for (lat, lon) in [
            (90.0, 400.0),
            (-90.0, -400.0),
            (f64::NAN, f64::NAN),
            (f64::INFINITY, f64::NEG_INFINITY),
        ] {
            let (c, r) = project_mercator(lat, lon, 70, 20);
            assert!((0..70).contains(&c) && (0..20).contains(&r), "{lat},{lon}");
        }
        assert_eq!(project_mercator(10.0, 10.0, 0, 0), (0, 0));
    }

    #[test]
    fn north_is_up() {
        let (_, north) = project_mercator(45.0, 0.0, 70, 20);
        let (_, south) = project_mercator(-45.0, 0.0, 70, 20);
        assert!(north < south);
    }

    #[test]
    fn single_marker_is_a_dot() {
        let map = WorldMap::builtin();
        let mut buf = CellBuffer::new(100, 40);
        draw_minimap(&mut buf, &map, &[marker(0.0, 0.0, "ISS")]);
        let (c, r) = project_mercator(0.0, 0.0, map.width(), map.height());
        assert_eq!(buf.get(MAP_TOP + r, MAP_LEFT + c).unwrap().ch, '●');
    }

    #[test]
    fn several_markers_use_initials() {
        let map = WorldMap::builtin();
        let mut buf = CellBuffer::new(100, 40);
        let ms = [marker(20.0, -100.0, "ISS"), marker(-20.0, 100.0, "Hubble")];
        draw_minimap(&mut buf, &map, &ms);
        let (c, r) = project_mercator(20.0, -100.0, map.width(), map.height());
        assert_eq!(buf.get(MAP_TOP + r, MAP_LEFT + c).unwrap().ch, 'I');
        let (c, r) = project_mercator(-20.0, 100.0, map.width(), map.height());
        assert_eq!(buf.get(MAP_TOP + r, MAP_LEFT + c).unwrap().ch, 'H');
    }

    #[test]
    fn panel_moves_beside_a_short_screen() {
        let map = WorldMap::builtin();
        let ms = [marker(1.0, 2.0, "ISS")];

        let mut tall = CellBuffer::new(120, 40);
        assert_eq!(draw_minimap(&mut tall, &map, &ms), PanelPlacement::Below);
        let row = MAP_TOP + map.height() + 1;
        assert!(tall.row_text(row).contains("--- LIVE POSITION ---"));
        assert!(tall.row_text(row + 1).contains("ISS LAT: 1.00° | LON: 2.00°"));

        let mut short = CellBuffer::new(140, 22);
        assert_eq!(draw_minimap(&mut short, &map, &ms), PanelPlacement::Beside);
        assert!(short.row_text(MAP_TOP).contains("--- LIVE POSITION ---"));
    }

    #[test]
    fn empty_marker_list_shows_waiting_text() {
        let lines = panel_lines(&[]);
        assert_eq!(lines[1], "waiting for position data...");
        assert_eq!(lines.last().unwrap(), "Press 'm' to return to telescope");
    }
}
