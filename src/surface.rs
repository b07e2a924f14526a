use crossterm::{
    cursor,
    execute, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

/// Character attributes for a single cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Style {
    pub(crate) fg: Color,
    pub(crate) bg: Color,
    pub(crate) bold: bool,
    pub(crate) reverse: bool,
}

impl Style {
    pub(crate) const fn plain() -> Self {
        Self {
            fg: Color::White,
            bg: Color::Black,
            bold: false,
            reverse: false,
        }
    }

    pub(crate) const fn fg(fg: Color) -> Self {
        Self {
            fg,
            bg: Color::Black,
            bold: false,
            reverse: false,
        }
    }

    pub(crate) const fn bold(self) -> Self {
        Self { bold: true, ..self }
    }

    pub(crate) const fn reversed(self) -> Self {
        Self {
            reverse: true,
            ..self
        }
    }
}

impl Default for Style {
    fn default() -> Self {
        Self::plain()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) style: Style,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            style: Style::plain(),
        }
    }
}

/// A character grid the renderer draws into.
///
/// Coordinates are signed so callers can hand over projected positions
/// without pre-clipping; anything outside the grid is silently dropped.
pub(crate) trait Surface {
    /// `(rows, cols)`
    fn dimensions(&self) -> (i32, i32);

    fn set_cell(&mut self, row: i32, col: i32, ch: char, style: Style);

    fn draw_text(&mut self, row: i32, col: i32, text: &str, style: Style) {
        let (rows, cols) = self.dimensions();
        if row < 0 || row >= rows {
            return;
        }
        for (i, ch) in text.chars().enumerate() {
            let c = col.saturating_add(i as i32);
            if c >= cols {
                break;
            }
            self.set_cell(row, c, ch, style);
        }
    }
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    pub(crate) cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }

    fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }

    #[cfg(test)]
    pub(crate) fn get(&self, row: i32, col: i32) -> Option<Cell> {
        if row < 0 || col < 0 || row >= self.h as i32 || col >= self.w as i32 {
            return None;
        }
        Some(self.cells[self.idx(col as u16, row as u16)])
    }

    pub(crate) fn clear(&mut self) {
        self.cells.fill(Cell::default());
    }

    #[cfg(test)]
    pub(crate) fn row_text(&self, row: i32) -> String {
        (0..self.w as i32)
            .filter_map(|c| self.get(row, c))
            .map(|c| c.ch)
            .collect()
    }
}

impl Surface for CellBuffer {
    fn dimensions(&self) -> (i32, i32) {
        (self.h as i32, self.w as i32)
    }

    fn set_cell(&mut self, row: i32, col: i32, ch: char, style: Style) {
        if row < 0 || col < 0 || row >= self.h as i32 || col >= self.w as i32 {
            return;
        }
        let i = self.idx(col as u16, row as u16);
        self.cells[i] = Cell { ch, style };
    }
}

pub(crate) struct Terminal {
    out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    prev: CellBuffer,
    pub(crate) cur: CellBuffer,
    color: bool,
}

impl Terminal {
    pub(crate) fn begin(color: bool) -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            terminal::Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;
        Ok(Self {
            out,
            cols,
            rows,
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
            color,
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            SetAttribute(Attribute::Reset),
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            EndSynchronizedUpdate,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub(crate) fn resize_if_needed(&mut self) -> anyhow::Result<bool> {
        let (c, r) = terminal::size()?;
        if c == self.cols && r == self.rows {
            return Ok(false);
        }
        self.cols = c;
        self.rows = r;
        self.prev = CellBuffer::new(c, r);
        self.cur = CellBuffer::new(c, r);
        execute!(self.out, terminal::Clear(ClearType::All))?;
        Ok(true)
    }

    /// Forget what is on screen so the next present repaints every cell.
    pub(crate) fn invalidate(&mut self) {
        self.prev.cells.fill(Cell {
            ch: '\0',
            style: Style::plain(),
        });
    }

    pub(crate) fn present(&mut self) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;
        let mut last_attr = (false, false);

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if c == self.prev.cells[i] {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;

                let attr = (c.style.bold, c.style.reverse);
                if attr != last_attr {
                    // Attribute::Reset also drops colours.
                    queue!(self.out, SetAttribute(Attribute::Reset))?;
                    last_fg = None;
                    last_bg = None;
                    if c.style.bold {
                        queue!(self.out, SetAttribute(Attribute::Bold))?;
                    }
                    if c.style.reverse {
                        queue!(self.out, SetAttribute(Attribute::Reverse))?;
                    }
                    last_attr = attr;
                }

                let (fg, bg) = if self.color {
                    (c.style.fg, c.style.bg)
                } else {
                    (Color::Reset, Color::Reset)
                };
                if last_fg != Some(fg) {
                    queue!(self.out, SetForegroundColor(fg))?;
                    last_fg = Some(fg);
                }
                if last_bg != Some(bg) {
                    queue!(self.out, SetBackgroundColor(bg))?;
                    last_bg = Some(bg);
                }

                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(
            self.out,
            SetAttribute(Attribute::Reset),
            ResetColor,
            EndSynchronizedUpdate
        )?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}
