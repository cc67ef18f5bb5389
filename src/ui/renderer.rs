/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// Board cells are CELL_W x CELL_H terminal cells. Sprites are placed at
/// sub-cell resolution so tweens slide instead of jumping.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::config::PaletteConfig;
use crate::domain::occupant::OccupantKind;
use super::scene::{Scene, Sprite};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: [u8; 4],
    ch_len: u8,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells, also used
    /// for `Clear` so inter-row gaps match on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell {
        ch: [b' ', 0, 0, 0],
        ch_len: 1,
        fg: Color::White,
        bg: Cell::BASE_BG,
    };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell {
        ch: [b'?', 0, 0, 0],
        ch_len: 1,
        fg: Color::Magenta,
        bg: Color::Magenta,
    };

    /// Normalize bg: Color::Reset → BASE_BG so that every cell gets an
    /// explicit background color (never terminal-default).
    #[inline]
    fn norm_bg(bg: Color) -> Color {
        match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        }
    }

    fn from_char(c: char, fg: Color, bg: Color) -> Self {
        let mut cell = Self::BLANK;
        let len = c.encode_utf8(&mut cell.ch).len() as u8;
        cell.ch_len = len;
        cell.fg = fg;
        cell.bg = Self::norm_bg(bg);
        cell
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.ch[..self.ch_len as usize]).unwrap_or(" ")
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Cell::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Background color already placed at (x, y).
    fn bg_at(&self, x: usize, y: usize) -> Color {
        self.get(x, y).bg
    }

    /// Write a string at (x, y) with given colors. Each char occupies 1 column;
    /// non-ASCII text (pack or level names) is shown as '?' since cells
    /// carry no wide-character tracking.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        let mut cx = x;
        for ch in s.chars() {
            if cx >= self.width { break; }
            let ch = if ch.is_ascii() { ch } else { '?' };
            self.set(cx, y, Cell::from_char(ch, fg, bg));
            cx += 1;
        }
    }
}

// ── Renderer ──

/// Terminal cells per board cell.
const CELL_W: usize = 4;
const CELL_H: usize = 2;

/// Offsets
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;
const MAP_COL: usize = 2;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const PLAYER_FG: Color = Color::Rgb { r: 255, g: 255, b: 255 };

/// Everything the renderer shows besides the board itself.
pub struct Hud<'a> {
    pub pack_name: &'a str,
    pub level_names: &'a [String],
    pub doors_remaining: usize,
    /// Level name of the key in hand.
    pub held: Option<&'a str>,
    pub solved: bool,
    pub message: &'a str,
}

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_solved: Option<bool>,
    palette: PaletteConfig,
}

fn rgb((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb { r, g, b }
}

impl Renderer {
    pub fn new(palette: &PaletteConfig) -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_solved: None,
            palette: palette.clone(),
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Palette index to terminal color. `level_count` is the worn floor.
    fn color(&self, index: usize, level_count: usize) -> Color {
        rgb(self.palette.color(index, level_count))
    }

    pub fn render(&mut self, scene: &Scene, hud: &Hud) -> io::Result<()> {
        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            // Force full repaint after resize.
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Solved/unsolved switch → clear for clean transition
        if self.last_solved != Some(hud.solved) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_solved = Some(hud.solved);
        }

        self.front.clear();
        self.compose_game(scene, hud);
        if hud.solved {
            self.compose_solved_overlay(scene);
        }

        // Diff and emit
        self.flush_diff()?;

        // Swap: current front becomes next back
        std::mem::swap(&mut self.front, &mut self.back);

        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors, not ResetColor: the terminal default may
        // differ from BASE_BG.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                // Position cursor if needed
                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }

                // Set colors only if changed
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                queue!(self.writer, Print(cell.as_str()))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_game(&mut self, scene: &Scene, hud: &Hud) {
        let buf_w = self.front.width;
        let size = scene.size();
        let level_count = hud.level_names.len();

        // ── HUD row ──
        let (pr, pc) = scene.player();
        let standing = scene
            .visible_tile(pr.max(0) as usize, pc.max(0) as usize)
            .and_then(|(level, _)| hud.level_names.get(level))
            .map(String::as_str)
            .unwrap_or("-");
        let hud_line = format!(
            " {}  |  on: {:<10}  key: {:<10}  doors left: {} ",
            hud.pack_name, standing, hud.held.unwrap_or("-"), hud.doors_remaining,
        );
        for x in 0..buf_w {
            self.front.set(x, HUD_ROW, Cell::from_char(' ', Color::White, HUD_BG));
        }
        self.front.put_str(0, HUD_ROW, &hud_line, Color::White, HUD_BG);

        // ── Board ──
        for row in 0..size {
            for column in 0..size {
                let bg = match scene.visible_tile(row, column) {
                    Some((_, color)) => self.color(color, level_count),
                    None => Cell::BASE_BG,
                };
                let x0 = MAP_COL + column * CELL_W;
                let y0 = MAP_ROW + row * CELL_H;
                for dy in 0..CELL_H {
                    // Rightmost column left as a gutter
                    for dx in 0..CELL_W - 1 {
                        self.front.set(x0 + dx, y0 + dy, Cell::from_char(' ', Color::White, bg));
                    }
                }
            }
        }

        // ── Held slot ──
        let (slot_r, slot_c) = scene.held_slot();
        let (slot_x, slot_y) = screen_pos(slot_r, slot_c);
        self.front.put_str(slot_x.saturating_sub(1), slot_y + CELL_H, "hand", Color::DarkGrey, Color::Reset);

        // ── Sprites ──
        for sprite in scene.sprites() {
            self.compose_sprite(&sprite, level_count);
        }

        // ── Player ──
        let (px, py) = screen_pos(pr as f32, pc as f32);
        let bg = self.front.bg_at(px, py);
        self.front.set(px, py, Cell::from_char('@', PLAYER_FG, bg));

        // ── Legend: one swatch per level ──
        let legend_row = MAP_ROW + size * CELL_H + 1;
        let mut x = MAP_COL;
        for (level, name) in hud.level_names.iter().enumerate() {
            let color = self.color(level, level_count);
            self.front.set(x, legend_row, Cell::from_char(' ', Color::White, color));
            self.front.put_str(x + 2, legend_row, name, Color::Grey, Color::Reset);
            x += name.chars().count() + 4;
        }

        // ── Message bar ──
        let msg_row = legend_row + 2;
        if !hud.message.is_empty() && msg_row < self.front.height {
            let msg = format!(" > {} ", hud.message);
            let bar = Color::Rgb { r: 200, g: 180, b: 50 };
            for x in 0..buf_w {
                self.front.set(x, msg_row, Cell::from_char(' ', Color::Black, bar));
            }
            self.front.put_str(0, msg_row, &msg, Color::Black, bar);
        }

        // ── Help bar ──
        let help_row = msg_row + 2;
        let help = " Arrows/WASD: Move  K: Finish  R: Restart  Esc: Quit";
        self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
    }

    fn compose_sprite(&mut self, sprite: &Sprite, level_count: usize) {
        let glyph = match sprite.kind {
            OccupantKind::Key => 'K',
            OccupantKind::Door => 'D',
            OccupantKind::Wall => '#',
        };
        let (x, y) = screen_pos(sprite.at.0, sprite.at.1);
        let fg = self.color(sprite.color, level_count);
        let (fg, bg) = match sprite.kind {
            // Walls are drawn solid in their level color
            OccupantKind::Wall => (Color::Black, fg),
            _ => (fg, Color::Black),
        };
        self.front.set(x, y, Cell::from_char(glyph, fg, bg));
    }

    fn compose_solved_overlay(&mut self, scene: &Scene) {
        let hdr = Color::Rgb { r: 255, g: 220, b: 50 };
        let dim = Color::Rgb { r: 40, g: 40, b: 40 };
        let box_art = [
            "+--------------------+",
            "|   *  SOLVED!  *    |",
            "+--------------------+",
        ];
        let y0 = MAP_ROW + (scene.size() * CELL_H).saturating_sub(box_art.len()) / 2;
        for (i, l) in box_art.iter().enumerate() {
            self.front.put_str(MAP_COL, y0 + i, l, hdr, dim);
        }
        self.front.put_str(MAP_COL, y0 + box_art.len(), " R: Again  Esc: Quit ", Color::White, dim);
    }
}

/// Terminal position of the glyph for a board point.
fn screen_pos(row: f32, column: f32) -> (usize, usize) {
    let x = (column.max(0.0) * CELL_W as f32).round() as usize + MAP_COL + 1;
    let y = (row.max(0.0) * CELL_H as f32).round() as usize + MAP_ROW;
    (x, y)
}
