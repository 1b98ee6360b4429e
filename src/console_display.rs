use crate::note_store::InstanceView;
use crate::render::{RenderBackend, StatsOverlay};
use std::io::{self, Write};

/// Glyph per texture id, wrapping for larger catalogs.
const GLYPHS: [char; 4] = ['█', '▲', '◆', '●'];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub rgb: [u8; 3],
    pub glyph: char,
}

/// Renders the note field as a 24-bit color character grid on a terminal.
///
/// Clip space (-1..1 on both axes) maps onto `cols` × `rows` cells with +y
/// at the top. Only every `skip`-th frame is drawn.
pub struct ConsoleRenderer<W: Write> {
    out: W,
    cols: usize,
    rows: usize,
    skip: u64,
    count: u64,
    drawing: bool,
    grid: Vec<Option<Cell>>,
}

impl ConsoleRenderer<io::Stdout> {
    /// Terminal renderer drawing `display_hz` times a second out of a
    /// frame loop running at `fps`.
    pub fn stdout(cols: usize, rows: usize, fps: u32, display_hz: u32) -> Self {
        let skip = if display_hz == 0 { u64::from(fps.max(1)) } else { u64::from((fps / display_hz).max(1)) };
        Self::new(io::stdout(), cols, rows, skip)
    }
}

impl<W: Write> ConsoleRenderer<W> {
    pub fn new(out: W, cols: usize, rows: usize, skip: u64) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        Self {
            out,
            cols,
            rows,
            skip: skip.max(1),
            count: 0,
            drawing: false,
            grid: vec![None; cols * rows],
        }
    }

    pub fn cell(&self, col: usize, row: usize) -> Option<Cell> {
        self.grid.get(row * self.cols + col).copied().flatten()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn rasterize(&mut self, view: &InstanceView<'_>) {
        self.grid.fill(None);
        for i in 0..view.len() {
            let scale = view.scales[i];
            if scale[0] <= 0.0 || scale[1] <= 0.0 || !view.is_visible(i) {
                continue;
            }
            let o = view.offsets[i];
            let (c0, c1) = span(o[0] - scale[0] * 0.5, o[0] + scale[0] * 0.5, self.cols);
            // Rows count downwards from +1.
            let (r0, r1) = span(-(o[1] + scale[1] * 0.5), -(o[1] - scale[1] * 0.5), self.rows);
            let cell = Cell {
                rgb: view.colors[i].map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8),
                glyph: GLYPHS[view.texture_ids[i] as usize % GLYPHS.len()],
            };
            for row in r0..=r1 {
                for col in c0..=c1 {
                    self.grid[row * self.cols + col] = Some(cell);
                }
            }
        }
    }

    fn render_grid(&self) -> String {
        let mut s = String::with_capacity(self.cols * self.rows * 20);
        s.push_str("\x1b[2J\x1b[H");
        s.push_str("DRUM VISUALIZER\r\n");
        s.push('┌');
        s.push_str(&"─".repeat(self.cols));
        s.push_str("┐\r\n");
        for row in self.grid.chunks(self.cols) {
            s.push('│');
            for cell in row {
                match cell {
                    Some(c) => {
                        let [r, g, b] = c.rgb;
                        s.push_str(&format!("\x1b[38;2;{};{};{}m{}\x1b[0m", r, g, b, c.glyph));
                    }
                    None => s.push(' '),
                }
            }
            s.push_str("│\r\n");
        }
        s.push('└');
        s.push_str(&"─".repeat(self.cols));
        s.push_str("┘\r\n");
        s
    }
}

/// Inclusive cell range covered by `[lo, hi]` in clip space, never empty.
fn span(lo: f32, hi: f32, cells: usize) -> (usize, usize) {
    let n = cells as f32;
    let to_cell = |v: f32| (((v + 1.0) * 0.5 * n).floor().max(0.0) as usize).min(cells - 1);
    let first = to_cell(lo);
    let last = to_cell(hi - f32::EPSILON).max(first);
    (first, last)
}

impl<W: Write> RenderBackend for ConsoleRenderer<W> {
    fn flush_instance_buffers(&mut self, instances: &InstanceView<'_>) {
        self.count += 1;
        self.drawing = self.count % self.skip == 0;
        if self.drawing {
            self.rasterize(instances);
        }
    }

    fn draw_instanced(&mut self, _count: usize) {
        if !self.drawing {
            return;
        }
        let frame = self.render_grid();
        let _ = self.out.write_all(frame.as_bytes());
        let _ = self.out.flush();
    }

    fn draw_stats(&mut self, stats: &StatsOverlay) {
        if !self.drawing {
            return;
        }
        let labels: Vec<String> = stats.rows().map(|(lane, _, _)| stats.label(lane)).collect();
        let _ = write!(self.out, " {:?} │ {}\r\n", stats.direction, labels.join(" │ "));
        let _ = self.out.flush();
    }
}
