use crate::types::{DeckleRange, Pattern, ProducedTotals};

const MAX_WIDTH: f64 = 80.0;

/// Draw a pattern as a strip scaled to the deckle maximum.
///
/// Rolls are boxed and labelled with their width, unused deckle is filled
/// with `.` and the deckle minimum is marked with `^` below the strip.
pub fn render_pattern(deckle: DeckleRange, pattern: &Pattern) -> String {
    let scale = MAX_WIDTH / deckle.max_mm() as f64;
    let grid_w = (deckle.max_mm() as f64 * scale).round() as usize;
    if grid_w == 0 {
        return String::new();
    }

    let mut grid = vec![vec![' '; grid_w + 1]; 3];

    let mut x_mm: u64 = 0;
    for cut in pattern.cuts() {
        for _ in 0..cut.quantity {
            let sx = (x_mm as f64 * scale).round() as usize;
            x_mm += cut.width_mm as u64;
            let ex = (x_mm as f64 * scale).round() as usize;
            if ex <= sx {
                continue;
            }
            draw_box(&mut grid, sx, ex - sx);

            let label: Vec<char> = cut.width_mm.to_string().chars().collect();
            if ex - sx > label.len() + 1 {
                let start = sx + (ex - sx - label.len()) / 2 + 1;
                let end = ex.min(grid[1].len());
                for (i, &ch) in label.iter().enumerate() {
                    if start + i < end {
                        grid[1][start + i] = ch;
                    }
                }
            }
        }
    }

    // Trim waste up to the deckle maximum
    let used = (x_mm as f64 * scale).round() as usize;
    for x in used + 1..grid_w {
        if x < grid[1].len() {
            grid[1][x] = '.';
        }
    }

    let mut result = String::new();
    for row in &grid {
        let line: String = row.iter().collect();
        result.push_str(line.trim_end());
        result.push('\n');
    }

    let min_x = ((deckle.min_mm() as f64 * scale).round() as usize).min(grid_w);
    result.push_str(&" ".repeat(min_x));
    result.push_str(&format!("^ min {}\n", deckle.min_mm()));
    result
}

#[allow(clippy::needless_range_loop)]
fn draw_box(grid: &mut [Vec<char>], x: usize, w: usize) {
    let cols = grid[0].len();
    for i in x..=x + w {
        if i < cols {
            grid[0][i] = '-';
            grid[2][i] = '-';
        }
    }
    for &cx in &[x, x + w] {
        if cx < cols {
            grid[0][cx] = '+';
            grid[1][cx] = '|';
            grid[2][cx] = '+';
        }
    }
}

/// Required vs produced table, one row per requirement.
pub fn render_totals(totals: &ProducedTotals) -> String {
    let mut out = format!(
        "{:<10} {:>8} {:>12} {:>12} {:>6} {:>11}\n",
        "Roll", "Width", "Required t", "Produced t", "Rolls", "Deviation"
    );
    for t in totals {
        out.push_str(&format!(
            "{:<10} {:>6}mm {:>12.3} {:>12.3} {:>6} {:>+11.3}\n",
            t.id,
            t.width_mm,
            t.required_tons,
            t.tons_produced,
            t.roll_count,
            t.deviation()
        ));
    }
    out
}
