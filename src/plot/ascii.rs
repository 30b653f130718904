//! ASCII plotting of monthly price series for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Each series is drawn as a line of its `line` character; observed points are
//! stamped on top with its `marker`.

use chrono::{Datelike, NaiveDate};

use crate::domain::TrendPoint;

/// One series to plot.
#[derive(Debug, Clone, Copy)]
pub struct Series<'a> {
    pub label: &'a str,
    pub marker: char,
    pub line: char,
    pub points: &'a [TrendPoint],
}

/// Months since year 0, so consecutive months are one unit apart.
pub fn month_index(date: NaiveDate) -> f64 {
    f64::from(date.year()) * 12.0 + f64::from(date.month0())
}

/// Inverse of `month_index`, rounded to the nearest month (`YYYY-MM`).
pub fn month_label(index: f64) -> String {
    let idx = index.round() as i64;
    let year = idx.div_euclid(12);
    let month = idx.rem_euclid(12) + 1;
    format!("{year:04}-{month:02}")
}

/// Render all `series` on one grid, sharing the month and price axes.
pub fn render_trend_plot(series: &[Series<'_>], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (x_min, x_max) = x_range(series);
    let (y_min, y_max) = y_range(series);
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Lines first so markers always win.
    for s in series {
        let mut prev = None;
        for p in s.points {
            let x = map_x(month_index(p.date), x_min, x_max, width);
            let y = map_y(p.price, y_min, y_max, height);
            if let Some((x0, y0)) = prev {
                draw_line(&mut grid, x0, y0, x, y, s.line);
            }
            prev = Some((x, y));
        }
    }
    for s in series {
        for p in s.points {
            let x = map_x(month_index(p.date), x_min, x_max, width);
            let y = map_y(p.price, y_min, y_max, height);
            grid[y][x] = s.marker;
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: months=[{}, {}] | price=[{y_min:.2}, {y_max:.2}]\n",
        month_label(x_min),
        month_label(x_max)
    ));
    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }
    for s in series {
        out.push_str(&format!("{} {} ({} points)\n", s.marker, s.label, s.points.len()));
    }

    out
}

fn x_range(series: &[Series<'_>]) -> (f64, f64) {
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    for p in series.iter().flat_map(|s| s.points) {
        let x = month_index(p.date);
        min_x = min_x.min(x);
        max_x = max_x.max(x);
    }
    if !(min_x.is_finite() && max_x.is_finite()) {
        return (0.0, 1.0);
    }
    if max_x > min_x {
        (min_x, max_x)
    } else {
        // A single month still needs a non-empty axis.
        (min_x - 1.0, max_x + 1.0)
    }
}

fn y_range(series: &[Series<'_>]) -> (f64, f64) {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for p in series.iter().flat_map(|s| s.points) {
        min_y = min_y.min(p.price);
        max_y = max_y.max(p.price);
    }
    if !(min_y.is_finite() && max_y.is_finite()) {
        return (0.0, 1.0);
    }
    if max_y > min_y {
        (min_y, max_y)
    } else {
        (min_y - 1.0, max_y + 1.0)
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham-ish). Only fills blank cells.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::month_start;

    fn point(year: i32, month: u32, price: f64) -> TrendPoint {
        TrendPoint {
            date: month_start(year, month).unwrap(),
            price,
        }
    }

    #[test]
    fn month_labels_round_trip() {
        let date = month_start(2023, 12).unwrap();
        assert_eq!(month_label(month_index(date)), "2023-12");
        assert_eq!(month_index(month_start(2024, 1).unwrap()) - month_index(date), 1.0);
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let history = vec![point(2023, 1, 20.0), point(2023, 10, 22.0)];
        let national = vec![point(2023, 1, 21.0)];
        let series = [
            Series {
                label: "CDMX - Regular",
                marker: 'o',
                line: '-',
                points: &history,
            },
            Series {
                label: "national average",
                marker: '+',
                line: '.',
                points: &national,
            },
        ];

        let txt = render_trend_plot(&series, 10, 5);
        let expected = concat!(
            "Plot: months=[2023-01, 2023-10] | price=[19.90, 22.10]\n",
            "        -o\n",
            "      --\n",
            "+   --\n",
            "  --\n",
            "o-\n",
            "o CDMX - Regular (2 points)\n",
            "+ national average (1 points)\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn empty_series_still_renders_a_frame() {
        let txt = render_trend_plot(&[], 12, 5);
        assert_eq!(txt.lines().count(), 6);
        assert!(txt.starts_with("Plot: months="));
    }
}
