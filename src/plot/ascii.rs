//! ASCII plotting of calibration residuals for terminal output.
//!
//! Fixed-size grid, deterministic output. Residuals `src_mag + zp - ref_mag`
//! are plotted against reference magnitude:
//! - used in the fit: `o`
//! - clipped: `x`
//! - reserved: `r`
//! - zero residual: `-` line

use crate::domain::{CalibrationResult, CandidateResidual, CandidateStatus};

/// Render the residual plot for a calibration result.
pub fn render_residual_plot(result: &CalibrationResult, width: usize, height: usize) -> String {
    render_plot(&result.residuals, width, height)
}

fn render_plot(residuals: &[CandidateResidual], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (x_min, x_max) = value_range(residuals.iter().map(|r| r.ref_mag)).unwrap_or((0.0, 1.0));
    // The zero line is always in view.
    let (y_min, y_max) =
        value_range(residuals.iter().map(|r| r.residual).chain(std::iter::once(0.0))).unwrap_or((-1.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    let zero_row = map_y(0.0, y_min, y_max, height);
    for cell in grid[zero_row].iter_mut() {
        *cell = '-';
    }

    // Used points last so they stay visible where markers overlap.
    for status in [CandidateStatus::Clipped, CandidateStatus::Reserved, CandidateStatus::Used] {
        for r in residuals.iter().filter(|r| r.status == status) {
            if !(r.ref_mag.is_finite() && r.residual.is_finite()) {
                continue;
            }
            let x = map_x(r.ref_mag, x_min, x_max, width);
            let y = map_y(r.residual, y_min, y_max, height);
            grid[y][x] = marker(status);
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: ref_mag=[{x_min:.3}, {x_max:.3}] | residual=[{y_min:.3}, {y_max:.3}] mag\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn marker(status: CandidateStatus) -> char {
    match status {
        CandidateStatus::Used => 'o',
        CandidateStatus::Clipped => 'x',
        CandidateStatus::Reserved => 'r',
    }
}

/// Finite min/max of `values`; a single repeated value is widened by 0.5 each side.
fn value_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min_v = f64::INFINITY;
    let mut max_v = f64::NEG_INFINITY;
    for v in values.filter(|v| v.is_finite()) {
        min_v = min_v.min(v);
        max_v = max_v.max(v);
    }
    if !(min_v.is_finite() && max_v.is_finite()) {
        return None;
    }
    if max_v > min_v {
        Some((min_v, max_v))
    } else {
        Some((min_v - 0.5, max_v + 0.5))
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
