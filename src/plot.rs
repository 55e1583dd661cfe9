use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use plotters::prelude::*;

use crate::error::{Result, RobregError};
use crate::metrics::SummaryRow;
use crate::sim::TailModel;

const FALLBACK_COLORS: [RGBColor; 4] = [
    RGBColor(0x94, 0x67, 0xbd),
    RGBColor(0xff, 0x7f, 0x0e),
    RGBColor(0x8c, 0x56, 0x4b),
    RGBColor(0x7f, 0x7f, 0x7f),
];

fn method_color(method: &str, idx: usize) -> RGBColor {
    match method {
        "OLS" => RGBColor(0x1f, 0x77, 0xb4),
        "LAD" => RGBColor(0x2c, 0xa0, 0x2c),
        "Huber" => RGBColor(0xd6, 0x27, 0x28),
        _ => FALLBACK_COLORS[idx % FALLBACK_COLORS.len()],
    }
}

fn plot_err<E: std::fmt::Display>(err: E) -> RobregError {
    RobregError::Plot(err.to_string())
}

fn sorted_unique(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut out: Vec<f64> = values.collect();
    out.sort_by(|a, b| a.total_cmp(b));
    out.dedup();
    out
}

pub fn figure_file_name(gamma: f64, snr: f64) -> String {
    format!("mse_vs_df_gamma{gamma}_snr{snr}.svg")
}

/// Render mean MSE against tail heaviness, one figure per (gamma, snr) pair
/// and one line per method. Returns the written paths.
pub fn plot_mse_vs_df(summary: &[SummaryRow], out_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)?;

    let gammas = sorted_unique(summary.iter().map(|r| r.gamma));
    let snrs = sorted_unique(summary.iter().map(|r| r.snr));
    let mut methods: Vec<&str> = Vec::new();
    for row in summary {
        if !methods.contains(&row.method.as_str()) {
            methods.push(row.method.as_str());
        }
    }

    let mut written = Vec::new();
    for &gamma in &gammas {
        for &snr in &snrs {
            let subset: Vec<&SummaryRow> = summary
                .iter()
                .filter(|r| r.gamma == gamma && r.snr == snr)
                .collect();
            if subset.is_empty() {
                continue;
            }
            let path = out_dir.join(figure_file_name(gamma, snr));
            draw_panel(&subset, &methods, gamma, snr, &path)?;
            info!("saved figure {}", path.display());
            written.push(path);
        }
    }
    Ok(written)
}

fn draw_panel(
    subset: &[&SummaryRow],
    methods: &[&str],
    gamma: f64,
    snr: f64,
    path: &Path,
) -> Result<()> {
    let mut levels: Vec<TailModel> = Vec::new();
    for row in subset {
        if !levels.contains(&row.df) {
            levels.push(row.df);
        }
    }
    levels.sort_by(|a, b| a.df().total_cmp(&b.df()));
    let level_of = |tail: &TailModel| levels.iter().position(|l| l == tail).unwrap_or(0) as f64;

    let max_mse = subset
        .iter()
        .map(|r| r.mean_mse)
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);
    let y_top = if max_mse > 0.0 { max_mse * 1.1 } else { 1.0 };
    let x_max = levels.len() as f64 - 0.5;

    let root = SVGBackend::new(path, (750, 450)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("MSE vs Tail Heaviness (gamma={gamma}, SNR={snr})"),
            ("sans-serif", 22).into_font(),
        )
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5..x_max, 0.0..y_top)
        .map_err(plot_err)?;

    let labels: Vec<String> = levels.iter().map(|l| l.to_string()).collect();
    let x_formatter = |x: &f64| {
        let idx = x.round();
        if (x - idx).abs() < 1e-6 && idx >= 0.0 {
            labels.get(idx as usize).cloned().unwrap_or_default()
        } else {
            String::new()
        }
    };

    chart
        .configure_mesh()
        .x_labels(levels.len())
        .x_label_formatter(&x_formatter)
        .x_desc("Degrees of Freedom (df)")
        .y_desc("Mean Squared Error (MSE)")
        .draw()
        .map_err(plot_err)?;

    for (idx, method) in methods.iter().enumerate() {
        let mut points: Vec<(f64, f64)> = subset
            .iter()
            .filter(|r| r.method == *method)
            .map(|r| (level_of(&r.df), r.mean_mse))
            .collect();
        if points.is_empty() {
            continue;
        }
        points.sort_by(|a, b| a.0.total_cmp(&b.0));

        let color = method_color(method, idx);
        chart
            .draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))
            .map_err(plot_err)?
            .label(*method)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(3)));
        chart
            .draw_series(points.iter().map(|&pt| Circle::new(pt, 4, color.filled())))
            .map_err(plot_err)?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .border_style(BLACK)
        .background_style(WHITE.mix(0.7))
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn figure_names_follow_grid_values() {
        assert_eq!(figure_file_name(0.2, 5.0), "mse_vs_df_gamma0.2_snr5.svg");
        assert_eq!(figure_file_name(0.5, 10.0), "mse_vs_df_gamma0.5_snr10.svg");
    }

    #[test]
    fn registered_methods_keep_their_colors() {
        let ols = method_color("OLS", 5);
        assert_eq!((ols.0, ols.1, ols.2), (0x1f, 0x77, 0xb4));
        let custom = method_color("custom", 1);
        assert_eq!((custom.0, custom.1, custom.2), (0xff, 0x7f, 0x0e));
    }
}
