//! Chart rendering using Plotters: category bars, payment pie, RFM histograms

use std::collections::BTreeMap;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use tracing::info;

use crate::analysis::CategorySales;
use crate::rfm::{rfm_columns, RfmRecord};
use crate::stats::{gaussian_kde, Histogram, HISTOGRAM_BINS};

const BACKGROUND: RGBColor = RGBColor(249, 249, 249);

/// Dark-to-light ramp for ranked bars
const BAR_COLORS: [RGBColor; 10] = [
    RGBColor(53, 25, 62),
    RGBColor(89, 30, 80),
    RGBColor(125, 30, 90),
    RGBColor(162, 27, 93),
    RGBColor(198, 32, 85),
    RGBColor(225, 59, 71),
    RGBColor(238, 98, 65),
    RGBColor(243, 135, 93),
    RGBColor(245, 169, 129),
    RGBColor(246, 200, 170),
];

const PIE_COLORS: [RGBColor; 8] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
];

const ROYAL_BLUE: RGBColor = RGBColor(65, 105, 225);
const SEA_GREEN: RGBColor = RGBColor(46, 139, 87);
const CRIMSON: RGBColor = RGBColor(220, 20, 60);

/// Shares at or below this percentage get no percentage label
const PIE_LABEL_THRESHOLD: f64 = 5.0;

/// Sample points along each density curve
const KDE_POINTS: usize = 200;

/// Horizontal bar chart of the category ranking, best seller on top
pub fn draw_category_ranking(
    ranking: &[CategorySales],
    title: &str,
    output_path: &Path,
) -> crate::Result<()> {
    if ranking.is_empty() {
        anyhow::bail!("Cannot draw a category ranking without categories");
    }

    let slots = ranking.len();
    let max_count = ranking.iter().map(|row| row.sales_count).max().unwrap_or(1) as f64;

    let root = BitMapBackend::new(output_path, (1200, 600)).into_drawing_area();
    root.fill(&BACKGROUND)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 26))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(20)
        // room on the right for the bar labels
        .build_cartesian_2d(0f64..max_count * 1.8, 0f64..slots as f64)?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(0)
        .x_desc("Number of sales")
        .y_desc("Product category")
        .axis_desc_style(("sans-serif", 15))
        .light_line_style(BLACK.mix(0.08))
        .draw()?;

    chart.draw_series(ranking.iter().enumerate().map(|(rank, row)| {
        let slot = (slots - 1 - rank) as f64;
        let color = BAR_COLORS[rank % BAR_COLORS.len()];
        Rectangle::new(
            [(0.0, slot + 0.15), (row.sales_count as f64, slot + 0.85)],
            color.mix(0.9).filled(),
        )
    }))?;

    let label_style = TextStyle::from(("sans-serif", 14).into_font()).pos(Pos::new(HPos::Left, VPos::Center));
    chart.draw_series(ranking.iter().enumerate().map(|(rank, row)| {
        let slot = (slots - 1 - rank) as f64;
        Text::new(
            format!("{}  {}", row.sales_count, row.label()),
            (row.sales_count as f64 + max_count * 0.02, slot + 0.5),
            label_style.clone(),
        )
    }))?;

    root.present()?;
    info!("category ranking saved to {}", output_path.display());
    Ok(())
}

/// Pie chart of transactions per payment type
pub fn draw_payment_pie(
    distribution: &BTreeMap<String, u32>,
    title: &str,
    output_path: &Path,
) -> crate::Result<()> {
    let total: u32 = distribution.values().sum();
    if total == 0 {
        anyhow::bail!("Cannot draw a payment distribution without transactions");
    }

    let root = BitMapBackend::new(output_path, (1100, 800)).into_drawing_area();
    root.fill(&BACKGROUND)?;
    root.titled(title, ("sans-serif", 26))?;

    let (width, height) = root.dim_in_pixel();
    let center = (width as i32 * 2 / 5, height as i32 / 2 + 20);
    let radius = width.min(height) as f64 * 0.32;

    let sizes: Vec<f64> = distribution.values().map(|&count| count as f64).collect();
    let colors: Vec<RGBColor> = (0..sizes.len())
        .map(|i| PIE_COLORS[i % PIE_COLORS.len()])
        .collect();
    let labels = pie_slice_labels(distribution);

    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.start_angle(140.0);
    pie.label_style(("sans-serif", 16).into_font().color(&BLACK));
    root.draw(&pie)?;

    // legend to the right of the pie
    let legend_x = center.0 + radius as i32 + 60;
    let mut legend_y = center.1 - (distribution.len() as i32 * 28) / 2 - 40;
    root.draw(&Text::new(
        "Payment method",
        (legend_x, legend_y),
        ("sans-serif", 18).into_font().style(FontStyle::Bold),
    ))?;
    for (payment_type, color) in distribution.keys().zip(&colors) {
        legend_y += 28;
        root.draw(&Rectangle::new(
            [(legend_x, legend_y), (legend_x + 16, legend_y + 16)],
            color.filled(),
        ))?;
        root.draw(&Text::new(
            payment_type.as_str(),
            (legend_x + 26, legend_y),
            ("sans-serif", 16),
        ))?;
    }

    root.present()?;
    info!("payment distribution saved to {}", output_path.display());
    Ok(())
}

/// Percentage labels for each slice, blank when the share is too small to read
fn pie_slice_labels(distribution: &BTreeMap<String, u32>) -> Vec<String> {
    let total: u32 = distribution.values().sum();
    distribution
        .values()
        .map(|&count| {
            let share = count as f64 / total as f64 * 100.0;
            if share > PIE_LABEL_THRESHOLD {
                format!("{:.1}%", share)
            } else {
                String::new()
            }
        })
        .collect()
}

/// Three side-by-side histograms of Recency, Frequency and Monetary
pub fn draw_rfm_histograms(records: &[RfmRecord], title: &str, output_path: &Path) -> crate::Result<()> {
    if records.is_empty() {
        anyhow::bail!("Cannot draw RFM histograms without customers");
    }

    let (recency, frequency, monetary) = rfm_columns(records);

    let root = BitMapBackend::new(output_path, (1800, 520)).into_drawing_area();
    root.fill(&BACKGROUND)?;
    let body = root.titled(title, ("sans-serif", 26))?;
    let panels = body.split_evenly((1, 3));

    let panel_layout = [
        ("Recency distribution", "Days since last purchase", &recency, ROYAL_BLUE),
        ("Frequency distribution", "Number of transactions", &frequency, SEA_GREEN),
        ("Monetary distribution", "Total spend", &monetary, CRIMSON),
    ];
    for (panel, (caption, x_desc, values, color)) in panels.iter().zip(panel_layout) {
        draw_histogram_panel(panel, caption, x_desc, values, color)?;
    }

    root.present()?;
    info!("RFM histograms saved to {}", output_path.display());
    Ok(())
}

fn draw_histogram_panel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    caption: &str,
    x_desc: &str,
    values: &[f64],
    color: RGBColor,
) -> crate::Result<()> {
    let Some(histogram) = Histogram::from_values(values, HISTOGRAM_BINS) else {
        return Ok(());
    };

    let x_min = histogram.edges[0];
    let x_max = histogram.edges[histogram.edges.len() - 1];
    let y_max = (histogram.max_count() as f64 * 1.1).max(1.0);

    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 18))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(55)
        .build_cartesian_2d(x_min..x_max, 0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(x_desc)
        .y_desc("Customers")
        .axis_desc_style(("sans-serif", 14))
        .light_line_style(BLACK.mix(0.08))
        .draw()?;

    chart.draw_series(histogram.bins().map(|(lower, upper, count)| {
        Rectangle::new([(lower, 0.0), (upper, count as f64)], color.mix(0.75).filled())
    }))?;

    let bin_width = histogram.edges[1] - histogram.edges[0];
    if let Some(curve) = gaussian_kde(values, x_min, x_max, KDE_POINTS, bin_width) {
        chart.draw_series(LineSeries::new(curve, color.stroke_width(2)))?;
    }

    Ok(())
}
