//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use clap::Parser;

use crate::dashboard::{DashboardOptions, Selection, View};
use crate::data::YearSelection;
use crate::rfm::MonetaryMode;

/// E-commerce exploration dashboard: category ranking, payment mix and RFM analysis
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory holding orders.csv, order_items.csv, products.csv, category.csv and payments.csv
    #[arg(short, long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Transaction year to analyse, or "all"
    #[arg(short, long, default_value = "all")]
    pub year: String,

    /// Analysis to show
    #[arg(long, value_enum, default_value_t = View::Categories)]
    pub view: View,

    /// Number of categories in the ranking
    #[arg(short = 'n', long, default_value = "10")]
    pub top: usize,

    /// How payment values are summed into Monetary
    #[arg(long, value_enum, default_value_t = MonetaryMode::FanOut)]
    pub monetary: MonetaryMode,

    /// Directory receiving the PNG charts
    #[arg(short, long, default_value = "charts")]
    pub output_dir: PathBuf,

    /// Skip chart rendering and only print the reports
    #[arg(long)]
    pub no_charts: bool,

    /// Keep reading selections from stdin after the first render
    #[arg(short, long)]
    pub interactive: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Initial selection from `--year` and `--view`
    pub fn selection(&self) -> crate::Result<Selection> {
        let year: YearSelection = self.year.parse()?;
        Ok(Selection {
            year,
            view: self.view,
        })
    }

    pub fn dashboard_options(&self) -> crate::Result<DashboardOptions> {
        if self.top == 0 {
            anyhow::bail!("--top must be at least 1");
        }

        Ok(DashboardOptions {
            top_n: self.top,
            monetary_mode: self.monetary,
            output_dir: self.output_dir.clone(),
            render_charts: !self.no_charts,
        })
    }
}
