//! Selection state, per-interaction rendering and the interactive session loop

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

use anyhow::Context;
use clap::ValueEnum;
use tracing::{debug, info, warn};

use crate::analysis::{payment_distribution, top_categories, CategorySales};
use crate::data::{
    available_years, filter_by_year, restrict_to_orders, transaction_summary, Dataset,
    TransactionSummary, YearSelection,
};
use crate::rfm::{compute_rfm, MonetaryMode, RfmRecord};
use crate::stats::RfmSummary;
use crate::viz;

/// Entry of the analysis menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum View {
    /// Best-selling product categories
    #[default]
    Categories,
    /// Transactions per payment method
    Payments,
    /// Recency / Frequency / Monetary segmentation
    Rfm,
}

/// What the user currently has selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub year: YearSelection,
    pub view: View,
}

#[derive(Debug, Clone)]
pub struct DashboardOptions {
    /// Number of categories in the ranking
    pub top_n: usize,
    pub monetary_mode: MonetaryMode,
    /// Directory receiving the PNG charts
    pub output_dir: PathBuf,
    pub render_charts: bool,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            top_n: 10,
            monetary_mode: MonetaryMode::default(),
            output_dir: PathBuf::from("charts"),
            render_charts: true,
        }
    }
}

/// Loaded tables plus the dataset-wide figures that never change with a selection
pub struct Dashboard {
    dataset: Dataset,
    options: DashboardOptions,
    summary: TransactionSummary,
    years: Vec<i32>,
}

impl Dashboard {
    pub fn new(dataset: Dataset, options: DashboardOptions) -> crate::Result<Self> {
        if options.top_n == 0 {
            anyhow::bail!("The category ranking needs at least one entry");
        }

        let summary = transaction_summary(&dataset.order_items, &dataset.payments)?;
        let years = available_years(&dataset.orders)?;

        Ok(Self {
            dataset,
            options,
            summary,
            years,
        })
    }

    /// Years offered by the year selector, newest first
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn summary(&self) -> TransactionSummary {
        self.summary
    }

    /// Recompute the selected view from the loaded tables
    pub fn render(&self, selection: &Selection) -> crate::Result<Report> {
        let start = Instant::now();

        if let YearSelection::Year(year) = selection.year {
            if !self.years.contains(&year) {
                warn!(year, "no orders recorded for the selected year");
            }
        }

        let orders = filter_by_year(&self.dataset.orders, selection.year)?;

        let body = match selection.view {
            View::Categories => ReportBody::Categories(top_categories(
                &self.dataset.order_items,
                &orders,
                &self.dataset.products,
                &self.dataset.categories,
                self.options.top_n,
            )?),
            View::Payments => {
                let payments = restrict_to_orders(&self.dataset.payments, &orders)?;
                ReportBody::Payments(payment_distribution(&payments)?)
            }
            View::Rfm => {
                let records = compute_rfm(
                    &orders,
                    &self.dataset.order_items,
                    &self.dataset.payments,
                    self.options.monetary_mode,
                )?;
                let summary = RfmSummary::from_records(&records);
                ReportBody::Rfm { records, summary }
            }
        };

        let title = body.title(selection.year, self.options.top_n);
        let chart = if self.options.render_charts && !body.is_empty() {
            Some(self.draw_chart(&body, &title, selection)?)
        } else {
            None
        };

        debug!(
            view = ?selection.view,
            year = %selection.year,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "view rendered"
        );

        Ok(Report {
            title,
            year: selection.year,
            summary: self.summary,
            body,
            chart,
        })
    }

    fn draw_chart(&self, body: &ReportBody, title: &str, selection: &Selection) -> crate::Result<PathBuf> {
        fs::create_dir_all(&self.options.output_dir).with_context(|| {
            format!(
                "Failed to create chart directory {}",
                self.options.output_dir.display()
            )
        })?;

        let file_name = format!("{}_{}.png", body.file_stem(), selection.year.slug());
        let path = self.options.output_dir.join(file_name);

        match body {
            ReportBody::Categories(ranking) => viz::draw_category_ranking(ranking, title, &path)?,
            ReportBody::Payments(distribution) => viz::draw_payment_pie(distribution, title, &path)?,
            ReportBody::Rfm { records, .. } => viz::draw_rfm_histograms(records, title, &path)?,
        }
        Ok(path)
    }
}

/// Result of one view computation
#[derive(Debug, Clone)]
pub enum ReportBody {
    Categories(Vec<CategorySales>),
    Payments(BTreeMap<String, u32>),
    Rfm {
        records: Vec<RfmRecord>,
        /// `None` when the window holds no customers
        summary: Option<RfmSummary>,
    },
}

impl ReportBody {
    pub fn is_empty(&self) -> bool {
        match self {
            ReportBody::Categories(ranking) => ranking.is_empty(),
            ReportBody::Payments(distribution) => distribution.is_empty(),
            ReportBody::Rfm { records, .. } => records.is_empty(),
        }
    }

    fn title(&self, year: YearSelection, top_n: usize) -> String {
        match self {
            ReportBody::Categories(_) => {
                format!("Top {} product categories by sales ({})", top_n, year)
            }
            ReportBody::Payments(_) => format!("Payment method distribution ({})", year),
            ReportBody::Rfm { .. } => format!("RFM analysis summary ({})", year),
        }
    }

    fn file_stem(&self) -> &'static str {
        match self {
            ReportBody::Categories(_) => "categories",
            ReportBody::Payments(_) => "payment_methods",
            ReportBody::Rfm { .. } => "rfm",
        }
    }
}

/// Everything shown for one selection
#[derive(Debug, Clone)]
pub struct Report {
    pub title: String,
    pub year: YearSelection,
    pub summary: TransactionSummary,
    pub body: ReportBody,
    /// Chart written for this view, if any
    pub chart: Option<PathBuf>,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Transaction Summary ===")?;
        writeln!(
            f,
            "Total orders in dataset: {}",
            group_thousands(self.summary.total_orders)
        )?;
        writeln!(
            f,
            "Confirmed orders (paid): {}",
            group_thousands(self.summary.confirmed_orders)
        )?;
        writeln!(f)?;
        writeln!(f, "=== {} ===", self.title)?;

        if self.body.is_empty() {
            writeln!(f, "No data for {}", self.year)?;
            return Ok(());
        }

        match &self.body {
            ReportBody::Categories(ranking) => {
                for (rank, row) in ranking.iter().enumerate() {
                    writeln!(f, "{:>3}. {:<40} {:>8}", rank + 1, row.label(), row.sales_count)?;
                }
            }
            ReportBody::Payments(distribution) => {
                let total: u32 = distribution.values().sum();
                for (payment_type, count) in distribution {
                    let share = *count as f64 / total as f64 * 100.0;
                    writeln!(f, "  {:<20} {:>8} ({:.1}%)", payment_type, count, share)?;
                }
            }
            ReportBody::Rfm { records, summary } => {
                writeln!(f, "Customers: {}", group_thousands(records.len()))?;
                if let Some(summary) = summary {
                    write!(f, "{}", summary)?;
                }
            }
        }

        if let Some(chart) = &self.chart {
            writeln!(f, "Chart saved to: {}", chart.display())?;
        }
        Ok(())
    }
}

fn group_thousands(value: usize) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

/// One line of interactive input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Year(YearSelection),
    View(View),
    Years,
    Show,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let keyword = words.next().unwrap_or_default().to_ascii_lowercase();
        let argument = words.next();

        let command = match (keyword.as_str(), argument) {
            ("year", Some(year)) => Command::Year(year.parse()?),
            ("view", Some(view)) => Command::View(
                <View as ValueEnum>::from_str(view, true)
                    .map_err(|_| anyhow::anyhow!("Unknown view '{}': expected categories, payments or rfm", view))?,
            ),
            ("years", None) => Command::Years,
            ("show", None) => Command::Show,
            ("help", None) => Command::Help,
            ("quit", None) | ("exit", None) => Command::Quit,
            ("year", None) | ("view", None) => anyhow::bail!("'{}' needs an argument", keyword),
            _ => anyhow::bail!("Unknown command '{}', type 'help' for the list", line.trim()),
        };

        if words.next().is_some() {
            anyhow::bail!("Too many arguments in '{}'", line.trim());
        }
        Ok(command)
    }
}

const HELP: &str = "\
Commands:
  year <YYYY|all>                   select the transaction year
  view <categories|payments|rfm>    select the analysis
  years                             list selectable years
  show                              render the current selection again
  help                              show this message
  quit                              leave the dashboard";

/// Drive the dashboard from line-oriented input until `quit` or end of input
///
/// Every selection change re-renders the view from scratch. Bad commands and
/// render failures are reported on `output` and the loop carries on.
pub fn run_session<R: BufRead, W: Write>(
    dashboard: &Dashboard,
    initial: Selection,
    input: R,
    output: &mut W,
) -> crate::Result<()> {
    let mut selection = initial;
    render_to(dashboard, &selection, output)?;

    write!(output, "> ")?;
    output.flush()?;
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            write!(output, "> ")?;
            output.flush()?;
            continue;
        }

        match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(Command::Help) => writeln!(output, "{}", HELP)?,
            Ok(Command::Years) => {
                let years: Vec<String> = dashboard.years().iter().map(i32::to_string).collect();
                writeln!(output, "Selectable years: all, {}", years.join(", "))?;
            }
            Ok(Command::Show) => render_to(dashboard, &selection, output)?,
            Ok(Command::Year(year)) => {
                selection.year = year;
                render_to(dashboard, &selection, output)?;
            }
            Ok(Command::View(view)) => {
                selection.view = view;
                render_to(dashboard, &selection, output)?;
            }
            Err(e) => writeln!(output, "error: {}", e)?,
        }

        write!(output, "> ")?;
        output.flush()?;
    }

    info!("session ended");
    Ok(())
}

fn render_to<W: Write>(dashboard: &Dashboard, selection: &Selection, output: &mut W) -> crate::Result<()> {
    match dashboard.render(selection) {
        Ok(report) => writeln!(output, "\n{}", report)?,
        Err(e) => writeln!(output, "error: {:#}", e)?,
    }
    Ok(())
}
