//! ecomdash: an e-commerce data exploration dashboard
//!
//! Loads orders, order items, products, category translations and payments
//! from CSV, filters them by purchase year and renders one of three views:
//! best-selling categories, payment-method distribution, or RFM (Recency,
//! Frequency, Monetary) customer segmentation.

pub mod analysis;
pub mod cli;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod rfm;
pub mod stats;
pub mod viz;

#[cfg(test)]
mod test_support;

// Re-export public items for easier access
pub use analysis::{payment_distribution, top_categories, CategorySales};
pub use cli::Args;
pub use dashboard::{run_session, Command, Dashboard, DashboardOptions, Report, ReportBody, Selection, View};
pub use data::{
    available_years, filter_by_year, restrict_to_orders, transaction_summary, Dataset,
    TransactionSummary, YearSelection,
};
pub use error::LoadError;
pub use rfm::{compute_rfm, MonetaryMode, RfmRecord};
pub use stats::{describe, Histogram, RfmSummary, Summary};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
