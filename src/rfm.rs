//! RFM (Recency, Frequency, Monetary) aggregation over year-filtered orders

use chrono::Duration;
use clap::ValueEnum;
use polars::prelude::*;
use tracing::debug;

use crate::data::{CUSTOMER_ID, ORDER_ID, PAYMENT_VALUE, PRODUCT_ID, PURCHASE_TS};

const LAST_PURCHASE: &str = "last_purchase";
const FREQUENCY: &str = "frequency";
const MONETARY: &str = "monetary";

/// Per-customer RFM values
#[derive(Debug, Clone, PartialEq)]
pub struct RfmRecord {
    pub customer_id: String,
    /// Whole days between the customer's latest order and the latest order in the window
    pub recency: i64,
    /// Distinct orders placed by the customer
    pub frequency: u32,
    /// Summed payment value
    pub monetary: f64,
}

/// How payment values are summed into Monetary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MonetaryMode {
    /// Sum over every (order, item, payment) row of the joined table. An order
    /// with several items and several payments has each payment counted once
    /// per item.
    #[default]
    FanOut,
    /// Sum each order's payments once, then sum across the customer's orders
    PerOrder,
}

/// Compute one [`RfmRecord`] per customer in `orders`
///
/// `orders` is expected to be already filtered by year. Recency is measured
/// against the latest purchase timestamp in `orders`, not the current date.
/// Records are sorted by customer id. An empty `orders` frame gives an empty
/// result.
pub fn compute_rfm(
    orders: &DataFrame,
    items: &DataFrame,
    payments: &DataFrame,
    mode: MonetaryMode,
) -> crate::Result<Vec<RfmRecord>> {
    let timestamps = orders.column(PURCHASE_TS)?.cast(&DataType::Int64)?;
    let Some(max_date) = timestamps.i64()?.max() else {
        debug!("no orders in window, RFM is empty");
        return Ok(Vec::new());
    };

    let base = orders
        .clone()
        .lazy()
        .select([col(ORDER_ID), col(CUSTOMER_ID), col(PURCHASE_TS)]);

    let joined = match mode {
        MonetaryMode::FanOut => base
            .join(
                items.clone().lazy().select([col(ORDER_ID), col(PRODUCT_ID)]),
                [col(ORDER_ID)],
                [col(ORDER_ID)],
                JoinArgs::new(JoinType::Left),
            )
            .join(
                payments.clone().lazy().select([col(ORDER_ID), col(PAYMENT_VALUE)]),
                [col(ORDER_ID)],
                [col(ORDER_ID)],
                JoinArgs::new(JoinType::Left),
            ),
        // Items carry no value, so joining them would only repeat payments.
        MonetaryMode::PerOrder => base.join(
            payments
                .clone()
                .lazy()
                .group_by([col(ORDER_ID)])
                .agg([col(PAYMENT_VALUE).sum()]),
            [col(ORDER_ID)],
            [col(ORDER_ID)],
            JoinArgs::new(JoinType::Left),
        ),
    };

    let rfm_df = joined
        .group_by([col(CUSTOMER_ID)])
        .agg([
            col(PURCHASE_TS).max().alias(LAST_PURCHASE),
            col(ORDER_ID).n_unique().alias(FREQUENCY),
            col(PAYMENT_VALUE).sum().alias(MONETARY),
        ])
        .sort([CUSTOMER_ID], SortMultipleOptions::default())
        .collect()?;

    let records = extract_records(&rfm_df, max_date)?;
    debug!(customers = records.len(), ?mode, "RFM computed");
    Ok(records)
}

fn extract_records(rfm_df: &DataFrame, max_date: i64) -> crate::Result<Vec<RfmRecord>> {
    let customers = rfm_df.column(CUSTOMER_ID)?.str()?;
    let last_purchase = rfm_df.column(LAST_PURCHASE)?.cast(&DataType::Int64)?;
    let frequency = rfm_df.column(FREQUENCY)?.cast(&DataType::UInt32)?;
    let monetary = rfm_df.column(MONETARY)?.cast(&DataType::Float64)?;

    let records = customers
        .into_iter()
        .zip(last_purchase.i64()?.into_iter())
        .zip(frequency.u32()?.into_iter())
        .zip(monetary.f64()?.into_iter())
        .filter_map(|(((customer, last), freq), value)| {
            Some(RfmRecord {
                customer_id: customer?.to_string(),
                recency: Duration::microseconds(max_date - last?).num_days(),
                frequency: freq.unwrap_or(0),
                monetary: value.unwrap_or(0.0),
            })
        })
        .collect();

    Ok(records)
}

/// Column-wise view of RFM records
pub fn rfm_columns(records: &[RfmRecord]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let recency = records.iter().map(|r| r.recency as f64).collect();
    let frequency = records.iter().map(|r| r.frequency as f64).collect();
    let monetary = records.iter().map(|r| r.monetary).collect();
    (recency, frequency, monetary)
}
