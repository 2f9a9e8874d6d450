//! Category ranking and payment-method distribution

use std::collections::BTreeMap;

use polars::prelude::*;

use crate::data::{restrict_to_orders, CATEGORY_NAME, CATEGORY_NAME_ENGLISH, PAYMENT_TYPE, PRODUCT_ID};

const SALES_COUNT: &str = "sales_count";
const TRANSACTION_COUNT: &str = "transaction_count";

/// One row of the category ranking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySales {
    /// English category name; `None` when the product or its translation is unknown
    pub category: Option<String>,
    pub sales_count: u32,
}

impl CategorySales {
    pub fn label(&self) -> &str {
        self.category.as_deref().unwrap_or("(uncategorized)")
    }
}

/// Top `n` English categories by number of line items sold within `orders`
///
/// Items whose product or category translation is missing are counted under a
/// `None` category instead of being dropped. Equal counts keep the order in
/// which the categories first appear.
pub fn top_categories(
    items: &DataFrame,
    orders: &DataFrame,
    products: &DataFrame,
    categories: &DataFrame,
    n: usize,
) -> crate::Result<Vec<CategorySales>> {
    let ranked = restrict_to_orders(items, orders)?
        .lazy()
        .select([col(PRODUCT_ID)])
        .join(
            products.clone().lazy(),
            [col(PRODUCT_ID)],
            [col(PRODUCT_ID)],
            JoinArgs::new(JoinType::Left),
        )
        .join(
            categories.clone().lazy(),
            [col(CATEGORY_NAME)],
            [col(CATEGORY_NAME)],
            JoinArgs::new(JoinType::Left),
        )
        .group_by_stable([col(CATEGORY_NAME_ENGLISH)])
        .agg([len().alias(SALES_COUNT)])
        .sort(
            [SALES_COUNT],
            SortMultipleOptions {
                descending: vec![true],
                maintain_order: true,
                ..Default::default()
            },
        )
        .limit(n as IdxSize)
        .collect()?;

    let names = ranked.column(CATEGORY_NAME_ENGLISH)?.str()?;
    let counts = ranked.column(SALES_COUNT)?.cast(&DataType::UInt32)?;

    let rows = names
        .into_iter()
        .zip(counts.u32()?.into_iter())
        .map(|(category, count)| CategorySales {
            category: category.map(str::to_string),
            sales_count: count.unwrap_or(0),
        })
        .collect();

    Ok(rows)
}

/// Number of payment rows per payment type, keyed by type
///
/// `payments` should already be restricted to the filtered orders. Each row
/// counts once, so a split payment contributes several transactions.
pub fn payment_distribution(payments: &DataFrame) -> crate::Result<BTreeMap<String, u32>> {
    let grouped = payments
        .clone()
        .lazy()
        .group_by([col(PAYMENT_TYPE)])
        .agg([len().alias(TRANSACTION_COUNT)])
        .collect()?;

    let types = grouped.column(PAYMENT_TYPE)?.str()?;
    let counts = grouped.column(TRANSACTION_COUNT)?.cast(&DataType::UInt32)?;

    let distribution = types
        .into_iter()
        .zip(counts.u32()?.into_iter())
        .filter_map(|(payment_type, count)| Some((payment_type?.to_string(), count?)))
        .collect();

    Ok(distribution)
}
