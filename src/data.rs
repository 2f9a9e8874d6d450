//! Dataset loading and order filtering using Polars

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use polars::prelude::*;
use tracing::{debug, info};

use crate::error::LoadError;

pub const ORDERS_FILE: &str = "orders.csv";
pub const ORDER_ITEMS_FILE: &str = "order_items.csv";
pub const PRODUCTS_FILE: &str = "products.csv";
pub const CATEGORIES_FILE: &str = "category.csv";
pub const PAYMENTS_FILE: &str = "payments.csv";

pub const ORDER_ID: &str = "order_id";
pub const CUSTOMER_ID: &str = "customer_id";
pub const PURCHASE_TS: &str = "order_purchase_timestamp";
pub const PRODUCT_ID: &str = "product_id";
pub const CATEGORY_NAME: &str = "product_category_name";
pub const CATEGORY_NAME_ENGLISH: &str = "product_category_name_english";
pub const PAYMENT_TYPE: &str = "payment_type";
pub const PAYMENT_VALUE: &str = "payment_value";

/// Layout of `order_purchase_timestamp` in the source files
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The five source tables, loaded once and never modified afterwards
#[derive(Debug, Clone)]
pub struct Dataset {
    /// `order_id`, `customer_id`, `order_purchase_timestamp` (datetime)
    pub orders: DataFrame,
    /// `order_id`, `product_id`
    pub order_items: DataFrame,
    /// `product_id`, `product_category_name`
    pub products: DataFrame,
    /// `product_category_name`, `product_category_name_english`
    pub categories: DataFrame,
    /// `order_id`, `payment_type`, `payment_value` (f64)
    pub payments: DataFrame,
}

impl Dataset {
    /// Load all five CSV files from `dir`
    ///
    /// Identifier columns are read as strings, the purchase timestamp is parsed
    /// with [`TIMESTAMP_FORMAT`] and `payment_value` as a float. A missing file,
    /// a missing column or an unparseable value fails the whole load.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, LoadError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(LoadError::MissingDirectory(dir.to_path_buf()));
        }

        let orders = load_table(
            dir,
            ORDERS_FILE,
            vec![
                col(ORDER_ID),
                col(CUSTOMER_ID),
                col(PURCHASE_TS).str().to_datetime(
                    Some(TimeUnit::Microseconds),
                    None,
                    StrptimeOptions {
                        format: Some(TIMESTAMP_FORMAT.into()),
                        ..Default::default()
                    },
                    lit("raise"),
                ),
            ],
        )?;
        reject_missing_timestamps(dir, &orders)?;

        let order_items = load_table(dir, ORDER_ITEMS_FILE, vec![col(ORDER_ID), col(PRODUCT_ID)])?;
        let products = load_table(dir, PRODUCTS_FILE, vec![col(PRODUCT_ID), col(CATEGORY_NAME)])?;
        let categories = load_table(
            dir,
            CATEGORIES_FILE,
            vec![col(CATEGORY_NAME), col(CATEGORY_NAME_ENGLISH)],
        )?;
        let payments = load_table(
            dir,
            PAYMENTS_FILE,
            vec![
                col(ORDER_ID),
                col(PAYMENT_TYPE),
                col(PAYMENT_VALUE).strict_cast(DataType::Float64),
            ],
        )?;

        info!(
            orders = orders.height(),
            order_items = order_items.height(),
            products = products.height(),
            categories = categories.height(),
            payments = payments.height(),
            "dataset loaded from {}",
            dir.display()
        );

        Ok(Self {
            orders,
            order_items,
            products,
            categories,
            payments,
        })
    }
}

fn load_table(dir: &Path, file_name: &str, columns: Vec<Expr>) -> Result<DataFrame, LoadError> {
    let path: PathBuf = dir.join(file_name);
    if !path.is_file() {
        return Err(LoadError::MissingFile(path));
    }

    let malformed = |source: PolarsError| LoadError::Malformed {
        path: path.clone(),
        source,
    };

    // Schema inference is disabled so every column arrives as a string;
    // typed columns are converted explicitly in `columns`.
    let df = LazyCsvReader::new(&path)
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .finish()
        .map_err(malformed)?
        .select(columns)
        .collect()
        .map_err(malformed)?;

    debug!(rows = df.height(), "read {}", path.display());
    Ok(df)
}

/// Empty timestamp cells load as nulls; an order without a purchase date has
/// no recency and no year, so the file is treated as malformed.
fn reject_missing_timestamps(dir: &Path, orders: &DataFrame) -> Result<(), LoadError> {
    let path = dir.join(ORDERS_FILE);
    let missing = orders
        .column(PURCHASE_TS)
        .map_err(|source| LoadError::Malformed {
            path: path.clone(),
            source,
        })?
        .null_count();

    if missing > 0 {
        return Err(LoadError::Malformed {
            path,
            source: PolarsError::ComputeError(
                format!("{} order(s) without {}", missing, PURCHASE_TS).into(),
            ),
        });
    }
    Ok(())
}

/// Year picked in the year selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YearSelection {
    #[default]
    All,
    Year(i32),
}

impl YearSelection {
    /// Short form used in chart file names
    pub fn slug(&self) -> String {
        match self {
            YearSelection::All => "all".to_string(),
            YearSelection::Year(year) => year.to_string(),
        }
    }
}

impl fmt::Display for YearSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YearSelection::All => write!(f, "All years"),
            YearSelection::Year(year) => write!(f, "{}", year),
        }
    }
}

impl FromStr for YearSelection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(YearSelection::All);
        }
        let year: i32 = s
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid year '{}': expected 'all' or a year such as 2017", s))?;
        Ok(YearSelection::Year(year))
    }
}

/// Narrow `orders` to one calendar year of purchase
///
/// `All` hands back the same rows. A year with no orders yields an empty frame.
pub fn filter_by_year(orders: &DataFrame, year: YearSelection) -> crate::Result<DataFrame> {
    let filtered = match year {
        YearSelection::All => orders.clone(),
        YearSelection::Year(year) => orders
            .clone()
            .lazy()
            .filter(col(PURCHASE_TS).dt().year().eq(lit(year)))
            .collect()?,
    };

    debug!(%year, rows = filtered.height(), "orders filtered by year");
    Ok(filtered)
}

/// Distinct purchase years present in `orders`, newest first
pub fn available_years(orders: &DataFrame) -> crate::Result<Vec<i32>> {
    let df = orders
        .clone()
        .lazy()
        .select([col(PURCHASE_TS).dt().year().alias("year")])
        .collect()?;

    let years: BTreeSet<i32> = df.column("year")?.i32()?.into_iter().flatten().collect();
    Ok(years.into_iter().rev().collect())
}

/// Keep the rows of `table` whose `order_id` appears in `orders`
pub fn restrict_to_orders(table: &DataFrame, orders: &DataFrame) -> crate::Result<DataFrame> {
    let order_ids = orders.column(ORDER_ID)?.clone();
    let df = table
        .clone()
        .lazy()
        .filter(col(ORDER_ID).is_in(lit(order_ids)))
        .collect()?;
    Ok(df)
}

/// Headline order counts over the whole dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionSummary {
    /// Distinct orders with at least one line item
    pub total_orders: usize,
    /// Distinct orders with both line items and a payment
    pub confirmed_orders: usize,
}

pub fn transaction_summary(items: &DataFrame, payments: &DataFrame) -> crate::Result<TransactionSummary> {
    let total_orders = items.column(ORDER_ID)?.drop_nulls().n_unique()?;

    let confirmed = items
        .clone()
        .lazy()
        .select([col(ORDER_ID)])
        .join(
            payments.clone().lazy().select([col(ORDER_ID)]),
            [col(ORDER_ID)],
            [col(ORDER_ID)],
            JoinArgs::new(JoinType::Inner),
        )
        .collect()?;
    let confirmed_orders = confirmed.column(ORDER_ID)?.drop_nulls().n_unique()?;

    Ok(TransactionSummary {
        total_orders,
        confirmed_orders,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::DatasetBuilder;

    fn sample() -> DatasetBuilder {
        DatasetBuilder::new()
            .order("o1", "c1", "2016-10-04 09:43:32")
            .order("o2", "c2", "2017-03-01 12:00:00")
            .order("o3", "c1", "2017-11-24 20:15:00")
            .order("o4", "c3", "2018-05-02 07:30:00")
            .item("o1", "p1")
            .item("o2", "p1")
            .item("o2", "p2")
            .item("o3", "p2")
            .payment("o1", "credit_card", "10.5")
            .payment("o2", "boleto", "20")
            .payment("o4", "voucher", "5")
    }

    #[test]
    fn test_load_parses_types() {
        let (_dir, dataset) = sample().load();

        assert_eq!(dataset.orders.height(), 4);
        assert_eq!(
            dataset.orders.column(PURCHASE_TS).unwrap().dtype(),
            &DataType::Datetime(TimeUnit::Microseconds, None)
        );
        assert_eq!(dataset.payments.column(PAYMENT_VALUE).unwrap().dtype(), &DataType::Float64);
        assert_eq!(dataset.orders.column(ORDER_ID).unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = sample().write();
        std::fs::remove_file(dir.path().join(PAYMENTS_FILE)).unwrap();

        let err = Dataset::load(dir.path()).unwrap_err();
        assert!(matches!(err, LoadError::MissingFile(ref path) if path.ends_with(PAYMENTS_FILE)));
    }

    #[test]
    fn test_load_missing_directory() {
        let err = Dataset::load("/definitely/not/here").unwrap_err();
        assert!(matches!(err, LoadError::MissingDirectory(_)));
    }

    #[test]
    fn test_load_malformed_timestamp() {
        let (dir, _) = sample().load();
        std::fs::write(
            dir.path().join(ORDERS_FILE),
            "order_id,customer_id,order_purchase_timestamp\no1,c1,yesterday\n",
        )
        .unwrap();

        let err = Dataset::load(dir.path()).unwrap_err();
        assert!(matches!(err, LoadError::Malformed { .. }));
    }

    #[test]
    fn test_load_empty_timestamp() {
        let dir = DatasetBuilder::new()
            .order("1", "A", "2023-01-10 00:00:00")
            .order("2", "B", "")
            .payment("2", "credit", "9")
            .write();

        let err = Dataset::load(dir.path()).unwrap_err();
        assert!(matches!(err, LoadError::Malformed { ref path, .. } if path.ends_with(ORDERS_FILE)));
        assert!(err.to_string().contains(ORDERS_FILE));
    }

    #[test]
    fn test_load_missing_column() {
        let (dir, _) = sample().load();
        std::fs::write(dir.path().join(PRODUCTS_FILE), "product_id\np1\n").unwrap();

        let err = Dataset::load(dir.path()).unwrap_err();
        assert!(matches!(err, LoadError::Malformed { .. }));
    }

    #[test]
    fn test_filter_by_year() {
        let (_dir, dataset) = sample().load();

        let all = filter_by_year(&dataset.orders, YearSelection::All).unwrap();
        assert_eq!(all.height(), 4);

        let y2017 = filter_by_year(&dataset.orders, YearSelection::Year(2017)).unwrap();
        assert_eq!(y2017.height(), 2);

        let none = filter_by_year(&dataset.orders, YearSelection::Year(2009)).unwrap();
        assert_eq!(none.height(), 0);

        // input untouched
        assert_eq!(dataset.orders.height(), 4);
    }

    #[test]
    fn test_years_partition_orders() {
        let (_dir, dataset) = sample().load();

        let years = available_years(&dataset.orders).unwrap();
        assert_eq!(years, vec![2018, 2017, 2016]);

        let mut ids: Vec<String> = Vec::new();
        for year in years {
            let part = filter_by_year(&dataset.orders, YearSelection::Year(year)).unwrap();
            ids.extend(
                part.column(ORDER_ID)
                    .unwrap()
                    .str()
                    .unwrap()
                    .into_iter()
                    .flatten()
                    .map(str::to_string),
            );
        }
        ids.sort();
        assert_eq!(ids, vec!["o1", "o2", "o3", "o4"]);
    }

    #[test]
    fn test_restrict_to_orders() {
        let (_dir, dataset) = sample().load();
        let orders = filter_by_year(&dataset.orders, YearSelection::Year(2017)).unwrap();

        let items = restrict_to_orders(&dataset.order_items, &orders).unwrap();
        assert_eq!(items.height(), 3);

        let payments = restrict_to_orders(&dataset.payments, &orders).unwrap();
        assert_eq!(payments.height(), 1);
    }

    #[test]
    fn test_transaction_summary() {
        let (_dir, dataset) = sample().load();
        let summary = transaction_summary(&dataset.order_items, &dataset.payments).unwrap();

        assert_eq!(summary.total_orders, 3);
        assert_eq!(summary.confirmed_orders, 2);
    }

    #[test]
    fn test_parse_year_selection() {
        assert_eq!("all".parse::<YearSelection>().unwrap(), YearSelection::All);
        assert_eq!(" ALL ".parse::<YearSelection>().unwrap(), YearSelection::All);
        assert_eq!("2017".parse::<YearSelection>().unwrap(), YearSelection::Year(2017));
        assert!("twenty".parse::<YearSelection>().is_err());

        assert_eq!(YearSelection::All.to_string(), "All years");
        assert_eq!(YearSelection::Year(2018).slug(), "2018");
    }
}
