//! CSV fixtures for unit tests

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use crate::data::{
    Dataset, CATEGORIES_FILE, ORDERS_FILE, ORDER_ITEMS_FILE, PAYMENTS_FILE, PRODUCTS_FILE,
};

/// Builds a data directory with the five source files
#[derive(Default)]
pub struct DatasetBuilder {
    orders: Vec<String>,
    items: Vec<String>,
    products: Vec<String>,
    categories: Vec<String>,
    payments: Vec<String>,
}

impl DatasetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order(mut self, order_id: &str, customer_id: &str, timestamp: &str) -> Self {
        self.orders.push(format!("{},{},{}", order_id, customer_id, timestamp));
        self
    }

    pub fn item(mut self, order_id: &str, product_id: &str) -> Self {
        self.items.push(format!("{},{}", order_id, product_id));
        self
    }

    pub fn product(mut self, product_id: &str, category: &str) -> Self {
        self.products.push(format!("{},{}", product_id, category));
        self
    }

    pub fn category(mut self, name: &str, english: &str) -> Self {
        self.categories.push(format!("{},{}", name, english));
        self
    }

    pub fn payment(mut self, order_id: &str, payment_type: &str, value: &str) -> Self {
        self.payments
            .push(format!("{},{},{}", order_id, payment_type, value));
        self
    }

    pub fn write(&self) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        write_csv(
            dir.path(),
            ORDERS_FILE,
            "order_id,customer_id,order_purchase_timestamp",
            &self.orders,
        );
        write_csv(dir.path(), ORDER_ITEMS_FILE, "order_id,product_id", &self.items);
        write_csv(
            dir.path(),
            PRODUCTS_FILE,
            "product_id,product_category_name",
            &self.products,
        );
        write_csv(
            dir.path(),
            CATEGORIES_FILE,
            "product_category_name,product_category_name_english",
            &self.categories,
        );
        write_csv(
            dir.path(),
            PAYMENTS_FILE,
            "order_id,payment_type,payment_value",
            &self.payments,
        );
        dir
    }

    /// Write the files and load them back; keep the `TempDir` alive while the
    /// dataset is in use
    pub fn load(&self) -> (TempDir, Dataset) {
        let dir = self.write();
        let dataset = Dataset::load(dir.path()).unwrap();
        (dir, dataset)
    }
}

fn write_csv(dir: &Path, name: &str, header: &str, rows: &[String]) {
    let mut contents = String::from(header);
    contents.push('\n');
    for row in rows {
        contents.push_str(row);
        contents.push('\n');
    }
    fs::write(dir.join(name), contents).unwrap();
}
