use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Raw source fields of one imported row, keyed by header name.
pub type RawRecord = BTreeMap<String, CellValue>;

/// A single spreadsheet cell as it came out of the import file.
///
/// CSV cells are always [`CellValue::Text`]; workbook cells keep their typed
/// value so numeric columns do not round-trip through a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Returns `true` for [`CellValue::Empty`] and for blank text.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Bool(_) | CellValue::Number(_) => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_owned())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

/// A product in the session catalog, normalized from one import row.
///
/// Products are immutable once committed; a re-import replaces the whole list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique within one committed catalog, e.g. `"p-0"`.
    pub id: String,
    pub title: String,
    pub price: f64,
    pub sales: f64,
    /// Gross merchandise value: `price * sales`.
    pub gmv: f64,
    pub image_url: Option<String>,
    pub original_data: RawRecord,
}

impl Product {
    /// Builds a product and derives its GMV.
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>, price: f64, sales: f64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            price,
            sales,
            gmv: price * sales,
            image_url: None,
            original_data: RawRecord::new(),
        }
    }

    #[must_use]
    pub fn with_image_url(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url;
        self
    }

    #[must_use]
    pub fn with_original_data(mut self, original_data: RawRecord) -> Self {
        self.original_data = original_data;
        self
    }
}

/// Inclusive price bounds used for cohort filtering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl Default for PriceRange {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 500.0,
        }
    }
}

impl PriceRange {
    #[must_use]
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// `[floor(min price), ceil(max price)]` across `products`.
    ///
    /// Returns `None` for an empty slice.
    #[must_use]
    pub fn spanning(products: &[Product]) -> Option<Self> {
        let mut prices = products.iter().map(|p| p.price);
        let first = prices.next()?;
        let (min, max) = prices.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
        Some(Self {
            min: min.floor(),
            max: max.ceil(),
        })
    }

    #[must_use]
    pub fn contains(&self, price: f64) -> bool {
        price >= self.min && price <= self.max
    }
}

/// The catalog shown before any import has been committed.
#[must_use]
pub fn demo_catalog() -> Vec<Product> {
    let seed = |id: &str, title: &str, price: f64, sales: f64| {
        Product::new(id, title, price, sales)
            .with_image_url(Some(format!("https://picsum.photos/200/200?random={id}")))
    };
    vec![
        seed("1", "星空投影灯 (Galaxy Projector)", 24.99, 12_500.0),
        seed("2", "收腹塑身衣 (Shapewear)", 18.50, 8_900.0),
        seed("3", "磁吸充电宝 (Magnetic Power Bank)", 12.99, 5_400.0),
        seed("4", "便携热敏打印机 (Mini Printer)", 29.99, 3_200.0),
        seed("5", "落日氛围灯 (Sunset Lamp)", 15.00, 2_100.0),
    ]
}
