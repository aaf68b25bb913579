//! Commit of raw rows into a product catalog.

use sha2::{Digest, Sha256};
use tkpro_core::{CellValue, PriceRange, Product, RawRecord};

use crate::mapping::ColumnMapping;
use crate::parse::normalize_numeric;

const UNTITLED: &str = "Untitled";

/// Result of committing an import: the new catalog and the price bounds
/// downstream filtering should start from.
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedCatalog {
    pub products: Vec<Product>,
    /// `None` when nothing was committed.
    pub price_range: Option<PriceRange>,
}

impl CommittedCatalog {
    /// See [`catalog_fingerprint`].
    #[must_use]
    pub fn fingerprint(&self) -> String {
        catalog_fingerprint(&self.products)
    }
}

/// SHA-256 over each product's id, title, price and sales, hex-encoded.
///
/// Two catalogs with the same products in the same order share a
/// fingerprint, so results keyed by product id can be kept across a
/// re-import of unchanged data and invalidated otherwise.
#[must_use]
pub fn catalog_fingerprint(products: &[Product]) -> String {
    let mut hasher = Sha256::new();
    for p in products {
        hasher.update(p.id.as_bytes());
        hasher.update([0x1f]);
        hasher.update(p.title.as_bytes());
        hasher.update([0x1f]);
        hasher.update(p.price.to_bits().to_le_bytes());
        hasher.update(p.sales.to_bits().to_le_bytes());
        hasher.update([0x1e]);
    }
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Maps every row through `mapping`, preserving row order.
///
/// Ids are `p-{row index}`, unique within the commit. Price and sales go
/// through [`normalize_numeric`]; a blank or missing title becomes
/// `"Untitled"`.
#[must_use]
pub fn commit(rows: Vec<RawRecord>, mapping: &ColumnMapping) -> CommittedCatalog {
    let products: Vec<Product> = rows
        .into_iter()
        .enumerate()
        .map(|(idx, row)| product_from_row(idx, row, mapping))
        .collect();
    let price_range = PriceRange::spanning(&products);

    tracing::info!(
        products = products.len(),
        min_price = price_range.map(|r| r.min),
        max_price = price_range.map(|r| r.max),
        "committed import"
    );

    CommittedCatalog {
        products,
        price_range,
    }
}

fn product_from_row(idx: usize, row: RawRecord, mapping: &ColumnMapping) -> Product {
    let price = normalize_numeric(row.get(&mapping.price));
    let sales = normalize_numeric(row.get(&mapping.sales));

    let title = row
        .get(&mapping.title)
        .filter(|v| !v.is_blank())
        .map_or_else(|| UNTITLED.to_owned(), |v| v.to_string().trim().to_owned());

    let image_url = mapping
        .image
        .as_ref()
        .and_then(|col| row.get(col))
        .filter(|v| matches!(v, CellValue::Text(_)) && !v.is_blank())
        .map(|v| v.to_string().trim().to_owned());

    Product::new(format!("p-{idx}"), title, price, sales)
        .with_image_url(image_url)
        .with_original_data(row)
}
