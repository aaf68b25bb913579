//! Catalog loading shared by the `inspect`, `rank` and `batch` commands.
//!
//! A command either names an export file, which is read, mapped and
//! committed in one go, or falls back to the built-in demo catalog.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use clap::Args;
use tkpro_core::{demo_catalog, Product};
use tkpro_import::{CommittedCatalog, MappingField, PendingImport};

const MAPPING_FIELDS: [MappingField; 4] = [
    MappingField::Title,
    MappingField::Price,
    MappingField::Sales,
    MappingField::Image,
];

/// Where the catalog comes from and how its columns map to product fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct CatalogArgs {
    /// CSV or spreadsheet export; the demo catalog is used when omitted
    pub file: Option<PathBuf>,
    /// Column holding the product title
    #[arg(long)]
    pub title: Option<String>,
    /// Column holding the unit price
    #[arg(long)]
    pub price: Option<String>,
    /// Column holding the units sold
    #[arg(long)]
    pub sales: Option<String>,
    /// Column holding the product image URL
    #[arg(long, conflicts_with = "no_image")]
    pub image: Option<String>,
    /// Ignore any inferred image column
    #[arg(long)]
    pub no_image: bool,
}

impl CatalogArgs {
    /// Column overrides in the order they are applied.
    fn overrides(&self) -> Vec<(MappingField, Option<String>)> {
        let mut overrides = Vec::new();
        for (field, column) in [
            (MappingField::Title, &self.title),
            (MappingField::Price, &self.price),
            (MappingField::Sales, &self.sales),
            (MappingField::Image, &self.image),
        ] {
            if let Some(column) = column {
                overrides.push((field, Some(column.clone())));
            }
        }
        if self.no_image {
            overrides.push((MappingField::Image, None));
        }
        overrides
    }
}

/// Commits the catalog described by `args`.
///
/// # Errors
///
/// Returns an error if column flags are given without a file, the file
/// cannot be read, or an override names a column the file does not have.
pub(crate) fn load_catalog(args: &CatalogArgs) -> anyhow::Result<CommittedCatalog> {
    let overrides = args.overrides();

    let Some(path) = &args.file else {
        if !overrides.is_empty() {
            anyhow::bail!("column flags need an export FILE to map");
        }
        let products = demo_catalog();
        tracing::info!(count = products.len(), "using demo catalog");
        return Ok(CommittedCatalog {
            products,
            price_range: None,
        });
    };

    let mut pending = PendingImport::from_path(path)?;
    for (field, column) in overrides {
        pending.override_column(field, column)?;
    }
    Ok(pending.commit())
}

/// Picks the products named by `ids`, in the order given. Repeated ids are
/// kept once.
///
/// # Errors
///
/// Returns an error listing every id that is not in the catalog.
pub(crate) fn select_products(products: &[Product], ids: &[String]) -> anyhow::Result<Vec<Product>> {
    let mut seen = HashSet::new();
    let mut selected = Vec::new();
    let mut unknown = Vec::new();

    for id in ids.iter().map(|id| id.trim()).filter(|id| !id.is_empty()) {
        if !seen.insert(id) {
            continue;
        }
        match products.iter().find(|p| p.id == id) {
            Some(product) => selected.push(product.clone()),
            None => unknown.push(id),
        }
    }

    if !unknown.is_empty() {
        anyhow::bail!(
            "unknown product id(s): {}; run `tkpro rank` to list ids",
            unknown.join(", ")
        );
    }
    Ok(selected)
}

/// Print an export's headers, row count and inferred column mapping.
///
/// # Errors
///
/// Returns an error if the file cannot be read or has no data rows.
pub(crate) fn run_inspect(path: &Path) -> anyhow::Result<()> {
    let pending = PendingImport::from_path(path)?;

    println!("file:    {}", path.display());
    println!("rows:    {}", pending.row_count());
    println!("columns: {}", pending.headers().join(", "));
    println!();
    println!("{:<8}COLUMN", "FIELD");
    for field in MAPPING_FIELDS {
        let column = pending.mapping().column(field).unwrap_or("\u{2014}");
        println!("{:<8}{column}", field.name());
    }

    Ok(())
}
