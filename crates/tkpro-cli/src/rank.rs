//! `rank`: filter the catalog into a cohort and print it by GMV.

use tkpro_core::{AppConfig, Cohort, CohortFilter, PriceRange, RankedProduct};

use crate::catalog::{load_catalog, CatalogArgs};
use crate::fmt_title;

/// Cohort bounds given on the command line. Unset bounds fall back to the
/// catalog's price range and the configured sales floor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct RankBounds {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_sales: Option<f64>,
}

impl RankBounds {
    fn filter(self, catalog_range: Option<PriceRange>, default_min_sales: f64) -> CohortFilter {
        let base = catalog_range.unwrap_or_default();
        CohortFilter {
            price_range: PriceRange::new(
                self.min_price.unwrap_or(base.min),
                self.max_price.unwrap_or(base.max),
            ),
            min_sales: self.min_sales.unwrap_or(default_min_sales),
        }
    }
}

fn format_row(rank: usize, ranked: &RankedProduct<'_>) -> String {
    let product = ranked.product;
    format!(
        "{:<5}{:<8}{:<5}{:<12}{:>10.2}{:>11.0}{:>14.2}  {}",
        rank,
        product.id,
        ranked.score.grade.to_string(),
        ranked.score.label.unwrap_or("\u{2014}"),
        product.price,
        product.sales,
        product.gmv,
        fmt_title(&product.title, 40)
    )
}

/// One-line summary of the cohort's three highest-GMV products.
fn leaders_line(cohort: &Cohort<'_>) -> String {
    let names: Vec<String> = cohort
        .top_by_gmv(3)
        .iter()
        .map(|product| fmt_title(&product.title, 24))
        .collect();
    format!("top 3 by GMV: {}", names.join(" \u{b7} "))
}

/// Print the cohort ranked by descending GMV.
///
/// Scores are relative to the cohort's own maxima, so the same product can
/// grade differently under different bounds.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded.
pub(crate) fn run_rank(
    config: &AppConfig,
    source: &CatalogArgs,
    bounds: RankBounds,
    limit: usize,
) -> anyhow::Result<()> {
    let catalog = load_catalog(source)?;
    let filter = bounds.filter(catalog.price_range, config.min_sales);
    let cohort = filter.apply(&catalog.products);

    println!(
        "cohort: {} of {} products  price {:.2}..={:.2}  sales >= {}",
        cohort.len(),
        catalog.products.len(),
        filter.price_range.min,
        filter.price_range.max,
        filter.min_sales
    );
    if cohort.is_empty() {
        println!("no products match; widen the price range or lower --min-sales");
        return Ok(());
    }
    println!(
        "total GMV {:.2}  average price {:.2}",
        cohort.total_gmv(),
        cohort.average_price()
    );
    println!("{}", leaders_line(&cohort));
    println!();

    let header = format!(
        "{:<5}{:<8}{:<5}{:<12}{:>10}{:>11}{:>14}  TITLE",
        "#", "ID", "GRD", "LABEL", "PRICE", "SALES", "GMV"
    );
    println!("{header}");
    for (idx, ranked) in cohort.ranked().iter().take(limit).enumerate() {
        println!("{}", format_row(idx + 1, ranked));
    }

    Ok(())
}
