//! Cohort selection and cohort-relative aggregates.

use serde::Serialize;

use crate::products::{PriceRange, Product};
use crate::scoring::{score, AnalysisScore};

/// Default sales floor applied before ranking.
pub const DEFAULT_MIN_SALES: f64 = 100.0;

/// Filter that turns a catalog into the cohort being ranked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CohortFilter {
    pub price_range: PriceRange,
    pub min_sales: f64,
}

impl Default for CohortFilter {
    fn default() -> Self {
        Self {
            price_range: PriceRange::default(),
            min_sales: DEFAULT_MIN_SALES,
        }
    }
}

impl CohortFilter {
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        self.price_range.contains(product.price) && product.sales >= self.min_sales
    }

    /// Selects the matching products, preserving catalog order.
    #[must_use]
    pub fn apply<'a>(&self, catalog: &'a [Product]) -> Cohort<'a> {
        Cohort::new(catalog.iter().filter(|p| self.matches(p)).collect())
    }
}

/// A product paired with its cohort-relative score.
#[derive(Debug, Clone, Serialize)]
pub struct RankedProduct<'a> {
    pub product: &'a Product,
    pub score: AnalysisScore,
}

/// The filtered product set scores are computed against.
#[derive(Debug, Clone)]
pub struct Cohort<'a> {
    members: Vec<&'a Product>,
    max_gmv: f64,
    max_sales: f64,
}

impl<'a> Cohort<'a> {
    #[must_use]
    pub fn new(members: Vec<&'a Product>) -> Self {
        let max_gmv = members.iter().map(|p| p.gmv).fold(0.0, f64::max);
        let max_sales = members.iter().map(|p| p.sales).fold(0.0, f64::max);
        Self {
            members,
            max_gmv,
            max_sales,
        }
    }

    /// Uses every product in `catalog` as the cohort.
    #[must_use]
    pub fn all(catalog: &'a [Product]) -> Self {
        Self::new(catalog.iter().collect())
    }

    #[must_use]
    pub fn members(&self) -> &[&'a Product] {
        &self.members
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Largest GMV in the cohort, `0.0` when empty.
    #[must_use]
    pub fn max_gmv(&self) -> f64 {
        self.max_gmv
    }

    /// Largest sales count in the cohort, `0.0` when empty.
    #[must_use]
    pub fn max_sales(&self) -> f64 {
        self.max_sales
    }

    #[must_use]
    pub fn total_gmv(&self) -> f64 {
        self.members.iter().map(|p| p.gmv).sum()
    }

    #[must_use]
    pub fn average_price(&self) -> f64 {
        if self.members.is_empty() {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let denom = self.members.len() as f64;
        self.members.iter().map(|p| p.price).sum::<f64>() / denom
    }

    #[must_use]
    pub fn score_of(&self, product: &Product) -> AnalysisScore {
        score(product, self.max_gmv, self.max_sales)
    }

    /// Members sorted by descending GMV with scores attached.
    #[must_use]
    pub fn ranked(&self) -> Vec<RankedProduct<'a>> {
        let mut sorted = self.members.clone();
        sorted.sort_by(|a, b| b.gmv.total_cmp(&a.gmv));
        sorted
            .into_iter()
            .map(|product| RankedProduct {
                product,
                score: self.score_of(product),
            })
            .collect()
    }

    /// The `n` highest-GMV members.
    #[must_use]
    pub fn top_by_gmv(&self, n: usize) -> Vec<&'a Product> {
        self.ranked().into_iter().take(n).map(|r| r.product).collect()
    }
}
