//! Cohort-relative marketability scoring.
//!
//! Sales volume is weighted above revenue: the ranking favors demonstrated
//! demand over raw GMV. Scores are relative to the maxima of the cohort the
//! product is displayed in, so they must be recomputed whenever the cohort
//! changes.

use std::fmt;

use serde::Serialize;

use crate::products::Product;

const SALES_WEIGHT: f64 = 0.6;
const GMV_WEIGHT: f64 = 0.4;

/// Discrete grade derived from the composite score, ordered low to high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ScoreGrade {
    C,
    B,
    A,
    S,
    #[serde(rename = "S+")]
    SPlus,
}

impl fmt::Display for ScoreGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScoreGrade::SPlus => "S+",
            ScoreGrade::S => "S",
            ScoreGrade::A => "A",
            ScoreGrade::B => "B",
            ScoreGrade::C => "C",
        };
        f.write_str(s)
    }
}

/// Presentation of a product's grade. Derived on demand, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisScore {
    pub grade: ScoreGrade,
    pub text: &'static str,
    /// Styling hint for front ends.
    pub color_class: &'static str,
    pub label: Option<&'static str>,
}

impl AnalysisScore {
    const fn new(
        grade: ScoreGrade,
        text: &'static str,
        color_class: &'static str,
        label: &'static str,
    ) -> Self {
        Self {
            grade,
            text,
            color_class,
            label: Some(label),
        }
    }
}

const NEW: AnalysisScore = AnalysisScore::new(ScoreGrade::C, "🌱 起步期", "bg-slate-100 text-slate-500", "New");
const TOP_VIRAL: AnalysisScore = AnalysisScore::new(
    ScoreGrade::SPlus,
    "👑 头部爆款",
    "bg-gradient-to-r from-amber-100 to-orange-100 text-orange-800 border-orange-200",
    "Top Viral",
);
const HIGH_VOLUME: AnalysisScore = AnalysisScore::new(
    ScoreGrade::S,
    "🔥 流量爆款",
    "bg-rose-50 text-rose-600 border-rose-100",
    "High Volume",
);
const HIGH_TICKET: AnalysisScore = AnalysisScore::new(
    ScoreGrade::S,
    "💰 高利爆款",
    "bg-emerald-50 text-emerald-600 border-emerald-100",
    "High Ticket",
);
const TRENDING: AnalysisScore = AnalysisScore::new(
    ScoreGrade::A,
    "🚀 潜力股",
    "bg-indigo-50 text-indigo-600 border-indigo-100",
    "Trending",
);
const STABLE: AnalysisScore = AnalysisScore::new(
    ScoreGrade::B,
    "⚖️ 稳健款",
    "bg-blue-50 text-blue-500 border-blue-100",
    "Stable",
);
const LOW: AnalysisScore = AnalysisScore::new(
    ScoreGrade::C,
    "💤 滞销/新品",
    "bg-slate-50 text-slate-400 border-slate-100",
    "Low",
);

/// Weighted blend of normalized sales and normalized GMV.
///
/// Returns `None` when either cohort maximum is zero (empty or all-zero
/// cohort), in which case no meaningful ratio exists.
#[must_use]
pub fn composite_score(product: &Product, max_gmv: f64, max_sales: f64) -> Option<f64> {
    if max_gmv == 0.0 || max_sales == 0.0 {
        return None;
    }
    let sales_score = product.sales / max_sales;
    let gmv_score = product.gmv / max_gmv;
    Some(SALES_WEIGHT * sales_score + GMV_WEIGHT * gmv_score)
}

/// Grades `product` against the cohort maxima.
///
/// Thresholds are evaluated high to low and the first match wins. An S grade
/// is split by whether sales alone exceed 70% of the cohort leader, which
/// separates traffic-driven winners from margin-driven ones.
#[must_use]
pub fn score(product: &Product, max_gmv: f64, max_sales: f64) -> AnalysisScore {
    let Some(composite) = composite_score(product, max_gmv, max_sales) else {
        return NEW;
    };

    if composite >= 0.8 {
        TOP_VIRAL
    } else if composite >= 0.5 {
        if product.sales / max_sales > 0.7 {
            HIGH_VOLUME
        } else {
            HIGH_TICKET
        }
    } else if composite >= 0.25 {
        TRENDING
    } else if composite >= 0.1 {
        STABLE
    } else {
        LOW
    }
}
