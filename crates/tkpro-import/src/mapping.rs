//! Heuristic column inference.
//!
//! Header names are matched case-insensitively by substring against a small
//! per-field keyword list covering common English and Chinese export
//! headers. The caller can override any inferred column before committing.

use std::fmt;

/// Which product field a column feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingField {
    Title,
    Price,
    Sales,
    Image,
}

impl MappingField {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            MappingField::Title => "title",
            MappingField::Price => "price",
            MappingField::Sales => "sales",
            MappingField::Image => "image",
        }
    }

    fn keywords(self) -> &'static [&'static str] {
        match self {
            MappingField::Title => &["title", "name", "名称", "标题", "商品"],
            MappingField::Price => &["price", "价格", "单价"],
            MappingField::Sales => &["sales", "sold", "销量", "订单"],
            MappingField::Image => &["img", "pic", "cover", "图"],
        }
    }

    /// First header containing one of this field's keywords.
    fn find_in(self, headers: &[String]) -> Option<&str> {
        headers
            .iter()
            .find(|header| {
                let lower = header.to_lowercase();
                self.keywords().iter().any(|kw| lower.contains(kw))
            })
            .map(String::as_str)
    }
}

impl fmt::Display for MappingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which raw header feeds each product field.
///
/// An empty string means "no column"; this only happens for an import
/// without headers. The image column is optional.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnMapping {
    pub title: String,
    pub price: String,
    pub sales: String,
    pub image: Option<String>,
}

impl ColumnMapping {
    /// Infers a mapping from an import's header row.
    ///
    /// Without a keyword match, title falls back to the first header, price
    /// to the second and sales to the third (each to the first header when
    /// the row is too short). Image has no fallback.
    #[must_use]
    pub fn infer(headers: &[String]) -> Self {
        let nth_or_first = |n: usize| -> String {
            headers
                .get(n)
                .or_else(|| headers.first())
                .cloned()
                .unwrap_or_default()
        };

        let pick = |field: MappingField, fallback: usize| -> String {
            field
                .find_in(headers)
                .map_or_else(|| nth_or_first(fallback), str::to_owned)
        };

        Self {
            title: pick(MappingField::Title, 0),
            price: pick(MappingField::Price, 1),
            sales: pick(MappingField::Sales, 2),
            image: MappingField::Image.find_in(headers).map(str::to_owned),
        }
    }

    /// The column currently assigned to `field`, if any.
    #[must_use]
    pub fn column(&self, field: MappingField) -> Option<&str> {
        let column = match field {
            MappingField::Title => self.title.as_str(),
            MappingField::Price => self.price.as_str(),
            MappingField::Sales => self.sales.as_str(),
            MappingField::Image => self.image.as_deref()?,
        };
        (!column.is_empty()).then_some(column)
    }

    /// Assigns `column` to `field`. `None` clears the field.
    pub fn set(&mut self, field: MappingField, column: Option<String>) {
        match field {
            MappingField::Title => self.title = column.unwrap_or_default(),
            MappingField::Price => self.price = column.unwrap_or_default(),
            MappingField::Sales => self.sales = column.unwrap_or_default(),
            MappingField::Image => self.image = column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn infers_chinese_headers() {
        let mapping = ColumnMapping::infer(&headers(&["商品名称", "单价", "销量", "图片链接"]));
        assert_eq!(mapping.title, "商品名称");
        assert_eq!(mapping.price, "单价");
        assert_eq!(mapping.sales, "销量");
        assert_eq!(mapping.image.as_deref(), Some("图片链接"));
    }

    #[test]
    fn infers_english_headers_case_insensitively() {
        let mapping = ColumnMapping::infer(&headers(&[
            "SKU",
            "Product Name",
            "Units Sold",
            "Unit Price",
            "Cover URL",
        ]));
        assert_eq!(mapping.title, "Product Name");
        assert_eq!(mapping.price, "Unit Price");
        assert_eq!(mapping.sales, "Units Sold");
        assert_eq!(mapping.image.as_deref(), Some("Cover URL"));
    }

    #[test]
    fn first_matching_header_wins() {
        let mapping = ColumnMapping::infer(&headers(&["Name", "Title", "price", "sales"]));
        assert_eq!(mapping.title, "Name");
    }

    #[test]
    fn positional_fallback_without_keywords() {
        let mapping = ColumnMapping::infer(&headers(&["a", "b", "c", "d"]));
        assert_eq!(mapping.title, "a");
        assert_eq!(mapping.price, "b");
        assert_eq!(mapping.sales, "c");
        assert!(mapping.image.is_none());
    }

    #[test]
    fn short_header_row_falls_back_to_first() {
        let mapping = ColumnMapping::infer(&headers(&["only"]));
        assert_eq!(mapping.title, "only");
        assert_eq!(mapping.price, "only");
        assert_eq!(mapping.sales, "only");
    }

    #[test]
    fn empty_header_row_maps_nothing() {
        let mapping = ColumnMapping::infer(&[]);
        assert_eq!(mapping, ColumnMapping::default());
        assert!(mapping.column(MappingField::Title).is_none());
    }

    #[test]
    fn set_overrides_and_clears() {
        let mut mapping = ColumnMapping::infer(&headers(&["商品名称", "单价", "销量", "图片链接"]));
        mapping.set(MappingField::Price, Some("销量".into()));
        mapping.set(MappingField::Image, None);
        assert_eq!(mapping.column(MappingField::Price), Some("销量"));
        assert!(mapping.column(MappingField::Image).is_none());
    }
}
