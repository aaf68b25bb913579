use std::path::Path;

use crate::error::ImportError;
use crate::mapping::{ColumnMapping, MappingField};
use crate::normalize::{commit, CommittedCatalog};
use crate::reader::{read_path, RawTable};

/// A read but not yet committed import.
///
/// Holds the raw rows and the current column mapping so the caller can
/// review and override the inferred columns. Committing consumes it; a
/// dropped `PendingImport` leaves the live catalog untouched.
#[derive(Debug, Clone)]
pub struct PendingImport {
    table: RawTable,
    mapping: ColumnMapping,
}

impl PendingImport {
    /// Reads `path` and infers a mapping from its header row.
    ///
    /// # Errors
    ///
    /// Propagates reader errors and returns [`ImportError::Empty`] when the
    /// file has no data rows.
    pub fn from_path(path: &Path) -> Result<Self, ImportError> {
        let table = read_path(path)?;
        tracing::info!(
            path = %path.display(),
            rows = table.rows.len(),
            columns = table.headers.len(),
            "read import file"
        );
        Self::from_table(table)
    }

    /// # Errors
    ///
    /// Returns [`ImportError::Empty`] when `table` has no rows.
    pub fn from_table(table: RawTable) -> Result<Self, ImportError> {
        if table.is_empty() {
            return Err(ImportError::Empty);
        }
        let mapping = ColumnMapping::infer(&table.headers);
        tracing::debug!(?mapping, "inferred column mapping");
        Ok(Self { table, mapping })
    }

    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.table.headers
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.table.rows.len()
    }

    #[must_use]
    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    /// Points `field` at `column`. Only the image field may be cleared.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::UnknownColumn`] if `column` is not one of this
    /// import's headers, or if `None` is given for a required field.
    pub fn override_column(
        &mut self,
        field: MappingField,
        column: Option<String>,
    ) -> Result<(), ImportError> {
        match &column {
            Some(name) if !self.table.headers.iter().any(|h| h == name) => {
                return Err(ImportError::UnknownColumn {
                    field: field.name(),
                    column: name.clone(),
                });
            }
            None if field != MappingField::Image => {
                return Err(ImportError::UnknownColumn {
                    field: field.name(),
                    column: String::new(),
                });
            }
            _ => {}
        }
        self.mapping.set(field, column);
        Ok(())
    }

    /// Normalizes every row with the current mapping.
    #[must_use]
    pub fn commit(self) -> CommittedCatalog {
        commit(self.table.rows, &self.mapping)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::reader::read_csv_str;

    fn pending(csv: &str) -> PendingImport {
        PendingImport::from_table(read_csv_str(csv).unwrap()).unwrap()
    }

    #[test]
    fn header_only_import_is_empty() {
        let err = PendingImport::from_table(read_csv_str("title,price\n").unwrap()).unwrap_err();
        assert!(matches!(err, ImportError::Empty));
    }

    #[test]
    fn commit_uses_inferred_mapping() {
        let import = pending("商品名称,单价,销量\n灯,\"1,200\",2.5k\n");
        assert_eq!(import.row_count(), 1);
        let catalog = import.commit();
        let product = &catalog.products[0];
        assert_eq!(product.title, "灯");
        assert!((product.price - 1200.0).abs() < f64::EPSILON);
        assert!((product.sales - 2500.0).abs() < f64::EPSILON);
        assert!((product.gmv - 3_000_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn override_redirects_a_field() {
        let mut import = pending("name,list price,promo,sold\nLamp,30,20,5\n");
        assert_eq!(import.mapping().price, "list price");
        import
            .override_column(MappingField::Price, Some("promo".into()))
            .unwrap();
        let catalog = import.commit();
        assert!((catalog.products[0].price - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn override_rejects_unknown_column() {
        let mut import = pending("name,price,sold\nLamp,3,5\n");
        let err = import
            .override_column(MappingField::Sales, Some("orders".into()))
            .unwrap_err();
        assert!(matches!(
            err,
            ImportError::UnknownColumn { field: "sales", ref column } if column == "orders"
        ));
        assert_eq!(import.mapping().sales, "sold");
    }

    #[test]
    fn only_image_can_be_cleared() {
        let mut import = pending("name,price,sold,cover\nLamp,3,5,https://x/y.png\n");
        assert!(import.override_column(MappingField::Title, None).is_err());
        import.override_column(MappingField::Image, None).unwrap();
        assert!(import.commit().products[0].image_url.is_none());
    }

    #[test]
    fn from_path_reads_csv_file() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(file, "title,price,sales\nA,10,2\nB,5,4\n").unwrap();
        let import = PendingImport::from_path(file.path()).unwrap();
        assert_eq!(import.headers(), ["title", "price", "sales"]);
        let catalog = import.commit();
        assert_eq!(catalog.products.len(), 2);
    }
}
