//! Spreadsheet import for tkpro.
//!
//! Reads CSV and workbook exports into a [`PendingImport`], infers which
//! columns hold title/price/sales/image, and commits the rows into a product
//! catalog with forgiving numeric parsing.

pub mod error;
pub mod mapping;
pub mod normalize;
pub mod parse;
pub mod pending;
pub mod reader;

pub use error::ImportError;
pub use mapping::{ColumnMapping, MappingField};
pub use normalize::{catalog_fingerprint, commit, CommittedCatalog};
pub use parse::{normalize_numeric, parse_numeric};
pub use pending::PendingImport;
pub use reader::{read_csv_str, read_path, RawTable};
