//! Page - One server-returned batch of prediction rows

use std::fmt;

use hashlink::LinkedHashMap;
use serde::{Deserialize, Serialize};

/// Name of a result column
pub type ColumnName = String;

/// A single cell of a prediction row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Null,
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

/// Ordered mapping from column name to value; key order follows the server
pub type Row = LinkedHashMap<ColumnName, CellValue>;

/// One page of prediction rows, immutable once received
#[derive(Debug, Clone, PartialEq)]
pub struct ResultPage {
    rows: Vec<Row>,
    columns: Vec<ColumnName>,
    page_number: u32,
    total_pages: u32,
}

impl ResultPage {
    /// Build a page; page numbers are 1-based and total pages is at least one
    pub fn new(
        rows: Vec<Row>,
        columns: Vec<ColumnName>,
        page_number: u32,
        total_pages: u32,
    ) -> Self {
        Self {
            rows,
            columns,
            page_number: page_number.max(1),
            total_pages: total_pages.max(1),
        }
    }

    /// Page with no rows, used when a body carried nothing usable
    pub fn empty(page_number: u32) -> Self {
        Self::new(Vec::new(), Vec::new(), page_number, 1)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn columns(&self) -> &[ColumnName] {
        &self.columns
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Consume the page, yielding its rows and schema
    pub fn into_parts(self) -> (Vec<Row>, Vec<ColumnName>) {
        (self.rows, self.columns)
    }
}

/// Wire shape shared by the browse and search endpoints
#[derive(Debug, Default, Deserialize)]
pub(crate) struct PageBody {
    #[serde(default)]
    pub preview: Vec<Row>,
    #[serde(default)]
    pub columns: Option<Vec<ColumnName>>,
    #[serde(default)]
    pub total_pages: Option<u32>,
}

impl PageBody {
    /// Convert into a page, deriving the schema from the first row when absent
    pub(crate) fn into_page(self, page_number: u32) -> ResultPage {
        let columns = match self.columns {
            Some(columns) => columns,
            None => self
                .preview
                .first()
                .map(|row| row.keys().cloned().collect())
                .unwrap_or_default(),
        };
        ResultPage::new(
            self.preview,
            columns,
            page_number,
            self.total_pages.unwrap_or(1),
        )
    }
}
