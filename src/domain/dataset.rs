//! Dataset - File and sheet selection

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Identifies one sheet of one uploaded file on the prediction service
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct DatasetKey {
    file: Arc<str>,
    sheet: Arc<str>,
}

impl DatasetKey {
    /// Build a key; both parts must be non-blank
    pub fn new(file: impl Into<Arc<str>>, sheet: impl Into<Arc<str>>) -> Result<Self> {
        let file = file.into();
        let sheet = sheet.into();

        if file.trim().is_empty() {
            return Err(Error::Invalid {
                message: "dataset file must not be empty".to_string(),
            });
        }
        if sheet.trim().is_empty() {
            return Err(Error::Invalid {
                message: format!("sheet for {file} must not be empty"),
            });
        }

        Ok(Self { file, sheet })
    }

    /// Build a key from a possibly incomplete UI selection
    ///
    /// Returns `None` unless both a file and a sheet are chosen; the loader
    /// stays inert for an incomplete selection.
    pub fn from_selection(file: Option<&str>, sheet: Option<&str>) -> Option<Self> {
        match (file, sheet) {
            (Some(file), Some(sheet)) => Self::new(file, sheet).ok(),
            _ => None,
        }
    }

    /// Uploaded file name (e.g. "sales.xlsx")
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Sheet name inside the file (e.g. "Q1")
    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    /// File name without its extension
    pub fn file_stem(&self) -> &str {
        match self.file.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.file,
        }
    }
}

impl fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.file, self.sheet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_file_and_sheet() {
        assert!(DatasetKey::new("sales.xlsx", "Q1").is_ok());
        assert!(DatasetKey::new("", "Q1").is_err());
        assert!(DatasetKey::new("sales.xlsx", "  ").is_err());
    }

    #[test]
    fn test_from_selection() {
        assert!(DatasetKey::from_selection(Some("sales.xlsx"), None).is_none());
        assert!(DatasetKey::from_selection(None, Some("Q1")).is_none());

        let key = DatasetKey::from_selection(Some("sales.xlsx"), Some("Q1")).expect("key");
        assert_eq!(key.to_string(), "sales.xlsx/Q1");
    }

    #[test]
    fn test_file_stem() {
        let key = DatasetKey::new("sales.2024.xlsx", "Q1").expect("key");
        assert_eq!(key.file_stem(), "sales.2024");

        let key = DatasetKey::new("plain", "Q1").expect("key");
        assert_eq!(key.file_stem(), "plain");

        let key = DatasetKey::new(".hidden", "Q1").expect("key");
        assert_eq!(key.file_stem(), ".hidden");
    }
}
