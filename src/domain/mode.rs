//! Mode - Browse or filtered search retrieval

use std::fmt;

/// Which endpoint family serves the result set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LoadMode {
    /// Sequential pages of the whole sheet
    #[default]
    Browse,
    /// Pages of the rows matching a search term
    Search,
}

impl LoadMode {
    pub fn label(&self) -> &'static str {
        match self {
            LoadMode::Browse => "browse",
            LoadMode::Search => "search",
        }
    }
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
