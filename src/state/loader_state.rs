//! Loader State
//!
//! The accumulated prediction result set for the current dataset selection
//! and mode. Only `LoaderController` mutates it; everything else reads
//! snapshots.

use std::sync::Arc;

use crate::domain::{ColumnName, DatasetKey, LoadMode, Row};
use crate::state::token::RequestToken;

/// Result-set state for one loader
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderState {
    /// Browse or search
    mode: LoadMode,
    /// Search term (empty in browse mode)
    query: Arc<str>,
    /// Selected file and sheet; `None` keeps the loader inert
    dataset: Option<DatasetKey>,
    /// Rows of every applied page, in page order
    rows: Arc<Vec<Row>>,
    /// Schema from the first non-empty page
    columns: Arc<Vec<ColumnName>>,
    /// Last applied page (0 before the first page lands)
    current_page: u32,
    /// Page count reported by the server
    total_pages: u32,
    /// An incremental page is in flight
    is_loading: bool,
    /// Page 1 is in flight
    is_initial_loading: bool,
    /// Generation the state belongs to
    token: RequestToken,
    /// Rows per page
    page_size: u32,
    /// Why page 1 failed, until the next reset
    last_error: Option<Arc<str>>,
}

impl LoaderState {
    /// Inert state with no dataset selected
    pub fn new(page_size: u32) -> Self {
        Self {
            mode: LoadMode::Browse,
            query: Arc::from(""),
            dataset: None,
            rows: Arc::new(Vec::new()),
            columns: Arc::new(Vec::new()),
            current_page: 0,
            total_pages: 1,
            is_loading: false,
            is_initial_loading: false,
            token: RequestToken::default(),
            page_size: page_size.max(1),
            last_error: None,
        }
    }

    // ==================== Getters ====================

    pub fn mode(&self) -> LoadMode {
        self.mode
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn dataset(&self) -> Option<&DatasetKey> {
        self.dataset.as_ref()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn columns(&self) -> &[ColumnName] {
        &self.columns
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_initial_loading(&self) -> bool {
        self.is_initial_loading
    }

    pub fn token(&self) -> RequestToken {
        self.token
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// No complete dataset selection; nothing is fetched or rendered
    pub fn is_inert(&self) -> bool {
        self.dataset.is_none()
    }

    /// Either tier of fetch is outstanding
    pub fn is_busy(&self) -> bool {
        self.is_loading || self.is_initial_loading
    }

    /// Pages beyond the last applied one remain on the server
    pub fn has_more(&self) -> bool {
        self.current_page < self.total_pages
    }

    /// A `request_next_page` call would issue a fetch
    ///
    /// Page 1 belongs to the initial load, so incremental loading only starts
    /// once it has been applied.
    pub fn can_request_more(&self) -> bool {
        !self.is_inert() && !self.is_busy() && self.current_page >= 1 && self.has_more()
    }

    /// Settled with nothing to show ("No predictions found")
    pub fn is_empty_result(&self) -> bool {
        !self.is_inert() && !self.is_initial_loading && self.rows.is_empty()
    }

    // ==================== Mutations (LoaderController only) ====================

    /// Start a new generation: clear the result set and mark page 1 in flight
    pub(crate) fn begin_generation(
        &mut self,
        token: RequestToken,
        dataset: Option<DatasetKey>,
        mode: LoadMode,
        query: Arc<str>,
    ) {
        self.is_initial_loading = dataset.is_some();
        self.token = token;
        self.dataset = dataset;
        self.mode = mode;
        self.query = query;
        self.rows = Arc::new(Vec::new());
        self.columns = Arc::new(Vec::new());
        self.current_page = 0;
        self.total_pages = 1;
        self.is_loading = false;
        self.last_error = None;
    }

    pub(crate) fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    pub(crate) fn set_initial_loading(&mut self, loading: bool) {
        self.is_initial_loading = loading;
    }

    /// Append one page worth of rows and advance the page counter
    pub(crate) fn apply_page(
        &mut self,
        page: u32,
        rows: Vec<Row>,
        columns: Vec<ColumnName>,
        total_pages: u32,
    ) {
        if self.columns.is_empty() && !rows.is_empty() {
            self.columns = Arc::new(columns);
        }
        if !rows.is_empty() {
            Arc::make_mut(&mut self.rows).extend(rows);
        }
        self.total_pages = total_pages.max(page);
        self.current_page = page;
    }

    /// Page 1 failed: show an empty result and remember why
    pub(crate) fn fail_initial(&mut self, message: Arc<str>) {
        self.rows = Arc::new(Vec::new());
        self.columns = Arc::new(Vec::new());
        self.current_page = 0;
        self.total_pages = 1;
        self.last_error = Some(message);
    }
}

impl Default for LoaderState {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CellValue;
    use crate::state::token::TokenGenerator;

    fn row(id: &str) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), CellValue::from(id));
        row
    }

    #[test]
    fn test_new_state_is_inert() {
        let state = LoaderState::new(20);
        assert!(state.is_inert());
        assert!(state.rows().is_empty());
        assert_eq!(state.total_pages(), 1);
        assert_eq!(state.current_page(), 0);
        assert!(!state.can_request_more());
        assert!(!state.is_empty_result());
    }

    #[test]
    fn test_columns_set_once_per_generation() {
        let mut state = LoaderState::new(20);
        let key = DatasetKey::new("sales.xlsx", "Q1").ok();
        state.begin_generation(TokenGenerator::new().mint(), key, LoadMode::Browse, Arc::from(""));

        state.apply_page(1, vec![row("1")], vec!["id".into()], 2);
        state.apply_page(2, vec![row("2")], vec!["other".into()], 2);

        assert_eq!(state.columns(), ["id"]);
        assert_eq!(state.rows().len(), 2);
        assert_eq!(state.current_page(), 2);
        assert!(!state.has_more());
    }

    #[test]
    fn test_snapshot_is_not_affected_by_later_pages() {
        let mut state = LoaderState::new(20);
        let key = DatasetKey::new("sales.xlsx", "Q1").ok();
        state.begin_generation(TokenGenerator::new().mint(), key, LoadMode::Browse, Arc::from(""));
        state.apply_page(1, vec![row("1")], vec!["id".into()], 3);

        let snapshot = state.clone();
        state.apply_page(2, vec![row("2")], vec!["id".into()], 3);

        assert_eq!(snapshot.rows().len(), 1);
        assert_eq!(state.rows().len(), 2);
    }
}
