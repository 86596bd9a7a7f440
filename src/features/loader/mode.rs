//! Mode Controller
//!
//! Decides when browse/search transitions happen. Keystrokes only edit a
//! draft; a reset is requested on an explicit submit, on clearing the search
//! box, or on a dataset change (which always returns to browsing).

use std::sync::Arc;

use crate::domain::{DatasetKey, LoadMode};

/// Browse/search state machine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ModeState {
    #[default]
    Browse,
    Searching { term: Arc<str> },
}

/// Arguments for `LoaderController::reset`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetRequest {
    pub dataset: Option<DatasetKey>,
    pub mode: LoadMode,
    pub query: Arc<str>,
}

/// Tracks the selection, the active mode and the search box draft
#[derive(Debug, Default)]
pub struct ModeController {
    state: ModeState,
    dataset: Option<DatasetKey>,
    draft: String,
}

impl ModeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ModeState {
        &self.state
    }

    /// Current search box text
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Reset arguments for the current selection and mode
    pub fn current(&self) -> ResetRequest {
        let (mode, query) = match &self.state {
            ModeState::Browse => (LoadMode::Browse, Arc::from("")),
            ModeState::Searching { term } => (LoadMode::Search, term.clone()),
        };
        ResetRequest {
            dataset: self.dataset.clone(),
            mode,
            query,
        }
    }

    /// A new dataset selection forces browse mode with an empty query
    ///
    /// Re-selecting the dataset already shown in browse mode is not a change.
    pub fn select_dataset(&mut self, dataset: Option<DatasetKey>) -> Option<ResetRequest> {
        if self.dataset == dataset && self.state == ModeState::Browse && self.draft.is_empty() {
            return None;
        }
        self.dataset = dataset;
        self.state = ModeState::Browse;
        self.draft.clear();
        Some(self.current())
    }

    /// Search box edited; only emptying it while searching changes mode
    pub fn edit_query(&mut self, text: &str) -> Option<ResetRequest> {
        self.draft = text.to_string();
        if text.trim().is_empty() {
            self.back_to_browse()
        } else {
            None
        }
    }

    /// Explicit submit of the search box
    ///
    /// A non-empty term always starts a new search generation, even when it
    /// repeats the active term.
    pub fn submit(&mut self, text: &str) -> Option<ResetRequest> {
        self.draft = text.to_string();
        let term = text.trim();
        if term.is_empty() {
            return self.back_to_browse();
        }
        self.state = ModeState::Searching {
            term: Arc::from(term),
        };
        Some(self.current())
    }

    /// Clear button on the search box
    pub fn clear(&mut self) -> Option<ResetRequest> {
        self.draft.clear();
        self.back_to_browse()
    }

    fn back_to_browse(&mut self) -> Option<ResetRequest> {
        match self.state {
            ModeState::Browse => None,
            ModeState::Searching { .. } => {
                self.state = ModeState::Browse;
                Some(self.current())
            }
        }
    }
}
