//! LoaderEvent - Loader Event Enum
//!
//! Events the loader sends to the consuming view. The view polls them from
//! a crossbeam channel between renders.

use std::sync::Arc;

use crate::domain::{DatasetKey, LoadMode};
use crate::state::RequestToken;

/// Loader -> view notifications
#[derive(Debug, Clone, PartialEq)]
pub enum LoaderEvent {
    /// A new generation started; previous rows are gone
    Reset {
        token: RequestToken,
        dataset: Option<DatasetKey>,
        mode: LoadMode,
    },

    /// A page was merged into the result set
    PageApplied {
        token: RequestToken,
        page: u32,
        rows: usize,
        total_pages: u32,
    },

    /// A response from a superseded generation arrived and was dropped
    StaleDiscarded { token: RequestToken, page: u32 },

    /// An incremental page failed; scrolling again retries it
    PageAbandoned {
        token: RequestToken,
        page: u32,
        message: Arc<str>,
    },

    /// Message for the user (inline notice or toast)
    Notice { message: Arc<str>, is_error: bool },
}

impl LoaderEvent {
    /// Create an error notice
    pub fn error(message: impl Into<Arc<str>>) -> Self {
        Self::Notice {
            message: message.into(),
            is_error: true,
        }
    }
}
