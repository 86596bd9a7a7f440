//! Page Source
//!
//! The seam between the loader and whatever serves prediction pages. The
//! HTTP client implements it for production; tests script it in memory.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::domain::{DatasetKey, LoadMode, ResultPage};
use crate::error::Result;

/// Everything needed to fetch one page, captured when the fetch is issued
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub dataset: DatasetKey,
    pub mode: LoadMode,
    /// Search term; empty in browse mode
    pub query: Arc<str>,
    /// 1-based page number
    pub page: u32,
    pub page_size: u32,
}

/// A paginated source of prediction rows
pub trait PageSource: Send + Sync + 'static {
    /// Fetch a single page; the future must not borrow `self`
    fn fetch_page(&self, request: PageRequest) -> BoxFuture<'static, Result<ResultPage>>;
}

impl<S: PageSource + ?Sized> PageSource for Arc<S> {
    fn fetch_page(&self, request: PageRequest) -> BoxFuture<'static, Result<ResultPage>> {
        (**self).fetch_page(request)
    }
}
