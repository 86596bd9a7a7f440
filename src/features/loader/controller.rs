//! Loader Controller
//!
//! Sole owner of [`LoaderState`]. Every operation is synchronous: it mutates
//! the state and hands back a [`FetchTicket`] describing the request to run.
//! The caller performs the request and feeds the outcome back through
//! [`LoaderController::settle`], which applies it only if the ticket still
//! belongs to the current generation.
//!
//! Page ordering needs no sorting: `request_next_page` only issues page N+1
//! after page N has been applied, and at most one fetch is in flight per
//! generation.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::{DatasetKey, LoadMode, ResultPage};
use crate::error::{Error, Result};
use crate::services::PageRequest;
use crate::state::{LoaderState, RequestToken, TokenGenerator};

/// Which loading flag a fetch owns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadTier {
    /// Page 1 after a reset
    Initial,
    /// Any later page, triggered by scrolling
    Incremental,
}

/// A fetch the controller wants performed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub token: RequestToken,
    pub tier: LoadTier,
    pub request: PageRequest,
}

impl FetchTicket {
    pub fn page(&self) -> u32 {
        self.request.page
    }
}

/// What settling a fetch did to the state
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    /// Rows were appended
    Applied { page: u32, rows: usize },
    /// The page carried no rows; the page counter still advanced
    Empty { page: u32 },
    /// Page 1 failed; the result set is empty and marked failed
    Failed { message: Arc<str> },
    /// An incremental page failed; state unchanged apart from the loading flag
    Abandoned { page: u32, message: Arc<str> },
    /// Superseded generation; nothing changed
    Stale { token: RequestToken, page: u32 },
}

/// Sequences page fetches for one result set
#[derive(Debug)]
pub struct LoaderController {
    state: LoaderState,
    tokens: TokenGenerator,
    /// (token, page) of the fetch that owns the current loading flag
    in_flight: Option<(RequestToken, u32)>,
}

impl LoaderController {
    pub fn new(page_size: u32) -> Self {
        Self {
            state: LoaderState::new(page_size),
            tokens: TokenGenerator::new(),
            in_flight: None,
        }
    }

    pub fn state(&self) -> &LoaderState {
        &self.state
    }

    /// Start a new generation and request page 1
    ///
    /// Every outstanding request is invalidated. Without a dataset the loader
    /// stays inert and nothing is fetched. A search without a term falls back
    /// to browsing.
    pub fn reset(
        &mut self,
        dataset: Option<DatasetKey>,
        mode: LoadMode,
        query: &str,
    ) -> Option<FetchTicket> {
        let query = query.trim();
        let (mode, query): (LoadMode, Arc<str>) = match mode {
            LoadMode::Search if !query.is_empty() => (LoadMode::Search, Arc::from(query)),
            _ => (LoadMode::Browse, Arc::from("")),
        };

        let token = self.tokens.mint();
        self.in_flight = None;
        self.state.begin_generation(token, dataset, mode, query);

        match self.state.dataset().cloned() {
            Some(dataset) => {
                info!(token = %token, dataset = %dataset, mode = %mode, "Loader reset");
                Some(self.fetch_page(dataset, 1, LoadTier::Initial))
            }
            None => {
                debug!(token = %token, "Loader reset without a dataset, staying inert");
                None
            }
        }
    }

    /// Request the page after the last applied one
    ///
    /// No-op while any fetch is in flight, before page 1 has landed, or once
    /// every page has been applied. Duplicate scroll signals are therefore
    /// harmless.
    pub fn request_next_page(&mut self) -> Option<FetchTicket> {
        if !self.state.can_request_more() {
            debug!(
                page = self.state.current_page(),
                total = self.state.total_pages(),
                busy = self.state.is_busy(),
                "Next page request ignored"
            );
            return None;
        }
        let dataset = self.state.dataset()?.clone();
        let next = self.state.current_page() + 1;
        Some(self.fetch_page(dataset, next, LoadTier::Incremental))
    }

    fn fetch_page(&mut self, dataset: DatasetKey, page: u32, tier: LoadTier) -> FetchTicket {
        let token = self.state.token();
        match tier {
            LoadTier::Initial => self.state.set_initial_loading(true),
            LoadTier::Incremental => self.state.set_loading(true),
        }
        self.in_flight = Some((token, page));

        let request = PageRequest {
            dataset,
            mode: self.state.mode(),
            query: Arc::from(self.state.query()),
            page,
            page_size: self.state.page_size(),
        };
        debug!(token = %token, page, ?tier, "Fetch issued");

        FetchTicket {
            token,
            tier,
            request,
        }
    }

    /// Apply the outcome of a fetch issued by this controller
    pub fn settle(&mut self, ticket: &FetchTicket, outcome: Result<ResultPage>) -> Settlement {
        let page = ticket.page();
        if ticket.token != self.state.token() || self.in_flight != Some((ticket.token, page)) {
            debug!(
                token = %ticket.token,
                current = %self.state.token(),
                page,
                "Stale response discarded"
            );
            return Settlement::Stale {
                token: ticket.token,
                page,
            };
        }

        self.in_flight = None;
        match ticket.tier {
            LoadTier::Initial => self.state.set_initial_loading(false),
            LoadTier::Incremental => self.state.set_loading(false),
        }

        match outcome {
            Ok(result) => self.apply(page, result),
            Err(err) if err.is_malformed() => {
                warn!(page, error = %err, "Malformed page treated as empty");
                self.apply(page, ResultPage::empty(page))
            }
            Err(err) => self.fail(ticket, err),
        }
    }

    fn apply(&mut self, page: u32, result: ResultPage) -> Settlement {
        let reported = result.total_pages();
        let page_size = self.state.page_size() as usize;
        let (mut rows, mut columns) = result.into_parts();

        if rows.len() > page_size {
            warn!(page, rows = rows.len(), page_size, "Page larger than requested, truncating");
            rows.truncate(page_size);
        }

        if rows.is_empty() {
            // An empty first page is an empty result set, not an error. A later
            // empty page never shrinks a page count already known.
            let total_pages = if page == 1 {
                1
            } else {
                self.state.total_pages().max(reported)
            };
            self.state.apply_page(page, rows, columns, total_pages);
            debug!(page, total_pages, "Empty page applied");
            return Settlement::Empty { page };
        }

        if columns.is_empty() {
            columns = rows
                .first()
                .map(|row| row.keys().cloned().collect())
                .unwrap_or_default();
        }

        let count = rows.len();
        self.state.apply_page(page, rows, columns, reported);
        info!(
            token = %self.state.token(),
            page,
            rows = count,
            total_pages = self.state.total_pages(),
            "Page applied"
        );
        Settlement::Applied { page, rows: count }
    }

    fn fail(&mut self, ticket: &FetchTicket, err: Error) -> Settlement {
        let message: Arc<str> = Arc::from(err.to_string());
        match ticket.tier {
            LoadTier::Initial => {
                warn!(token = %ticket.token, error = %err, "Initial page failed");
                self.state.fail_initial(message.clone());
                Settlement::Failed { message }
            }
            LoadTier::Incremental => {
                warn!(token = %ticket.token, page = ticket.page(), error = %err, "Page abandoned");
                Settlement::Abandoned {
                    page: ticket.page(),
                    message,
                }
            }
        }
    }
}
