//! Loader Session
//!
//! Runs a [`LoaderController`] and a [`ModeController`] on a tokio task and
//! exposes them through a cheap [`LoaderHandle`]. The task is the only place
//! state changes: user intents arrive as commands, fetch outcomes arrive on
//! a second channel, and each change is published as a snapshot.
//!
//! ## Data Flow
//!
//! ```text
//! LoaderHandle ──Command──► LoaderTask ──PageRequest──► PageSource
//!      ▲                       │   ▲                         │
//!      │ watch<LoaderState>    │   └──── settled outcome ────┘
//!      └───────────────────────┤
//!                              └──LoaderEvent──► crossbeam Receiver (view)
//! ```

use crossbeam_channel::Sender;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use crate::domain::{AppConfig, DatasetKey, ResultPage};
use crate::error::{Error, Result};
use crate::eventing::LoaderEvent;
use crate::features::loader::controller::{FetchTicket, LoadTier, LoaderController, Settlement};
use crate::features::loader::mode::{ModeController, ResetRequest};
use crate::features::loader::sentinel::{ScrollSentinel, SentinelGeometry};
use crate::services::{PageSource, spawn_named};
use crate::state::LoaderState;

/// User intents forwarded to the loader task
#[derive(Debug)]
enum Command {
    SelectDataset(Option<DatasetKey>),
    EditQuery(String),
    SubmitSearch(String),
    ClearSearch,
    RequestNextPage,
    /// Restart the current selection and mode from page 1
    Refresh,
    /// Answered once every earlier command has been handled
    Flush(oneshot::Sender<()>),
}

type Settled = (FetchTicket, Result<ResultPage>);

fn closed() -> Error {
    Error::ChannelClosed {
        message: "loader task stopped".to_string(),
    }
}

/// Start a loader task on the current (or global) tokio runtime
pub fn spawn_loader<S: PageSource>(
    source: S,
    config: &AppConfig,
    events: Sender<LoaderEvent>,
) -> Result<LoaderHandle> {
    let loader = LoaderController::new(config.loader.page_size);
    let (state_tx, state_rx) = watch::channel(loader.state().clone());
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (settled_tx, settled_rx) = mpsc::unbounded_channel();

    let task = LoaderTask {
        source,
        loader,
        modes: ModeController::new(),
        commands: command_rx,
        settled_tx,
        settled_rx,
        state_tx,
        events,
    };
    spawn_named("loader", task.run())?;

    Ok(LoaderHandle {
        commands: command_tx,
        state: state_rx,
        sentinel: ScrollSentinel::new(config.sentinel),
    })
}

/// View-side access to a running loader
///
/// Dropping the handle stops the task; fetches still in flight are discarded.
#[derive(Debug)]
pub struct LoaderHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<LoaderState>,
    sentinel: ScrollSentinel,
}

impl LoaderHandle {
    fn send(&self, command: Command) -> Result<()> {
        self.commands.send(command).map_err(|_| closed())
    }

    pub fn select_dataset(&self, dataset: Option<DatasetKey>) -> Result<()> {
        self.send(Command::SelectDataset(dataset))
    }

    /// Search box edited (no fetch unless the box was emptied)
    pub fn edit_query(&self, text: impl Into<String>) -> Result<()> {
        self.send(Command::EditQuery(text.into()))
    }

    pub fn submit_search(&self, text: impl Into<String>) -> Result<()> {
        self.send(Command::SubmitSearch(text.into()))
    }

    pub fn clear_search(&self) -> Result<()> {
        self.send(Command::ClearSearch)
    }

    pub fn request_next_page(&self) -> Result<()> {
        self.send(Command::RequestNextPage)
    }

    /// Reload from page 1, e.g. after the first page failed
    pub fn refresh(&self) -> Result<()> {
        self.send(Command::Refresh)
    }

    /// Latest published state
    pub fn state(&self) -> LoaderState {
        self.state.borrow().clone()
    }

    /// Receiver that wakes on every published state
    pub fn subscribe(&self) -> watch::Receiver<LoaderState> {
        self.state.clone()
    }

    /// Wait until every command sent so far has been handled
    pub async fn flush(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Flush(tx))?;
        rx.await.map_err(|_| closed())
    }

    /// Wait for the first published state matching `predicate`
    pub async fn wait_until(
        &self,
        predicate: impl FnMut(&LoaderState) -> bool,
    ) -> Result<LoaderState> {
        let mut state = self.state.clone();
        let matched = state.wait_for(predicate).await.map_err(|_| closed())?;
        Ok(LoaderState::clone(&matched))
    }

    /// Feed the end-of-list marker position; requests the next page when it
    /// becomes visible. Returns whether a request was sent.
    pub fn on_scroll(&mut self, geometry: SentinelGeometry) -> Result<bool> {
        let fire = {
            let state = self.state.borrow();
            self.sentinel.observe(&geometry, &state)
        };
        if fire {
            self.request_next_page()?;
        }
        Ok(fire)
    }

    /// The view re-rendered; the sentinel observes the marker again
    pub fn on_render(&mut self) {
        self.sentinel.rearm();
    }
}

struct LoaderTask<S> {
    source: S,
    loader: LoaderController,
    modes: ModeController,
    commands: mpsc::UnboundedReceiver<Command>,
    settled_tx: mpsc::UnboundedSender<Settled>,
    settled_rx: mpsc::UnboundedReceiver<Settled>,
    state_tx: watch::Sender<LoaderState>,
    events: Sender<LoaderEvent>,
}

impl<S: PageSource> LoaderTask<S> {
    async fn run(mut self) {
        debug!("Loader task started");
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                Some((ticket, outcome)) = self.settled_rx.recv() => {
                    self.settle(ticket, outcome);
                }
            }
        }
        debug!("Loader task stopped");
    }

    fn handle(&mut self, command: Command) {
        let reset = match command {
            Command::SelectDataset(dataset) => self.modes.select_dataset(dataset),
            Command::EditQuery(text) => self.modes.edit_query(&text),
            Command::SubmitSearch(text) => self.modes.submit(&text),
            Command::ClearSearch => self.modes.clear(),
            Command::Refresh => Some(self.modes.current()),
            Command::RequestNextPage => {
                if let Some(ticket) = self.loader.request_next_page() {
                    self.publish();
                    self.dispatch(ticket);
                }
                None
            }
            Command::Flush(reply) => {
                let _ = reply.send(());
                None
            }
        };
        if let Some(reset) = reset {
            self.reset(reset);
        }
    }

    fn reset(&mut self, request: ResetRequest) {
        let ticket = self
            .loader
            .reset(request.dataset, request.mode, &request.query);
        let state = self.loader.state();
        self.emit(LoaderEvent::Reset {
            token: state.token(),
            dataset: state.dataset().cloned(),
            mode: state.mode(),
        });
        self.publish();
        if let Some(ticket) = ticket {
            self.dispatch(ticket);
        }
    }

    /// Run the fetch on its own task and route the outcome back to the loop
    fn dispatch(&self, ticket: FetchTicket) {
        let name = match ticket.tier {
            LoadTier::Initial => "loader-first-page",
            LoadTier::Incremental => "loader-next-page",
        };
        let fetch = self.source.fetch_page(ticket.request.clone());
        let settled = self.settled_tx.clone();
        let fallback = ticket.clone();

        let spawned = spawn_named(name, async move {
            let outcome = fetch.await;
            let _ = settled.send((ticket, outcome));
        });
        if let Err(err) = spawned {
            let _ = self.settled_tx.send((fallback, Err(err)));
        }
    }

    fn settle(&mut self, ticket: FetchTicket, outcome: Result<ResultPage>) {
        let token = ticket.token;
        match self.loader.settle(&ticket, outcome) {
            Settlement::Stale { token, page } => {
                self.emit(LoaderEvent::StaleDiscarded { token, page });
                return;
            }
            Settlement::Applied { page, rows } => self.page_applied(page, rows),
            Settlement::Empty { page } => self.page_applied(page, 0),
            Settlement::Failed { message } => {
                self.emit(LoaderEvent::error(format!(
                    "Failed to load predictions: {message}"
                )));
            }
            Settlement::Abandoned { page, message } => {
                self.emit(LoaderEvent::PageAbandoned {
                    token,
                    page,
                    message,
                });
            }
        }
        self.publish();
    }

    fn page_applied(&self, page: u32, rows: usize) {
        let state = self.loader.state();
        self.emit(LoaderEvent::PageApplied {
            token: state.token(),
            page,
            rows,
            total_pages: state.total_pages(),
        });
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.loader.state().clone());
    }

    fn emit(&self, event: LoaderEvent) {
        if self.events.send(event).is_err() {
            debug!("Loader event receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crossbeam_channel::Receiver;
    use futures::FutureExt;
    use futures::future::BoxFuture;

    use crate::domain::{CellValue, LoadMode, Row};
    use crate::services::PageRequest;

    type Reply = oneshot::Sender<Result<ResultPage>>;

    /// Hands every request to the test, which answers whenever it likes
    struct ScriptedSource {
        requests: mpsc::UnboundedSender<(PageRequest, Reply)>,
    }

    impl ScriptedSource {
        fn new() -> (Self, mpsc::UnboundedReceiver<(PageRequest, Reply)>) {
            let (tx, rx) = mpsc::unbounded_channel();
            (Self { requests: tx }, rx)
        }
    }

    impl PageSource for ScriptedSource {
        fn fetch_page(&self, request: PageRequest) -> BoxFuture<'static, Result<ResultPage>> {
            let (tx, rx) = oneshot::channel();
            let sent = self.requests.send((request, tx)).is_ok();
            async move {
                if !sent {
                    return Err(closed());
                }
                rx.await.map_err(|_| closed())?
            }
            .boxed()
        }
    }

    fn sales() -> Option<DatasetKey> {
        DatasetKey::new("sales.xlsx", "Q1").ok()
    }

    fn page(tag: &str, number: u32, count: usize, total: u32) -> Result<ResultPage> {
        let rows = (0..count)
            .map(|i| {
                let mut row = Row::new();
                row.insert("id".into(), CellValue::from(format!("{tag}-{number}-{i}").as_str()));
                row.insert("Churn Prediction".into(), CellValue::from(1.0));
                row
            })
            .collect();
        Ok(ResultPage::new(
            rows,
            vec!["id".into(), "Churn Prediction".into()],
            number,
            total,
        ))
    }

    async fn next_request(
        requests: &mut mpsc::UnboundedReceiver<(PageRequest, Reply)>,
    ) -> (PageRequest, Reply) {
        tokio::time::timeout(Duration::from_secs(2), requests.recv())
            .await
            .expect("request in time")
            .expect("source open")
    }

    async fn wait_for_event(
        events: &Receiver<LoaderEvent>,
        predicate: impl Fn(&LoaderEvent) -> bool,
    ) -> LoaderEvent {
        for _ in 0..200 {
            while let Ok(event) = events.try_recv() {
                if predicate(&event) {
                    return event;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected loader event not received");
    }

    async fn wait_state(
        handle: &LoaderHandle,
        predicate: impl FnMut(&LoaderState) -> bool,
    ) -> LoaderState {
        tokio::time::timeout(Duration::from_secs(2), handle.wait_until(predicate))
            .await
            .expect("state in time")
            .expect("loader running")
    }

    fn start() -> (
        LoaderHandle,
        mpsc::UnboundedReceiver<(PageRequest, Reply)>,
        Receiver<LoaderEvent>,
    ) {
        let (source, requests) = ScriptedSource::new();
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        let handle = spawn_loader(source, &AppConfig::default(), events_tx).expect("spawn");
        (handle, requests, events_rx)
    }

    #[tokio::test]
    async fn test_double_next_page_issues_one_fetch() {
        let (handle, mut requests, _events) = start();
        handle.select_dataset(sales()).expect("send");

        let (first, reply) = next_request(&mut requests).await;
        assert_eq!(first.page, 1);
        let _ = reply.send(page("b", 1, 20, 3));
        wait_state(&handle, |s| s.current_page() == 1).await;

        handle.request_next_page().expect("send");
        handle.request_next_page().expect("send");
        handle.flush().await.expect("flush");

        let (second, _reply) = next_request(&mut requests).await;
        assert_eq!(second.page, 2);
        assert!(requests.try_recv().is_err());
        assert!(handle.state().is_loading());
    }

    #[tokio::test]
    async fn test_browse_then_search_then_clear_discards_stale_page() {
        let (handle, mut requests, events) = start();
        handle.select_dataset(sales()).expect("send");

        let (request, reply) = next_request(&mut requests).await;
        assert_eq!(request.mode, LoadMode::Browse);
        let _ = reply.send(page("browse", 1, 20, 3));
        let state = wait_state(&handle, |s| s.current_page() == 1).await;
        assert_eq!(state.rows().len(), 20);

        // typing alone never fetches
        handle.edit_query("churn").expect("send");
        handle.flush().await.expect("flush");
        assert!(requests.try_recv().is_err());

        handle.submit_search("churn").expect("send");
        let (request, reply) = next_request(&mut requests).await;
        assert_eq!(request.mode, LoadMode::Search);
        assert_eq!(&*request.query, "churn");
        assert_eq!(request.page, 1);
        let _ = reply.send(page("search", 1, 20, 3));
        wait_state(&handle, |s| s.mode() == LoadMode::Search && s.current_page() == 1).await;

        handle.request_next_page().expect("send");
        let (pending, stale_reply) = next_request(&mut requests).await;
        assert_eq!(pending.page, 2);

        // clearing the search while page 2 is in flight
        handle.clear_search().expect("send");
        let (request, reply) = next_request(&mut requests).await;
        assert_eq!(request.mode, LoadMode::Browse);
        assert_eq!(request.page, 1);

        let _ = stale_reply.send(page("search", 2, 20, 3));
        let stale =
            wait_for_event(&events, |e| matches!(e, LoaderEvent::StaleDiscarded { .. })).await;
        match stale {
            LoaderEvent::StaleDiscarded { token, page } => {
                assert_eq!(page, 2);
                assert!(token < handle.state().token());
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(handle.state().is_initial_loading());

        let _ = reply.send(page("browse", 1, 20, 3));
        let state = wait_state(&handle, |s| {
            s.mode() == LoadMode::Browse && s.current_page() == 1
        })
        .await;
        assert_eq!(state.rows().len(), 20);
        assert!(state.rows().iter().all(|r| r["id"].to_string().starts_with("browse-1-")));
        assert_eq!(state.total_pages(), 3);
    }

    #[tokio::test]
    async fn test_empty_search_never_requests_more() {
        let (mut handle, mut requests, events) = start();
        handle.select_dataset(sales()).expect("send");
        let (_, reply) = next_request(&mut requests).await;
        let _ = reply.send(page("browse", 1, 20, 3));
        wait_state(&handle, |s| s.current_page() == 1).await;

        handle.submit_search("churn=1").expect("send");
        let (request, reply) = next_request(&mut requests).await;
        assert_eq!(&*request.query, "churn=1");
        let _ = reply.send(page("search", 1, 0, 0));

        let state = wait_state(&handle, |s| {
            s.mode() == LoadMode::Search && !s.is_initial_loading()
        })
        .await;
        assert!(state.is_empty_result());
        assert_eq!(state.total_pages(), 1);
        let applied = wait_for_event(&events, |e| {
            matches!(e, LoaderEvent::PageApplied { rows: 0, .. })
        })
        .await;
        assert!(matches!(applied, LoaderEvent::PageApplied { page: 1, total_pages: 1, .. }));
        assert!(!events.try_iter().any(|e| matches!(e, LoaderEvent::Notice { .. })));

        // the marker sits at the top of an empty list and is fully visible
        let geometry = SentinelGeometry::after_rows(0, 30.0, 0.0, 600.0);
        handle.on_render();
        assert!(!handle.on_scroll(geometry).expect("scroll"));
        handle.flush().await.expect("flush");
        assert!(requests.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_sentinel_drives_next_page() {
        let (mut handle, mut requests, _events) = start();
        handle.select_dataset(sales()).expect("send");
        let (_, reply) = next_request(&mut requests).await;
        let _ = reply.send(page("browse", 1, 20, 2));
        wait_state(&handle, |s| s.current_page() == 1).await;

        let geometry = SentinelGeometry::after_rows(20, 30.0, 0.0, 600.0);
        assert!(handle.on_scroll(geometry).expect("scroll"));
        // fired once; a second observation before the next render is ignored
        assert!(!handle.on_scroll(geometry).expect("scroll"));

        let (request, reply) = next_request(&mut requests).await;
        assert_eq!(request.page, 2);
        let _ = reply.send(page("browse", 2, 20, 2));
        let state = wait_state(&handle, |s| s.current_page() == 2).await;
        assert_eq!(state.rows().len(), 40);

        handle.on_render();
        let geometry = SentinelGeometry::after_rows(40, 30.0, 600.0, 600.0);
        assert!(!handle.on_scroll(geometry).expect("scroll"));
    }

    #[tokio::test]
    async fn test_first_page_failure_notifies_and_refresh_retries() {
        let (handle, mut requests, events) = start();
        handle.select_dataset(sales()).expect("send");
        let (_, reply) = next_request(&mut requests).await;
        let _ = reply.send(Err(Error::Timeout {
            message: "no answer".into(),
        }));

        let notice = wait_for_event(&events, |e| {
            matches!(e, LoaderEvent::Notice { is_error: true, .. })
        })
        .await;
        match notice {
            LoaderEvent::Notice { message, .. } => {
                assert!(message.starts_with("Failed to load predictions"));
            }
            other => panic!("unexpected event {other:?}"),
        }
        let state = wait_state(&handle, |s| !s.is_initial_loading()).await;
        assert!(state.rows().is_empty());
        assert!(state.last_error().is_some());

        handle.refresh().expect("send");
        let (request, reply) = next_request(&mut requests).await;
        assert_eq!(request.page, 1);
        let _ = reply.send(page("browse", 1, 3, 1));
        let state = wait_state(&handle, |s| s.current_page() == 1).await;
        assert_eq!(state.rows().len(), 3);
        assert!(state.last_error().is_none());
    }

    #[tokio::test]
    async fn test_dropping_handle_stops_task() {
        let (source, _requests) = ScriptedSource::new();
        let (events_tx, _events_rx) = crossbeam_channel::unbounded();
        let handle = spawn_loader(source, &AppConfig::default(), events_tx).expect("spawn");
        let mut state = handle.subscribe();
        drop(handle);

        let changed = tokio::time::timeout(Duration::from_secs(2), state.changed()).await;
        assert!(matches!(changed, Ok(Err(_))));
    }
}
