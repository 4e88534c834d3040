//! Paginated, searchable list state for server-backed collections.
//!
//! One [`ListQueryController`] per collection (products, orders). Each owns
//! the page currently shown, the search box value, its own debounce slot and
//! a request sequence counter. Fetch failures never reach the caller: the
//! controller logs them, keeps the error for inspection and shows an empty
//! page until the next user action.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::AdminClient;
use crate::config::AdminConfig;
use crate::envelope::RemoteEnvelope;
use crate::error::AdminError;
use crate::pagination::{PageRequest, PageResult};

// ---------------------------------------------------------------------------
// Source seam
// ---------------------------------------------------------------------------

/// Where list pages come from. Returns the raw response body; envelope
/// recognition happens in the controller.
#[async_trait]
pub trait ListSource: Send + Sync {
    async fn fetch(&self, request: &PageRequest) -> Result<Value, AdminError>;
}

/// `GET {origin}{path}?page=&per_page=&search=` against the admin API.
#[derive(Debug, Clone)]
pub struct HttpListSource {
    client: AdminClient,
    path: String,
}

impl HttpListSource {
    pub fn new(client: AdminClient, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[async_trait]
impl ListSource for HttpListSource {
    async fn fetch(&self, request: &PageRequest) -> Result<Value, AdminError> {
        self.client
            .get_json(&self.path, &request.query_params())
            .await
    }
}

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

/// How responses of overlapping requests are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseOrdering {
    /// Drop a response if a later-issued request has already been applied.
    #[default]
    LatestIssued,
    /// Apply every response as it arrives; the last one to land wins.
    LastArrival,
}

impl FromStr for ResponseOrdering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "latest-issued" => Ok(Self::LatestIssued),
            "last-arrival" => Ok(Self::LastArrival),
            other => Err(format!(
                "unknown response ordering {other:?} (expected latest-issued or last-arrival)"
            )),
        }
    }
}

impl fmt::Display for ResponseOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LatestIssued => f.write_str("latest-issued"),
            Self::LastArrival => f.write_str("last-arrival"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    pub page_size: u32,
    pub search_debounce: Duration,
    pub ordering: ResponseOrdering,
}

impl ListOptions {
    pub fn from_config(config: &AdminConfig) -> Self {
        Self {
            page_size: config.default_page_size.max(1),
            search_debounce: config.search_debounce,
            ordering: config.response_ordering,
        }
    }
}

impl Default for ListOptions {
    fn default() -> Self {
        Self::from_config(&AdminConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListPhase {
    /// Showing the last applied page.
    Idle,
    /// At least one request is in flight; the previous page stays visible.
    Fetching,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

struct ListState<T> {
    result: PageResult<T>,
    /// What the search box shows right now.
    search_input: String,
    /// Search term of the most recently issued request.
    search_term: String,
    page_size: u32,
    in_flight: usize,
    last_applied_seq: u64,
    last_error: Option<AdminError>,
}

struct ListInner<T> {
    name: String,
    source: Arc<dyn ListSource>,
    options: ListOptions,
    state: Mutex<ListState<T>>,
    next_seq: AtomicU64,
    /// Debounce slot: generation + token of the scheduled search, if any.
    pending_search: Mutex<Option<(u64, CancellationToken)>>,
    search_generation: AtomicU64,
}

pub struct ListQueryController<T> {
    inner: Arc<ListInner<T>>,
}

impl<T> Clone for ListQueryController<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> ListQueryController<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, source: Arc<dyn ListSource>, options: ListOptions) -> Self {
        let page_size = options.page_size.max(1);
        Self {
            inner: Arc::new(ListInner {
                name: name.into(),
                source,
                options,
                state: Mutex::new(ListState {
                    result: PageResult::empty(page_size),
                    search_input: String::new(),
                    search_term: String::new(),
                    page_size,
                    in_flight: 0,
                    last_applied_seq: 0,
                    last_error: None,
                }),
                next_seq: AtomicU64::new(0),
                pending_search: Mutex::new(None),
                search_generation: AtomicU64::new(0),
            }),
        }
    }

    /// Controller backed by an admin API list endpoint.
    pub fn http(
        name: impl Into<String>,
        client: AdminClient,
        path: &str,
        config: &AdminConfig,
    ) -> Self {
        Self::new(
            name,
            Arc::new(HttpListSource::new(client, path)),
            ListOptions::from_config(config),
        )
    }

    fn state(&self) -> MutexGuard<'_, ListState<T>> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn pending(&self) -> MutexGuard<'_, Option<(u64, CancellationToken)>> {
        self.inner
            .pending_search
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    // -- accessors ----------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn options(&self) -> ListOptions {
        self.inner.options
    }

    /// Clone of the page currently shown.
    pub fn snapshot(&self) -> PageResult<T> {
        self.state().result.clone()
    }

    pub fn search_input(&self) -> String {
        self.state().search_input.clone()
    }

    pub fn search_term(&self) -> String {
        self.state().search_term.clone()
    }

    pub fn page_size(&self) -> u32 {
        self.state().page_size
    }

    pub fn phase(&self) -> ListPhase {
        if self.state().in_flight > 0 {
            ListPhase::Fetching
        } else {
            ListPhase::Idle
        }
    }

    /// Failure of the most recently applied response, if it failed.
    pub fn last_error(&self) -> Option<AdminError> {
        self.state().last_error.clone()
    }

    pub fn has_pending_search(&self) -> bool {
        self.pending().is_some()
    }

    // -- fetching -----------------------------------------------------------

    /// Fetch one page and make it the shown page. Out-of-range input is
    /// clamped. Never fails: on error the shown page becomes empty and the
    /// error is kept in [`last_error`](Self::last_error).
    pub async fn request_page(&self, page: i64, search_term: &str, page_size: i64) -> PageResult<T> {
        let request = PageRequest::new(page, search_term, page_size, self.inner.options.page_size);
        let seq = self.inner.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.state();
            state.in_flight += 1;
            state.search_term = request.search_term.clone();
            state.page_size = request.page_size;
        }
        debug!(
            list = %self.inner.name,
            seq,
            page = request.page,
            per_page = request.page_size,
            search = %request.search_term,
            "requesting page"
        );

        let outcome = match self.inner.source.fetch(&request).await {
            Ok(body) => RemoteEnvelope::classify(body).into_page::<T>(&request),
            Err(err) => Err(err),
        };

        let mut state = self.state();
        state.in_flight = state.in_flight.saturating_sub(1);

        if self.inner.options.ordering == ResponseOrdering::LatestIssued
            && seq < state.last_applied_seq
        {
            debug!(
                list = %self.inner.name,
                seq,
                applied = state.last_applied_seq,
                "discarding stale response"
            );
            return state.result.clone();
        }
        state.last_applied_seq = state.last_applied_seq.max(seq);

        match outcome {
            Ok(page) => {
                info!(
                    list = %self.inner.name,
                    page = page.current_page,
                    last_page = page.last_page,
                    rows = page.items.len(),
                    total = page.total,
                    "page applied"
                );
                state.result = page;
                state.last_error = None;
            }
            Err(err) => {
                warn!(
                    list = %self.inner.name,
                    page = request.page,
                    error = %err,
                    format_error = err.is_format(),
                    "list fetch failed, showing empty page"
                );
                state.result = PageResult::empty(request.page_size);
                state.last_error = Some(err);
            }
        }
        state.result.clone()
    }

    pub async fn next_page(&self) -> PageResult<T> {
        let (current, last, term, size) = self.position();
        if current >= last {
            debug!(list = %self.inner.name, current, "already on last page");
            return self.snapshot();
        }
        self.request_page(current as i64 + 1, &term, size as i64)
            .await
    }

    pub async fn previous_page(&self) -> PageResult<T> {
        let (current, _, term, size) = self.position();
        if current <= 1 {
            debug!(list = %self.inner.name, "already on first page");
            return self.snapshot();
        }
        self.request_page(current as i64 - 1, &term, size as i64)
            .await
    }

    /// Re-fetch the shown page, e.g. after a create or delete.
    pub async fn refresh(&self) -> PageResult<T> {
        let (current, _, term, size) = self.position();
        self.request_page(current as i64, &term, size as i64).await
    }

    fn position(&self) -> (u32, u32, String, u32) {
        let state = self.state();
        (
            state.result.current_page,
            state.result.last_page,
            state.search_term.clone(),
            state.page_size,
        )
    }

    // -- debounced search ---------------------------------------------------

    /// Search box keystroke. The box value updates immediately; the fetch of
    /// page 1 runs once input has been quiet for the debounce window.
    /// Must be called from within a Tokio runtime.
    pub fn on_search_input(&self, text: &str) {
        self.state().search_input = text.to_string();

        let generation = self.inner.search_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        if let Some((_, previous)) = self.pending().replace((generation, token.clone())) {
            previous.cancel();
        }

        let controller = self.clone();
        let text = text.to_string();
        let delay = self.inner.options.search_debounce;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(list = %controller.inner.name, generation, "search superseded");
                }
                _ = tokio::time::sleep(delay) => {
                    // A keystroke can replace the slot after the sleep won
                    // but before this task ran.
                    if !controller.take_pending(generation) {
                        debug!(list = %controller.inner.name, generation, "search superseded");
                        return;
                    }
                    let page_size = controller.page_size();
                    controller.request_page(1, &text, page_size as i64).await;
                }
            }
        });
    }

    /// Drop a scheduled search, if one is waiting.
    pub fn cancel_pending_search(&self) {
        if let Some((_, token)) = self.pending().take() {
            token.cancel();
        }
    }

    /// Clear the debounce slot if it still holds `generation`. Returns
    /// whether it did.
    fn take_pending(&self, generation: u64) -> bool {
        let mut slot = self.pending();
        if matches!(slot.as_ref(), Some((g, _)) if *g == generation) {
            *slot = None;
            true
        } else {
            false
        }
    }
}
