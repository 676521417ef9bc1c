//! Offset/limit traversal of list endpoints
//!
//! The scan ends on the first page shorter than the page size. An exactly
//! full page always costs one more round trip, which then comes back short
//! (possibly empty).

use std::future::Future;
use std::sync::Arc;

use convergent_common::resilience::RateLimiter;
use convergent_domain::{ConvergeError, Page, PageRequest, Result};
use tracing::{debug, instrument};

/// Sequential paginator, one page in flight at a time
#[derive(Clone)]
pub struct Paginator {
    page_size: u64,
    limiter: Option<Arc<RateLimiter>>,
}

impl std::fmt::Debug for Paginator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paginator")
            .field("page_size", &self.page_size)
            .field("throttled", &self.limiter.is_some())
            .finish()
    }
}

impl Paginator {
    /// Paginator whose list action handles its own rate limiting
    pub fn new(page_size: u64) -> Result<Self> {
        if page_size == 0 {
            return Err(ConvergeError::Config("page size must be at least 1".into()));
        }
        Ok(Self { page_size, limiter: None })
    }

    /// Paginator that acquires a token for the action before every page
    pub fn throttled(page_size: u64, limiter: Arc<RateLimiter>) -> Result<Self> {
        Ok(Self { limiter: Some(limiter), ..Self::new(page_size)? })
    }

    pub const fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Collect every item returned by `list`
    ///
    /// `list` returns `Ok(None)` when the remote side declared success without
    /// a payload; that is a contract violation, never an empty page.
    pub async fn collect_all<T, F, Fut>(&self, action: &str, list: F) -> Result<Vec<T>>
    where
        F: FnMut(PageRequest) -> Fut,
        Fut: Future<Output = Result<Option<Vec<T>>>>,
    {
        self.collect_filtered(action, list, |_: &T| true).await
    }

    /// Like [`collect_all`](Self::collect_all), keeping items accepted by
    /// `filter`
    ///
    /// Termination looks at the unfiltered page length.
    #[instrument(skip_all, fields(action = %action, page_size = self.page_size))]
    pub async fn collect_filtered<T, F, Fut, P>(
        &self,
        action: &str,
        mut list: F,
        mut filter: P,
    ) -> Result<Vec<T>>
    where
        F: FnMut(PageRequest) -> Fut,
        Fut: Future<Output = Result<Option<Vec<T>>>>,
        P: FnMut(&T) -> bool,
    {
        let mut request = PageRequest::first(self.page_size);
        let mut collected = Vec::new();
        let mut round_trips: u32 = 0;

        loop {
            if let Some(limiter) = &self.limiter {
                limiter.acquire(action).await;
            }
            round_trips += 1;

            let items = list(request).await?.ok_or_else(|| {
                ConvergeError::contract(
                    action,
                    format!("empty response for page at offset {}", request.offset),
                )
            })?;
            let page = Page::from_response(items, request.limit);
            debug!(offset = request.offset, items = page.len(), "fetched page");

            let has_more = page.has_more;
            collected.extend(page.items.into_iter().filter(|item| filter(item)));
            if !has_more {
                break;
            }
            request = request.next();
        }

        debug!(round_trips, total = collected.len(), "scan complete");
        Ok(collected)
    }
}
