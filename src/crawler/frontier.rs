//! Frontier for managing the URLs a scan still has to fetch
//!
//! This module handles:
//! - The FIFO queue of discovered, not yet fetched URLs
//! - The per-scan seen-set used for deduplication
//! - Tracking in-flight fetches so idle workers know when the scan is done
//! - Cancellation on timeout or resource-limit trips
//!
//! The frontier is the only mutable state the workers share besides storage.
//! Its lock is a plain mutex that is never held across an await; idle workers
//! park on a `Notify` instead.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;
use url::Url;

#[derive(Debug, Default)]
struct FrontierState {
    queue: VecDeque<Url>,
    seen: HashSet<String>,
    in_flight: usize,
    cancelled: bool,
}

/// Work queue shared by the workers of one scan
#[derive(Debug, Default)]
pub struct Frontier {
    state: Mutex<FrontierState>,
    notify: Notify,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        // The state stays consistent under every critical section, so a
        // poisoned lock is still usable
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Records a URL as seen without queueing it
    ///
    /// Returns false if it was already seen.
    pub fn mark_seen(&self, url: &Url) -> bool {
        self.lock().seen.insert(url.as_str().to_string())
    }

    /// Queues a URL unless it was seen before or the frontier is cancelled
    ///
    /// # Returns
    ///
    /// * `true` - The URL was queued
    /// * `false` - Duplicate, or no new work is accepted
    pub fn push(&self, url: Url) -> bool {
        {
            let mut state = self.lock();
            if state.cancelled || !state.seen.insert(url.as_str().to_string()) {
                return false;
            }
            state.queue.push_back(url);
        }

        self.notify.notify_waiters();
        true
    }

    /// Waits for the next URL to fetch
    ///
    /// Each returned URL counts as in flight until `complete` is called for
    /// it.
    ///
    /// # Returns
    ///
    /// * `Some(Url)` - A URL to fetch
    /// * `None` - The queue is empty with nothing in flight, or the frontier
    ///   was cancelled
    pub async fn next(&self) -> Option<Url> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before inspecting the state so no wakeup is lost
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if state.cancelled {
                    return None;
                }
                if let Some(url) = state.queue.pop_front() {
                    state.in_flight += 1;
                    return Some(url);
                }
                if state.in_flight == 0 {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Marks one URL returned by `next` as done
    pub fn complete(&self) {
        let finished = {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
            state.in_flight == 0 && state.queue.is_empty()
        };

        if finished {
            self.notify.notify_waiters();
        }
    }

    /// Stops dispatching work
    ///
    /// Queued URLs are dropped; fetches already in flight run to completion.
    pub fn cancel(&self) {
        {
            let mut state = self.lock();
            state.cancelled = true;
            state.queue.clear();
        }
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    /// Number of URLs still waiting for a worker
    pub fn queued(&self) -> usize {
        self.lock().queue.len()
    }

    /// Number of URLs ever seen
    pub fn seen_count(&self) -> usize {
        self.lock().seen.len()
    }
}
