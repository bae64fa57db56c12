//! Delivery cursor: which captured requests have already been handed out.

use std::collections::{HashSet, VecDeque};

use log::debug;

use crate::api::models::CapturedRequest;
use crate::config::Backlog;

/// Tracks delivered ids and buffers requests observed but not yet returned.
///
/// Every id enters `seen` exactly once, so a request can be queued and
/// returned at most once per client no matter how often it is observed.
#[derive(Debug, Default)]
pub(crate) struct PollCursor {
    seen: HashSet<String>,
    pending: VecDeque<CapturedRequest>,
    primed: bool,
}

impl PollCursor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queues the unseen requests of `batch` in server order.
    ///
    /// With `Backlog::Skip` the first batch ever admitted only marks its ids
    /// as seen. Returns how many requests were queued.
    pub(crate) fn admit(&mut self, batch: Vec<CapturedRequest>, backlog: Backlog) -> usize {
        let skip = !self.primed && backlog == Backlog::Skip;
        self.primed = true;

        let mut queued = 0;
        for request in batch {
            if !self.seen.insert(request.id().to_string()) {
                continue;
            }
            if skip {
                continue;
            }
            self.pending.push_back(request);
            queued += 1;
        }
        if skip {
            debug!("Skipped backlog of {} stored requests", self.seen.len());
        }
        queued
    }

    /// Removes and returns the oldest queued request accepted by `filter`.
    ///
    /// Requests it skips stay queued in order.
    pub(crate) fn take_matching<F>(&mut self, filter: &mut F) -> Option<CapturedRequest>
    where
        F: FnMut(&CapturedRequest) -> bool + ?Sized,
    {
        let position = self.pending.iter().position(|r| filter(r))?;
        self.pending.remove(position)
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn seen_len(&self) -> usize {
        self.seen.len()
    }
}
