// Copyright © 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! In-process transport between a hub thread and one spoke.
//!
//! The hub side pushes values and raises the kill flag; the spoke side polls.
//! Only the latest unconsumed push is kept, matching the cache's
//! "newest complete push wins" rule.

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cache::NonantPush;
use crate::capability::Transport;
use crate::types::BoundRecord;

#[derive(Debug, Default)]
struct HubShared {
    kill: AtomicBool,
    pending: ArcSwapOption<NonantPush>,
    published: Mutex<Vec<BoundRecord>>,
}

/// Cloneable handle; the hub keeps one clone and hands another to the spoke.
#[derive(Debug, Clone, Default)]
pub struct LocalHub {
    shared: Arc<HubShared>,
}

impl LocalHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer new shared values. An unconsumed earlier push is replaced.
    pub fn push(&self, push: NonantPush) {
        self.shared.pending.store(Some(Arc::new(push)));
    }

    pub fn send_kill(&self) {
        self.shared.kill.store(true, Ordering::Release);
    }

    pub fn kill_sent(&self) -> bool {
        self.shared.kill.load(Ordering::Acquire)
    }

    /// Every bound the spoke has published, oldest first.
    pub fn published(&self) -> Vec<BoundRecord> {
        self.shared.published.lock().clone()
    }

    pub fn latest_bound(&self) -> Option<BoundRecord> {
        self.shared.published.lock().last().copied()
    }
}

impl Transport for LocalHub {
    fn poll_shared_values(&mut self) -> Option<NonantPush> {
        self.shared
            .pending
            .swap(None)
            .map(|push| Arc::try_unwrap(push).unwrap_or_else(|shared| NonantPush::clone(&shared)))
    }

    fn poll_cancellation(&mut self) -> bool {
        self.kill_sent()
    }

    fn publish_bound(&mut self, record: BoundRecord) {
        self.shared.published.lock().push(record);
    }
}
