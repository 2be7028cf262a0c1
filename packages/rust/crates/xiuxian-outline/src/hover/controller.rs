use async_trait::async_trait;
use log::debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::cache::PreviewCache;
use super::machine::{HoverAnchor, HoverMachine, HoverPhase, HoverTiming};
use crate::config::HoverConfig;
use crate::fs::DirectoryAccess;
use crate::models::PageContent;
use crate::session::GraphSession;

/// Loads the content shown in a hover preview.
#[async_trait]
pub trait PreviewLoader: Send + Sync {
    /// Resolve and parse `page_name`.
    async fn load_preview(&self, page_name: &str) -> PageContent;
}

#[async_trait]
impl<D: DirectoryAccess> PreviewLoader for GraphSession<D> {
    async fn load_preview(&self, page_name: &str) -> PageContent {
        self.load_page(page_name).await
    }
}

struct HoverState {
    machine: HoverMachine,
    /// Content of the current target only.
    slot: Option<(String, PageContent)>,
    fetching: Option<String>,
    timer: Option<JoinHandle<()>>,
}

struct Inner<L> {
    loader: Arc<L>,
    cache: PreviewCache,
    state: Mutex<HoverState>,
    this: Weak<Inner<L>>,
}

impl<L> Drop for Inner<L> {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
    }
}

impl<L: PreviewLoader + 'static> Inner<L> {
    fn lock(&self) -> MutexGuard<'_, HoverState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_fetch(&self, state: &mut HoverState, target: &str) {
        if state.slot.as_ref().is_some_and(|(name, _)| name == target)
            || state.fetching.as_deref() == Some(target)
        {
            return;
        }
        if let Some(content) = self.cache.peek(target) {
            debug!("hover preview cache hit for {target:?}");
            state.slot = Some((target.to_string(), content));
            return;
        }
        state.fetching = Some(target.to_string());
        let this = self.this.clone();
        let loader = Arc::clone(&self.loader);
        let name = target.to_string();
        tokio::spawn(async move {
            let Some(inner) = this.upgrade() else {
                return;
            };
            let fetch_name = name.clone();
            let content = inner
                .cache
                .get_or_load(&name, move || async move {
                    loader.load_preview(&fetch_name).await
                })
                .await;
            inner.store_content(&name, content);
        });
    }

    fn store_content(&self, name: &str, content: PageContent) {
        let mut state = self.lock();
        if state.fetching.as_deref() == Some(name) {
            state.fetching = None;
        }
        if state.machine.target() == Some(name) {
            state.slot = Some((name.to_string(), content));
        } else {
            debug!("discarding preview for {name:?}; hover moved on");
        }
    }

    fn reschedule(&self, state: &mut HoverState) {
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        let Some(deadline) = state.machine.next_deadline() else {
            return;
        };
        let this = self.this.clone();
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(inner) = this.upgrade() {
                inner.on_timer();
            }
        }));
    }

    fn on_timer(&self) {
        let mut state = self.lock();
        let before = state.machine.phase();
        let after = state.machine.tick(Instant::now());
        if before != after {
            debug!(
                "hover preview for {:?}: {before:?} -> {after:?}",
                state.machine.target()
            );
        }
        self.reschedule(&mut state);
    }

    fn update(&self, event: impl FnOnce(&mut HoverMachine, Instant)) {
        let mut state = self.lock();
        event(&mut state.machine, Instant::now());
        self.reschedule(&mut state);
    }
}

/// Deferred hover preview over a [`PreviewLoader`].
///
/// Owns one pending timer and a single-slot content cache for the current
/// target, backed by a bounded [`PreviewCache`] that de-duplicates fetches.
/// Must be used from within a tokio runtime.
pub struct HoverPreview<L: PreviewLoader + 'static> {
    inner: Arc<Inner<L>>,
}

impl<L: PreviewLoader + 'static> HoverPreview<L> {
    /// Create a preview controller.
    #[must_use]
    pub fn new(loader: Arc<L>, config: &HoverConfig) -> Self {
        let inner = Arc::new_cyclic(|this| Inner {
            loader,
            cache: PreviewCache::new(config.cache_capacity, config.cache_ttl()),
            state: Mutex::new(HoverState {
                machine: HoverMachine::new(HoverTiming::from(config)),
                slot: None,
                fetching: None,
                timer: None,
            }),
            this: this.clone(),
        });
        Self { inner }
    }

    /// Pointer entered the hover zone of `target`. Loading starts at once;
    /// the popover shows after the show delay.
    pub fn request_preview(&self, target: &str, anchor: HoverAnchor) {
        let target = target.trim();
        if target.is_empty() {
            return;
        }
        let mut state = self.inner.lock();
        if state.machine.pointer_enter(target, anchor, Instant::now()) {
            debug!("hover target changed to {target:?}");
            state.slot = None;
        }
        self.inner.ensure_fetch(&mut state, target);
        self.inner.reschedule(&mut state);
    }

    /// Pointer left the hover zone.
    pub fn pointer_left(&self) {
        self.inner.update(HoverMachine::pointer_leave_zone);
    }

    /// Pointer entered the popover.
    pub fn popover_entered(&self) {
        self.inner.update(HoverMachine::popover_enter);
    }

    /// Pointer moved over the popover.
    pub fn popover_activity(&self) {
        self.inner.update(HoverMachine::popover_activity);
    }

    /// Pointer left the popover.
    pub fn popover_left(&self) {
        self.inner.update(HoverMachine::popover_leave);
    }

    /// Hide immediately and drop the pending timer.
    pub fn cancel_hover(&self) {
        self.inner.update(|machine, _now| machine.cancel());
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> HoverPhase {
        self.inner.lock().machine.phase()
    }

    /// Whether the popover is on screen.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.inner.lock().machine.is_visible()
    }

    /// Hovered page name.
    #[must_use]
    pub fn target(&self) -> Option<String> {
        self.inner.lock().machine.target().map(str::to_string)
    }

    /// Anchor of the hovered target.
    #[must_use]
    pub fn anchor(&self) -> HoverAnchor {
        self.inner.lock().machine.anchor()
    }

    /// Content for the hovered target; `NotLoaded` while fetching.
    #[must_use]
    pub fn content(&self) -> PageContent {
        let state = self.inner.lock();
        match (&state.slot, state.machine.target()) {
            (Some((name, content)), Some(target)) if name == target => content.clone(),
            _ => PageContent::NotLoaded,
        }
    }

    /// How many times a popover became visible.
    #[must_use]
    pub fn shown_count(&self) -> u64 {
        self.inner.lock().machine.shown_count()
    }

    /// Backing fetch cache.
    #[must_use]
    pub fn cache(&self) -> &PreviewCache {
        &self.inner.cache
    }
}
