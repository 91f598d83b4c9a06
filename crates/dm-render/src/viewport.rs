//! Viewport tracker: turns render-surface layout into the current page
//! rectangle and publishes it to dependents.
//!
//! Each [`ViewportTracker::notify`] call performs one measurement. When no
//! page element is found the container's own size is published as a
//! fallback and a retry delay is returned, until the retry budget runs out.
//! Hosts drive retries with their own timer; native hosts can use
//! [`ViewportTracker::settle`] instead.

use crate::surface::{RenderSurface, SurfaceRect};
use dm_core::PageRect;
use dm_core::config::TrackerConfig;
use std::time::Duration;
use tokio::sync::watch;

/// Why a measurement was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutTrigger {
    Mount,
    /// The surface's subtree changed (page element added or replaced).
    Mutation,
    Resize,
    Zoom,
    /// A scheduled retry. Unlike the other triggers it does not reset the
    /// retry budget.
    Retry,
}

/// Outcome of one measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Refresh {
    /// A page element was found.
    Settled(PageRect),
    /// No page element yet. `rect` is the container-size fallback (`None`
    /// if the container has no area either); `retry_in` is `None` once the
    /// retry budget is spent.
    Fallback {
        rect: Option<PageRect>,
        retry_in: Option<Duration>,
    },
    /// The tracker is unmounted; nothing was measured.
    Detached,
}

#[derive(Debug)]
pub struct ViewportTracker {
    config: TrackerConfig,
    tx: watch::Sender<Option<PageRect>>,
    attempts: u32,
    mounted: bool,
}

impl ViewportTracker {
    pub fn new(config: TrackerConfig) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            config,
            tx,
            attempts: 0,
            mounted: false,
        }
    }

    /// Receive every published page rectangle. `None` means unavailable.
    pub fn subscribe(&self) -> watch::Receiver<Option<PageRect>> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Option<PageRect> {
        *self.tx.borrow()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Retries spent since the last non-retry trigger.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Measure the surface in response to `trigger` and publish the result.
    pub fn notify<S: RenderSurface + ?Sized>(&mut self, trigger: LayoutTrigger, surface: &S) -> Refresh {
        match trigger {
            LayoutTrigger::Mount => {
                self.mounted = true;
                self.attempts = 0;
            }
            LayoutTrigger::Retry => {}
            _ => self.attempts = 0,
        }
        if !self.mounted {
            log::debug!("viewport: ignoring {trigger:?} while unmounted");
            return Refresh::Detached;
        }
        self.measure(surface)
    }

    /// Stop tracking. Publishes `None` so no dependent keeps a stale page.
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.attempts = 0;
        self.publish(None);
    }

    fn measure<S: RenderSurface + ?Sized>(&mut self, surface: &S) -> Refresh {
        let Some(container) = surface.container() else {
            self.publish(None);
            return self.schedule_retry(None);
        };

        let page = surface
            .page_candidates()
            .into_iter()
            .filter(|c| c.area() > 0.0)
            .max_by(|a, b| a.area().total_cmp(&b.area()))
            .map(|c| relative_to(&c, &container))
            .filter(PageRect::is_usable);

        if let Some(rect) = page {
            self.attempts = 0;
            self.publish(Some(rect));
            return Refresh::Settled(rect);
        }

        let fallback = Some(PageRect::new(
            container.width.round(),
            container.height.round(),
        ))
        .filter(PageRect::is_usable);
        self.publish(fallback);
        self.schedule_retry(fallback)
    }

    fn schedule_retry(&mut self, rect: Option<PageRect>) -> Refresh {
        let retry_in = if self.attempts < self.config.max_retries {
            self.attempts += 1;
            Some(Duration::from_millis(self.config.delay_ms(self.attempts)))
        } else {
            log::debug!(
                "viewport: no page element after {} retries, keeping fallback {rect:?}",
                self.attempts
            );
            None
        };
        Refresh::Fallback { rect, retry_in }
    }

    fn publish(&self, rect: Option<PageRect>) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == rect {
                false
            } else {
                *current = rect;
                true
            }
        });
        if changed {
            log::debug!("viewport: page rect -> {rect:?}");
        }
    }

    /// Measure, then keep retrying on a timer until a page element appears
    /// or the retry budget is spent. Returns the last published rectangle.
    #[cfg(feature = "settle")]
    pub async fn settle<S: RenderSurface + ?Sized>(&mut self, surface: &S) -> Option<PageRect> {
        let mut outcome = self.notify(LayoutTrigger::Mount, surface);
        loop {
            match outcome {
                Refresh::Settled(rect) => return Some(rect),
                Refresh::Detached => return None,
                Refresh::Fallback {
                    rect,
                    retry_in: None,
                } => return rect,
                Refresh::Fallback {
                    retry_in: Some(delay),
                    ..
                } => {
                    tokio::time::sleep(delay).await;
                    if !self.mounted {
                        return None;
                    }
                    outcome = self.notify(LayoutTrigger::Retry, surface);
                }
            }
        }
    }
}

/// Page position relative to the container, snapped to whole pixels.
fn relative_to(page: &SurfaceRect, container: &SurfaceRect) -> PageRect {
    PageRect::new(page.width.round(), page.height.round())
        .with_origin((page.left - container.left).round(), (page.top - container.top).round())
}
