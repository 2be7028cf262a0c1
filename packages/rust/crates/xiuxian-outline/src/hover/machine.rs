use std::time::Duration;
use tokio::time::Instant;

use crate::config::HoverConfig;

/// Screen position the preview is anchored to.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HoverAnchor {
    /// Horizontal position.
    pub x: f32,
    /// Vertical position.
    pub y: f32,
}

/// Hover timing knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoverTiming {
    /// Delay between entering a hover zone and showing the popover.
    pub show_delay: Duration,
    /// Minimum time a shown popover stays up.
    pub min_visible: Duration,
    /// Extension applied on pointer activity over the popover.
    pub popover_extend: Duration,
}

impl Default for HoverTiming {
    fn default() -> Self {
        Self::from(&HoverConfig::default())
    }
}

impl From<&HoverConfig> for HoverTiming {
    fn from(config: &HoverConfig) -> Self {
        Self {
            show_delay: config.show_delay(),
            min_visible: config.min_visible(),
            popover_extend: config.popover_extend(),
        }
    }
}

/// Popover phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverPhase {
    /// Nothing shown or pending.
    Idle,
    /// Waiting for the show delay.
    Arming {
        /// When the popover may become visible.
        show_at: Instant,
    },
    /// Popover shown.
    Visible,
    /// Pointer left; hiding once the minimum visible time passed.
    Closing,
}

/// Timer-free hover state machine; the caller feeds events and ticks.
#[derive(Debug, Clone)]
pub struct HoverMachine {
    timing: HoverTiming,
    phase: HoverPhase,
    target: Option<String>,
    anchor: HoverAnchor,
    over_zone: bool,
    over_popover: bool,
    min_visible_until: Option<Instant>,
    shown: u64,
}

impl HoverMachine {
    /// Idle machine.
    #[must_use]
    pub fn new(timing: HoverTiming) -> Self {
        Self {
            timing,
            phase: HoverPhase::Idle,
            target: None,
            anchor: HoverAnchor::default(),
            over_zone: false,
            over_popover: false,
            min_visible_until: None,
            shown: 0,
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> HoverPhase {
        self.phase
    }

    /// Hovered page name.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Anchor of the current target.
    #[must_use]
    pub fn anchor(&self) -> HoverAnchor {
        self.anchor
    }

    /// Whether a popover is on screen (closing popovers still are).
    #[must_use]
    pub fn is_visible(&self) -> bool {
        matches!(self.phase, HoverPhase::Visible | HoverPhase::Closing)
    }

    /// How many times a popover became visible.
    #[must_use]
    pub fn shown_count(&self) -> u64 {
        self.shown
    }

    /// Earliest instant at which [`Self::tick`] may change the phase.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.phase {
            HoverPhase::Arming { show_at } => Some(show_at),
            HoverPhase::Closing if !self.over_zone && !self.over_popover => {
                self.min_visible_until
            }
            _ => None,
        }
    }

    /// Pointer entered the hover zone of `target`.
    ///
    /// Returns `true` when the target differs from the previous one, in
    /// which case cached content for the old target must be dropped.
    pub fn pointer_enter(&mut self, target: &str, anchor: HoverAnchor, now: Instant) -> bool {
        self.over_zone = true;
        let changed = self.target.as_deref() != Some(target);
        if !changed && self.is_visible() {
            self.phase = HoverPhase::Visible;
            return false;
        }
        self.target = Some(target.to_string());
        self.anchor = anchor;
        self.over_popover = false;
        self.min_visible_until = None;
        self.phase = HoverPhase::Arming {
            show_at: now + self.timing.show_delay,
        };
        changed
    }

    /// Pointer left the hover zone.
    pub fn pointer_leave_zone(&mut self, _now: Instant) {
        self.over_zone = false;
        match self.phase {
            HoverPhase::Arming { .. } => self.phase = HoverPhase::Idle,
            HoverPhase::Visible if !self.over_popover => self.phase = HoverPhase::Closing,
            _ => {}
        }
    }

    /// Pointer entered the popover.
    pub fn popover_enter(&mut self, now: Instant) {
        if !self.is_visible() {
            return;
        }
        self.over_popover = true;
        self.phase = HoverPhase::Visible;
        self.extend(now);
    }

    /// Pointer activity over the popover extends its visible time.
    pub fn popover_activity(&mut self, now: Instant) {
        if self.is_visible() {
            self.extend(now);
        }
    }

    /// Pointer left the popover.
    pub fn popover_leave(&mut self, _now: Instant) {
        self.over_popover = false;
        if self.phase == HoverPhase::Visible && !self.over_zone {
            self.phase = HoverPhase::Closing;
        }
    }

    /// Advance timers.
    pub fn tick(&mut self, now: Instant) -> HoverPhase {
        match self.phase {
            HoverPhase::Arming { show_at } if now >= show_at => {
                if self.over_zone {
                    self.phase = HoverPhase::Visible;
                    self.min_visible_until = Some(now + self.timing.min_visible);
                    self.shown += 1;
                } else {
                    self.phase = HoverPhase::Idle;
                }
            }
            HoverPhase::Closing
                if !self.over_zone
                    && !self.over_popover
                    && self.min_visible_until.is_none_or(|until| now >= until) =>
            {
                self.phase = HoverPhase::Idle;
                self.min_visible_until = None;
            }
            _ => {}
        }
        self.phase
    }

    /// Drop everything pending or shown.
    pub fn cancel(&mut self) {
        self.phase = HoverPhase::Idle;
        self.over_zone = false;
        self.over_popover = false;
        self.min_visible_until = None;
    }

    fn extend(&mut self, now: Instant) {
        let floor = now + self.timing.popover_extend;
        self.min_visible_until = Some(match self.min_visible_until {
            Some(until) if until > floor => until,
            _ => floor,
        });
    }
}
