//! Overlay controller
//!
//! Keeps what the page shows consistent with persisted state. Every mutating
//! action persists first and then runs an invalidate cycle (re-evaluate,
//! transition, re-render), so the display never lags the store.
//!
//! ## State transitions
//!
//! ```text
//! Allowed -> NoOverlay
//! Blocked -> ShowingOverlay    (block recorded once, on entry)
//! Exempt  -> ShowingCountdown  (ticker running only in this state)
//! ```

use chrono::{DateTime, Duration, Utc};

use crate::clock::Clock;
use crate::config::FokusConfig;
use crate::counters::DailyCounters;
use crate::engine::DecisionEngine;
use crate::error::FokusError;
use crate::exemption::ExemptionWindow;
use crate::policy::BlockListPolicy;
use crate::store::Store;
use crate::ticker::TickSource;
use crate::types::{toggle_message, Decision, HostOutcome, OverlayState};
use crate::url::Host;

// =============================================================================
// Render hooks
// =============================================================================

/// Content of the full-page blocking overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayView {
    pub host: String,
    /// Label of the grant action, e.g. `Enable for 5 minutes`
    pub grant_label: String,
    /// Today's block tallies, highest first
    pub stats: Vec<(String, u64)>,
}

/// Content of the countdown indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountdownView {
    pub remaining_secs: i64,
    /// `m:ss`
    pub label: String,
    pub urgent: bool,
}

impl CountdownView {
    pub fn new(remaining_secs: i64, urgent_threshold_secs: i64) -> Self {
        let secs = remaining_secs.max(0);
        Self {
            remaining_secs,
            label: format!("{}:{:02}", secs / 60, secs % 60),
            urgent: remaining_secs <= urgent_threshold_secs,
        }
    }
}

/// Presentation layer. Owns whatever DOM or terminal output exists.
pub trait Renderer {
    fn show_overlay(&mut self, view: &OverlayView);
    fn show_countdown(&mut self, view: &CountdownView);
    /// Remove any overlay or countdown.
    fn clear(&mut self);
}

// =============================================================================
// Menu
// =============================================================================

/// Action behind a context-menu entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    GrantExemption,
    ToggleBlocking,
    BlockHost,
    UnblockHost,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuCommand {
    pub label: String,
    pub action: MenuAction,
}

/// Result of one countdown pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still exempt; seconds left.
    Counting(i64),
    /// The window closed and the controller re-evaluated to this decision.
    Expired(Decision),
    /// Not in the countdown state; the pulse source was stopped.
    Idle,
}

// =============================================================================
// Controller
// =============================================================================

/// State machine over [`OverlayState`] for the current page's host.
pub struct OverlayController<S, C, R, T> {
    store: S,
    clock: C,
    renderer: R,
    ticker: T,
    config: FokusConfig,
    host: Host,
    state: OverlayState,
    decision: Decision,
}

impl<S, C, R, T> OverlayController<S, C, R, T>
where
    S: Store,
    C: Clock,
    R: Renderer,
    T: TickSource,
{
    /// Controller for a page on `host`. Nothing is shown until the first
    /// [`invalidate`](Self::invalidate).
    pub fn new(store: S, clock: C, renderer: R, ticker: T, config: FokusConfig, host: Host) -> Self {
        Self {
            store,
            clock,
            renderer,
            ticker,
            config,
            host,
            state: OverlayState::NoOverlay,
            decision: Decision::Allowed,
        }
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    /// Decision from the latest invalidate cycle.
    pub fn decision(&self) -> Decision {
        self.decision
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn ticker(&self) -> &T {
        &self.ticker
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_running()
    }

    /// Evaluate `host` at `now` without touching the UI.
    pub async fn decide(&self, host: &Host, now: DateTime<Utc>) -> Decision {
        DecisionEngine::new(&self.store).decide(host, now).await
    }

    /// Re-evaluate and re-render.
    pub async fn invalidate(&mut self) -> Decision {
        let now = self.clock.now();
        let eval = DecisionEngine::new(&self.store).evaluate(&self.host, now).await;
        let next = OverlayState::from(eval.decision);
        let previous = std::mem::replace(&mut self.state, next);
        self.decision = eval.decision;

        if previous != next {
            log::debug!("{}: {previous:?} -> {next:?}", self.host);
        }

        if next != OverlayState::ShowingCountdown && self.ticker.is_running() {
            self.ticker.stop();
        }

        match next {
            OverlayState::ShowingOverlay => {
                if previous != OverlayState::ShowingOverlay {
                    if let Err(e) = DailyCounters::new(&self.store).record_block(&self.host, now).await {
                        log::warn!("failed to record block of {}: {e}", self.host);
                    }
                }
                let view = self.overlay_view(now).await;
                self.renderer.show_overlay(&view);
            }
            OverlayState::ShowingCountdown => {
                if !self.ticker.is_running() {
                    self.ticker.start(self.config.tick_period());
                }
                let view = CountdownView::new(eval.remaining_secs, self.config.urgent_threshold_secs);
                self.renderer.show_countdown(&view);
            }
            OverlayState::NoOverlay => {
                if previous != OverlayState::NoOverlay {
                    self.renderer.clear();
                }
            }
        }

        self.decision
    }

    /// Handle one countdown pulse.
    pub async fn tick(&mut self) -> TickOutcome {
        if self.state != OverlayState::ShowingCountdown {
            self.ticker.stop();
            return TickOutcome::Idle;
        }

        let now = self.clock.now();
        let remaining = ExemptionWindow::new(&self.store).remaining_seconds(now).await;
        if remaining <= 0 {
            self.ticker.stop();
            return TickOutcome::Expired(self.invalidate().await);
        }

        let view = CountdownView::new(remaining, self.config.urgent_threshold_secs);
        self.renderer.show_countdown(&view);
        TickOutcome::Counting(remaining)
    }

    // ── Actions ──────────────────────────────────────────────────────

    /// Flip the global enable flag; returns the new value.
    pub async fn toggle_blocking(&mut self) -> Result<bool, FokusError> {
        let result = BlockListPolicy::new(&self.store).toggle().await;
        self.invalidate().await;
        Ok(result?)
    }

    pub async fn add_host(&mut self, host: &Host) -> Result<HostOutcome, FokusError> {
        let result = BlockListPolicy::new(&self.store).add(host).await;
        self.invalidate().await;
        Ok(result?)
    }

    pub async fn remove_host(&mut self, host: &Host) -> Result<HostOutcome, FokusError> {
        let result = BlockListPolicy::new(&self.store).remove(host).await;
        self.invalidate().await;
        Ok(result?)
    }

    pub async fn block_current_page(&mut self) -> Result<HostOutcome, FokusError> {
        let host = self.host.clone();
        self.add_host(&host).await
    }

    pub async fn unblock_current_page(&mut self) -> Result<HostOutcome, FokusError> {
        let host = self.host.clone();
        self.remove_host(&host).await
    }

    /// Open the global window for `duration` from now, replacing any open
    /// window, and count the exemption against the current host.
    ///
    /// Non-positive or out-of-range durations fail with
    /// [`FokusError::InvalidDuration`] and leave state untouched.
    pub async fn grant_exemption(&mut self, duration: Duration) -> Result<DateTime<Utc>, FokusError> {
        let now = self.clock.now();
        let result = ExemptionWindow::new(&self.store).grant(now, duration).await;
        match &result {
            Ok(_) => {
                if let Err(e) = DailyCounters::new(&self.store).record_exemption(&self.host, now).await {
                    log::warn!("failed to record exemption for {}: {e}", self.host);
                }
            }
            Err(FokusError::InvalidDuration(reason)) => {
                log::debug!("refused exemption for {}: {reason}", self.host);
                return result;
            }
            Err(_) => {}
        }
        self.invalidate().await;
        result
    }

    /// Grant the configured exemption length.
    pub async fn grant_configured_exemption(&mut self) -> Result<DateTime<Utc>, FokusError> {
        let duration = self.config.exemption_duration();
        self.grant_exemption(duration).await
    }

    /// Close the exemption window early.
    pub async fn dismiss_exemption(&mut self) -> Result<(), FokusError> {
        let result = ExemptionWindow::new(&self.store).clear().await;
        self.invalidate().await;
        Ok(result?)
    }

    /// Count a block of `host` today; returns its running total.
    pub async fn record_block(&self, host: &Host) -> Result<u64, FokusError> {
        let now = self.clock.now();
        Ok(DailyCounters::new(&self.store).record_block(host, now).await?)
    }

    // ── Menu ─────────────────────────────────────────────────────────

    /// Context-menu entries for the current page.
    pub async fn menu_commands(&self) -> Vec<MenuCommand> {
        let policy = BlockListPolicy::new(&self.store);
        let enabled = policy.is_enabled().await;
        let listed = enabled && policy.matches(&self.host).await;

        vec![
            MenuCommand {
                label: self.config.grant_label(),
                action: MenuAction::GrantExemption,
            },
            MenuCommand {
                label: format!("{} Blocking", if enabled { "Disable" } else { "Enable" }),
                action: MenuAction::ToggleBlocking,
            },
            if listed {
                MenuCommand {
                    label: format!("Unblock {}", self.host),
                    action: MenuAction::UnblockHost,
                }
            } else {
                MenuCommand {
                    label: format!("Block {}", self.host),
                    action: MenuAction::BlockHost,
                }
            },
        ]
    }

    /// Run a menu entry; returns the notification text, if any.
    pub async fn run_menu_action(&mut self, action: MenuAction) -> Result<Option<String>, FokusError> {
        match action {
            MenuAction::GrantExemption => {
                self.grant_configured_exemption().await?;
                Ok(None)
            }
            MenuAction::ToggleBlocking => {
                let enabled = self.toggle_blocking().await?;
                Ok(Some(toggle_message(enabled)))
            }
            MenuAction::BlockHost => {
                let outcome = self.block_current_page().await?;
                Ok(Some(outcome.message(&self.host)))
            }
            MenuAction::UnblockHost => {
                let outcome = self.unblock_current_page().await?;
                Ok(Some(outcome.message(&self.host)))
            }
        }
    }

    async fn overlay_view(&self, now: DateTime<Utc>) -> OverlayView {
        let tally = DailyCounters::new(&self.store).snapshot(now).await;
        OverlayView {
            host: self.host.to_string(),
            grant_label: self.config.grant_label(),
            stats: tally.ranked_hosts(),
        }
    }
}

#[cfg(feature = "runtime")]
impl<S, C, R> OverlayController<S, C, R, crate::ticker::Ticker>
where
    S: Store,
    C: Clock,
    R: Renderer,
{
    /// Drive the countdown until the controller leaves `ShowingCountdown`.
    pub async fn run_countdown(&mut self) -> Decision {
        while self.state == OverlayState::ShowingCountdown {
            if self.ticker.pulse().await.is_none() {
                break;
            }
            self.tick().await;
        }
        self.decision
    }
}
