//! WebAssembly bindings for fokus
//!
//! The page script constructs one [`Fokus`] per page load, passing render
//! callbacks. State lives in `window.localStorage`, whose calls complete
//! synchronously, so every core future is polled to completion in place.
//! While `isTicking()` is true the script should call `tick()` every
//! `tickPeriodMs()` milliseconds.

use std::future::Future;

use chrono::{DateTime, Utc};
use fk_core::{
    exemption::{duration_from_secs, format_timestamp, EPOCH},
    store::{Store, StoreError},
    Clock, CountdownView, DailyCounters, FokusConfig, FokusError, Host, ManualTicker, MenuAction,
    OverlayController, OverlayView, Renderer, TickOutcome,
};
use futures::FutureExt;
use serde_json::Value;
use wasm_bindgen::prelude::*;

// =============================================================================
// Storage
// =============================================================================

/// [`Store`] over `window.localStorage`, one JSON document per key.
pub struct LocalStorageStore {
    storage: web_sys::Storage,
}

impl LocalStorageStore {
    pub fn from_window() -> Result<Self, StoreError> {
        let window = web_sys::window().ok_or_else(|| StoreError::Unavailable("no window".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(js_unavailable)?
            .ok_or_else(|| StoreError::Unavailable("localStorage is disabled".to_string()))?;
        Ok(Self { storage })
    }
}

impl Store for LocalStorageStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let Some(text) = self.storage.get_item(key).map_err(js_unavailable)? else {
            return Ok(None);
        };
        serde_json::from_str(&text).map(Some).map_err(|e| StoreError::Malformed {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.storage
            .set_item(key, &value.to_string())
            .map_err(js_unavailable)
    }
}

fn js_unavailable(e: JsValue) -> StoreError {
    StoreError::Unavailable(e.as_string().unwrap_or_else(|| format!("{e:?}")))
}

/// Wall clock from `Date.now()`.
pub struct JsClock;

impl Clock for JsClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(js_sys::Date::now() as i64).unwrap_or(EPOCH)
    }
}

// =============================================================================
// Rendering
// =============================================================================

/// Forwards render hooks to page callbacks.
struct JsRenderer {
    on_overlay: js_sys::Function,
    on_countdown: js_sys::Function,
    on_clear: js_sys::Function,
}

impl JsRenderer {
    fn call(&self, callback: &js_sys::Function, arg: &JsValue) {
        if let Err(e) = callback.call1(&JsValue::NULL, arg) {
            log::warn!("render callback threw: {e:?}");
        }
    }
}

impl Renderer for JsRenderer {
    fn show_overlay(&mut self, view: &OverlayView) {
        self.call(&self.on_overlay, &overlay_to_js(view));
    }

    fn show_countdown(&mut self, view: &CountdownView) {
        self.call(&self.on_countdown, &countdown_to_js(view));
    }

    fn clear(&mut self) {
        self.call(&self.on_clear, &JsValue::UNDEFINED);
    }
}

fn set(target: &js_sys::Object, key: &str, value: &JsValue) {
    let _ = js_sys::Reflect::set(target, &key.into(), value);
}

fn stats_to_js(stats: &[(String, u64)]) -> js_sys::Array {
    let array = js_sys::Array::new_with_length(stats.len() as u32);
    for (i, (host, count)) in stats.iter().enumerate() {
        let entry = js_sys::Object::new();
        set(&entry, "host", &JsValue::from_str(host));
        set(&entry, "count", &JsValue::from(*count as f64));
        array.set(i as u32, entry.into());
    }
    array
}

fn overlay_to_js(view: &OverlayView) -> JsValue {
    let result = js_sys::Object::new();
    set(&result, "host", &JsValue::from_str(&view.host));
    set(&result, "grantLabel", &JsValue::from_str(&view.grant_label));
    set(&result, "stats", &stats_to_js(&view.stats));
    result.into()
}

fn countdown_to_js(view: &CountdownView) -> JsValue {
    let result = js_sys::Object::new();
    set(&result, "remainingSecs", &JsValue::from(view.remaining_secs as f64));
    set(&result, "label", &JsValue::from_str(&view.label));
    set(&result, "urgent", &JsValue::from(view.urgent));
    result.into()
}

// =============================================================================
// Logging
// =============================================================================

/// Routes `log` records to the browser console.
struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = JsValue::from_str(&format!("[fokus] {}", record.args()));
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&message),
            log::Level::Warn => web_sys::console::warn_1(&message),
            log::Level::Info => web_sys::console::info_1(&message),
            log::Level::Debug | log::Level::Trace => web_sys::console::debug_1(&message),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

/// Install the console logger. `level` is a `log` level name; default `warn`.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(level: Option<String>) {
    let filter = level
        .as_deref()
        .and_then(|l| l.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Warn);
    // Already installed on a second call; only the level changes.
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(filter);
}

// =============================================================================
// Page API
// =============================================================================

type PageController = OverlayController<LocalStorageStore, JsClock, JsRenderer, ManualTicker>;

/// Poll a storage-backed future that is expected to be ready immediately.
fn ready<F: Future>(future: F) -> Result<F::Output, JsValue> {
    future
        .now_or_never()
        .ok_or_else(|| JsValue::from_str("Storage call did not complete synchronously"))
}

fn to_js_error(e: FokusError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Whole seconds from a JS number; NaN and infinities are refused.
fn exemption_duration(secs: f64) -> Result<chrono::Duration, FokusError> {
    if !secs.is_finite() {
        return Err(FokusError::InvalidDuration(format!("{secs} is not a number of seconds")));
    }
    duration_from_secs(secs.trunc() as i64)
}

fn parse_action(action: &str) -> Option<MenuAction> {
    match action {
        "grantExemption" => Some(MenuAction::GrantExemption),
        "toggleBlocking" => Some(MenuAction::ToggleBlocking),
        "blockHost" => Some(MenuAction::BlockHost),
        "unblockHost" => Some(MenuAction::UnblockHost),
        _ => None,
    }
}

fn action_name(action: MenuAction) -> &'static str {
    match action {
        MenuAction::GrantExemption => "grantExemption",
        MenuAction::ToggleBlocking => "toggleBlocking",
        MenuAction::BlockHost => "blockHost",
        MenuAction::UnblockHost => "unblockHost",
    }
}

/// Overlay controller for the current page.
#[wasm_bindgen]
pub struct Fokus {
    controller: PageController,
}

#[wasm_bindgen]
impl Fokus {
    /// `url` is the page location; `config_json` an optional JSON config.
    #[wasm_bindgen(constructor)]
    pub fn new(
        url: &str,
        config_json: Option<String>,
        on_overlay: js_sys::Function,
        on_countdown: js_sys::Function,
        on_clear: js_sys::Function,
    ) -> Result<Fokus, JsValue> {
        let config = match config_json.as_deref() {
            Some(text) => FokusConfig::from_json(text).map_err(to_js_error)?,
            None => FokusConfig::default(),
        };
        let store = LocalStorageStore::from_window().map_err(|e| JsValue::from_str(&e.to_string()))?;
        let renderer = JsRenderer {
            on_overlay,
            on_countdown,
            on_clear,
        };

        Ok(Fokus {
            controller: OverlayController::new(store, JsClock, renderer, ManualTicker::new(), config, Host::parse(url)),
        })
    }

    pub fn host(&self) -> String {
        self.controller.host().to_string()
    }

    /// Latest decision: `allowed`, `blocked` or `exempt`.
    pub fn decision(&self) -> String {
        self.controller.decision().to_string()
    }

    /// Re-evaluate and re-render; returns the decision.
    pub fn invalidate(&mut self) -> Result<String, JsValue> {
        Ok(ready(self.controller.invalidate())?.to_string())
    }

    /// Returns `{ state, remainingSecs?, decision? }`.
    pub fn tick(&mut self) -> Result<JsValue, JsValue> {
        let result = js_sys::Object::new();
        match ready(self.controller.tick())? {
            TickOutcome::Counting(remaining) => {
                set(&result, "state", &"counting".into());
                set(&result, "remainingSecs", &JsValue::from(remaining as f64));
            }
            TickOutcome::Expired(decision) => {
                set(&result, "state", &"expired".into());
                set(&result, "decision", &JsValue::from_str(&decision.to_string()));
            }
            TickOutcome::Idle => set(&result, "state", &"idle".into()),
        }
        Ok(result.into())
    }

    #[wasm_bindgen(js_name = isTicking)]
    pub fn is_ticking(&self) -> bool {
        self.controller.is_ticking()
    }

    #[wasm_bindgen(js_name = tickPeriodMs)]
    pub fn tick_period_ms(&self) -> Option<f64> {
        self.controller.ticker().period().map(|p| p.as_millis() as f64)
    }

    #[wasm_bindgen(js_name = toggleBlocking)]
    pub fn toggle_blocking(&mut self) -> Result<bool, JsValue> {
        ready(self.controller.toggle_blocking())?.map_err(to_js_error)
    }

    /// Returns the notification text.
    #[wasm_bindgen(js_name = addHost)]
    pub fn add_host(&mut self, host: &str) -> Result<String, JsValue> {
        let host = Host::parse(host);
        let outcome = ready(self.controller.add_host(&host))?.map_err(to_js_error)?;
        Ok(outcome.message(&host))
    }

    #[wasm_bindgen(js_name = removeHost)]
    pub fn remove_host(&mut self, host: &str) -> Result<String, JsValue> {
        let host = Host::parse(host);
        let outcome = ready(self.controller.remove_host(&host))?.map_err(to_js_error)?;
        Ok(outcome.message(&host))
    }

    #[wasm_bindgen(js_name = blockCurrentPage)]
    pub fn block_current_page(&mut self) -> Result<String, JsValue> {
        let outcome = ready(self.controller.block_current_page())?.map_err(to_js_error)?;
        Ok(outcome.message(self.controller.host()))
    }

    #[wasm_bindgen(js_name = unblockCurrentPage)]
    pub fn unblock_current_page(&mut self) -> Result<String, JsValue> {
        let outcome = ready(self.controller.unblock_current_page())?.map_err(to_js_error)?;
        Ok(outcome.message(self.controller.host()))
    }

    /// Open the exemption window for `seconds`, or the configured length.
    /// Returns the deadline as an ISO-8601 string.
    #[wasm_bindgen(js_name = grantExemption)]
    pub fn grant_exemption(&mut self, seconds: Option<f64>) -> Result<String, JsValue> {
        let until = match seconds {
            Some(secs) => {
                let duration = exemption_duration(secs).map_err(to_js_error)?;
                ready(self.controller.grant_exemption(duration))?
            }
            None => ready(self.controller.grant_configured_exemption())?,
        }
        .map_err(to_js_error)?;
        Ok(format_timestamp(until))
    }

    #[wasm_bindgen(js_name = dismissExemption)]
    pub fn dismiss_exemption(&mut self) -> Result<(), JsValue> {
        ready(self.controller.dismiss_exemption())?.map_err(to_js_error)
    }

    /// Returns `[{ label, action }]`.
    #[wasm_bindgen(js_name = menuCommands)]
    pub fn menu_commands(&self) -> Result<js_sys::Array, JsValue> {
        let commands = ready(self.controller.menu_commands())?;
        let array = js_sys::Array::new();
        for command in commands {
            let entry = js_sys::Object::new();
            set(&entry, "label", &JsValue::from_str(&command.label));
            set(&entry, "action", &action_name(command.action).into());
            array.push(&entry);
        }
        Ok(array)
    }

    /// Run a menu action by name; returns the notification text, if any.
    #[wasm_bindgen(js_name = runMenuAction)]
    pub fn run_menu_action(&mut self, action: &str) -> Result<Option<String>, JsValue> {
        let action = parse_action(action).ok_or_else(|| JsValue::from_str(&format!("Unknown menu action: {action}")))?;
        ready(self.controller.run_menu_action(action))?.map_err(to_js_error)
    }

    /// Today's tallies: `{ date, hosts, totalBlocks, totalExemptions }`.
    pub fn stats(&self) -> Result<JsValue, JsValue> {
        let now = self.controller.clock().now();
        let tally = ready(DailyCounters::new(self.controller.store()).snapshot(now))?;
        let result = js_sys::Object::new();
        set(&result, "date", &JsValue::from_str(&tally.date));
        set(&result, "hosts", &stats_to_js(&tally.ranked_hosts()));
        set(&result, "totalBlocks", &JsValue::from(tally.total_blocks() as f64));
        set(&result, "totalExemptions", &JsValue::from(tally.total_exemptions() as f64));
        Ok(result.into())
    }
}

/// Normalized host of `url` (empty when it has none).
#[wasm_bindgen(js_name = extractHost)]
pub fn extract_host_js(url: &str) -> String {
    Host::parse(url).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_action_names() {
        for action in [
            MenuAction::GrantExemption,
            MenuAction::ToggleBlocking,
            MenuAction::BlockHost,
            MenuAction::UnblockHost,
        ] {
            assert_eq!(parse_action(action_name(action)), Some(action));
        }
        assert_eq!(parse_action("reload"), None);
    }

    #[test]
    fn test_extract_host() {
        assert_eq!(extract_host_js("https://www.Reddit.com/r/rust"), "reddit.com");
        assert_eq!(extract_host_js("file:///tmp/notes.html"), "");
    }

    #[test]
    fn test_exemption_duration_from_js_numbers() {
        assert_eq!(exemption_duration(90.7).ok(), Some(chrono::Duration::seconds(90)));
        for secs in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 1e300] {
            assert!(
                matches!(exemption_duration(secs), Err(FokusError::InvalidDuration(_))),
                "{secs}"
            );
        }
    }

    #[test]
    fn test_ready_polls_immediate_futures() {
        assert_eq!(ready(async { 7 }).ok(), Some(7));
    }
}
