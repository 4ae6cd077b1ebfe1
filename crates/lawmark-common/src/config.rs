//! Timing configuration for the synchronization engine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The engine's coalescing and handoff cadences, in milliseconds.
///
/// Defaults match the behavior the engine was tuned against: re-renders
/// are debounced well below typing speed, preview offset notifications
/// fire eagerly but no more than ten times a second, and the initial
/// push waits for the surface's first paint before offsets mean
/// anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Window for coalescing re-render pushes on text change.
    pub render_debounce_ms: u64,
    /// Window for preview-side viewport-center notifications.
    pub offset_notify_ms: u64,
    /// Lead-in before the first viewport-center notification in a burst.
    pub offset_notify_lead_in_ms: u64,
    /// Window for persisting the preview scroll-ratio memo.
    pub ratio_memo_ms: u64,
    /// Delay before the first document push after opening a preview.
    pub initial_paint_delay_ms: u64,
    /// Delay between the first push and the follow-up refresh.
    pub initial_refresh_delay_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            render_debounce_ms: 300,
            offset_notify_ms: 100,
            offset_notify_lead_in_ms: 0,
            ratio_memo_ms: 500,
            initial_paint_delay_ms: 100,
            initial_refresh_delay_ms: 300,
        }
    }
}

impl SyncConfig {
    /// Render-coalescing window as a `Duration`.
    pub fn render_debounce(&self) -> Duration {
        Duration::from_millis(self.render_debounce_ms)
    }

    /// Offset-notification window as a `Duration`.
    pub fn offset_notify(&self) -> Duration {
        Duration::from_millis(self.offset_notify_ms)
    }

    /// Offset-notification lead-in as a `Duration`.
    pub fn offset_notify_lead_in(&self) -> Duration {
        Duration::from_millis(self.offset_notify_lead_in_ms)
    }

    /// Scroll-ratio memo window as a `Duration`.
    pub fn ratio_memo(&self) -> Duration {
        Duration::from_millis(self.ratio_memo_ms)
    }

    /// Initial paint delay as a `Duration`.
    pub fn initial_paint_delay(&self) -> Duration {
        Duration::from_millis(self.initial_paint_delay_ms)
    }

    /// Initial refresh delay as a `Duration`.
    pub fn initial_refresh_delay(&self) -> Duration {
        Duration::from_millis(self.initial_refresh_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: SyncConfig = serde_json::from_str(r#"{"render_debounce_ms": 50}"#).unwrap();
        assert_eq!(config.render_debounce_ms, 50);
        assert_eq!(config.offset_notify_ms, 100);
        assert_eq!(config.initial_paint_delay_ms, 100);
    }

    #[test]
    fn test_duration_accessors() {
        let config = SyncConfig::default();
        assert_eq!(config.render_debounce(), Duration::from_millis(300));
        assert_eq!(config.offset_notify_lead_in(), Duration::ZERO);
    }
}
