//! Auto-save scheduling with per-image debouncing.
//!
//! Each edited image gets its own debounce timer. An image becomes due once
//! no further change arrived for the debounce delay. Navigation flushes the
//! current image right away through [`AutoSaveManager::needs_flush`],
//! regardless of the timer.

use std::collections::HashMap;
use std::time::Duration;
use web_time::Instant;

use crate::constants::auto_save::DEBOUNCE;

/// Tracks which images have unsaved edits and when they are due.
#[derive(Debug)]
pub struct AutoSaveManager {
    /// Wait this long after the last change before saving.
    debounce_delay: Duration,

    /// Image key -> time of its last unsaved change.
    pending: HashMap<String, Instant>,

    /// Time of last successful save.
    last_save: Option<Instant>,

    /// Whether timed saves are enabled. Flushes on navigation still happen.
    enabled: bool,
}

impl AutoSaveManager {
    /// Create a new auto-save manager with the default debounce delay.
    pub fn new() -> Self {
        Self {
            debounce_delay: DEBOUNCE,
            pending: HashMap::new(),
            last_save: None,
            enabled: true,
        }
    }

    /// Create a manager with timed saves switched off.
    pub fn disabled() -> Self {
        let mut manager = Self::new();
        manager.enabled = false;
        manager
    }

    /// Set the debounce delay.
    pub fn with_debounce_delay(mut self, delay: Duration) -> Self {
        self.debounce_delay = delay;
        self
    }

    pub fn debounce_delay(&self) -> Duration {
        self.debounce_delay
    }

    /// Record a change to `key`, restarting its timer.
    pub fn mark_dirty(&mut self, key: &str) {
        self.mark_dirty_at(key, Instant::now());
    }

    pub fn mark_dirty_at(&mut self, key: &str, now: Instant) {
        self.pending.insert(key.to_string(), now);
        log::trace!("Auto-save: {} marked dirty", key);
    }

    /// Check if `key` has unsaved changes.
    pub fn is_dirty(&self, key: &str) -> bool {
        self.pending.contains_key(key)
    }

    /// Check if any image has unsaved changes.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Images whose debounce delay has passed, sorted by key.
    pub fn due(&self) -> Vec<String> {
        self.due_at(Instant::now())
    }

    pub fn due_at(&self, now: Instant) -> Vec<String> {
        if !self.enabled {
            return Vec::new();
        }
        let mut keys: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, changed)| now.saturating_duration_since(**changed) >= self.debounce_delay)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Whether `key` has unsaved changes that a flush must write.
    ///
    /// Used before navigating away: the caller saves immediately if this
    /// returns true. The image stays dirty until [`Self::mark_saved`].
    pub fn needs_flush(&self, key: &str) -> bool {
        self.is_dirty(key)
    }

    /// Mark that a save of `key` completed successfully.
    pub fn mark_saved(&mut self, key: &str) {
        self.pending.remove(key);
        self.last_save = Some(Instant::now());
        log::trace!("Auto-save: {} saved", key);
    }

    /// Mark that a save of `key` failed.
    ///
    /// The image stays dirty and its timer restarts, so the next attempt
    /// waits another debounce delay.
    pub fn mark_save_failed(&mut self, key: &str) {
        self.mark_save_failed_at(key, Instant::now());
    }

    pub fn mark_save_failed_at(&mut self, key: &str, now: Instant) {
        self.pending.insert(key.to_string(), now);
        log::trace!("Auto-save: {} save failed", key);
    }

    /// Set whether timed saves are enabled.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        log::debug!("Auto-save: enabled = {}", enabled);
    }

    /// Check if timed saves are enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Get time since last save (if any).
    pub fn time_since_last_save(&self) -> Option<Duration> {
        self.last_save.map(|t| t.elapsed())
    }

    /// Forget all pending changes.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.last_save = None;
    }
}

impl Default for AutoSaveManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let manager = AutoSaveManager::new();
        assert!(!manager.has_pending());
        assert!(manager.due().is_empty());
        assert!(manager.is_enabled());
        assert_eq!(manager.debounce_delay(), Duration::from_millis(800));
    }

    #[test]
    fn test_debounce_prevents_immediate_save() {
        let mut manager = AutoSaveManager::new();
        let t0 = Instant::now();
        manager.mark_dirty_at("a", t0);
        assert!(manager.is_dirty("a"));
        assert!(manager.due_at(t0 + Duration::from_millis(500)).is_empty());
        assert_eq!(manager.due_at(t0 + Duration::from_millis(800)), vec!["a"]);
    }

    #[test]
    fn test_new_change_restarts_timer() {
        let mut manager = AutoSaveManager::new();
        let t0 = Instant::now();
        manager.mark_dirty_at("a", t0);
        manager.mark_dirty_at("a", t0 + Duration::from_millis(600));
        assert!(manager.due_at(t0 + Duration::from_millis(1000)).is_empty());
        assert_eq!(manager.due_at(t0 + Duration::from_millis(1400)), vec!["a"]);
    }

    #[test]
    fn test_images_debounce_independently() {
        let mut manager = AutoSaveManager::new();
        let t0 = Instant::now();
        manager.mark_dirty_at("b", t0);
        manager.mark_dirty_at("a", t0 + Duration::from_millis(500));
        assert_eq!(manager.due_at(t0 + Duration::from_millis(900)), vec!["b"]);
        assert_eq!(manager.due_at(t0 + Duration::from_millis(1300)), vec!["a", "b"]);
    }

    #[test]
    fn test_mark_saved() {
        let mut manager = AutoSaveManager::new();
        manager.mark_dirty("a");
        manager.mark_saved("a");
        assert!(!manager.is_dirty("a"));
        assert!(manager.time_since_last_save().is_some());
    }

    #[test]
    fn test_failed_save_stays_dirty() {
        let mut manager = AutoSaveManager::new();
        let t0 = Instant::now();
        manager.mark_dirty_at("a", t0);
        manager.mark_save_failed_at("a", t0 + Duration::from_millis(900));
        assert!(manager.is_dirty("a"));
        assert!(manager.due_at(t0 + Duration::from_millis(1000)).is_empty());
        assert_eq!(manager.due_at(t0 + Duration::from_millis(1700)), vec!["a"]);
    }

    #[test]
    fn test_disabled_never_due_but_flushes() {
        let mut manager = AutoSaveManager::disabled();
        let t0 = Instant::now();
        manager.mark_dirty_at("a", t0);
        assert!(manager.due_at(t0 + Duration::from_secs(60)).is_empty());
        assert!(manager.needs_flush("a"));
        assert!(!manager.needs_flush("b"));
    }
}
