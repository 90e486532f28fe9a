//! Merge configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::{MergeError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    /// Maximum number of results to emit. Once reached, no further source
    /// reads are issued.
    pub limit: Option<usize>,

    /// Check that every source is non-decreasing under the comparer and fail
    /// with `OrderingViolation` when it is not. Costs one comparison per read.
    pub verify_order: bool,

    /// Number of key/value pairs requested per range read.
    pub page_size: usize,

    /// Advance several cursors concurrently when one step needs more than one
    /// of them to move. When off, they advance one after another in index order.
    pub concurrent_advance: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            limit: None,
            verify_order: cfg!(debug_assertions),
            page_size: 256,
            concurrent_advance: true,
        }
    }
}

impl MergeOptions {
    /// Create options from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `KVMERGE_LIMIT`: maximum number of results
    /// - `KVMERGE_VERIFY_ORDER`: `true`/`false`
    /// - `KVMERGE_PAGE_SIZE`: pairs per range read
    /// - `KVMERGE_CONCURRENT_ADVANCE`: `true`/`false`
    ///
    /// Unparseable values are ignored, like missing ones.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("KVMERGE_LIMIT") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.limit = Some(v);
            }
        }

        if let Ok(s) = std::env::var("KVMERGE_VERIFY_ORDER") {
            if let Some(v) = parse_flag(&s) {
                cfg.verify_order = v;
            }
        }

        if let Ok(s) = std::env::var("KVMERGE_PAGE_SIZE") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.page_size = v;
            }
        }

        if let Ok(s) = std::env::var("KVMERGE_CONCURRENT_ADVANCE") {
            if let Some(v) = parse_flag(&s) {
                cfg.concurrent_advance = v;
            }
        }

        cfg
    }

    /// Parse options from JSON. Missing fields take their default value.
    pub fn from_json(s: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(MergeError::Config("page_size must be at least 1".into()));
        }
        Ok(())
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_verify_order(mut self, on: bool) -> Self {
        self.verify_order = on;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_concurrent_advance(mut self, on: bool) -> Self {
        self.concurrent_advance = on;
        self
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    // The environment is process-wide; tests that touch it take this lock.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const VARS: [&str; 4] = [
        "KVMERGE_LIMIT",
        "KVMERGE_VERIFY_ORDER",
        "KVMERGE_PAGE_SIZE",
        "KVMERGE_CONCURRENT_ADVANCE",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_from_env_reads_variables() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        std::env::set_var("KVMERGE_LIMIT", "5");
        std::env::set_var("KVMERGE_VERIFY_ORDER", "yes");
        std::env::set_var("KVMERGE_PAGE_SIZE", "64");
        std::env::set_var("KVMERGE_CONCURRENT_ADVANCE", "off");

        let cfg = MergeOptions::from_env();
        clear_env();

        assert_eq!(cfg.limit, Some(5));
        assert!(cfg.verify_order);
        assert_eq!(cfg.page_size, 64);
        assert!(!cfg.concurrent_advance);
    }

    #[test]
    fn test_from_env_ignores_unparseable_values() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        std::env::set_var("KVMERGE_LIMIT", "-3");
        std::env::set_var("KVMERGE_VERIFY_ORDER", "sometimes");
        std::env::set_var("KVMERGE_PAGE_SIZE", "lots");
        std::env::set_var("KVMERGE_CONCURRENT_ADVANCE", "");

        let cfg = MergeOptions::from_env();
        clear_env();

        assert_eq!(cfg, MergeOptions::default());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg = MergeOptions::from_json(r#"{ "limit": 10, "page_size": 16 }"#).unwrap();
        assert_eq!(cfg.limit, Some(10));
        assert_eq!(cfg.page_size, 16);
        assert!(cfg.concurrent_advance);
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let err = MergeOptions::from_json(r#"{ "page_size": 0 }"#).unwrap_err();
        assert!(matches!(err, MergeError::Config(_)));
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag(" TRUE "), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
