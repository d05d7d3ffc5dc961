// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Service configuration.

/// Settings for a [`TransactionService`](crate::TransactionService).
///
/// With the `serde` feature this can be read from any serde format; missing fields take their
/// default.
///
/// ```
/// # #[cfg(feature = "json")] {
/// use txlog::Config;
///
/// let config: Config = serde_json::from_str(r#"{ "enabled": false }"#).unwrap();
/// assert!(!config.enabled);
/// assert!(Config::default().enabled);
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(::serde::Deserialize, ::serde::Serialize),
    serde(default)
)]
pub struct Config {
    /// When false the service runs in pass-through mode: every `add` is refused and nothing is
    /// tracked.
    pub enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// A configuration for a pass-through service.
    pub fn disabled() -> Self {
        Self { enabled: false }
    }
}
