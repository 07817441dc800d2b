//! Transport collaborator interfaces.
//!
//! privsh never opens connections itself. The caller establishes the
//! SSH/telnet/serial session and hands over something that implements
//! [`SessionChannel`](crate::channel::SessionChannel) and [`Transport`].

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Lifecycle control over the underlying transport.
#[async_trait]
pub trait Transport: Send {
    /// Tear the transport down. Called once, at the end of `close()`.
    async fn terminate(&mut self) -> Result<()>;
}

/// Free-form options for the caller's transport.
///
/// privsh stores these alongside the driver and never interprets them; they
/// exist so a single builder can describe both the device and how to reach
/// it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransportOptions(IndexMap<String, String>);

impl TransportOptions {
    /// Create an empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Get an option value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Iterate options in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of options.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no options are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_keep_insertion_order() {
        let mut options = TransportOptions::new();
        options.set("port", "22");
        options.set("username", "admin");
        options.set("port", "2222");

        let keys: Vec<_> = options.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["port", "username"]);
        assert_eq!(options.get("port"), Some("2222"));
    }

    #[test]
    fn test_options_serde() {
        let options: TransportOptions =
            serde_json::from_str(r#"{"port": "830", "transport": "ssh"}"#).unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options.get("transport"), Some("ssh"));

        let json = serde_json::to_string(&options).unwrap();
        assert_eq!(json, r#"{"port":"830","transport":"ssh"}"#);
    }
}
