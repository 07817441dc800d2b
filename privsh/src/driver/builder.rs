//! Builder for creating device drivers.

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use secrecy::SecretString;

use super::generic::GenericDriver;
use super::privilege::PrivilegeGraph;
use crate::channel::SessionChannel;
use crate::error::{DriverError, PlatformError, PrivilegeError, Result};
use crate::platform::{PlatformDefinition, PlatformRegistry, PrivilegeLevel, SessionHook};
use crate::transport::TransportOptions;

/// Builder for constructing device drivers.
///
/// Start from a registered platform (or a custom definition), override what
/// differs for this device, then hand over an established channel.
///
/// # Example
///
/// ```rust,no_run
/// use privsh::{Driver, DriverBuilder, StreamChannel};
///
/// # async fn example(stream: tokio::net::TcpStream) -> Result<(), privsh::Error> {
/// let mut driver = DriverBuilder::new("leaf-1")
///     .platform("sonic")
///     .default_privilege("cli")
///     .build(StreamChannel::new(stream))?;
///
/// driver.open().await?;
/// let response = driver.send_command("show version").await?;
/// println!("{}", response.result);
/// driver.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct DriverBuilder {
    host: String,
    platform_name: Option<String>,
    custom_platform: Option<Arc<PlatformDefinition>>,
    privilege_levels: Option<IndexMap<String, PrivilegeLevel>>,
    default_privilege: Option<String>,
    failed_when_contains: Option<Vec<String>>,
    on_open: Option<Arc<dyn SessionHook>>,
    on_close: Option<Arc<dyn SessionHook>>,
    transport_options: TransportOptions,
    secret: Option<SecretString>,
    timeout: Duration,
    search_depth: usize,
}

impl DriverBuilder {
    /// Create a new driver builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            platform_name: None,
            custom_platform: None,
            privilege_levels: None,
            default_privilege: None,
            failed_when_contains: None,
            on_open: None,
            on_close: None,
            transport_options: TransportOptions::new(),
            secret: None,
            timeout: Duration::from_secs(30),
            search_depth: 1000,
        }
    }

    /// Set the platform name (e.g., "sonic", "arista_eos").
    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform_name = Some(platform.into());
        self
    }

    /// Set a custom platform definition.
    ///
    /// Pass an `Arc` to share one definition between many drivers.
    pub fn custom_platform(mut self, platform: impl Into<Arc<PlatformDefinition>>) -> Self {
        self.custom_platform = Some(platform.into());
        self
    }

    /// Replace the platform's privilege levels.
    pub fn privilege_levels(mut self, levels: IndexMap<String, PrivilegeLevel>) -> Self {
        self.privilege_levels = Some(levels);
        self
    }

    /// Override the level `open()` and `close()` navigate to.
    pub fn default_privilege(mut self, name: impl Into<String>) -> Self {
        self.default_privilege = Some(name.into());
        self
    }

    /// Replace the platform's failure triggers.
    pub fn failed_when_contains<I, S>(mut self, triggers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failed_when_contains = Some(triggers.into_iter().map(Into::into).collect());
        self
    }

    /// Override the on-open hook.
    pub fn on_open(mut self, hook: Arc<dyn SessionHook>) -> Self {
        self.on_open = Some(hook);
        self
    }

    /// Override the on-close hook.
    pub fn on_close(mut self, hook: Arc<dyn SessionHook>) -> Self {
        self.on_close = Some(hook);
        self
    }

    /// Set a free-form transport option.
    pub fn transport_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.transport_options.set(key, value);
        self
    }

    /// Replace all transport options.
    pub fn transport_options(mut self, options: TransportOptions) -> Self {
        self.transport_options = options;
        self
    }

    /// Secret sent when an escalation prompts for authentication.
    pub fn escalation_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(SecretString::from(secret.into()));
        self
    }

    /// Set the read timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set how many trailing bytes are searched for prompts.
    pub fn search_depth(mut self, search_depth: usize) -> Self {
        self.search_depth = search_depth;
        self
    }

    fn base_platform(&mut self) -> Result<Arc<PlatformDefinition>> {
        if let Some(custom) = self.custom_platform.take() {
            return Ok(custom);
        }

        if let Some(name) = self.platform_name.take() {
            let registry = PlatformRegistry::global().read().map_err(|_| {
                PlatformError::InvalidDefinition {
                    message: "Failed to acquire registry lock".to_string(),
                }
            })?;
            return registry
                .get(&name)
                .cloned()
                .ok_or_else(|| PlatformError::UnknownPlatform { name }.into());
        }

        if self.privilege_levels.is_some() {
            return Ok(Arc::new(PlatformDefinition::new(self.host.clone())));
        }

        Err(DriverError::InvalidConfig {
            message: "Platform or privilege levels must be specified".to_string(),
        }
        .into())
    }

    /// Build the driver around an established channel.
    ///
    /// Validates the privilege tree and prompt set; nothing is sent to the
    /// device until `open()`.
    pub fn build(mut self, channel: impl SessionChannel + 'static) -> Result<GenericDriver> {
        let mut platform = self.base_platform()?;

        let overridden = self.privilege_levels.is_some()
            || self.default_privilege.is_some()
            || self.failed_when_contains.is_some()
            || self.on_open.is_some()
            || self.on_close.is_some();
        if overridden {
            let def = Arc::make_mut(&mut platform);
            if let Some(levels) = self.privilege_levels.take() {
                def.privilege_levels = levels;
            }
            if let Some(default) = self.default_privilege.take() {
                def.default_privilege = default;
            }
            if let Some(triggers) = self.failed_when_contains.take() {
                def.failed_when_contains = triggers;
            }
            if let Some(hook) = self.on_open.take() {
                def.on_open = hook;
            }
            if let Some(hook) = self.on_close.take() {
                def.on_close = hook;
            }
        }

        let graph = PrivilegeGraph::new(platform.privilege_levels.clone())?;
        if graph.get(&platform.default_privilege).is_none() {
            return Err(PrivilegeError::UnknownLevel {
                name: platform.default_privilege.clone(),
            }
            .into());
        }

        Ok(GenericDriver::from_parts(
            self.host,
            platform,
            Arc::new(graph),
            Box::new(channel),
            self.timeout,
            self.search_depth,
            self.secret,
            self.transport_options,
        ))
    }
}
