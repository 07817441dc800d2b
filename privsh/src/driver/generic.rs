//! Generic driver implementation that works with any platform.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};
use secrecy::SecretString;

use super::Driver;
use super::SessionState;
use super::navigator::Navigator;
use super::privilege::PrivilegeGraph;
use super::response::Response;
use crate::channel::{MatchKind, SessionChannel};
use crate::error::{DriverError, Result};
use crate::platform::PlatformDefinition;
use crate::transport::TransportOptions;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Built, `open()` not called yet.
    Pending,

    /// Open and at a known or discoverable level.
    Open,

    /// A navigation failure left the privilege level indeterminate.
    Failed,

    /// Closed; the transport has been terminated.
    Closed,
}

/// Generic driver that works with any platform definition.
///
/// This is the session lifecycle manager. It handles:
/// - Open/close through the platform's hooks
/// - Privilege level navigation
/// - Command execution with prompt detection and failure triggers
///
/// One operation runs at a time per driver (every method takes
/// `&mut self`). Separate drivers share nothing mutable and can run on
/// separate tasks.
pub struct GenericDriver {
    /// Device identifier, used in logs.
    host: String,

    /// Platform definition.
    platform: Arc<PlatformDefinition>,

    /// Validated privilege tree.
    graph: Arc<PrivilegeGraph>,

    /// Session channel (None once closed).
    channel: Option<Box<dyn SessionChannel>>,

    /// Navigation state.
    state: SessionState,

    /// Lifecycle status.
    status: SessionStatus,

    /// Default timeout for reads.
    timeout: Duration,

    /// Tail search depth for prompt matching.
    search_depth: usize,

    /// Escalation secret.
    secret: Option<SecretString>,

    /// Options for the caller's transport, passed through untouched.
    transport_options: TransportOptions,
}

impl GenericDriver {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        host: String,
        platform: Arc<PlatformDefinition>,
        graph: Arc<PrivilegeGraph>,
        channel: Box<dyn SessionChannel>,
        timeout: Duration,
        search_depth: usize,
        secret: Option<SecretString>,
        transport_options: TransportOptions,
    ) -> Self {
        let state = SessionState::new(platform.default_privilege.clone());
        Self {
            host,
            platform,
            graph,
            channel: Some(channel),
            state,
            status: SessionStatus::Pending,
            timeout,
            search_depth,
            secret,
            transport_options,
        }
    }

    /// Device identifier given to the builder.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Get a reference to the platform definition.
    pub fn platform(&self) -> &PlatformDefinition {
        &self.platform
    }

    /// Get the privilege graph.
    pub fn privilege_graph(&self) -> &PrivilegeGraph {
        &self.graph
    }

    /// Current navigation state.
    pub fn session_state(&self) -> &SessionState {
        &self.state
    }

    /// Lifecycle status.
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Transport options given to the builder.
    pub fn transport_options(&self) -> &TransportOptions {
        &self.transport_options
    }

    /// Get the read timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Set the default timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    fn ensure_open(&self) -> Result<()> {
        match self.status {
            SessionStatus::Open => Ok(()),
            SessionStatus::Failed => Err(DriverError::SessionFailed.into()),
            SessionStatus::Pending | SessionStatus::Closed => Err(DriverError::NotConnected.into()),
        }
    }

    fn channel_mut(&mut self) -> Result<&mut (dyn SessionChannel + 'static)> {
        self.channel
            .as_deref_mut()
            .ok_or_else(|| DriverError::NotConnected.into())
    }

    /// Mark the session failed if `result` carries a poisoning error.
    fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.poisons_session() {
                warn!("{}: session failed: {}", self.host, e);
                self.status = SessionStatus::Failed;
            }
        }
        result
    }

    /// Write raw bytes without waiting for any prompt.
    pub async fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_open()?;
        let result = self.channel_mut()?.write(data).await;
        self.record(result)
    }

    /// Send the channel's line terminator.
    pub async fn send_return(&mut self) -> Result<()> {
        self.ensure_open()?;
        let result = self.channel_mut()?.send_return().await;
        self.record(result)
    }
}

impl Driver for GenericDriver {
    async fn open(&mut self) -> Result<()> {
        match self.status {
            SessionStatus::Pending => {}
            SessionStatus::Closed => return Err(DriverError::NotConnected.into()),
            SessionStatus::Open | SessionStatus::Failed => {
                return Err(DriverError::AlreadyConnected.into());
            }
        }

        debug!("{}: opening session on platform '{}'", self.host, self.platform.name);
        self.status = SessionStatus::Open;
        self.state = SessionState::new(self.platform.default_privilege.clone());

        let hook = self.platform.on_open.clone();
        hook.run(self).await?;

        let platform = self.platform.clone();
        for cmd in &platform.on_open_commands {
            self.send_command(cmd).await?;
        }

        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let hook_result = match self.status {
            SessionStatus::Closed => return Ok(()),
            SessionStatus::Open => {
                let hook = self.platform.on_close.clone();
                hook.run(self).await
            }
            SessionStatus::Pending | SessionStatus::Failed => Ok(()),
        };

        if let Err(e) = &hook_result {
            warn!("{}: on-close hook failed: {}", self.host, e);
        }

        if let Some(mut channel) = self.channel.take() {
            if let Err(e) = channel.terminate().await {
                warn!("{}: transport terminate failed: {}", self.host, e);
            }
        }

        debug!("{}: session closed", self.host);
        self.status = SessionStatus::Closed;
        self.state.current = None;

        hook_result
    }

    async fn send_command(&mut self, command: &str) -> Result<Response> {
        self.ensure_open()?;
        let start = Instant::now();
        let timeout = self.timeout;
        let mut matcher = self.graph.prompt_matcher(self.search_depth);

        debug!("{}: send_command {:?}", self.host, command);
        let channel = self.channel_mut()?;
        let result = async {
            channel.write(command.as_bytes()).await?;
            channel.send_return().await?;
            channel.read_until(&mut matcher, timeout).await
        }
        .await;
        let found = self.record(result)?;

        let level = match found.kind {
            MatchKind::Prompt { level } => {
                self.state.current = Some(level.clone());
                Some(level)
            }
            _ => None,
        };

        let response = Response::from_capture(
            command,
            String::from_utf8_lossy(&found.captured).into_owned(),
            found.matched,
            level,
            start.elapsed(),
            &self.platform.failed_when_contains,
        );
        if let Some(trigger) = &response.failure_message {
            debug!("{}: {:?} failed: output contains {:?}", self.host, command, trigger);
        }
        Ok(response)
    }

    async fn send_config(&mut self, commands: &[&str]) -> Result<Vec<Response>> {
        let previous = self
            .state
            .current
            .clone()
            .unwrap_or_else(|| self.state.desired.clone());
        let config = self.platform.config_privilege.clone();

        self.acquire_privilege(&config).await?;

        let mut responses = Vec::with_capacity(commands.len());
        for cmd in commands {
            responses.push(self.send_command(cmd).await?);
        }

        self.acquire_privilege(&previous).await?;
        Ok(responses)
    }

    async fn acquire_privilege(&mut self, target: &str) -> Result<()> {
        self.ensure_open()?;

        let channel = self
            .channel
            .as_deref_mut()
            .ok_or(DriverError::NotConnected)?;

        let result = Navigator::new(&self.graph, &self.platform.failed_when_contains)
            .with_secret(self.secret.as_ref())
            .with_timeout(self.timeout)
            .with_search_depth(self.search_depth)
            .acquire(channel, &mut self.state, target)
            .await;

        self.record(result)
    }

    fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }

    fn current_privilege(&self) -> Option<&str> {
        self.state.current()
    }
}
