//! Open/close hooks for the session lifecycle.
//!
//! A hook is a capability with a single `run` method. Platforms pick one for
//! open and one for close; callers can swap either through the builder
//! without touching the driver itself.

use async_trait::async_trait;
use log::debug;

use crate::driver::{Driver, GenericDriver};
use crate::error::Result;

/// Device-specific action run by `open()` or `close()`.
#[async_trait]
pub trait SessionHook: Send + Sync {
    /// Run the hook against a live session.
    async fn run(&self, driver: &mut GenericDriver) -> Result<()>;
}

/// Navigate to the platform's default privilege level.
///
/// The standard on-open hook.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcquireDefaultPrivilege;

#[async_trait]
impl SessionHook for AcquireDefaultPrivilege {
    async fn run(&self, driver: &mut GenericDriver) -> Result<()> {
        let target = driver.session_state().desired().to_string();
        driver.acquire_privilege(&target).await
    }
}

/// Return to the default privilege level, then log out.
///
/// The exit command is written raw: once it is sent the shell is gone, so
/// there is no prompt to wait for.
#[derive(Debug, Clone)]
pub struct ExitOnClose {
    exit_command: String,
}

impl ExitOnClose {
    /// Use a custom exit command (e.g. `logout`, `quit`).
    pub fn new(exit_command: impl Into<String>) -> Self {
        Self {
            exit_command: exit_command.into(),
        }
    }

    /// The command written to end the session.
    pub fn exit_command(&self) -> &str {
        &self.exit_command
    }
}

impl Default for ExitOnClose {
    fn default() -> Self {
        Self::new("exit")
    }
}

#[async_trait]
impl SessionHook for ExitOnClose {
    async fn run(&self, driver: &mut GenericDriver) -> Result<()> {
        let target = driver.session_state().desired().to_string();
        driver.acquire_privilege(&target).await?;

        debug!("{}: sending {:?}", driver.host(), self.exit_command);
        driver.write_raw(self.exit_command.as_bytes()).await?;
        driver.send_return().await
    }
}
