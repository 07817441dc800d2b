//! High-level driver for device interaction.
//!
//! The driver layer provides the main API for navigating privilege levels,
//! sending commands, and opening/closing sessions on network devices.

mod builder;
mod generic;
mod navigator;
mod privilege;
mod response;

pub use builder::DriverBuilder;
pub use generic::{GenericDriver, SessionStatus};
pub use navigator::Navigator;
pub use privilege::{Direction, PrivilegeGraph, Transition};
pub use response::Response;

use std::future::Future;

use crate::error::Result;

/// Trait for device drivers.
pub trait Driver: Send {
    /// Open the session: run the on-open hook, then the platform's
    /// on-open commands.
    fn open(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Close the session: run the on-close hook, then terminate the
    /// transport even if the hook failed.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Send a command and wait for the prompt.
    fn send_command(&mut self, command: &str) -> impl Future<Output = Result<Response>> + Send;

    /// Send multiple commands sequentially.
    fn send_commands(
        &mut self,
        commands: &[&str],
    ) -> impl Future<Output = Result<Vec<Response>>> + Send {
        async move {
            let mut responses = Vec::with_capacity(commands.len());
            for cmd in commands {
                responses.push(self.send_command(cmd).await?);
            }
            Ok(responses)
        }
    }

    /// Send commands in configuration mode.
    ///
    /// This method:
    /// 1. Acquires the configuration privilege level
    /// 2. Sends all the provided commands
    /// 3. Returns to the previous privilege level
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use privsh::driver::Driver;
    ///
    /// # async fn example(driver: &mut impl Driver) -> Result<(), privsh::Error> {
    /// let responses = driver.send_config(&[
    ///     "interface Ethernet0",
    ///     "description Uplink to Core",
    ///     "no shutdown",
    /// ]).await?;
    /// # Ok(())
    /// # }
    /// ```
    fn send_config(
        &mut self,
        commands: &[&str],
    ) -> impl Future<Output = Result<Vec<Response>>> + Send;

    /// Acquire a specific privilege level.
    fn acquire_privilege(&mut self, privilege: &str) -> impl Future<Output = Result<()>> + Send;

    /// Check if the session is open and usable.
    fn is_open(&self) -> bool;

    /// Get the current privilege level name, if known.
    fn current_privilege(&self) -> Option<&str>;
}

/// Per-session navigation state.
///
/// Created at `open()`, written only by the navigator, discarded at
/// `close()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// Best-known current level; `None` until probed.
    pub(crate) current: Option<String>,

    /// Level the lifecycle hooks navigate to.
    pub(crate) desired: String,
}

impl SessionState {
    /// Fresh state with an unknown current level.
    pub fn new(desired: impl Into<String>) -> Self {
        Self {
            current: None,
            desired: desired.into(),
        }
    }

    /// Best-known current level.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Level the lifecycle hooks navigate to.
    pub fn desired(&self) -> &str {
        &self.desired
    }
}
