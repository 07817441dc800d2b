//! Device family definitions.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use super::hooks::{AcquireDefaultPrivilege, ExitOnClose, SessionHook};
use super::privilege_level::PrivilegeLevel;

/// Everything privsh knows about a device family.
///
/// Built once, then shared read-only by every session that uses it.
#[derive(Clone)]
pub struct PlatformDefinition {
    /// Platform name (e.g., "sonic", "arista_eos", "linux").
    pub name: String,

    /// Privilege levels keyed by name.
    pub privilege_levels: IndexMap<String, PrivilegeLevel>,

    /// Level that `open()` and `close()` navigate to.
    pub default_privilege: String,

    /// Level `send_config` runs commands in.
    pub config_privilege: String,

    /// Substrings that indicate command failure.
    pub failed_when_contains: Vec<String>,

    /// Commands to run after the on-open hook.
    pub on_open_commands: Vec<String>,

    /// Hook run by `open()`.
    pub on_open: Arc<dyn SessionHook>,

    /// Hook run by `close()` before the transport is terminated.
    pub on_close: Arc<dyn SessionHook>,
}

impl PlatformDefinition {
    /// Empty definition. Defaults to acquiring the default privilege on open and to
    /// [`ExitOnClose`] on close.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            privilege_levels: IndexMap::new(),
            default_privilege: String::new(),
            config_privilege: "configuration".to_string(),
            failed_when_contains: vec![],
            on_open_commands: vec![],
            on_open: Arc::new(AcquireDefaultPrivilege),
            on_close: Arc::new(ExitOnClose::default()),
        }
    }

    /// Add a level, keyed by its name.
    pub fn with_privilege(mut self, level: PrivilegeLevel) -> Self {
        self.privilege_levels.insert(level.name.clone(), level);
        self
    }

    /// Level `open()` and `close()` navigate to.
    pub fn with_default_privilege(mut self, name: impl Into<String>) -> Self {
        self.default_privilege = name.into();
        self
    }

    /// Level `send_config` runs in.
    pub fn with_config_privilege(mut self, name: impl Into<String>) -> Self {
        self.config_privilege = name.into();
        self
    }

    /// Add a failure trigger substring.
    pub fn with_failure_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.failed_when_contains.push(pattern.into());
        self
    }

    /// Add a command run after the on-open hook.
    pub fn with_on_open_command(mut self, command: impl Into<String>) -> Self {
        self.on_open_commands.push(command.into());
        self
    }

    /// Set the on-open hook.
    pub fn with_on_open(mut self, hook: Arc<dyn SessionHook>) -> Self {
        self.on_open = hook;
        self
    }

    /// Set the on-close hook.
    pub fn with_on_close(mut self, hook: Arc<dyn SessionHook>) -> Self {
        self.on_close = hook;
        self
    }

    /// Look up a level.
    pub fn get_privilege(&self, name: &str) -> Option<&PrivilegeLevel> {
        self.privilege_levels.get(name)
    }
}

impl fmt::Debug for PlatformDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformDefinition")
            .field("name", &self.name)
            .field("privilege_levels", &self.privilege_levels)
            .field("default_privilege", &self.default_privilege)
            .field("config_privilege", &self.config_privilege)
            .field("failed_when_contains", &self.failed_when_contains)
            .field("on_open_commands", &self.on_open_commands)
            .field("on_open", &"<SessionHook>")
            .field("on_close", &"<SessionHook>")
            .finish()
    }
}
