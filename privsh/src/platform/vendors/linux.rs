//! Linux platform definition.
//!
//! Standard Linux/Unix shells with `$` (user) and `#` (root) prompts.

use crate::platform::{PlatformDefinition, PrivilegeLevel};

/// Create the Linux platform definition.
pub fn platform() -> PlatformDefinition {
    let user = PrivilegeLevel::new("user", r"[$]\s?$")
        .unwrap()
        .with_sample_prompt("user@host:~$ ")
        .with_sample_prompt("$ ");

    let root = PrivilegeLevel::new("root", r"[#]\s?$")
        .unwrap()
        .with_parent("user")
        .with_escalate("sudo -i")
        .with_deescalate("exit")
        .with_auth(r"[Pp]assword[^:]*:\s?$")
        .unwrap()
        .with_sample_prompt("root@host:~# ");

    PlatformDefinition::new("linux")
        .with_privilege(user)
        .with_privilege(root)
        .with_default_privilege("user")
        .with_config_privilege("root")
        .with_failure_pattern("command not found")
        .with_failure_pattern("No such file or directory")
        .with_failure_pattern("Permission denied")
        .with_failure_pattern("Operation not permitted")
}
