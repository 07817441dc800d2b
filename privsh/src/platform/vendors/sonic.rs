//! SONiC platform definition.
//!
//! SONiC boxes log in to a Linux shell; the routing CLI is a separate
//! program started from it.
//!
//! # Prompt Examples
//!
//! ```text
//! admin@sonic:~$                     # exec (Linux shell)
//! root@sonic:~#                      # exec, after sudo -i
//! sonic#                             # cli (sonic-cli)
//! sonic(config)#                     # configuration
//! sonic(config-if-Ethernet0)#        # config sub-mode
//! ```
//!
//! # Privilege Graph
//!
//! ```text
//! ┌──────┐  sonic-cli  ┌─────┐  configure terminal  ┌───────────────┐
//! │ exec ├─────────────► cli ├──────────────────────► configuration │
//! │  $   │    exit     │  #  │        end           │  (config*)#   │
//! └──────┘◄────────────┴─────┘◄─────────────────────┴───────────────┘
//! ```

use crate::platform::{PlatformDefinition, PrivilegeLevel};

/// Create the SONiC platform definition.
pub fn platform() -> PlatformDefinition {
    // A root shell is still the Linux shell; `sonic-cli` works from either.
    let exec = PrivilegeLevel::new("exec", r"^[\w._-]+@[\w.()_-]+:[\w~./-]*[$#]\s?$")
        .unwrap()
        .with_sample_prompt("admin@sonic:~$ ")
        .with_sample_prompt("admin@leaf-1:/etc/sonic$")
        .with_sample_prompt("root@sonic:~# ");

    // No `@` or `:`, so shell prompts never land here.
    let cli = PrivilegeLevel::new("cli", r"^[\w.\-]{1,63}#\s?$")
        .unwrap()
        .with_parent("exec")
        .with_escalate("sonic-cli")
        .with_deescalate("exit")
        .with_sample_prompt("sonic#")
        .with_sample_prompt("leaf-1# ");

    let configuration = PrivilegeLevel::new(
        "configuration",
        r"^[\w.\-]{1,63}\([\w.\-@/:+]{0,32}\)#\s?$",
    )
    .unwrap()
    .with_parent("cli")
    .with_escalate("configure terminal")
    .with_deescalate("end")
    .with_sample_prompt("sonic(config)#")
    .with_sample_prompt("sonic(config-if-Ethernet0)# ");

    PlatformDefinition::new("sonic")
        .with_privilege(exec)
        .with_privilege(cli)
        .with_privilege(configuration)
        .with_default_privilege("exec")
        .with_failure_pattern("% Ambiguous command")
        .with_failure_pattern("% Incomplete command")
        .with_failure_pattern("% Invalid input detected")
        .with_failure_pattern("% Unknown command")
}
