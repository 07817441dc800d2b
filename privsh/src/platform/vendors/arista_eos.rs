//! Arista EOS platform definition.
//!
//! # Prompt Examples
//!
//! ```text
//! switch>                            # exec mode
//! switch#                            # privilege_exec mode
//! switch(config)#                    # configuration mode
//! switch(config-if-Et1)#             # config sub-mode (interface)
//! ```
//!
//! # Privilege Graph
//!
//! ```text
//! ┌──────┐  enable     ┌────────────────┐  configure terminal  ┌───────────────┐
//! │ exec ├──────────────► privilege_exec ├──────────────────────► configuration │
//! │  >   │   disable   │       #        │        end           │  (config*)#   │
//! └──────┘◄────────────┴────────────────┘◄─────────────────────┴───────────────┘
//! ```
//!
//! `enable` may ask for a password; set one with
//! [`DriverBuilder::escalation_secret`](crate::DriverBuilder::escalation_secret).

use crate::platform::{PlatformDefinition, PrivilegeLevel};

/// Create the Arista EOS platform definition.
pub fn platform() -> PlatformDefinition {
    let exec = PrivilegeLevel::new("exec", r"^[\w.\-@()/: ]{1,63}>\s?$")
        .unwrap()
        .with_sample_prompt("switch>")
        .with_sample_prompt("admin@switch.lab> ");

    // The raw pattern also matches config prompts; not_contains filters them.
    let privilege_exec = PrivilegeLevel::new("privilege_exec", r"^[\w.\-@()/: ]{1,63}#\s?$")
        .unwrap()
        .with_parent("exec")
        .with_escalate("enable")
        .with_deescalate("disable")
        .with_auth(r"^password:\s?$")
        .unwrap()
        .with_not_contains("(config")
        .with_sample_prompt("switch#")
        .with_sample_prompt("switch# ");

    let configuration = PrivilegeLevel::new(
        "configuration",
        r"^[\w.\-@()/: ]{1,63}\(config[\w.\-@/:+]{0,63}\)#\s?$",
    )
    .unwrap()
    .with_parent("privilege_exec")
    .with_escalate("configure terminal")
    .with_deescalate("end")
    .with_sample_prompt("switch(config)#")
    .with_sample_prompt("switch(config-if-Et1)# ");

    PlatformDefinition::new("arista_eos")
        .with_privilege(exec)
        .with_privilege(privilege_exec)
        .with_privilege(configuration)
        .with_default_privilege("privilege_exec")
        .with_failure_pattern("% Ambiguous command")
        .with_failure_pattern("% Error")
        .with_failure_pattern("% Incomplete command")
        .with_failure_pattern("% Invalid input")
        .with_failure_pattern("% Cannot commit")
        .with_failure_pattern("% Unavailable command")
        .with_on_open_command("terminal length 0")
        .with_on_open_command("terminal width 32767")
}
