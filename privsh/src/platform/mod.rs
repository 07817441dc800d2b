//! Platform definitions for multi-vendor support.
//!
//! A platform bundles a device family's privilege levels, failure triggers,
//! and open/close hooks. Definitions are immutable once built and are
//! shared between sessions through `Arc`.

mod definition;
mod hooks;
mod privilege_level;
mod registry;
pub mod vendors;

pub use definition::PlatformDefinition;
pub use hooks::{AcquireDefaultPrivilege, ExitOnClose, SessionHook};
pub use privilege_level::{PrivilegeLevel, PrivilegeLevelDef};
pub use registry::PlatformRegistry;
