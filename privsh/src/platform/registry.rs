//! Global platform registry for looking up platform definitions.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};

use log::debug;

use super::definition::PlatformDefinition;
use super::vendors;
use crate::error::{PlatformError, Result};

/// Global platform registry.
static REGISTRY: LazyLock<RwLock<PlatformRegistry>> = LazyLock::new(|| {
    let mut registry = PlatformRegistry::new();
    registry.register_builtin_platforms();
    RwLock::new(registry)
});

/// Registry for platform definitions.
///
/// Definitions are stored behind `Arc` so every driver built from the same
/// platform shares one read-only copy.
#[derive(Debug, Default)]
pub struct PlatformRegistry {
    platforms: HashMap<String, Arc<PlatformDefinition>>,
}

impl PlatformRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            platforms: HashMap::new(),
        }
    }

    /// Get the global registry.
    pub fn global() -> &'static RwLock<PlatformRegistry> {
        &REGISTRY
    }

    fn register_builtin_platforms(&mut self) {
        for platform in [
            vendors::sonic::platform(),
            vendors::arista_eos::platform(),
            vendors::linux::platform(),
        ] {
            self.platforms
                .insert(platform.name.clone(), Arc::new(platform));
        }
    }

    /// Register a platform definition.
    pub fn register(&mut self, platform: PlatformDefinition) -> Result<()> {
        if self.platforms.contains_key(&platform.name) {
            return Err(PlatformError::AlreadyRegistered {
                name: platform.name.clone(),
            }
            .into());
        }
        debug!("registering platform '{}'", platform.name);
        self.platforms
            .insert(platform.name.clone(), Arc::new(platform));
        Ok(())
    }

    /// Get a platform by name.
    pub fn get(&self, name: &str) -> Option<&Arc<PlatformDefinition>> {
        self.platforms.get(name)
    }

    /// Check if a platform is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.platforms.contains_key(name)
    }

    /// List all registered platform names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.platforms.keys().map(String::as_str)
    }
}
