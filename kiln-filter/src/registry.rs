//! Application registry

use crate::traits::Application;
use kiln_core::error::{Error, Result};
use std::collections::HashMap;

/// Creates a fresh application instance
pub type ApplicationFactory = Box<dyn Fn() -> Box<dyn Application> + Send + Sync>;

/// Named application factories, looked up by the filter's
/// `application_class` setting
pub struct ApplicationRegistry {
    factories: HashMap<String, ApplicationFactory>,
}

impl ApplicationRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory under `name`, replacing any previous one
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Application> + Send + Sync + 'static,
    {
        let name = name.into();
        tracing::debug!("Registering application: {}", name);
        self.factories.insert(name, Box::new(factory));
    }

    /// Instantiate the application registered under `name`
    pub fn create(&self, name: &str) -> Result<Box<dyn Application>> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| Error::Application(format!("Unknown application: {}", name)))
    }

    /// Names of all registered applications
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ApplicationRegistry {
    fn default() -> Self {
        Self::new()
    }
}
