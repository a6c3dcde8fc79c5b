//! The ordered provider list, built once at startup.

use tracing::info;

use crate::provider::{AnswerProvider, InitError};

/// Providers in dispatch priority order.
///
/// The order is the declaration order and never changes after `load()`.
/// There is no deduplication: a provider listed twice runs twice.
pub struct ModuleRegistry {
    providers: Vec<Box<dyn AnswerProvider>>,
}

impl ModuleRegistry {
    /// Initialize every provider in declared order.
    ///
    /// The first `init()` failure aborts the whole load; the registry never
    /// enters service with a partially initialized provider.
    pub fn load(declared: Vec<Box<dyn AnswerProvider>>) -> Result<Self, InitError> {
        let mut providers = declared;
        for provider in providers.iter_mut() {
            provider.init()?;
            info!("loaded provider {}", provider.name());
        }
        Ok(Self { providers })
    }

    pub fn providers(&self) -> &[Box<dyn AnswerProvider>] {
        &self.providers
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
