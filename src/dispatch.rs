//! First-hit-wins dispatch over the provider registry.

use tracing::{debug, warn};

use crate::answer::Answer;
use crate::cipher;
use crate::registry::ModuleRegistry;

/// Walks the registry in priority order and returns the first answer.
pub struct AnswerDispatcher {
    registry: ModuleRegistry,
}

impl AnswerDispatcher {
    pub fn new(registry: ModuleRegistry) -> Self {
        Self { registry }
    }

    /// Dispatch one message.
    ///
    /// The input is lower-cased once here; providers always observe the
    /// normalized text. The first provider returning an answer wins and no
    /// later provider is consulted. A provider error is logged and counts
    /// as no answer from that provider, so the chain keeps going. If the
    /// winning answer requests the cipher transform it is applied exactly
    /// once, before the answer leaves the dispatcher.
    pub fn dispatch(&self, text: &str) -> Option<Answer> {
        let text = text.to_lowercase();
        for provider in self.registry.providers() {
            match provider.answer(&text) {
                Ok(Some(mut answer)) => {
                    debug!("provider {} answered", provider.name());
                    if answer.wants_cipher() {
                        answer.content = cipher::apply(&answer.content);
                    }
                    return Some(answer);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("provider {} failed: {}", provider.name(), e);
                }
            }
        }
        None
    }
}
