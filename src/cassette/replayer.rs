//! Replays recorded interactions from a cassette.

use std::collections::HashMap;

use super::format::{Cassette, Interaction};

/// Key for indexing interactions by port, method and call input.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
struct InteractionKey {
    port: String,
    method: String,
    input: String,
}

impl InteractionKey {
    fn new(port: &str, method: &str, input: &serde_json::Value) -> Self {
        Self { port: port.to_string(), method: method.to_string(), input: input.to_string() }
    }
}

/// Replays interactions from a loaded cassette.
///
/// Interactions are matched on their input rather than on global order, so
/// calls that race each other (two concurrent fetches) replay correctly.
/// Repeated calls with the same input are served in recorded order; the last
/// one is reused once the queue runs dry.
pub struct CassetteReplayer {
    queues: HashMap<InteractionKey, Vec<Interaction>>,
    cursors: HashMap<InteractionKey, usize>,
}

impl CassetteReplayer {
    /// Create a new replayer from a loaded cassette.
    #[must_use]
    pub fn new(cassette: &Cassette) -> Self {
        let mut queues: HashMap<InteractionKey, Vec<Interaction>> = HashMap::new();
        for interaction in &cassette.interactions {
            let key = InteractionKey::new(&interaction.port, &interaction.method, &interaction.input);
            queues.entry(key).or_default().push(interaction.clone());
        }
        let cursors = queues.keys().map(|k| (k.clone(), 0)).collect();
        Self { queues, cursors }
    }

    /// Return the next interaction recorded for the given call.
    ///
    /// # Errors
    ///
    /// Returns an error naming the recorded inputs if nothing matches.
    pub fn next_interaction(
        &mut self,
        port: &str,
        method: &str,
        input: &serde_json::Value,
    ) -> Result<&Interaction, String> {
        let key = InteractionKey::new(port, method, input);

        let Some(queue) = self.queues.get(&key) else {
            let available: Vec<&str> = self
                .queues
                .keys()
                .filter(|k| k.port == port && k.method == method)
                .map(|k| k.input.as_str())
                .collect();
            return Err(format!(
                "Cassette has no interaction for {port}::{method} with input {input}. \
                 Recorded inputs: [{}]",
                available.join(", ")
            ));
        };

        let cursor = self.cursors.entry(key).or_insert(0);
        let index = (*cursor).min(queue.len() - 1);
        *cursor += 1;
        Ok(&queue[index])
    }
}
