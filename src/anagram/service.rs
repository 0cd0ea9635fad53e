use super::{is_anagram, normalize, AnagramRecord, AnagramStore, StoreError};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Check-then-compute lookup over an [`AnagramStore`].
#[derive(Clone)]
pub struct AnagramService {
    store: Arc<dyn AnagramStore>,
}

impl AnagramService {
    #[must_use]
    pub fn new(store: Arc<dyn AnagramStore>) -> Self {
        Self { store }
    }

    /// Return the memoized result for the pair, computing and storing it on a miss.
    ///
    /// # Errors
    /// Returns [`StoreError`] if the store cannot be queried or written.
    #[instrument(skip(self))]
    pub async fn check_or_compute(&self, one: &str, two: &str) -> Result<bool, StoreError> {
        let one = normalize(one);
        let two = normalize(two);

        if let Some(stored) = self.store.find_pair(&one, &two).await? {
            debug!("stored result: {}", stored);
            return Ok(stored);
        }

        let result = is_anagram(&one, &two);

        self.store
            .insert(&AnagramRecord {
                string_one: one,
                string_two: two,
                is_anagram: result,
            })
            .await?;

        debug!("computed result: {}", result);

        Ok(result)
    }

    /// # Errors
    /// Returns [`StoreError`] if the store is unreachable.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }
}

impl std::fmt::Debug for AnagramService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnagramService").finish_non_exhaustive()
    }
}
