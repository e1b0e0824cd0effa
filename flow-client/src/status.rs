//! Persisted onboarding completion status.

use flow_core::CollectedData;
use serde::{Deserialize, Serialize};

use crate::store::{current_timestamp_ms, ClientStore, STATUS_KEY};
use crate::ClientResult;

/// Whether and how this device finished onboarding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingStatus {
    /// Whether onboarding was completed.
    pub completed: bool,
    /// Version of the flow that was completed.
    #[serde(default)]
    pub flow_version: Option<String>,
    /// Completion time (ms since epoch).
    #[serde(default)]
    pub completed_at: Option<u64>,
    /// Data collected during the completed flow.
    #[serde(default)]
    pub collected_data: CollectedData,
}

/// Reads and writes [`OnboardingStatus`].
#[derive(Debug, Clone)]
pub struct StatusStore {
    store: ClientStore,
}

impl StatusStore {
    /// Create a status store over `store`.
    #[must_use]
    pub fn new(store: ClientStore) -> Self {
        Self { store }
    }

    /// Current status; defaults to not completed.
    ///
    /// # Errors
    ///
    /// Returns an error if the status cannot be read.
    pub fn status(&self) -> ClientResult<OnboardingStatus> {
        Ok(self.store.get(STATUS_KEY)?.unwrap_or_default())
    }

    /// Whether onboarding was completed.
    ///
    /// # Errors
    ///
    /// Returns an error if the status cannot be read.
    pub fn is_completed(&self) -> ClientResult<bool> {
        Ok(self.status()?.completed)
    }

    /// Record completion of `flow_version` with its collected data.
    ///
    /// # Errors
    ///
    /// Returns an error if the status cannot be written.
    pub fn mark_completed(
        &self,
        flow_version: &str,
        collected_data: &CollectedData,
    ) -> ClientResult<OnboardingStatus> {
        let status = OnboardingStatus {
            completed: true,
            flow_version: Some(flow_version.to_string()),
            completed_at: Some(current_timestamp_ms()),
            collected_data: collected_data.clone(),
        };
        self.store.put(STATUS_KEY, &status)?;
        tracing::info!("Onboarding marked completed for flow version {flow_version}");
        Ok(status)
    }

    /// Forget completion so onboarding shows again.
    ///
    /// # Errors
    ///
    /// Returns an error if the status cannot be removed.
    pub fn reset(&self) -> ClientResult<()> {
        self.store.remove(STATUS_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_core::FieldValue;

    #[test]
    fn test_default_is_not_completed() {
        let status = StatusStore::new(ClientStore::new());
        assert!(!status.is_completed().expect("read"));
        assert_eq!(status.status().expect("read"), OnboardingStatus::default());
    }

    #[test]
    fn test_mark_completed_and_reset() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ClientStore::with_data_dir(dir.path()).expect("store");
        let status = StatusStore::new(store);

        let mut data = CollectedData::new();
        data.insert("name".into(), FieldValue::from("Ada"));
        status.mark_completed("9", &data).expect("mark");

        let reopened = StatusStore::new(ClientStore::with_data_dir(dir.path()).expect("store"));
        let persisted = reopened.status().expect("read");
        assert!(persisted.completed);
        assert_eq!(persisted.flow_version.as_deref(), Some("9"));
        assert_eq!(persisted.collected_data["name"], FieldValue::from("Ada"));

        reopened.reset().expect("reset");
        assert!(!reopened.is_completed().expect("read"));
    }
}
