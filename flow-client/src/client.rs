//! The onboarding client: config loading, identity, telemetry and status.

use std::sync::Arc;

use flow_core::{CollectedData, FlowConfig, FlowController, FlowObserver, TelemetrySink, Viewport};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::batcher::{EventBatcher, FlushReport, FlushTask};
use crate::cache::ConfigCache;
use crate::http::HttpTransport;
use crate::identity::Identity;
use crate::status::{OnboardingStatus, StatusStore};
use crate::store::ClientStore;
use crate::transport::{ConfigSource, EventTransport};
use crate::{ClientResult, SdkConfig};

/// Where a loaded configuration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// Fetched from the backend just now.
    Remote,
    /// Served from the local cache after a failed fetch.
    Cache {
        /// Whether the entry is older than the cache TTL.
        stale: bool,
    },
}

/// A flow configuration plus its origin.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    /// The configuration.
    pub config: FlowConfig,
    /// Where it came from.
    pub origin: ConfigOrigin,
}

/// Entry point for hosts: owns the transports and all persisted state.
///
/// There is no global instance; create one client per app and share it.
pub struct OnboardingClient {
    config: SdkConfig,
    source: Arc<dyn ConfigSource>,
    transport: Arc<dyn EventTransport>,
    identity: Arc<Identity>,
    cache: ConfigCache,
    status: StatusStore,
    batcher: Arc<EventBatcher>,
}

impl OnboardingClient {
    /// Create a client talking HTTP to `config.base_url`.
    ///
    /// State lives under `config.data_dir`, or in memory when unset.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the store cannot be opened.
    pub fn new(config: SdkConfig) -> ClientResult<Self> {
        let store = match &config.data_dir {
            Some(dir) => ClientStore::with_data_dir(dir)?,
            None => ClientStore::new(),
        };
        let http = Arc::new(HttpTransport::new(&config)?);
        Self::with_services(config, store, http.clone(), http)
    }

    /// Create a client over explicit services.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity cannot be loaded from `store`.
    pub fn with_services(
        config: SdkConfig,
        store: ClientStore,
        source: Arc<dyn ConfigSource>,
        transport: Arc<dyn EventTransport>,
    ) -> ClientResult<Self> {
        let identity = Arc::new(Identity::load(store.clone())?);
        let batcher = Arc::new(EventBatcher::new(
            Arc::clone(&transport),
            Arc::clone(&identity),
            config.batch_size,
            config.max_queue,
            config.retry.clone(),
        ));
        Ok(Self {
            cache: ConfigCache::new(store.clone(), config.cache_ttl),
            status: StatusStore::new(store),
            config,
            source,
            transport,
            identity,
            batcher,
        })
    }

    /// The SDK configuration.
    #[must_use]
    pub const fn sdk_config(&self) -> &SdkConfig {
        &self.config
    }

    /// Stable device identifier.
    #[must_use]
    pub fn device_id(&self) -> Uuid {
        self.identity.device_id()
    }

    /// Device and user identity.
    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Fetch the flow, falling back to the cached copy when the backend fails.
    ///
    /// A successful fetch replaces the cache.
    ///
    /// # Errors
    ///
    /// Returns the fetch error when there is no cached copy to fall back to.
    pub async fn load_config(&self) -> ClientResult<LoadedConfig> {
        let fetched = self
            .config
            .retry
            .run("flow config fetch", || self.source.fetch_config())
            .await;

        match fetched {
            Ok(config) => {
                if let Err(e) = self.cache.save(&config) {
                    tracing::warn!("Failed to cache flow config: {e}");
                }
                Ok(LoadedConfig {
                    config,
                    origin: ConfigOrigin::Remote,
                })
            }
            Err(error) => match self.cache.load() {
                Ok(Some(entry)) => {
                    let stale = self.cache.is_stale(&entry);
                    tracing::warn!(
                        "Flow config fetch failed, using cached version {} (stale: {stale}): {error}",
                        entry.config.version
                    );
                    Ok(LoadedConfig {
                        config: entry.config,
                        origin: ConfigOrigin::Cache { stale },
                    })
                }
                Ok(None) => Err(error),
                Err(cache_error) => {
                    tracing::warn!("Flow config cache unreadable: {cache_error}");
                    Err(error)
                }
            },
        }
    }

    /// Attach a user to this device, locally and upstream.
    ///
    /// The user is persisted before the upload, so a failed upload still
    /// stamps later events with the user id.
    ///
    /// # Errors
    ///
    /// Returns an error if persistence or the upload fails.
    pub async fn identify(&self, user_id: &str, traits: Map<String, Value>) -> ClientResult<()> {
        let request = self.identity.identify(user_id, traits)?;
        self.config
            .retry
            .run("identify", || self.transport.identify(&request))
            .await?;
        tracing::info!("Identified user {user_id}");
        Ok(())
    }

    /// Forget the identified user.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted user cannot be removed.
    pub fn logout(&self) -> ClientResult<()> {
        self.identity.clear_user()
    }

    /// The telemetry sink to hand to a [`FlowController`].
    #[must_use]
    pub fn telemetry(&self) -> Arc<dyn TelemetrySink> {
        self.batcher.clone()
    }

    /// The event batcher.
    #[must_use]
    pub fn batcher(&self) -> &Arc<EventBatcher> {
        &self.batcher
    }

    /// Upload queued events now.
    ///
    /// # Errors
    ///
    /// Returns the transport error of the first failing batch.
    pub async fn flush(&self) -> ClientResult<FlushReport> {
        self.batcher.flush().await
    }

    /// Start periodic flushing at the configured interval.
    #[must_use]
    pub fn start_flush_task(&self) -> FlushTask {
        self.batcher.spawn_flush_task(self.config.flush_interval)
    }

    /// Persisted onboarding status.
    ///
    /// # Errors
    ///
    /// Returns an error if the status cannot be read.
    pub fn status(&self) -> ClientResult<OnboardingStatus> {
        self.status.status()
    }

    /// Whether onboarding was completed on this device.
    ///
    /// # Errors
    ///
    /// Returns an error if the status cannot be read.
    pub fn is_completed(&self) -> ClientResult<bool> {
        self.status.is_completed()
    }

    /// Record completion of `flow_version`.
    ///
    /// # Errors
    ///
    /// Returns an error if the status cannot be written.
    pub fn mark_completed(
        &self,
        flow_version: &str,
        collected_data: &CollectedData,
    ) -> ClientResult<OnboardingStatus> {
        self.status.mark_completed(flow_version, collected_data)
    }

    /// Forget completion so onboarding shows again.
    ///
    /// # Errors
    ///
    /// Returns an error if the status cannot be removed.
    pub fn reset(&self) -> ClientResult<()> {
        self.status.reset()
    }

    /// Build a controller wired to this client's telemetry.
    ///
    /// Completion is persisted automatically; `observer`, if given, is called
    /// afterwards.
    #[must_use]
    pub fn controller(
        &self,
        config: FlowConfig,
        viewport: Viewport,
        observer: Option<Box<dyn FlowObserver>>,
    ) -> FlowController {
        let recorder = CompletionRecorder {
            status: self.status.clone(),
            flow_version: config.version.clone(),
            inner: observer,
        };
        FlowController::new(config, viewport, self.telemetry()).with_observer(Box::new(recorder))
    }
}

/// Persists completion, then forwards to the host observer.
struct CompletionRecorder {
    status: StatusStore,
    flow_version: String,
    inner: Option<Box<dyn FlowObserver>>,
}

impl FlowObserver for CompletionRecorder {
    fn on_complete(&mut self, data: &CollectedData) {
        if let Err(e) = self.status.mark_completed(&self.flow_version, data) {
            tracing::error!("Failed to persist onboarding completion: {e}");
        }
        if let Some(inner) = self.inner.as_mut() {
            inner.on_complete(data);
        }
    }

    fn on_custom_action(&mut self, identifier: &str) {
        if let Some(inner) = self.inner.as_mut() {
            inner.on_custom_action(identifier);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batcher::EventEnvelope;
    use crate::identity::IdentifyRequest;
    use crate::{ClientError, RetryConfig};
    use async_trait::async_trait;
    use flow_core::{ActionOutcome, FlowAction, Screen, ScreenType};
    use std::sync::Mutex;

    // ========================================================================
    // Fakes
    // ========================================================================

    struct FakeSource {
        result: Mutex<Option<FlowConfig>>,
    }

    impl FakeSource {
        fn serving(config: Option<FlowConfig>) -> Arc<Self> {
            Arc::new(Self {
                result: Mutex::new(config),
            })
        }

        fn set(&self, config: Option<FlowConfig>) {
            *self.result.lock().expect("lock") = config;
        }
    }

    #[async_trait]
    impl ConfigSource for FakeSource {
        async fn fetch_config(&self) -> ClientResult<FlowConfig> {
            self.result.lock().expect("lock").clone().ok_or(ClientError::Api {
                status: 503,
                message: "down".into(),
            })
        }
    }

    #[derive(Default)]
    struct FakeTransport {
        events: Mutex<Vec<EventEnvelope>>,
        identified: Mutex<Vec<IdentifyRequest>>,
    }

    #[async_trait]
    impl EventTransport for FakeTransport {
        async fn send_events(&self, events: &[EventEnvelope]) -> ClientResult<()> {
            self.events.lock().expect("lock").extend_from_slice(events);
            Ok(())
        }

        async fn identify(&self, request: &IdentifyRequest) -> ClientResult<()> {
            self.identified.lock().expect("lock").push(request.clone());
            Ok(())
        }
    }

    fn flow(version: &str) -> FlowConfig {
        let mut config = FlowConfig::new(vec![
            Screen::new("welcome", ScreenType::Welcome),
            Screen::new("done", ScreenType::Celebration),
        ]);
        config.version = version.into();
        config
    }

    fn client(
        source: Arc<FakeSource>,
        transport: Arc<FakeTransport>,
        store: ClientStore,
    ) -> OnboardingClient {
        let config = SdkConfig::new("key").with_retry(RetryConfig::none());
        OnboardingClient::with_services(config, store, source, transport).expect("client")
    }

    // ========================================================================
    // Config loading
    // ========================================================================

    #[tokio::test]
    async fn test_load_config_remote_then_cache() {
        let source = FakeSource::serving(Some(flow("1")));
        let client = client(source.clone(), Arc::default(), ClientStore::new());

        let loaded = client.load_config().await.expect("load");
        assert_eq!(loaded.origin, ConfigOrigin::Remote);
        assert_eq!(loaded.config.version, "1");

        source.set(None);
        let cached = client.load_config().await.expect("cached");
        assert_eq!(cached.origin, ConfigOrigin::Cache { stale: false });
        assert_eq!(cached.config.version, "1");
    }

    #[tokio::test]
    async fn test_load_config_without_cache_fails() {
        let client = client(FakeSource::serving(None), Arc::default(), ClientStore::new());
        let result = client.load_config().await;
        assert!(matches!(result, Err(ClientError::Api { status: 503, .. })));
    }

    // ========================================================================
    // Identity and telemetry
    // ========================================================================

    #[tokio::test]
    async fn test_identify_persists_and_uploads() {
        let transport = Arc::new(FakeTransport::default());
        let client = client(FakeSource::serving(None), transport.clone(), ClientStore::new());

        client.identify("user-7", Map::new()).await.expect("identify");

        assert_eq!(client.identity().user_id().as_deref(), Some("user-7"));
        let sent = transport.identified.lock().expect("lock").clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].device_id, client.device_id());
    }

    #[tokio::test]
    async fn test_controller_events_flow_through_batcher() {
        let transport = Arc::new(FakeTransport::default());
        let client = client(FakeSource::serving(None), transport.clone(), ClientStore::new());

        let mut controller = client.controller(flow("2"), Viewport::default(), None);
        controller.mount();
        assert!(!client.batcher().is_empty());

        client.flush().await.expect("flush");
        let events = transport.events.lock().expect("lock").clone();
        assert!(events.iter().all(|e| e.device_id == client.device_id()));
        assert!(client.batcher().is_empty());
    }

    // ========================================================================
    // Completion
    // ========================================================================

    #[test]
    fn test_completion_is_persisted() {
        struct Flag(Arc<Mutex<bool>>);
        impl FlowObserver for Flag {
            fn on_complete(&mut self, _data: &CollectedData) {
                *self.0.lock().expect("lock") = true;
            }
        }

        let dir = tempfile::tempdir().expect("tempdir");
        let store = ClientStore::with_data_dir(dir.path()).expect("store");
        let client = client(FakeSource::serving(None), Arc::default(), store);
        let called = Arc::new(Mutex::new(false));

        let mut controller = client.controller(
            flow("3"),
            Viewport::default(),
            Some(Box::new(Flag(called.clone()))),
        );
        let outcome = controller.handle_action(&FlowAction::Complete);

        assert_eq!(outcome, ActionOutcome::Completed);
        assert!(*called.lock().expect("lock"));
        let status = client.status().expect("status");
        assert!(status.completed);
        assert_eq!(status.flow_version.as_deref(), Some("3"));

        client.reset().expect("reset");
        assert!(!client.is_completed().expect("status"));
    }
}
