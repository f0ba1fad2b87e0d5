use crate::capabilities::{BoxFuture, SetupStateProvider, SystemPolicyControl};
use crate::domain::{ManagedKey, Snapshot};
use crate::error::ControlError;
use crate::helper::{CleanupReport, HelperClient};
use std::sync::Arc;

/// System sleep policy driven through the privileged helper.
///
/// Mutations first confirm the helper is `Ready`; anything else surfaces as
/// [`ControlError::SetupRequired`] carrying the state the caller must resolve.
pub struct HelperPolicy {
    client: HelperClient,
    setup: Arc<dyn SetupStateProvider>,
}

impl HelperPolicy {
    pub fn new(client: HelperClient, setup: Arc<dyn SetupStateProvider>) -> Self {
        Self { client, setup }
    }

    async fn ensure_ready(&self) -> Result<(), ControlError> {
        let state = self.setup.refresh_status().await;
        if state.is_ready() {
            Ok(())
        } else {
            Err(ControlError::SetupRequired(state))
        }
    }

    async fn apply(&self, sleep_disabled: bool) -> Result<(), ControlError> {
        self.ensure_ready().await?;
        self.client.set_sleep_disabled(sleep_disabled).await?;
        tracing::info!(sleep_disabled, "system sleep policy updated");
        Ok(())
    }
}

impl SystemPolicyControl for HelperPolicy {
    fn set_enabled(&self, enabled: bool) -> BoxFuture<'_, Result<(), ControlError>> {
        Box::pin(self.apply(enabled))
    }

    fn read_current_value(&self) -> BoxFuture<'_, Result<bool, ControlError>> {
        Box::pin(async move { Ok(self.client.read_sleep_disabled().await?) })
    }

    fn capture_baseline(&self) -> BoxFuture<'_, Result<Snapshot, ControlError>> {
        Box::pin(async move {
            self.ensure_ready().await?;
            let current = self.client.read_sleep_disabled().await?;
            Ok(Snapshot::sleep_disabled(current))
        })
    }

    fn restore<'a>(&'a self, snapshot: &'a Snapshot) -> BoxFuture<'a, Result<(), ControlError>> {
        Box::pin(async move {
            match snapshot.get(ManagedKey::SleepDisabled) {
                Some(original) => self.apply(original).await,
                None => Ok(()),
            }
        })
    }

    fn cleanup_legacy_artifacts(&self) -> BoxFuture<'_, Result<CleanupReport, ControlError>> {
        Box::pin(async move {
            self.ensure_ready().await?;
            Ok(self.client.cleanup_legacy_artifacts().await?)
        })
    }
}
