use super::cooldown::{RepairCooldown, ceil_secs};
use crate::capabilities::{BoxFuture, RegistrationStatus, ServiceRegistry, SetupStateProvider};
use crate::config::SetupConfig;
use crate::domain::SetupState;
use crate::helper::HelperClient;
use crate::util::{Generation, GenerationToken};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Opens the system surface where the helper is approved.
pub type ApprovalOpener = Arc<dyn Fn() + Send + Sync>;

enum PollOutcome {
    Reachable,
    Unreachable(String),
    Superseded,
}

/// Establishes, verifies and repairs the privileged helper's registration.
///
/// Registration propagates asynchronously, so an "enabled" helper may not be
/// dispatchable yet. A bounded soft-retry phase absorbs that delay; a single
/// unregister/register pass recovers stuck registrations, at most once per
/// repair cooldown. Every wait loop has a fixed interval and a hard attempt
/// ceiling.
pub struct SetupMachine {
    registry: Arc<dyn ServiceRegistry>,
    client: HelperClient,
    config: SetupConfig,
    executable: PathBuf,
    open_settings: ApprovalOpener,
    cooldown: Mutex<RepairCooldown>,
    generation: Generation,
}

impl SetupMachine {
    pub fn new(
        registry: Arc<dyn ServiceRegistry>,
        client: HelperClient,
        config: SetupConfig,
        executable: PathBuf,
        open_settings: ApprovalOpener,
    ) -> Self {
        let cooldown = Mutex::new(RepairCooldown::new(config.repair_cooldown()));
        Self {
            registry,
            client,
            config,
            executable,
            open_settings,
            cooldown,
            generation: Generation::new(),
        }
    }

    fn install_location_ok(&self) -> bool {
        self.config
            .required_install_prefix
            .as_ref()
            .is_none_or(|prefix| self.executable.starts_with(prefix))
    }

    pub async fn refresh(&self) -> SetupState {
        if !self.install_location_ok() {
            return SetupState::NotInApplications;
        }

        match self.registry.status() {
            RegistrationStatus::NotRegistered => SetupState::NotRegistered,
            RegistrationStatus::RequiresApproval => SetupState::ApprovalRequired,
            RegistrationStatus::NotFound => not_found(),
            RegistrationStatus::Enabled => match self.client.ping().await {
                Ok(()) => SetupState::Ready,
                Err(error) => SetupState::Unavailable(format!(
                    "Privileged helper is registered but unreachable: {error}"
                )),
            },
        }
    }

    pub async fn start(&self) -> SetupState {
        if !self.install_location_ok() {
            return SetupState::NotInApplications;
        }

        let token = self.generation.begin();
        let status = self.registry.status();
        tracing::debug!(%status, "starting helper setup");

        let state = match status {
            RegistrationStatus::RequiresApproval => SetupState::ApprovalRequired,
            RegistrationStatus::NotFound => not_found(),
            RegistrationStatus::NotRegistered => self.register_and_poll(&token).await,
            RegistrationStatus::Enabled => self.recover_enabled(&token).await,
        };
        tracing::info!(state = ?state, "helper setup finished");
        state
    }

    /// Exactly one `register()` per call; no retry loop against a failing
    /// registration API.
    async fn register_and_poll(&self, token: &GenerationToken) -> SetupState {
        tracing::info!("registering privileged helper");
        if let Err(error) = self.registry.register() {
            return SetupState::Unavailable(format!(
                "Could not register privileged helper: {error}"
            ));
        }

        match self.registry.status() {
            RegistrationStatus::RequiresApproval => return SetupState::ApprovalRequired,
            RegistrationStatus::NotFound => return not_found(),
            RegistrationStatus::NotRegistered | RegistrationStatus::Enabled => {}
        }

        let outcome = self
            .poll_reachability(
                token,
                self.config.post_register_attempts,
                self.config.poll_interval(),
            )
            .await;
        outcome_state(outcome)
    }

    async fn recover_enabled(&self, token: &GenerationToken) -> SetupState {
        match self
            .poll_reachability(
                token,
                self.config.soft_retry_attempts,
                self.config.soft_retry_interval(),
            )
            .await
        {
            PollOutcome::Reachable => return SetupState::Ready,
            PollOutcome::Superseded => return superseded(),
            PollOutcome::Unreachable(error) => {
                tracing::warn!(%error, "helper enabled but unreachable after soft retries");
            }
        }

        {
            let mut cooldown = self.cooldown.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(remaining) = cooldown.remaining() {
                return SetupState::Unavailable(format!(
                    "Privileged helper is registered but unreachable. Repair can be retried in {}s.",
                    ceil_secs(remaining)
                ));
            }
            cooldown.record();
        }

        tracing::warn!("repairing privileged helper registration");
        if let Err(error) = self.registry.unregister() {
            tracing::warn!(%error, "unregister during repair failed; registering anyway");
        }
        if let Err(error) = self.registry.register() {
            return SetupState::Unavailable(format!(
                "Could not re-register privileged helper: {error}"
            ));
        }
        if self.registry.status() == RegistrationStatus::RequiresApproval {
            return SetupState::ApprovalRequired;
        }

        let outcome = self
            .poll_reachability(
                token,
                self.config.post_repair_attempts,
                self.config.poll_interval(),
            )
            .await;
        outcome_state(outcome)
    }

    async fn poll_reachability(
        &self,
        token: &GenerationToken,
        attempts: u32,
        interval: Duration,
    ) -> PollOutcome {
        let attempts = attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            if !token.is_current() {
                return PollOutcome::Superseded;
            }
            match self.client.ping().await {
                Ok(()) => return PollOutcome::Reachable,
                Err(error) => {
                    tracing::debug!(attempt, attempts, %error, "helper ping failed");
                    last_error = error.to_string();
                }
            }
            if attempt < attempts {
                tokio::time::sleep(interval).await;
            }
        }

        PollOutcome::Unreachable(last_error)
    }
}

fn outcome_state(outcome: PollOutcome) -> SetupState {
    match outcome {
        PollOutcome::Reachable => SetupState::Ready,
        PollOutcome::Superseded => superseded(),
        PollOutcome::Unreachable(error) => SetupState::Unavailable(format!(
            "Privileged helper did not become reachable: {error}"
        )),
    }
}

fn not_found() -> SetupState {
    SetupState::Unavailable("Privileged helper was not found in the install location.".into())
}

fn superseded() -> SetupState {
    SetupState::Unavailable("Setup was superseded by a newer request.".into())
}

impl SetupStateProvider for SetupMachine {
    fn refresh_status(&self) -> BoxFuture<'_, SetupState> {
        Box::pin(self.refresh())
    }

    fn start_setup(&self) -> BoxFuture<'_, SetupState> {
        Box::pin(self.start())
    }

    fn open_approval_ui(&self) {
        (self.open_settings)();
    }
}
