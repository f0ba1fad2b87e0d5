use super::protocol::{CleanupReport, HelperRequest, HelperResponse};
use crate::capabilities::BoxFuture;
use crate::error::HelperError;
use std::sync::Arc;
use std::time::Duration;

/// Carries one request to the helper and brings back its reply.
///
/// Transports do not time out or retry; [`HelperClient`] owns both concerns.
pub trait HelperTransport: Send + Sync {
    fn call(&self, request: HelperRequest) -> BoxFuture<'_, Result<HelperResponse, HelperError>>;
}

/// Request/response client for the privileged helper.
///
/// Every call races the transport against a timer. Reachability pings use the
/// shorter `ping_timeout`; data operations use `request_timeout`.
#[derive(Clone)]
pub struct HelperClient {
    transport: Arc<dyn HelperTransport>,
    request_timeout: Duration,
    ping_timeout: Duration,
}

impl HelperClient {
    pub fn new(
        transport: Arc<dyn HelperTransport>,
        request_timeout: Duration,
        ping_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            request_timeout,
            ping_timeout,
        }
    }

    pub async fn ping(&self) -> Result<(), HelperError> {
        match self.request(HelperRequest::Ping, self.ping_timeout).await? {
            HelperResponse::Ok => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn set_sleep_disabled(&self, sleep_disabled: bool) -> Result<(), HelperError> {
        match self
            .request(
                HelperRequest::SetPolicy { sleep_disabled },
                self.request_timeout,
            )
            .await?
        {
            HelperResponse::Ok => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn read_sleep_disabled(&self) -> Result<bool, HelperError> {
        match self
            .request(HelperRequest::ReadPolicy, self.request_timeout)
            .await?
        {
            HelperResponse::Value { sleep_disabled } => Ok(sleep_disabled),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn cleanup_legacy_artifacts(&self) -> Result<CleanupReport, HelperError> {
        match self
            .request(HelperRequest::CleanupLegacyArtifacts, self.request_timeout)
            .await?
        {
            HelperResponse::Cleanup { report } => Ok(report),
            other => Err(unexpected(&other)),
        }
    }

    async fn request(
        &self,
        request: HelperRequest,
        timeout: Duration,
    ) -> Result<HelperResponse, HelperError> {
        let operation = request.operation();
        match tokio::time::timeout(timeout, self.transport.call(request)).await {
            Ok(Ok(HelperResponse::Error { message })) => Err(HelperError::Rejected(message)),
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(operation, ?timeout, "privileged helper request timed out");
                Err(HelperError::Timeout { operation })
            }
        }
    }
}

fn unexpected(response: &HelperResponse) -> HelperError {
    HelperError::InvalidResponse(format!("unexpected reply {response:?}"))
}
