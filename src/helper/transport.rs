use super::client::HelperTransport;
use super::protocol::{HelperRequest, HelperResponse};
use crate::capabilities::BoxFuture;
use crate::error::HelperError;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

/// JSON-lines over a Unix domain socket, one connection per request.
pub struct SocketTransport {
    socket_path: PathBuf,
}

impl SocketTransport {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    async fn exchange(&self, request: &HelperRequest) -> Result<HelperResponse, HelperError> {
        let stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|e| HelperError::Unreachable(format!("{}: {e}", self.socket_path.display())))?;
        let (reader, mut writer) = stream.into_split();

        let mut line = serde_json::to_string(request)
            .map_err(|e| HelperError::InvalidResponse(e.to_string()))?;
        line.push('\n');
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| HelperError::Unreachable(e.to_string()))?;
        writer
            .shutdown()
            .await
            .map_err(|e| HelperError::Unreachable(e.to_string()))?;

        let mut reply = String::new();
        let read = BufReader::new(reader)
            .read_line(&mut reply)
            .await
            .map_err(|e| HelperError::Unreachable(e.to_string()))?;
        if read == 0 {
            return Err(HelperError::Unreachable(
                "connection closed before reply".into(),
            ));
        }

        serde_json::from_str(reply.trim_end())
            .map_err(|e| HelperError::InvalidResponse(e.to_string()))
    }
}

impl HelperTransport for SocketTransport {
    fn call(&self, request: HelperRequest) -> BoxFuture<'_, Result<HelperResponse, HelperError>> {
        Box::pin(async move {
            tracing::debug!(operation = request.operation(), "helper request");
            self.exchange(&request).await
        })
    }
}
