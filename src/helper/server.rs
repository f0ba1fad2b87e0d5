use super::cleanup::LegacyCleanup;
use super::pmset::parse_sleep_disabled;
use super::protocol::{HelperRequest, HelperResponse};
use crate::config::HelperConfig;
use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::process::Command;

/// Upper bound on one request line, newline included.
const MAX_REQUEST_BYTES: u64 = 16 * 1024;

/// Root-side implementation of the helper contract.
pub struct PrivilegedService {
    pmset: PathBuf,
    cleanup: LegacyCleanup,
    allowed_uids: Vec<u32>,
}

impl PrivilegedService {
    pub fn new(config: &HelperConfig) -> Self {
        Self {
            pmset: config.pmset_path.clone(),
            cleanup: LegacyCleanup::new(config.legacy_paths.clone(), config.backup_root.clone()),
            allowed_uids: config.allowed_uids.clone(),
        }
    }

    /// Root and the configured user ids may call the helper; nobody else.
    pub fn authorizes(&self, uid: u32) -> bool {
        uid == 0 || self.allowed_uids.contains(&uid)
    }

    pub async fn handle(&self, request: HelperRequest) -> HelperResponse {
        let operation = request.operation();
        let result = match request {
            HelperRequest::Ping => Ok(HelperResponse::Ok),
            HelperRequest::SetPolicy { sleep_disabled } => {
                let value = if sleep_disabled { "1" } else { "0" };
                self.run_pmset(&["-a", "disablesleep", value])
                    .await
                    .map(|_| HelperResponse::Ok)
            }
            HelperRequest::ReadPolicy => self.read_policy().await,
            HelperRequest::CleanupLegacyArtifacts => self
                .cleanup
                .run(chrono::Utc::now())
                .map(|report| HelperResponse::Cleanup { report }),
        };

        result.unwrap_or_else(|error| {
            tracing::warn!(operation, %error, "helper request failed");
            HelperResponse::Error {
                message: format!("{error:#}"),
            }
        })
    }

    async fn read_policy(&self) -> Result<HelperResponse> {
        let output = self.run_pmset(&["-g"]).await?;
        let sleep_disabled = parse_sleep_disabled(&output)?;
        Ok(HelperResponse::Value { sleep_disabled })
    }

    async fn run_pmset(&self, args: &[&str]) -> Result<String> {
        let output = Command::new(&self.pmset)
            .args(args)
            .output()
            .await
            .with_context(|| format!("Failed to spawn {}", self.pmset.display()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("pmset {} failed: {}", args.join(" "), stderr.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Bind the helper socket and answer requests until the process is stopped.
pub async fn serve(config: &HelperConfig) -> Result<()> {
    let socket_path = &config.socket_path;
    if let Some(parent) = socket_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .context("Failed to create helper socket directory")?;
    }
    let _ = tokio::fs::remove_file(socket_path).await;

    let listener = UnixListener::bind(socket_path)
        .with_context(|| format!("Failed to bind {}", socket_path.display()))?;
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o666))?;
    }
    tracing::info!(socket = %socket_path.display(), "privileged helper listening");

    let service = Arc::new(PrivilegedService::new(config));
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    if let Err(error) = handle_connection(stream, &service).await {
                        tracing::warn!(%error, "helper connection failed");
                    }
                });
            }
            Err(error) => tracing::error!(%error, "failed to accept helper connection"),
        }
    }
}

async fn handle_connection(stream: UnixStream, service: &PrivilegedService) -> Result<()> {
    let cred = stream
        .peer_cred()
        .context("Could not read helper client credentials")?;
    tracing::debug!(uid = cred.uid(), pid = ?cred.pid(), "helper client connected");
    answer(stream, cred.uid(), service).await
}

/// Serve one request from a client already identified as `peer_uid`.
async fn answer<S>(stream: S, peer_uid: u32, service: &PrivilegedService) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let response = if service.authorizes(peer_uid) {
        match read_request(reader).await {
            Ok(request) => service.handle(request).await,
            Err(message) => HelperResponse::Error { message },
        }
    } else {
        tracing::warn!(uid = peer_uid, "rejected helper client");
        HelperResponse::Error {
            message: format!("uid {peer_uid} is not allowed to use the privileged helper"),
        }
    };

    let mut reply = serde_json::to_string(&response)?;
    reply.push('\n');
    writer.write_all(reply.as_bytes()).await?;
    writer.shutdown().await?;
    Ok(())
}

async fn read_request<R>(reader: R) -> Result<HelperRequest, String>
where
    R: AsyncRead + Unpin,
{
    let mut line = String::new();
    let read = BufReader::new(reader.take(MAX_REQUEST_BYTES))
        .read_line(&mut line)
        .await
        .map_err(|e| format!("could not read request: {e}"))?;
    if read as u64 >= MAX_REQUEST_BYTES && !line.ends_with('\n') {
        return Err(format!("request exceeds {MAX_REQUEST_BYTES} bytes"));
    }
    serde_json::from_str(line.trim_end()).map_err(|e| format!("malformed request: {e}"))
}
