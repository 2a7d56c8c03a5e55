use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::agent::registry::Agent;

/// Probe line sent to a candidate agent.
pub const PROBE_REQUEST: &[u8] = b"PROBE\n";

/// Prefix of a well-formed capability response.
pub const PROBE_RESPONSE_PREFIX: &str = "NINJA-AGENT:";

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("connection to {host}:{port} failed: {source}")]
    Connect {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    #[error("probe of {host}:{port} timed out")]
    Timeout { host: String, port: u16 },

    #[error("malformed probe response from {host}:{port}: {detail}")]
    Malformed {
        host: String,
        port: u16,
        detail: String,
    },

    #[error("I/O error probing {host}:{port}: {source}")]
    Io {
        host: String,
        port: u16,
        source: std::io::Error,
    },
}

/// Capability payload an agent returns after the response prefix.
#[derive(Debug, Deserialize)]
struct ProbePayload {
    name: String,
    cores: usize,
    /// Available memory in MB.
    memory: u64,
}

/// Probe a candidate agent at `host:port`.
///
/// Sends the fixed probe line and expects one response line of the form
/// `NINJA-AGENT:{"name":...,"cores":...,"memory":...}`. Any timeout,
/// connection failure, or malformed response is a [`ProbeError`]; callers log
/// it and move on to the next host without aborting discovery.
pub async fn probe_agent(host: &str, port: u16, timeout: Duration) -> Result<Agent, ProbeError> {
    let fut = async {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|source| ProbeError::Connect {
                host: host.to_string(),
                port,
                source,
            })?;

        let mut reader = BufReader::new(stream);
        reader
            .get_mut()
            .write_all(PROBE_REQUEST)
            .await
            .map_err(|source| ProbeError::Io {
                host: host.to_string(),
                port,
                source,
            })?;

        let mut line = String::new();
        reader
            .read_line(&mut line)
            .await
            .map_err(|source| ProbeError::Io {
                host: host.to_string(),
                port,
                source,
            })?;

        parse_response(host, port, line.trim())
    };

    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProbeError::Timeout {
            host: host.to_string(),
            port,
        }),
    }
}

fn parse_response(host: &str, port: u16, line: &str) -> Result<Agent, ProbeError> {
    let payload_str =
        line.strip_prefix(PROBE_RESPONSE_PREFIX)
            .ok_or_else(|| ProbeError::Malformed {
                host: host.to_string(),
                port,
                detail: format!("unexpected response {:?}", line),
            })?;

    let payload: ProbePayload =
        serde_json::from_str(payload_str).map_err(|e| ProbeError::Malformed {
            host: host.to_string(),
            port,
            detail: e.to_string(),
        })?;

    Ok(Agent::new(
        payload.name,
        host.to_string(),
        port,
        payload.cores,
        payload.memory,
    ))
}
