//! OpenAI client construction with per-request credentials.

use crate::error::{CourseRagError, Result};
use async_openai::{config::OpenAIConfig, Client};
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::time::Duration;

/// Default timeout for OpenAI API requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Build the shared HTTP client used for all OpenAI calls.
///
/// Requests that exceed `timeout` fail at the reqwest layer and surface as the
/// calling component's failure kind.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| CourseRagError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Backoff policy that gives up after the first attempt.
///
/// Rate limits and server errors are reported to the caller as they happen.
fn single_attempt() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

/// Create an OpenAI client bound to `api_key`, reusing `http`'s connection pool.
///
/// `api_base` overrides the default endpoint (for proxies and gateways).
pub fn client_for_key(
    http: &reqwest::Client,
    api_base: Option<&str>,
    api_key: &str,
) -> Client<OpenAIConfig> {
    let mut config = OpenAIConfig::new().with_api_key(api_key);
    if let Some(base) = api_base {
        config = config.with_api_base(base);
    }
    Client::with_config(config)
        .with_http_client(http.clone())
        .with_backoff(single_attempt())
}

/// Pick the credential for a request.
///
/// A non-blank key supplied with the request wins; otherwise the configured
/// key is used.
pub fn resolve_api_key<'a>(request_key: &'a str, fallback: Option<&'a str>) -> Option<&'a str> {
    let request_key = request_key.trim();
    if !request_key.is_empty() {
        return Some(request_key);
    }
    fallback.map(str::trim).filter(|k| !k.is_empty())
}

/// Local stand-in for the OpenAI API that answers every request with 429.
#[cfg(test)]
pub(crate) mod rate_limited {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const BODY: &str = r#"{"error":{"message":"Rate limit reached for requests","type":"requests","param":null,"code":"rate_limit_exceeded"}}"#;

    /// Start the server; returns its API base URL and a request counter.
    pub(crate) async fn serve() -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let counter = counter.clone();
                tokio::spawn(async move {
                    let _ = respond(socket, &counter).await;
                });
            }
        });

        (format!("http://{}/v1", addr), hits)
    }

    async fn respond(mut socket: TcpStream, counter: &AtomicUsize) -> std::io::Result<()> {
        read_request(&mut socket).await?;
        counter.fetch_add(1, Ordering::SeqCst);

        let response = format!(
            "HTTP/1.1 429 Too Many Requests\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            BODY.len(),
            BODY
        );
        socket.write_all(response.as_bytes()).await?;
        socket.shutdown().await
    }

    /// Read one request: headers, then `content-length` bytes of body.
    async fn read_request(socket: &mut TcpStream) -> std::io::Result<()> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await?;
            if n == 0 {
                return Ok(());
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let content_length = text[..end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + content_length {
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_key_takes_precedence() {
        assert_eq!(resolve_api_key("sk-request", Some("sk-config")), Some("sk-request"));
    }

    #[test]
    fn test_blank_request_key_falls_back() {
        assert_eq!(resolve_api_key("  ", Some("sk-config")), Some("sk-config"));
        assert_eq!(resolve_api_key("", None), None);
        assert_eq!(resolve_api_key("", Some("")), None);
    }

    #[test]
    fn test_single_attempt_policy_never_waits() {
        use backoff::backoff::Backoff;

        let mut policy = single_attempt();
        std::thread::sleep(Duration::from_millis(1));
        assert_eq!(policy.next_backoff(), None);
    }
}
