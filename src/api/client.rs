//! HTTP transport for the LMS REST API.
//!
//! The aggregator only sees the [`ApiTransport`] trait, so tests can script
//! responses without a server. [`HttpTransport`] is the `reqwest`-backed
//! implementation used by the binary.

use crate::api::retry::RetryPolicy;
use crate::error::ReceiptError;
use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("lms-receipt/", env!("CARGO_PKG_VERSION"));

/// Characters that would change the structure of a URL path.
///
/// Course keys such as `course-v1:edx+dummy+2015_T3` keep their `:` and `+`.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Something that can GET a path of the LMS API.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// GET `path` and return the body of a 2xx response.
    async fn get(&self, path: &str) -> Result<String, ReceiptError>;
}

/// GET `path` and deserialize the JSON body.
pub async fn fetch_json<T>(transport: &dyn ApiTransport, path: &str) -> Result<T, ReceiptError>
where
    T: DeserializeOwned,
{
    let body = transport.get(path).await?;
    serde_json::from_str(&body).map_err(|source| ReceiptError::Parse {
        path: path.to_string(),
        source,
    })
}

/// Percent-encode a value for use as a single URL path segment.
pub fn encode_path_segment(s: &str) -> String {
    utf8_percent_encode(s, PATH_SEGMENT).to_string()
}

/// Settings for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub session_cookie: Option<String>,
    pub bearer_token: Option<String>,
}

/// `reqwest`-backed transport with per-request timeout and retry.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
    session_cookie: Option<String>,
    bearer_token: Option<String>,
}

impl HttpTransport {
    pub fn new(config: TransportConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry: config.retry,
            session_cookie: config.session_cookie,
            bearer_token: config.bearer_token,
        })
    }

    async fn get_once(&self, path: &str) -> Result<String, ReceiptError> {
        let url = format!("{}{path}", self.base_url);

        let mut req = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json");

        if let Some(ref cookie) = self.session_cookie {
            req = req.header(reqwest::header::COOKIE, cookie);
        }
        if let Some(ref token) = self.bearer_token {
            req = req.bearer_auth(token);
        }

        let transport = |source| ReceiptError::Transport {
            path: path.to_string(),
            source,
        };

        let resp = req.send().await.map_err(transport)?;
        let status = resp.status();

        if !status.is_success() {
            return Err(ReceiptError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        resp.text().await.map_err(transport)
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn get(&self, path: &str) -> Result<String, ReceiptError> {
        debug!(path, "GET");
        self.retry.run(|_| self.get_once(path)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned response per connection and record request heads.
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);

        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                }
                log.lock()
                    .unwrap()
                    .push(String::from_utf8_lossy(&buf).to_string());

                let reply = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
        });

        (format!("http://{addr}"), seen)
    }

    fn transport(base_url: String, retries: u32) -> HttpTransport {
        transport_with_timeout(base_url, retries, Duration::from_secs(5))
    }

    fn transport_with_timeout(base_url: String, retries: u32, timeout: Duration) -> HttpTransport {
        HttpTransport::new(TransportConfig {
            base_url,
            timeout,
            retry: RetryPolicy {
                max_retries: retries,
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
            },
            session_cookie: Some("sessionid=abc".into()),
            bearer_token: None,
        })
        .unwrap()
    }

    #[test]
    fn test_encode_path_segment_keeps_course_key() {
        assert_eq!(
            encode_path_segment("course-v1:edx+dummy+2015_T3"),
            "course-v1:edx+dummy+2015_T3"
        );
        assert_eq!(encode_path_segment("EDX-123456"), "EDX-123456");
    }

    #[test]
    fn test_encode_path_segment_escapes_structure() {
        assert_eq!(encode_path_segment("a/b"), "a%2Fb");
        assert_eq!(encode_path_segment("x?y#z"), "x%3Fy%23z");
        assert_eq!(encode_path_segment("a b"), "a%20b");
        assert_eq!(encode_path_segment("50%"), "50%25");
    }

    #[tokio::test]
    async fn test_get_returns_body_and_sends_headers() {
        let (base, seen) = serve(vec![(200, r#"{"ok":true}"#)]).await;
        let body = transport(base, 0).get("/api/thing/").await.unwrap();
        assert_eq!(body, r#"{"ok":true}"#);

        let requests = seen.lock().unwrap();
        let head = requests[0].to_lowercase();
        assert!(head.starts_with("get /api/thing/ http/1.1"));
        assert!(head.contains("accept: application/json"));
        assert!(head.contains("cookie: sessionid=abc"));
        assert!(head.contains("user-agent: lms-receipt/"));
    }

    #[tokio::test]
    async fn test_get_retries_server_error() {
        let (base, seen) = serve(vec![(503, "busy"), (200, "{}")]).await;
        let body = transport(base, 1).get("/api/thing/").await.unwrap();
        assert_eq!(body, "{}");
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_get_fails_fast_on_not_found() {
        let (base, seen) = serve(vec![(404, "{}"), (200, "{}")]).await;
        let err = transport(base, 3).get("/api/missing/").await.unwrap_err();
        assert!(matches!(err, ReceiptError::Status { status: 404, .. }));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_json_reports_parse_error() {
        let (base, _) = serve(vec![(200, "not json")]).await;
        let t = transport(base, 0);
        let err = fetch_json::<serde_json::Value>(&t, "/api/bad/")
            .await
            .unwrap_err();
        assert!(matches!(err, ReceiptError::Parse { ref path, .. } if path == "/api/bad/"));
    }

    #[tokio::test]
    async fn test_timeout_is_retried_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let count = Arc::clone(&accepted);

        // Accept and hold every connection without answering.
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                count.fetch_add(1, Ordering::SeqCst);
                held.push(socket);
            }
        });

        let t = transport_with_timeout(format!("http://{addr}"), 1, Duration::from_millis(200));
        let err = t.get("/api/slow/").await.unwrap_err();

        assert!(matches!(err, ReceiptError::Transport { ref path, .. } if path == "/api/slow/"));
        assert!(err.is_network());
        assert_eq!(accepted.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = transport(format!("http://{addr}"), 0)
            .get("/api/x/")
            .await
            .unwrap_err();
        assert!(matches!(err, ReceiptError::Transport { .. }));
        assert!(err.is_network());
    }
}
