//! Outbound document fetcher.
//!
//! Plain reqwest client dressed up as a desktop Chrome browser (user agent and
//! the headers Chrome sends on a top-level navigation) so trivial bot filters
//! let the request through. All traffic goes through the configured proxy.
//!
//! Limitations:
//! - No TLS/HTTP2 fingerprint impersonation; only the header set is mimicked.
//! - No timeout is enforced here; a hung request blocks the caller.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::StatusCode;
use thiserror::Error;
use tracing::debug;

use super::BaseDocumentFetcher;

const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const MAX_REDIRECTS: usize = 5;

/// Why a document could not be fetched.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status}")]
    Status { status: u16 },

    #[error("HTTP {status} with empty body")]
    EmptyBody { status: u16 },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl FetchError {
    /// Status code returned by the server, if the request got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status } | FetchError::EmptyBody { status } => Some(*status),
            FetchError::Transport(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

/// Browser-like fetcher routed through an optional proxy.
pub struct ProxiedFetcher {
    client: reqwest::Client,
}

impl ProxiedFetcher {
    /// Build the fetcher. With no proxy URL requests go out directly
    /// (environment proxy variables are ignored).
    pub fn new(proxy_url: Option<&str>) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(CHROME_USER_AGENT)
            .default_headers(browser_headers())
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS));

        builder = match proxy_url {
            Some(url) => builder.proxy(reqwest::Proxy::all(url).context("Invalid proxy URL")?),
            None => builder.no_proxy(),
        };

        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers.insert(
        "sec-ch-ua",
        HeaderValue::from_static(
            "\"Chromium\";v=\"124\", \"Google Chrome\";v=\"124\", \"Not-A.Brand\";v=\"99\"",
        ),
    );
    headers.insert("sec-ch-ua-mobile", HeaderValue::from_static("?0"));
    headers.insert("sec-ch-ua-platform", HeaderValue::from_static("\"Windows\""));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
    headers.insert("sec-fetch-user", HeaderValue::from_static("?1"));
    headers
}

#[async_trait]
impl BaseDocumentFetcher for ProxiedFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
        debug!(url = %url, "Fetching document");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        if body.is_empty() {
            return Err(FetchError::EmptyBody {
                status: status.as_u16(),
            });
        }

        debug!(url = %url, bytes = body.len(), "Fetched document");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve a single canned HTTP response; yields the raw request text.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap_or(0);
            let _ = tx.send(String::from_utf8_lossy(&buf[..n]).to_string());

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });

        (format!("http://{}/article", addr), rx)
    }

    #[tokio::test]
    async fn test_fetch_returns_body_on_200() {
        let (url, request) = serve_once("200 OK", "<div class=\"content\">Hello</div>").await;
        let fetcher = ProxiedFetcher::new(None).unwrap();

        let body = fetcher.fetch(&url).await.unwrap();
        assert_eq!(body, "<div class=\"content\">Hello</div>");

        let request = request.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /article"));
        assert!(request.contains("chrome/124"));
        assert!(request.contains("sec-fetch-mode: navigate"));
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_200() {
        let (url, _request) = serve_once("404 Not Found", "missing").await;
        let fetcher = ProxiedFetcher::new(None).unwrap();

        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404 }));
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_fetch_rejects_empty_body() {
        let (url, _request) = serve_once("200 OK", "").await;
        let fetcher = ProxiedFetcher::new(None).unwrap();

        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::EmptyBody { status: 200 }));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = ProxiedFetcher::new(None).unwrap();
        let err = fetcher.fetch(&format!("http://{}/", addr)).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_new_with_proxy() {
        assert!(ProxiedFetcher::new(Some("http://proxy.internal:3128")).is_ok());
    }
}
