use log::{debug, info, warn};
use reqwest::Client;
use std::time::Duration;
use url::Url;

use crate::error::Result;

/// Outcome of a single GET against the watched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResult {
    /// The connection could not be established or the response did not
    /// arrive in time.
    Timeout,
    /// The server answered with a status outside `[200, 300)`.
    HttpError(u16),
    /// The server answered with a 2xx status; carries the page body.
    Success(String),
}

/// Issues GET requests against one URL through a single pooled client.
///
/// The client keeps its connections alive between polls. Call
/// [`Fetcher::close`] when the run ends to release them.
#[derive(Debug)]
pub struct Fetcher {
    client: Client,
    url: Url,
}

impl Fetcher {
    /// Builds the pooled client.
    ///
    /// `read_timeout` of `None` means the response may take arbitrarily long.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed (for
    /// example when the TLS backend fails to initialise).
    pub fn new(url: Url, connect_timeout: Duration, read_timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().connect_timeout(connect_timeout);
        if let Some(read_timeout) = read_timeout {
            builder = builder.read_timeout(read_timeout);
        }

        Ok(Self {
            client: builder.build()?,
            url,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Performs one poll. Never fails: transport problems fold into
    /// [`PollResult::Timeout`].
    pub async fn fetch(&self) -> PollResult {
        let response = match self.client.get(self.url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                if e.is_timeout() {
                    debug!("Request to {} timed out: {e}", self.url);
                } else {
                    // Refused connections and DNS failures are reported like timeouts
                    warn!("Request to {} failed: {e}", self.url);
                }
                return PollResult::Timeout;
            }
        };

        let status = response.status();
        if !status.is_success() {
            return PollResult::HttpError(status.as_u16());
        }

        match response.text().await {
            Ok(body) => PollResult::Success(body),
            Err(e) => {
                warn!("Could not read the body of {}: {e}", self.url);
                PollResult::Timeout
            }
        }
    }

    /// Drops the client and with it every pooled connection.
    pub fn close(self) {
        drop(self.client);
        info!("Released HTTP connections to {}", self.url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves `response` verbatim to the first connection and returns the
    /// URL of the listener.
    async fn serve_once(response: &'static str) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let mut request = Vec::new();
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        Url::parse(&format!("http://{addr}/icpplus/index.html")).unwrap()
    }

    #[tokio::test]
    async fn test_success_returns_body() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 13\r\nConnection: close\r\n\r\n<html></html>",
        )
        .await;
        let fetcher = Fetcher::new(url, Duration::from_secs(5), None).unwrap();
        assert_eq!(
            fetcher.fetch().await,
            PollResult::Success("<html></html>".to_string())
        );
        fetcher.close();
    }

    #[tokio::test]
    async fn test_non_success_status_is_http_error() {
        let url = serve_once(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        let fetcher = Fetcher::new(url, Duration::from_secs(5), None).unwrap();
        assert_eq!(fetcher.fetch().await, PollResult::HttpError(503));
    }

    #[tokio::test]
    async fn test_silent_server_hits_read_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // Accept and hold the socket without ever answering
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(3)).await;
        });

        let url = Url::parse(&format!("http://{addr}/")).unwrap();
        let fetcher = Fetcher::new(
            url,
            Duration::from_secs(5),
            Some(Duration::from_millis(200)),
        )
        .unwrap();
        assert_eq!(fetcher.fetch().await, PollResult::Timeout);
    }

    #[tokio::test]
    async fn test_refused_connection_is_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("http://{addr}/")).unwrap();
        let fetcher = Fetcher::new(url, Duration::from_millis(500), None).unwrap();
        assert_eq!(fetcher.fetch().await, PollResult::Timeout);
    }

    #[ignore = "This test requires a network where 10.255.255.1 silently drops packets"]
    #[tokio::test]
    async fn test_unroutable_host_hits_connect_timeout() {
        let fetcher = Fetcher::new(
            Url::parse("http://10.255.255.1/").unwrap(),
            Duration::from_millis(500),
            None,
        )
        .unwrap();

        let started = std::time::Instant::now();
        assert_eq!(fetcher.fetch().await, PollResult::Timeout);
        assert!(
            started.elapsed() < Duration::from_secs(2),
            "Expected the connect timeout to fire, took {:?}",
            started.elapsed()
        );
    }

    #[ignore = "This test requires network access to the booking site"]
    #[tokio::test]
    async fn test_live_site_answers() {
        let fetcher = Fetcher::new(
            Url::parse(crate::TARGET_URL).unwrap(),
            Duration::from_secs(5),
            Some(Duration::from_secs(10)),
        )
        .unwrap();
        let result = fetcher.fetch().await;
        assert!(
            !matches!(result, PollResult::Timeout),
            "Expected the booking site to answer"
        );
    }
}
