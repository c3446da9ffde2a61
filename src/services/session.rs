//! HTTP session and page fetcher.
//!
//! One [`Session`] is built per run and shared by every fetch task. It owns the
//! pooled `reqwest::Client`, the connection retry policy and the per-fetch
//! deadline.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{CrawlerConfig, FetchResult, PageTask};

/// Fetches the raw content behind a [`PageTask`].
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, task: &PageTask) -> Result<FetchResult>;
}

/// Retry schedule for connection-phase failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub connect_retries: u32,
    pub backoff_factor: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            connect_retries: config.connect_retries,
            backoff_factor: config.backoff_factor(),
        }
    }

    /// Delay before retry `attempt` (1-based): factor, 2x factor, 4x factor, ...
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.backoff_factor.saturating_mul(1 << exponent)
    }
}

/// Shared HTTP session.
#[derive(Debug)]
pub struct Session {
    client: Client,
    retry: RetryPolicy,
    timeout: Duration,
}

impl Session {
    /// Build the session, retrying client construction up to
    /// `config.session_attempts` times.
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        Self::build_with(config, || create_client(config))
    }

    /// Like [`Session::new`], with the client produced by `build`.
    pub fn build_with<E, F>(config: &CrawlerConfig, build: F) -> Result<Self>
    where
        F: FnMut() -> std::result::Result<Client, E>,
        E: fmt::Display,
    {
        let client = build_with_attempts(config.session_attempts, build)?;
        Ok(Self::with_policy(
            client,
            RetryPolicy::from_config(config),
            config.timeout(),
        ))
    }

    pub fn with_policy(client: Client, retry: RetryPolicy, timeout: Duration) -> Self {
        Self {
            client,
            retry,
            timeout,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// GET `url` and return the body.
    ///
    /// Connection failures are retried with exponential backoff. The
    /// deadline covers the whole fetch, retries and backoff sleeps included.
    /// Deadline overruns, HTTP error statuses and exhausted retries become
    /// [`AppError::Fetch`].
    pub async fn get(&self, url: &str) -> Result<String> {
        match tokio::time::timeout(self.timeout, self.get_with_retries(url)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(AppError::fetch(
                url,
                format!("timed out after {:?}", self.timeout),
            )),
        }
    }

    async fn get_with_retries(&self, url: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.send(url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_connect() && attempt < self.retry.connect_retries => {
                    attempt += 1;
                    let delay = self.retry.delay_for_attempt(attempt);
                    log::debug!(
                        "Connection to {} failed, retry {}/{} in {:?}: {}",
                        url,
                        attempt,
                        self.retry.connect_retries,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(AppError::fetch(url, describe(&e))),
            }
        }
    }

    async fn send(&self, url: &str) -> reqwest::Result<String> {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

fn describe(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("timed out: {e}")
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else if let Some(status) = e.status() {
        format!("HTTP {}", status.as_u16())
    } else {
        e.to_string()
    }
}

/// Create a configured asynchronous HTTP client.
pub fn create_client(config: &CrawlerConfig) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.timeout())
        .build()
}

/// Run `build` until it succeeds or `attempts` tries have failed.
pub fn build_with_attempts<T, E, F>(attempts: u32, mut build: F) -> Result<T>
where
    F: FnMut() -> std::result::Result<T, E>,
    E: fmt::Display,
{
    let mut last_error = String::from("no attempt made");
    for attempt in 1..=attempts {
        match build() {
            Ok(value) => {
                log::info!("Session created (attempt {}/{})", attempt, attempts);
                return Ok(value);
            }
            Err(e) => {
                log::warn!(
                    "Session cannot be created (attempt {}/{}): {}",
                    attempt,
                    attempts,
                    e
                );
                last_error = e.to_string();
            }
        }
    }
    Err(AppError::session(attempts, last_error))
}

/// [`PageFetcher`] backed by the shared [`Session`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    session: Arc<Session>,
}

impl HttpFetcher {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, task: &PageTask) -> Result<FetchResult> {
        let target = task.target();
        let body = self.session.get(&target).await?;
        log::info!("Fetched {}", target);
        Ok(FetchResult::new(target, body))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    fn test_session(connect_retries: u32, timeout: Duration) -> Session {
        session_with_backoff(connect_retries, Duration::from_millis(5), timeout)
    }

    fn session_with_backoff(
        connect_retries: u32,
        backoff_factor: Duration,
        timeout: Duration,
    ) -> Session {
        Session::with_policy(
            Client::new(),
            RetryPolicy {
                connect_retries,
                backoff_factor,
            },
            timeout,
        )
    }

    /// An address nothing listens on.
    async fn closed_port() -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        addr
    }

    /// Serve every connection with the same canned HTTP response.
    async fn serve(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let _ = socket.read(&mut buf).await;
                    let response = format!(
                        "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::from_config(&CrawlerConfig::default());
        assert_eq!(policy.connect_retries, 3);
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(2000));
    }

    #[test]
    fn test_session_construction_gives_up_after_all_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = build_with_attempts(10, || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("transport unavailable")
        });

        assert_eq!(calls.load(Ordering::SeqCst), 10);
        match result {
            Err(AppError::Session { attempts, message }) => {
                assert_eq!(attempts, 10);
                assert_eq!(message, "transport unavailable");
            }
            other => panic!("expected session error, got {other:?}"),
        }
    }

    #[test]
    fn test_session_construction_stops_on_success() {
        let mut calls = 0;
        let result = build_with_attempts(10, || {
            calls += 1;
            if calls < 3 { Err("not yet") } else { Ok(calls) }
        });
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn test_session_new_with_defaults() {
        let session = Session::new(&CrawlerConfig::default()).unwrap();
        assert_eq!(session.retry_policy().connect_retries, 3);
    }

    #[tokio::test]
    async fn test_fetch_appends_page_number() {
        let base = serve("200 OK", "<html><body>listing</body></html>").await;
        let fetcher = HttpFetcher::new(Arc::new(test_session(0, Duration::from_secs(5))));

        let task = PageTask::page(format!("{base}/jobs/?q=rust"), 2);
        let page = fetcher.fetch(&task).await.unwrap();

        assert_eq!(page.url, format!("{base}/jobs/?q=rust&page=2"));
        assert!(page.body.contains("listing"));
    }

    #[tokio::test]
    async fn test_fetch_error_status() {
        let base = serve("404 Not Found", "missing").await;
        let fetcher = HttpFetcher::new(Arc::new(test_session(0, Duration::from_secs(5))));

        let err = fetcher.fetch(&PageTask::bare(&base)).await.unwrap_err();
        match err {
            AppError::Fetch { url, message } => {
                assert_eq!(url, base);
                assert_eq!(message, "HTTP 404");
            }
            other => panic!("expected fetch error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connection_refused_exhausts_retries() {
        let addr = closed_port().await;
        let session = session_with_backoff(3, Duration::from_millis(100), Duration::from_secs(5));
        let url = format!("http://{addr}/jobs");

        let started = std::time::Instant::now();
        let err = session.get(&url).await.unwrap_err();

        // 100 + 200 + 400 ms of backoff before giving up
        assert!(started.elapsed() >= Duration::from_millis(700));
        match err {
            AppError::Fetch { url: u, message } => {
                assert_eq!(u, url);
                assert!(message.contains("connection failed"), "{message}");
            }
            other => panic!("expected fetch error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_deadline_covers_retry_backoff() {
        let addr = closed_port().await;
        // 1 s + 2 s + 4 s of backoff, far beyond the deadline
        let session = session_with_backoff(3, Duration::from_secs(1), Duration::from_millis(300));

        let started = std::time::Instant::now();
        let err = session.get(&format!("http://{addr}/jobs")).await.unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(1));
        match err {
            AppError::Fetch { message, .. } => assert!(message.contains("timed out"), "{message}"),
            other => panic!("expected fetch error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_deadline_exceeded_is_fetch_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let session = test_session(0, Duration::from_millis(200));
        let err = session.get(&format!("http://{addr}/slow")).await.unwrap_err();

        match err {
            AppError::Fetch { message, .. } => assert!(message.contains("timed out")),
            other => panic!("expected fetch error, got {other:?}"),
        }
    }
}
