use tokio::time::sleep;
use url::Url;

use crate::{
    CancelFlag, ClientOptions, Phase, RelayError, RequestDescriptor, ResponseEnvelope, Result,
    RetryState,
};

/// Default backend address, matching the bundled development server.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8015";

#[derive(Clone, Debug)]
/// HTTP client for the request-proxy backend's `/request` endpoint.
pub struct RelayClient {
    http: reqwest::Client,
    base_url: Url,
    options: ClientOptions,
}

impl RelayClient {
    /// Creates a client for the backend at `base_url`.
    ///
    /// Only the scheme and authority of `base_url` matter: requests always go
    /// to its `/request` path.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref().trim())?;
        if base_url.cannot_be_a_base() {
            return Err(RelayError::UnsupportedBase(base_url.into()));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            options: ClientOptions::default(),
        })
    }

    /// Creates a client from environment variables.
    ///
    /// Reads:
    /// - `REQRELAY_BASE_URL` — backend base URL (e.g. `http://127.0.0.1:8015`)
    /// - `REQRELAY_TIMEOUT_MS` — optional per-attempt timeout in milliseconds
    ///
    /// Returns an error if the base URL is missing, empty or unparsable, or if
    /// the timeout is not a number.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use reqrelay::RelayClient;
    ///
    /// let client = RelayClient::from_env().expect("missing REQRELAY_BASE_URL");
    /// ```
    pub fn from_env() -> std::result::Result<Self, String> {
        let url = std::env::var("REQRELAY_BASE_URL")
            .map_err(|_| "missing REQRELAY_BASE_URL environment variable".to_owned())?;
        if url.trim().is_empty() {
            return Err("REQRELAY_BASE_URL is set but empty".to_owned());
        }
        let mut options = ClientOptions::default();
        if let Ok(raw) = std::env::var("REQRELAY_TIMEOUT_MS") {
            let timeout_ms = raw
                .trim()
                .parse::<u64>()
                .map_err(|err| format!("invalid REQRELAY_TIMEOUT_MS '{raw}': {err}"))?;
            options.timeout_ms = Some(timeout_ms);
        }
        let client = Self::new(&url).map_err(|err| format!("invalid REQRELAY_BASE_URL: {err}"))?;
        Ok(client.with_options(options))
    }

    /// Applies client options such as timeout, retry schedule and display timing.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Issues a single call without retrying.
    ///
    /// The HTTP status is not inspected: any body that decodes as an envelope
    /// is a valid reply, error statuses included.
    pub async fn send_once(&self, descriptor: &RequestDescriptor) -> Result<ResponseEnvelope> {
        let url = descriptor.request_url(&self.base_url)?;
        self.call(url).await
    }

    /// Runs the full retry sequence and returns the first decoded envelope.
    ///
    /// Fails with [`RelayError::Exhausted`] once the initial call and every
    /// retry have failed.
    pub async fn send(&self, descriptor: &RequestDescriptor) -> Result<ResponseEnvelope> {
        self.send_cancellable(descriptor, &CancelFlag::new()).await
    }

    /// Like [`RelayClient::send`], but stops with [`RelayError::Cancelled`]
    /// once `cancel` is set. The flag is checked before every call and
    /// interrupts the wait between retries.
    pub async fn send_cancellable(
        &self,
        descriptor: &RequestDescriptor,
        cancel: &CancelFlag,
    ) -> Result<ResponseEnvelope> {
        self.drive(descriptor, cancel, |_| {}).await
    }

    pub(crate) async fn drive<F>(
        &self,
        descriptor: &RequestDescriptor,
        cancel: &CancelFlag,
        report: F,
    ) -> Result<ResponseEnvelope>
    where
        F: Fn(Phase),
    {
        let url = descriptor.request_url(&self.base_url)?;
        let mut state = RetryState::from_options(&self.options);
        state.start();
        report(state.phase());

        loop {
            if cancel.is_cancelled() {
                state.record_cancelled();
                report(state.phase());
                return Err(RelayError::Cancelled);
            }

            let err = match self.call(url.clone()).await {
                Ok(envelope) => {
                    state.record_success();
                    report(state.phase());
                    return Ok(envelope);
                }
                Err(err) => err,
            };

            if !err.is_transient() {
                state.record_fatal();
                report(state.phase());
                return Err(err);
            }

            #[cfg(feature = "tracing")]
            tracing::warn!(attempt = state.attempt_count(), error = %err, "relay request failed");

            let Some(delay) = state.record_failure() else {
                report(state.phase());
                #[cfg(feature = "tracing")]
                tracing::error!(attempts = state.calls_issued(), "relay request retries exhausted");
                return Err(RelayError::Exhausted {
                    attempts: state.calls_issued(),
                    source: Box::new(err),
                });
            };
            report(state.phase());

            #[cfg(feature = "tracing")]
            tracing::debug!(
                "retrying relay request ({}/{}) after {} ms",
                state.attempt_count(),
                state.max_attempts(),
                delay.as_millis()
            );

            tokio::select! {
                _ = sleep(delay) => {}
                _ = cancel.cancelled() => {
                    state.record_cancelled();
                    report(state.phase());
                    return Err(RelayError::Cancelled);
                }
            }
        }
    }

    async fn call(&self, url: Url) -> Result<ResponseEnvelope> {
        let mut request = self.http.get(url);
        if let Some(timeout) = self.options.timeout() {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(RelayError::Transport)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(status = response.status().as_u16(), "relay response received");

        let body = response.text().await.map_err(RelayError::Transport)?;
        ResponseEnvelope::from_body(&body)
    }
}
