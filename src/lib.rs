//! `reqrelay` is an async client for an HTTP request-proxy backend.
//!
//! A [`RequestDescriptor`] describes the outbound request (method, URL,
//! encoding, body, custom headers, cookie, proxy). The crate submits it to the
//! backend's `/request` endpoint and retries transient failures on a bounded
//! backoff schedule:
//! - [`RelayClient::send`] returns the decoded [`ResponseEnvelope`]
//! - [`Controller::submit`] renders the outcome onto a [`Surface`]

mod cancel;
mod client;
mod controller;
mod descriptor;
mod display;
mod envelope;
mod error;
mod options;
mod retry;

pub use cancel::CancelFlag;
pub use client::{RelayClient, DEFAULT_BASE_URL};
pub use controller::{Controller, Outcome, SubmissionHandle};
pub use descriptor::{Encoding, Method, RequestDescriptor, REQUEST_PATH};
pub use display::{
    render_envelope, truncate_log, MemorySurface, Rendered, StatusClass, Surface,
    SurfaceSnapshot, DEFAULT_MESSAGE, FAILURE_NOTICE, TRUNCATION_MARKER,
};
pub use envelope::ResponseEnvelope;
pub use error::RelayError;
pub use options::ClientOptions;
pub use retry::{Phase, RetryState};

pub type Result<T> = std::result::Result<T, RelayError>;
