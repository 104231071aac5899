/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Response body was not a JSON envelope.
    #[error("decode error: {0}")]
    Decode(String),
    /// Backend base URL could not be parsed or joined.
    #[error("invalid backend url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// Backend URL has no authority to resolve `/request` against.
    #[error("backend url '{0}' cannot serve as a base url")]
    UnsupportedBase(String),
    /// Form field holds a value outside the offered options.
    #[error("invalid value '{value}' for field '{field}'")]
    InvalidField {
        /// Form field name.
        field: &'static str,
        /// Raw value that was rejected.
        value: String,
    },
    /// Every attempt of the retry sequence failed.
    #[error("request failed after {attempts} attempts: {source}")]
    Exhausted {
        /// Number of calls issued, the initial one included.
        attempts: usize,
        /// Failure of the last attempt.
        source: Box<RelayError>,
    },
    /// The sequence was cancelled before it reached a terminal state.
    #[error("request sequence cancelled")]
    Cancelled,
}

impl RelayError {
    /// Returns `true` for failures the retry loop re-issues the request on.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Decode(_))
    }
}

#[cfg(test)]
mod tests {
    use super::RelayError;

    #[test]
    fn only_transport_and_decode_failures_are_transient() {
        assert!(RelayError::Decode("not json".to_owned()).is_transient());
        assert!(!RelayError::Cancelled.is_transient());
        assert!(!RelayError::UnsupportedBase("mailto:x".to_owned()).is_transient());
        assert!(!RelayError::InvalidField {
            field: "method",
            value: "FETCH".to_owned(),
        }
        .is_transient());
    }
}
