use reqwest::StatusCode;
use tokio_tungstenite::tungstenite;

/// Failures of the client subcommands, split by which port was involved.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("no control endpoint at {0}")]
    ControlUnreachable(String),

    #[error("no notification endpoint at {0}")]
    NotificationUnreachable(String),

    #[error("{url} answered {status}")]
    Rejected { url: String, status: StatusCode },

    #[error("malformed state frame: {0}")]
    BadFrame(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ClientError {
    /// True when nothing was listening, as opposed to a server that misbehaved.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            Self::ControlUnreachable(_) | Self::NotificationUnreachable(_)
        )
    }

    pub(crate) fn control(url: &str, err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self::ControlUnreachable(url.to_string())
        } else {
            Self::Other(anyhow::Error::new(err).context(format!("request to {url} failed")))
        }
    }

    pub(crate) fn notification(url: &str, err: tungstenite::Error) -> Self {
        match err {
            tungstenite::Error::Io(io)
                if io.kind() == std::io::ErrorKind::ConnectionRefused =>
            {
                Self::NotificationUnreachable(url.to_string())
            }
            other => {
                Self::Other(anyhow::Error::new(other).context(format!("subscription to {url} failed")))
            }
        }
    }
}
