use std::net::SocketAddr;

/// Errors that stop the notifier from starting.
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("failed to bind {role} listener on {addr}")]
    Bind {
        role: &'static str,
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid listen address {0:?}")]
    InvalidAddress(String),

    #[error("invalid configuration")]
    Config(#[from] Box<figment::Error>),

    #[error("server error")]
    Serve(#[from] std::io::Error),
}

/// Why a frame could not be queued for a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The sink's outbox is full; its consumer has fallen behind.
    #[error("sink outbox is full")]
    Full,

    /// The connection behind the sink has gone away.
    #[error("sink is closed")]
    Closed,
}
