use thiserror::Error;

/// Unified error type for the whole crate.
///
/// Argument/usage errors (`InvalidLength`, `UnknownMessage`, `SignalOutOfRange`,
/// `SignalExceedsMessage`, `BitPositionOutOfBounds`) propagate to the caller. Transport and
/// callback errors are recovered locally by the `Messenger` listener loop; they're part of this
/// enum only because `Socket`/DBC decode still need to *name* the failure when logging it.
#[derive(Debug, Error)]
pub enum Error {
    #[error("payload of {len} bytes exceeds the {max} byte limit for this frame kind")]
    InvalidLength { len: usize, max: usize },

    #[error("no DBC message named {0:?}")]
    UnknownMessage(String),

    #[error("signal {signal:?} value {raw} does not fit in a {length}-bit field")]
    SignalOutOfRange {
        signal: String,
        raw: i64,
        length: u8,
    },

    #[error("signal {signal:?} declares bit length {length}, outside the valid 1..=64 range")]
    InvalidSignalLength { signal: String, length: u8 },

    #[error("signal {signal:?} bit range extends past the message's {dlc}-byte payload")]
    SignalExceedsMessage { signal: String, dlc: u8 },

    #[error("signal {signal:?} requires bit {bit} but only {available} bytes were provided")]
    BitPositionOutOfBounds {
        signal: String,
        bit: usize,
        available: usize,
    },

    #[error("failed to open or configure CAN socket on {interface:?}")]
    SocketOpenError {
        interface: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CAN interface lookup failed")]
    LookupError(#[source] nix::Error),

    #[error("CAN transport error")]
    TransportError(#[source] std::io::Error),

    #[error("malformed frame bytes ({0} bytes, expected at least 8)")]
    ParseError(usize),

    #[error("listener callback returned an error")]
    CallbackError(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to read DBC file")]
    DbcIo(#[from] std::io::Error),
}

pub type CanResult<T> = std::result::Result<T, Error>;
