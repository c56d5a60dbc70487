//! Wire format for state notifications.

use axum::extract::ws::Utf8Bytes;
use serde::{Deserialize, Serialize};

use crate::state::WindowState;

/// The only frame the notification server ever sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    #[serde(rename = "windowOpened")]
    pub window_opened: bool,
}

impl From<WindowState> for BroadcastMessage {
    fn from(state: WindowState) -> Self {
        Self {
            window_opened: state.is_open(),
        }
    }
}

impl From<BroadcastMessage> for WindowState {
    fn from(msg: BroadcastMessage) -> Self {
        WindowState::from(msg.window_opened)
    }
}

/// Encode a state as a text frame. The result is reference-counted, so one
/// encoding can be handed to every sink of a broadcast pass.
pub fn encode(state: WindowState) -> serde_json::Result<Utf8Bytes> {
    serde_json::to_string(&BroadcastMessage::from(state)).map(Utf8Bytes::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_open() {
        let frame = encode(WindowState::Open).unwrap();
        let value: serde_json::Value = serde_json::from_str(frame.as_str()).unwrap();
        assert_eq!(value, serde_json::json!({ "windowOpened": true }));
    }

    #[test]
    fn test_encode_closed() {
        let frame = encode(WindowState::Closed).unwrap();
        let msg: BroadcastMessage = serde_json::from_str(frame.as_str()).unwrap();
        assert!(!msg.window_opened);
        assert_eq!(WindowState::from(msg), WindowState::Closed);
    }

    #[test]
    fn test_frame_is_exact_wire_text() {
        assert_eq!(encode(WindowState::Open).unwrap().as_str(), r#"{"windowOpened":true}"#);
        assert_eq!(encode(WindowState::Closed).unwrap().as_str(), r#"{"windowOpened":false}"#);
    }

    #[test]
    fn test_encode_has_no_other_fields() {
        let frame = encode(WindowState::Open).unwrap();
        let value: serde_json::Value = serde_json::from_str(frame.as_str()).unwrap();
        assert_eq!(value.as_object().map(|o| o.len()), Some(1));
    }
}
