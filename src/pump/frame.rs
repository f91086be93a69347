//! Application frames as seen by the pump's consumers.

// ============================================================================
// Imports
// ============================================================================

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_tungstenite::tungstenite::Message;

// ============================================================================
// FrameKind
// ============================================================================

/// Wire type of a data frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    /// UTF-8 text message.
    Text,
    /// Binary message.
    Binary,
}

// ============================================================================
// Frame
// ============================================================================

/// One inbound application message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    kind: FrameKind,
    payload: Bytes,
}

impl Frame {
    /// Creates a binary frame.
    #[inline]
    #[must_use]
    pub fn binary(payload: impl Into<Bytes>) -> Self {
        Self {
            kind: FrameKind::Binary,
            payload: payload.into(),
        }
    }

    /// Creates a text frame.
    #[inline]
    #[must_use]
    pub fn text(payload: impl Into<String>) -> Self {
        Self {
            kind: FrameKind::Text,
            payload: Bytes::from(payload.into()),
        }
    }

    /// Converts a data message; control messages yield `None`.
    pub(crate) fn from_message(message: Message) -> Option<Self> {
        let kind = match &message {
            Message::Text(_) => FrameKind::Text,
            Message::Binary(_) => FrameKind::Binary,
            _ => return None,
        };
        Some(Self {
            kind,
            payload: message.into_data(),
        })
    }

    /// Wire type of this frame.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    /// Raw payload bytes.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Consumes the frame, returning its payload.
    #[inline]
    #[must_use]
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Payload as text, for text frames only.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self.kind {
            FrameKind::Text => std::str::from_utf8(&self.payload).ok(),
            FrameKind::Binary => None,
        }
    }

    /// Payload length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns `true` if the payload is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
