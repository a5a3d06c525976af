//! Control channel messages.
//!
//! Messages and replies travel as JSON objects tagged by `"type"`:
//!
//! | Message | Reply |
//! |---------|-------|
//! | `{"type":"skip-wait"}` | `{"type":"ack"}` |
//! | `{"type":"get-version"}` | `{"type":"version","version":"app-v1.0.0"}` |
//! | `{"type":"clear-cache"}` | `{"type":"cleared","success":true}` |
//! | `{"type":"update-cache"}` | `{"type":"updated","success":true}` |
//! | anything else | `{"type":"error","message":"..."}` |

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ControlMessage {
    /// Activate a waiting instance now.
    SkipWait,
    /// Report the current generation name.
    GetVersion,
    /// Delete every generation of the app.
    ClearCache,
    /// Re-populate the current generation from the origin.
    UpdateCache,
}

impl ControlMessage {
    /// Parse a JSON control message. Fields other than `type` are ignored.
    ///
    /// # Errors
    ///
    /// - `Error::DeserializationError`: Not a JSON document
    /// - `Error::UnknownControlMessage`: Missing or unrecognised `type`
    pub fn from_json(raw: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        let kind = value
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| Error::UnknownControlMessage("message has no type".to_string()))?;
        Self::from_kind(kind)
    }

    /// Look up a message by its `type` tag.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownControlMessage` for an unrecognised tag.
    pub fn from_kind(kind: &str) -> Result<Self> {
        match kind {
            "skip-wait" => Ok(ControlMessage::SkipWait),
            "get-version" => Ok(ControlMessage::GetVersion),
            "clear-cache" => Ok(ControlMessage::ClearCache),
            "update-cache" => Ok(ControlMessage::UpdateCache),
            other => Err(Error::UnknownControlMessage(other.to_string())),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ControlMessage::SkipWait => "skip-wait",
            ControlMessage::GetVersion => "get-version",
            ControlMessage::ClearCache => "clear-cache",
            ControlMessage::UpdateCache => "update-cache",
        }
    }
}

impl fmt::Display for ControlMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// Reply sent on a message's reply channel. Exactly one per message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ControlReply {
    Ack,
    Version { version: String },
    Cleared { success: bool },
    Updated { success: bool },
    Error { message: String },
}

impl ControlReply {
    pub fn error(err: impl fmt::Display) -> Self {
        ControlReply::Error {
            message: err.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ControlReply::Error { .. })
    }

    /// # Errors
    ///
    /// Returns `Error::SerializationError` if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::SerializationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_messages() {
        for (raw, expected) in [
            (r#"{"type":"skip-wait"}"#, ControlMessage::SkipWait),
            (r#"{"type":"get-version"}"#, ControlMessage::GetVersion),
            (r#"{"type":"clear-cache"}"#, ControlMessage::ClearCache),
            (r#"{"type":"update-cache","extra":1}"#, ControlMessage::UpdateCache),
        ] {
            assert_eq!(ControlMessage::from_json(raw).expect("Failed to parse"), expected);
        }
    }

    #[test]
    fn test_parse_unknown_message() {
        assert!(matches!(
            ControlMessage::from_json(r#"{"type":"self-destruct"}"#),
            Err(Error::UnknownControlMessage(kind)) if kind == "self-destruct"
        ));
        assert!(matches!(
            ControlMessage::from_json(r#"{"kind":"skip-wait"}"#),
            Err(Error::UnknownControlMessage(_))
        ));
        assert!(matches!(
            ControlMessage::from_json("not json"),
            Err(Error::DeserializationError(_))
        ));
    }

    #[test]
    fn test_message_serializes_with_tag() {
        let json = serde_json::to_string(&ControlMessage::GetVersion).expect("Failed to encode");
        assert_eq!(json, r#"{"type":"get-version"}"#);
        assert_eq!(ControlMessage::ClearCache.to_string(), "clear-cache");
    }

    #[test]
    fn test_reply_json_shapes() {
        assert_eq!(ControlReply::Ack.to_json().expect("encode"), r#"{"type":"ack"}"#);
        assert_eq!(
            ControlReply::Version {
                version: "app-v1.0.0".to_string()
            }
            .to_json()
            .expect("encode"),
            r#"{"type":"version","version":"app-v1.0.0"}"#
        );
        assert_eq!(
            ControlReply::Cleared { success: true }.to_json().expect("encode"),
            r#"{"type":"cleared","success":true}"#
        );
        assert_eq!(
            ControlReply::Updated { success: false }.to_json().expect("encode"),
            r#"{"type":"updated","success":false}"#
        );
        let error = ControlReply::error("boom");
        assert!(error.is_error());
        assert_eq!(error.to_json().expect("encode"), r#"{"type":"error","message":"boom"}"#);
    }
}
