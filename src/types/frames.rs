use serde::{Deserialize, Deserializer};

/// One decoded event from the chat-stream response body.
///
/// The backend tags each event with a string kind; anything it grows later
/// decodes to `Unknown` and is skipped rather than treated as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// Progress side channel; never touches the transcript.
    Status { message: String },
    /// Cumulative answer text so far, not a delta.
    Answer { content: String },
    /// End of turn, with the backend's conversation identifier when present.
    Complete { thread_id: Option<String> },
    /// Backend-reported failure, terminal for the turn.
    Error { message: String },
    Unknown,
}

/// Wire shape before kind dispatch. The kind field is spelled `type` by the
/// current backend; `kind` is accepted as well.
#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type", alias = "kind")]
    kind: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    thread_id: Option<String>,
}

impl<'de> Deserialize<'de> for StreamFrame {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawFrame::deserialize(deserializer)?;
        Ok(match raw.kind.as_str() {
            "status" => Self::Status {
                message: raw.message.unwrap_or_default(),
            },
            "answer" => Self::Answer {
                content: raw.content.unwrap_or_default(),
            },
            "complete" => Self::Complete {
                thread_id: raw.thread_id,
            },
            "error" => Self::Error {
                message: raw
                    .message
                    .unwrap_or_else(|| "unspecified backend error".to_string()),
            },
            _ => Self::Unknown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_frame_decodes_content() {
        let frame: StreamFrame =
            serde_json::from_str(r#"{"type":"answer","content":"Hi there"}"#).unwrap();
        assert_eq!(
            frame,
            StreamFrame::Answer {
                content: "Hi there".to_string()
            }
        );
    }

    #[test]
    fn test_kind_key_is_accepted_as_alias() {
        let frame: StreamFrame =
            serde_json::from_str(r#"{"kind":"status","message":"searching"}"#).unwrap();
        assert_eq!(
            frame,
            StreamFrame::Status {
                message: "searching".to_string()
            }
        );
    }

    #[test]
    fn test_complete_frame_thread_id_is_optional() {
        let frame: StreamFrame = serde_json::from_str(r#"{"type":"complete"}"#).unwrap();
        assert_eq!(frame, StreamFrame::Complete { thread_id: None });

        let frame: StreamFrame =
            serde_json::from_str(r#"{"type":"complete","thread_id":"user-a"}"#).unwrap();
        assert_eq!(
            frame,
            StreamFrame::Complete {
                thread_id: Some("user-a".to_string())
            }
        );
    }

    #[test]
    fn test_unrecognized_kind_maps_to_unknown() {
        let frame: StreamFrame =
            serde_json::from_str(r#"{"type":"heartbeat","seq":7}"#).unwrap();
        assert_eq!(frame, StreamFrame::Unknown);
    }

    #[test]
    fn test_missing_kind_is_a_decode_error() {
        assert!(serde_json::from_str::<StreamFrame>(r#"{"content":"x"}"#).is_err());
    }

    #[test]
    fn test_error_frame_defaults_message() {
        let frame: StreamFrame = serde_json::from_str(r#"{"type":"error"}"#).unwrap();
        assert_eq!(
            frame,
            StreamFrame::Error {
                message: "unspecified backend error".to_string()
            }
        );
    }
}
