//! Envelopes exchanged between the chat UI and the workspace host.
//!
//! Every request carries a [`RequestId`] that the response echoes back, so a
//! late answer for a request the session no longer waits on can be dropped.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::relay::RelayError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// UI → host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum UiMessage {
    /// Read a workspace-relative file.
    ReadFile {
        filename: String,
        request_id: RequestId,
    },
    /// List every file under the workspace root.
    RequestFileList { request_id: RequestId },
}

impl UiMessage {
    pub fn request_id(&self) -> RequestId {
        match self {
            UiMessage::ReadFile { request_id, .. } | UiMessage::RequestFileList { request_id } => {
                *request_id
            }
        }
    }
}

/// Host → UI.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum HostMessage {
    FileContent {
        content: String,
        request_id: RequestId,
    },
    /// The file is missing or unreadable.
    FileNotFound { request_id: RequestId },
    /// Full listing: relative paths with `/` separators.
    FileList {
        files: Vec<String>,
        request_id: RequestId,
    },
}

impl HostMessage {
    pub fn request_id(&self) -> RequestId {
        match self {
            HostMessage::FileContent { request_id, .. }
            | HostMessage::FileNotFound { request_id }
            | HostMessage::FileList { request_id, .. } => *request_id,
        }
    }
}

/// Outcome of one relay call.
#[derive(Debug)]
pub struct RelayReply {
    pub request_id: RequestId,
    pub result: Result<String, RelayError>,
}

/// Everything that can wake the session up after an asynchronous boundary.
#[derive(Debug)]
pub enum SessionEvent {
    Host(HostMessage),
    Relay(RelayReply),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn read_file_wire_shape() {
        let msg = UiMessage::ReadFile {
            filename: "notes.md".into(),
            request_id: RequestId(3),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "readFile", "filename": "notes.md", "requestId": 3})
        );
    }

    #[test]
    fn request_file_list_wire_shape() {
        let msg = UiMessage::RequestFileList {
            request_id: RequestId(1),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "requestFileList", "requestId": 1})
        );
    }

    #[test]
    fn host_messages_parse_from_wire() {
        let content: HostMessage =
            serde_json::from_value(json!({"type": "fileContent", "content": "hi", "requestId": 7}))
                .unwrap();
        assert_eq!(
            content,
            HostMessage::FileContent {
                content: "hi".into(),
                request_id: RequestId(7)
            }
        );

        let missing: HostMessage =
            serde_json::from_value(json!({"type": "fileNotFound", "requestId": 8})).unwrap();
        assert_eq!(missing.request_id(), RequestId(8));

        let list: HostMessage = serde_json::from_value(
            json!({"type": "fileList", "files": ["a.txt", "b/c.txt"], "requestId": 9}),
        )
        .unwrap();
        assert_eq!(
            list,
            HostMessage::FileList {
                files: vec!["a.txt".into(), "b/c.txt".into()],
                request_id: RequestId(9)
            }
        );
    }

    #[test]
    fn unknown_type_is_rejected() {
        let parsed = serde_json::from_value::<HostMessage>(json!({"type": "bogus", "requestId": 1}));
        assert!(parsed.is_err());
    }
}
