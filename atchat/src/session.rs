//! The chat session: one explicit state machine per submission.
//!
//! ```text
//! Idle --submit(@token)--> AwaitingFile --fileContent--> AwaitingRelay --reply--> Idle
//! Idle --submit---------------------------------------> AwaitingRelay
//! AwaitingFile --fileNotFound--> Idle
//! ```
//!
//! The host bridge and the relay are injected, so the session can be driven
//! entirely from tests.

use std::sync::Arc;

use crate::compose::{compose_prompt, not_found_notice};
use crate::host::HostBridge;
use crate::mention::find_mention;
use crate::protocol::{HostMessage, RelayReply, RequestId, SessionEvent, UiMessage};
use crate::relay::{RELAY_ERROR_TEXT, RelayDispatch};
use crate::suggest::{FileList, SuggestionState};
use crate::transcript::{Message, Transcript};

/// A submitted mention waiting for its file content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingMention {
    pub raw_filename: String,
    pub original_input: String,
    pub request_id: RequestId,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum ChatState {
    #[default]
    Idle,
    AwaitingFile(PendingMention),
    AwaitingRelay { request_id: RequestId },
}

impl ChatState {
    pub fn is_idle(&self) -> bool {
        matches!(self, ChatState::Idle)
    }

    /// Short label for status displays.
    pub fn label(&self) -> &'static str {
        match self {
            ChatState::Idle => "idle",
            ChatState::AwaitingFile(_) => "reading file",
            ChatState::AwaitingRelay { .. } => "waiting for reply",
        }
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("nothing to send")]
    Empty,
    #[error("still {0}")]
    Busy(&'static str),
}

/// What an accepted submission is now waiting on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Submission {
    AwaitingFile { filename: String },
    AwaitingRelay,
}

/// Whether an inbound event matched an outstanding request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventOutcome {
    Applied,
    Stale,
}

pub struct ChatSession {
    transcript: Transcript,
    files: FileList,
    state: ChatState,
    next_id: u64,
    /// Latest outstanding listing request; older listings are dropped.
    list_request: Option<RequestId>,
    bridge: Arc<dyn HostBridge>,
    relay: Arc<dyn RelayDispatch>,
}

impl ChatSession {
    pub fn new(bridge: Arc<dyn HostBridge>, relay: Arc<dyn RelayDispatch>) -> Self {
        Self {
            transcript: Transcript::new(),
            files: FileList::default(),
            state: ChatState::Idle,
            next_id: 0,
            list_request: None,
            bridge,
            relay,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn files(&self) -> &FileList {
        &self.files
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn is_busy(&self) -> bool {
        !self.state.is_idle()
    }

    fn next_request_id(&mut self) -> RequestId {
        self.next_id += 1;
        RequestId(self.next_id)
    }

    /// Ask the host for a fresh listing. Also the manual refresh hook.
    pub fn request_file_list(&mut self) -> RequestId {
        let request_id = self.next_request_id();
        self.list_request = Some(request_id);
        self.bridge.post(UiMessage::RequestFileList { request_id });
        request_id
    }

    /// Suggestions for the current input and caret.
    pub fn suggest(&self, input: &str, cursor: usize) -> Option<SuggestionState> {
        SuggestionState::compute(&self.files, input, cursor)
    }

    /// Submit user text. Rejected while any request is outstanding.
    pub fn submit(&mut self, text: &str) -> Result<Submission, SubmitError> {
        if !self.state.is_idle() {
            return Err(SubmitError::Busy(self.state.label()));
        }
        if text.trim().is_empty() {
            return Err(SubmitError::Empty);
        }

        self.transcript.append(Message::user(text));

        match find_mention(text) {
            Some(mention) => {
                let filename = mention.filename.to_string();
                let request_id = self.next_request_id();
                tracing::debug!(%request_id, %filename, "requesting mentioned file");
                self.state = ChatState::AwaitingFile(PendingMention {
                    raw_filename: filename.clone(),
                    original_input: text.to_string(),
                    request_id,
                });
                self.bridge.post(UiMessage::ReadFile {
                    filename: filename.clone(),
                    request_id,
                });
                Ok(Submission::AwaitingFile { filename })
            }
            None => {
                self.send_to_relay(text.to_string());
                Ok(Submission::AwaitingRelay)
            }
        }
    }

    fn send_to_relay(&mut self, prompt: String) {
        let request_id = self.next_request_id();
        tracing::debug!(%request_id, len = prompt.len(), "dispatching prompt");
        self.state = ChatState::AwaitingRelay { request_id };
        self.relay.dispatch(request_id, prompt);
    }

    pub fn handle_event(&mut self, event: SessionEvent) -> EventOutcome {
        match event {
            SessionEvent::Host(message) => self.handle_host_message(message),
            SessionEvent::Relay(reply) => self.handle_relay_reply(reply),
        }
    }

    fn handle_host_message(&mut self, message: HostMessage) -> EventOutcome {
        let request_id = message.request_id();
        match message {
            HostMessage::FileList { files, .. } => {
                if self.list_request != Some(request_id) {
                    tracing::debug!(%request_id, "dropping stale file listing");
                    return EventOutcome::Stale;
                }
                self.list_request = None;
                self.files.replace(files);
                EventOutcome::Applied
            }
            HostMessage::FileContent { content, .. } => {
                let Some(pending) = self.take_pending(request_id) else {
                    return EventOutcome::Stale;
                };
                let prompt =
                    compose_prompt(&pending.original_input, &pending.raw_filename, &content);
                self.send_to_relay(prompt);
                EventOutcome::Applied
            }
            HostMessage::FileNotFound { .. } => {
                let Some(pending) = self.take_pending(request_id) else {
                    return EventOutcome::Stale;
                };
                tracing::info!(filename = %pending.raw_filename, "mentioned file not found");
                self.transcript
                    .append(Message::assistant(not_found_notice(&pending.raw_filename)));
                self.state = ChatState::Idle;
                EventOutcome::Applied
            }
        }
    }

    /// Consume the pending mention if `request_id` is the one it waits on.
    fn take_pending(&mut self, request_id: RequestId) -> Option<PendingMention> {
        let waiting = matches!(
            &self.state,
            ChatState::AwaitingFile(pending) if pending.request_id == request_id
        );
        if !waiting {
            tracing::debug!(%request_id, state = self.state.label(), "dropping stale file reply");
            return None;
        }
        match std::mem::take(&mut self.state) {
            ChatState::AwaitingFile(pending) => Some(pending),
            _ => None,
        }
    }

    fn handle_relay_reply(&mut self, reply: RelayReply) -> EventOutcome {
        match self.state {
            ChatState::AwaitingRelay { request_id } if request_id == reply.request_id => {}
            _ => {
                tracing::debug!(request_id = %reply.request_id, "dropping stale relay reply");
                return EventOutcome::Stale;
            }
        }

        let content = match reply.result {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("relay call failed: {e}");
                RELAY_ERROR_TEXT.to_string()
            }
        };
        self.transcript.append(Message::assistant(content));
        self.state = ChatState::Idle;
        EventOutcome::Applied
    }
}
