pub mod compose;
pub mod config;
pub mod host;
pub mod mention;
pub mod protocol;
pub mod relay;
pub mod session;
pub mod suggest;
pub mod transcript;

// Re-exports
pub use config::{ChatConfig, ConfigError};
pub use host::{FileIndex, FileResolver, HostBridge, LocalBridge, Workspace};
pub use mention::{Mention, find_mention};
pub use protocol::{HostMessage, RelayReply, RequestId, SessionEvent, UiMessage};
pub use relay::{RelayClient, RelayDispatch, RelayError, SpawnedRelay};
pub use session::{ChatSession, ChatState, EventOutcome, SubmitError, Submission};
pub use suggest::{FileList, SuggestionState};
pub use transcript::{Message, Role, Transcript};
