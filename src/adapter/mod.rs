pub mod contract;
pub mod echo;
pub mod types;

pub use contract::{AdapterError, ChatAdapter, PromptRequest};
pub use echo::EchoAdapter;
pub use types::{
    AiMessage, ChatSegmentItem, DataTransferMode, MessageStatus, ParticipantRole, new_uid,
};
