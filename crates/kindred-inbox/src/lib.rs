pub mod conversations;
pub mod events;
pub mod inbox;
pub mod messages;
pub mod moderation;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testing;

pub use conversations::ConversationStore;
pub use events::EventBus;
pub use inbox::{ComposeState, Inbox, InboxConfig};
pub use messages::{Delivery, MessageStore, ThreadMessage};
pub use moderation::{BlockOutcome, ModerationController, ReportDialog};
pub use scheduler::PollingScheduler;
