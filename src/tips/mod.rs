//! Environmental tips delivered to the pet.
//!
//! A producer thread fetches data and pushes finished messages into an
//! unbounded channel. The UI side drains it through [`TipInbox`] at its own
//! pace and never blocks.

pub mod connect;
mod inbox;
mod producer;

pub use connect::connect_pipeline;
pub use inbox::TipInbox;
pub use producer::{TipPipeline, TipProducer, TipProducerConfig};

use crate::chat::ChatMessage;
use tokio::sync::mpsc;

/// Create the queue shared by the producer and the UI
pub fn tip_queue() -> (mpsc::UnboundedSender<ChatMessage>, mpsc::UnboundedReceiver<ChatMessage>) {
    mpsc::unbounded_channel()
}
