use tokio::sync::oneshot;

use crate::errors::ResolveError;
use crate::protocol::{Packet, Question};

/// The ActorMessage enum defines the kind of messages we can send to the actor.
/// By using an enum, we can have many different message types,
/// and each message type can have its own set of arguments.
/// We return a value to the sender by using an oneshot channel,
/// which is a message passing channel that allows sending exactly one message.
#[derive(Debug)]
pub enum QueryActorMessage {
    /// Resolve a question recursively, starting at the root.
    Resolve {
        question: Question,
        respond_to: oneshot::Sender<Result<Packet, ResolveError>>,
    },
}
