use tokio::sync::{mpsc, oneshot};

use crate::actors::{messages::QueryActorMessage, query_actor::QueryActor};
use crate::errors::ResolveError;
use crate::protocol::{Packet, Question};
use crate::resolver::Resolver;
use crate::transport::Transport;

#[derive(Clone, Debug)]
pub struct QueryActorHandle {
    sender: mpsc::Sender<QueryActorMessage>,
}

// Gives you access to the underlying actor.
impl QueryActorHandle {
    pub fn new<T>(resolver: Resolver<T>) -> Self
    where
        T: Transport + Send + Sync + 'static,
    {
        let (sender, receiver) = mpsc::channel(8);
        let mut actor = QueryActor::new(receiver, resolver);
        tokio::spawn(async move { actor.run().await });

        Self { sender }
    }

    /// Resolves a question to the final packet of the delegation walk.
    pub async fn resolve(&self, question: Question) -> Result<Packet, ResolveError> {
        let (send, recv) = oneshot::channel();
        let msg = QueryActorMessage::Resolve {
            question,
            respond_to: send,
        };

        // If this send fails, so does the recv.await below.
        // There's no reason to check the failure twice.
        let _ = self.sender.send(msg).await;

        recv.await.map_err(|_| ResolveError::ActorUnavailable)?
    }
}
