// Import necessary modules and types
use crate::actors::messages::QueryActorMessage;
use crate::resolver::Resolver;
use crate::transport::Transport;

use tokio::sync::mpsc;
use tracing::{error, info};

/// Resolves DNS queries by acting as an actor that processes incoming messages.
/// Messages are handled one at a time, so resolutions never overlap.
pub struct QueryActor<T> {
    // The receiver for incoming messages
    receiver: mpsc::Receiver<QueryActorMessage>,
    // The resolver used to resolve DNS queries
    resolver: Resolver<T>,
}

impl<T> QueryActor<T>
where
    T: Transport + Send + Sync,
{
    // Constructor for the actor
    pub fn new(receiver: mpsc::Receiver<QueryActorMessage>, resolver: Resolver<T>) -> Self {
        Self { receiver, resolver }
    }

    // Run the actor
    pub async fn run(&mut self) {
        // Continuously receive messages and handle them
        while let Some(msg) = self.receiver.recv().await {
            self.handle_message(msg).await;
        }
    }

    // Handle a message
    async fn handle_message(&self, msg: QueryActorMessage) {
        match msg {
            QueryActorMessage::Resolve {
                question,
                respond_to,
            } => {
                let result = self.resolver.resolve(&question.name, question.qtype).await;

                match &result {
                    Ok(packet) => info!(
                        %question,
                        rescode = %packet.header.rescode,
                        answers = packet.answers.len(),
                        "resolution finished"
                    ),
                    Err(e) => error!("DNS lookup failed for {}: {}", question, e),
                }

                // The requester may have gone away; nothing to do if so
                let _ = respond_to.send(result);
            }
        }
    }
}
