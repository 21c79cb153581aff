mod buffer;
mod cli;
mod codec;
mod errors;
mod processor;
mod protocol;
mod resolver;
mod response_builder;
mod transport;

mod actors;
mod handlers;

use crate::handlers::query_handler::QueryActorHandle;

use resolver::Resolver;
use tokio::net::UdpSocket;
use transport::UdpTransport;

use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse_args();

    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let sock = UdpSocket::bind(args.bind).await?;

    let config = args.resolver_config();
    info!(
        root = %config.root,
        timeout = ?config.timeout,
        max_depth = config.max_depth,
        max_referrals = config.max_referrals,
        "resolver configured"
    );

    // The actor owns the resolver; each lookup binds its own upstream socket
    let resolver = Resolver::new(UdpTransport::new(config.timeout), config);
    let query_actor_handle = QueryActorHandle::new(resolver);

    let mut buf = [0; buffer::MAX_PACKET_SIZE];

    info!("DNS server listening on {}", args.bind);

    // One request at a time: each is resolved and answered before the next read
    loop {
        let (len, addr) = sock.recv_from(&mut buf).await?;

        if let Err(e) =
            processor::process_dns_query(&buf[..len], addr, &query_actor_handle, &sock).await
        {
            error!("Failed to send DNS response to {}: {}", addr, e);
        }
    }
}
