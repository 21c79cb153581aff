//! Iterative resolution from the root down the delegation chain.
//!
//! Each hop sends the original question to one name server and inspects the
//! reply: an answer or NXDOMAIN ends the walk, a referral with glue moves on
//! to the glue address, and a referral without glue resolves a name server
//! host from the root first.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use async_recursion::async_recursion;
use tracing::{debug, info, warn};

use crate::errors::ResolveError;
use crate::protocol::{Header, Packet, QueryType, Question, ResultCode};
use crate::transport::Transport;

/// Port upstream name servers listen on
pub const DNS_PORT: u16 = 53;

/// a.root-servers.net
pub const DEFAULT_ROOT: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(Ipv4Addr::new(198, 41, 0, 4)), DNS_PORT);

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Where every resolution starts
    pub root: SocketAddr,
    /// Per-hop wait for a reply
    pub timeout: Duration,
    /// How deep name server lookups may nest
    pub max_depth: usize,
    /// How many referrals one level may follow
    pub max_referrals: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            root: DEFAULT_ROOT,
            timeout: Duration::from_secs(5),
            max_depth: 16,
            max_referrals: 32,
        }
    }
}

pub struct Resolver<T> {
    transport: T,
    config: ResolverConfig,
}

impl<T> Resolver<T>
where
    T: Transport + Send + Sync,
{
    pub fn new(transport: T, config: ResolverConfig) -> Self {
        Self { transport, config }
    }

    /// Send a single question to `server` and decode the reply
    pub async fn lookup(
        &self,
        qname: &str,
        qtype: QueryType,
        server: SocketAddr,
    ) -> Result<Packet, ResolveError> {
        let packet = Packet {
            header: Header {
                id: rand::random(),
                recursion_desired: true,
                ..Header::default()
            },
            questions: vec![Question::new(qname, qtype)],
            ..Packet::default()
        };

        let request = packet.to_bytes()?;
        let reply = self.transport.exchange(&request, server).await?;
        let response = Packet::from_bytes(&reply)?;

        debug!(
            %server,
            %qname,
            %qtype,
            rescode = %response.header.rescode,
            answers = response.answers.len(),
            authorities = response.authorities.len(),
            resources = response.resources.len(),
            "name server replied"
        );

        Ok(response)
    }

    /// Resolve `qname` starting from the configured root server
    pub async fn resolve(&self, qname: &str, qtype: QueryType) -> Result<Packet, ResolveError> {
        self.resolve_at_depth(qname, qtype, 0).await
    }

    #[async_recursion]
    async fn resolve_at_depth(
        &self,
        qname: &str,
        qtype: QueryType,
        depth: usize,
    ) -> Result<Packet, ResolveError> {
        if depth > self.config.max_depth {
            return Err(ResolveError::RecursionLimit {
                depth: self.config.max_depth,
            });
        }

        let mut server = self.config.root;
        let mut referrals = 0;

        loop {
            info!(%qname, %qtype, %server, depth, "attempting lookup");

            let response = self.lookup(qname, qtype, server).await?;

            if !response.answers.is_empty() && response.header.rescode == ResultCode::NoError {
                return Ok(response);
            }

            if response.header.rescode == ResultCode::NxDomain {
                return Ok(response);
            }

            if let Some(ns) = response.resolved_name_server(qname) {
                self.count_referral(&mut referrals)?;
                server = SocketAddr::new(ns.into(), DNS_PORT);
                continue;
            }

            debug!(
                %qname,
                host = response.unresolved_name_server_host(qname).unwrap_or("-"),
                "no glue for delegation, resolving name server"
            );

            let hosts: Vec<String> = response
                .name_servers(qname)
                .map(|(_, host)| host)
                .filter(|host| !host.is_empty())
                .map(str::to_string)
                .collect();

            let mut next = None;
            for host in hosts {
                // Name server addresses are always A lookups
                match self.resolve_at_depth(&host, QueryType::A, depth + 1).await {
                    Ok(recursive_response) => match recursive_response.random_a() {
                        Some(addr) => {
                            next = Some(addr);
                            break;
                        }
                        None => return Ok(response),
                    },
                    Err(e) => {
                        warn!(%host, error = %e, "could not resolve name server, trying the next one");
                    }
                }
            }

            match next {
                Some(addr) => {
                    self.count_referral(&mut referrals)?;
                    server = SocketAddr::new(addr.into(), DNS_PORT);
                }
                None => return Ok(response),
            }
        }
    }

    /// Charge one followed referral against `max_referrals`
    fn count_referral(&self, referrals: &mut usize) -> Result<(), ResolveError> {
        *referrals += 1;
        if *referrals > self.config.max_referrals {
            return Err(ResolveError::ReferralLimit {
                hops: self.config.max_referrals,
            });
        }
        Ok(())
    }
}
