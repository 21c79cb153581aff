use bytes::BytesMut;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, error, info, warn};

use crate::codec::DnsCodec;
use crate::handlers::query_handler::QueryActorHandle;
use crate::protocol::{Packet, ResultCode};
use crate::response_builder::DnsResponseBuilder;

/// Tracing target for per-request header dumps
const PACKET_DETAILS_TARGET: &str = "dns_recursor::packet_details";

/// Turn a decoded request into the reply for the requester.
///
/// Requests must carry exactly one question; anything else is FORMERR. A
/// failed resolution is SERVFAIL. Otherwise the upstream result code and
/// sections are relayed.
pub async fn handle_request(packet: &Packet, query_handle: &QueryActorHandle) -> Packet {
    let mut dns_response_builder = DnsResponseBuilder::new();
    let response_builder = dns_response_builder.build_custom_response(packet);

    let question = match packet.questions.as_slice() {
        [question] => question.clone(),
        questions => {
            warn!(
                packet_id = packet.header.id,
                question_count = questions.len(),
                "expected exactly one question"
            );
            return response_builder.with_rcode(ResultCode::FormErr).build();
        }
    };

    match query_handle.resolve(question.clone()).await {
        Ok(upstream) => {
            for answer in &upstream.answers {
                info!("Resolved {} -> {}", question, answer);
            }
            response_builder
                .with_question(question)
                .with_upstream(upstream)
                .build()
        }
        Err(e) => {
            error!("Could not resolve {}: {}", question, e);
            response_builder
                .with_question(question)
                .with_rcode(ResultCode::ServFail)
                .build()
        }
    }
}

/// Decode one datagram, resolve it and build the encoded reply.
///
/// Returns `None` only when the datagram is too short to even carry an id.
pub async fn process_datagram(packet_data: &[u8], query_handle: &QueryActorHandle) -> Option<BytesMut> {
    // Create a new DNS codec instance.
    let mut codec = DnsCodec::new();
    let mut bytes_mut = BytesMut::from(packet_data);

    let (request, response_packet) = match codec.decode(&mut bytes_mut) {
        Ok(Some(packet)) => {
            debug!(
                target: PACKET_DETAILS_TARGET,
                packet_id = packet.header.id,
                query_response = if packet.header.response { "Response" } else { "Query" },
                opcode = packet.header.opcode,
                recursion_desired = packet.header.recursion_desired,
                response_code = %packet.header.rescode,
                question_count = packet.header.questions,
                answer_count = packet.header.answers,
                authority_count = packet.header.authoritative_entries,
                additional_count = packet.header.resource_entries,
                "DNS packet header parsed successfully"
            );

            let response = handle_request(&packet, query_handle).await;
            (Some(packet), response)
        }
        Ok(None) | Err(_) if packet_data.len() < 2 => {
            info!("Datagram of {} bytes has no id, ignoring", packet_data.len());
            return None;
        }
        Ok(None) | Err(_) => {
            // Still answer, using the id from the first two bytes
            let id = u16::from_be_bytes([packet_data[0], packet_data[1]]);
            warn!(packet_id = id, "Malformed DNS request, replying FORMERR");
            let response = DnsResponseBuilder::new().build_error_response(id, ResultCode::FormErr);
            (None, response)
        }
    };

    let mut response_buf = BytesMut::new();
    match codec.encode(response_packet, &mut response_buf) {
        Ok(()) => Some(response_buf),
        Err(e) => {
            error!("Failed to encode DNS response: {}", e);
            response_buf.clear();
            codec
                .encode(servfail_fallback(request.as_ref(), packet_data), &mut response_buf)
                .ok()?;
            Some(response_buf)
        }
    }
}

/// SERVFAIL in the normal reply shape when the request decoded, else bare
fn servfail_fallback(request: Option<&Packet>, packet_data: &[u8]) -> Packet {
    let mut dns_response_builder = DnsResponseBuilder::new();
    match request {
        Some(packet) => {
            let response_builder = dns_response_builder
                .build_custom_response(packet)
                .with_rcode(ResultCode::ServFail);
            match packet.questions.first() {
                Some(question) => response_builder.with_question(question.clone()).build(),
                None => response_builder.build(),
            }
        }
        None => {
            let id = u16::from_be_bytes([packet_data[0], packet_data[1]]);
            dns_response_builder.build_error_response(id, ResultCode::ServFail)
        }
    }
}

// Process DNS query to completion, then send the reply
pub async fn process_dns_query(
    packet_data: &[u8],
    addr: SocketAddr,
    query_handle: &QueryActorHandle,
    sock: &UdpSocket,
) -> std::io::Result<()> {
    debug!("Received {} bytes from {}", packet_data.len(), addr);

    if let Some(response_buf) = process_datagram(packet_data, query_handle).await {
        let response_len = sock.send_to(&response_buf, addr).await?;
        info!("Sent DNS response ({} bytes) to {}", response_len, addr);
    }

    Ok(())
}
