//! DNS packet codec for tokio_util
//!
//! This module provides Decoder and Encoder implementations for DNS packets,
//! so datagrams received on the listening socket can be turned into
//! [`Packet`]s and replies turned back into bytes.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, error};

use crate::errors::DnsCodecError;
use crate::protocol::Packet;

/// Size of the fixed message header
pub const HEADER_SIZE: usize = 12;

/// DNS packet codec for use with tokio_util framed streams
#[derive(Debug, Default)]
pub struct DnsCodec;

impl DnsCodec {
    /// Create a new DNS codec instance
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for DnsCodec {
    type Item = Packet;
    type Error = DnsCodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // DNS packets need at least 12 bytes for the header
        if src.len() < HEADER_SIZE {
            debug!("Insufficient bytes for DNS header: {} < {}", src.len(), HEADER_SIZE);
            return Ok(None);
        }

        // Each UDP datagram is exactly one message, so it is consumed whole
        let datagram = src.split_to(src.len());

        match Packet::from_bytes(&datagram) {
            Ok(packet) => Ok(Some(packet)),
            Err(e) => {
                error!("DNS parsing error: {}", e);
                Err(e.into())
            }
        }
    }
}

impl Encoder<Packet> for DnsCodec {
    type Error = DnsCodecError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        debug!("DnsCodec::encode called for packet ID {}", item.header.id);

        // Anything that does not fit in 512 bytes fails with EndOfBuffer
        let bytes = item.to_bytes()?;

        dst.reserve(bytes.len());
        dst.extend_from_slice(&bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BufferError;
    use crate::protocol::{Header, QueryType, Question, Record, ResultCode};
    use std::net::Ipv4Addr;

    #[test]
    fn test_dns_codec_insufficient_bytes() {
        let mut codec = DnsCodec::new();
        let mut buf = BytesMut::from(&b"short"[..]);

        let result = codec.decode(&mut buf);
        assert!(result.is_ok());
        assert!(result.unwrap().is_none());
    }

    #[test]
    fn test_dns_codec_empty_buffer() {
        let mut codec = DnsCodec::new();
        let mut buf = BytesMut::new();

        let result = codec.decode(&mut buf);
        assert!(result.is_ok());
        assert!(result.unwrap().is_none());
    }

    #[test]
    fn test_dns_codec_oversized_datagram() {
        let mut codec = DnsCodec::new();
        let mut buf = BytesMut::from(&[0u8; 600][..]);

        let result = codec.decode(&mut buf);
        assert!(matches!(
            result,
            Err(DnsCodecError::Buffer(BufferError::PacketTooLarge { len: 600 }))
        ));
    }

    #[test]
    fn test_dns_codec_encode_header() {
        let mut codec = DnsCodec::new();
        let mut buf = BytesMut::new();

        let header = Header {
            id: 0x1234,
            response: true,
            authoritative_answer: true,
            recursion_desired: true,
            recursion_available: true,
            questions: 1,
            answers: 1,
            ..Header::default()
        };

        let packet = Packet {
            header,
            ..Packet::default()
        };

        let result = codec.encode(packet, &mut buf);
        assert!(result.is_ok());
        assert_eq!(buf.len(), 12); // Header is 12 bytes

        let bytes = buf.as_ref();

        // ID should be 0x1234
        assert_eq!(bytes[0], 0x12);
        assert_eq!(bytes[1], 0x34);

        // Flags should have QR=1, AA=1, RD=1, RA=1
        assert_eq!(bytes[2], 0x85);
        assert_eq!(bytes[3], 0x80);

        // Counts are corrected to match the empty sections
        assert_eq!(&bytes[4..12], &[0; 8]);
    }

    #[test]
    fn test_dns_codec_encode_with_questions() {
        let mut codec = DnsCodec::new();
        let mut buf = BytesMut::new();

        let packet = Packet {
            header: Header {
                id: 0x1234,
                recursion_desired: true,
                ..Header::default()
            },
            questions: vec![Question::new("google.com", QueryType::A)],
            ..Packet::default()
        };

        codec.encode(packet, &mut buf).unwrap();
        let bytes = buf.as_ref();

        // Verify flags (RD=1, others=0)
        assert_eq!(bytes[2], 0x01);
        assert_eq!(bytes[3], 0x00);

        // QDCOUNT = 1
        assert_eq!(bytes[4], 0x00);
        assert_eq!(bytes[5], 0x01);

        // "google.com" starts at byte 12
        assert_eq!(bytes[12], 6);
        assert_eq!(&bytes[13..19], b"google");
        assert_eq!(bytes[19], 3);
        assert_eq!(&bytes[20..23], b"com");
        assert_eq!(bytes[23], 0);

        // QTYPE A, QCLASS IN
        assert_eq!(&bytes[24..28], &[0, 1, 0, 1]);
        assert_eq!(bytes.len(), 28);
    }

    #[test]
    fn test_dns_codec_encode_with_answers() {
        let mut codec = DnsCodec::new();
        let mut buf = BytesMut::new();

        let packet = Packet {
            header: Header {
                id: 0x5678,
                response: true,
                ..Header::default()
            },
            questions: vec![Question::new("example.com", QueryType::A)],
            answers: vec![Record::A {
                domain: "example.com".to_string(),
                addr: Ipv4Addr::new(192, 168, 1, 1),
                ttl: 300,
            }],
            ..Packet::default()
        };

        codec.encode(packet, &mut buf).unwrap();
        let bytes = buf.as_ref();

        // ANCOUNT = 1
        assert_eq!(bytes[6], 0x00);
        assert_eq!(bytes[7], 0x01);

        // Header (12) + question (17), then the answer's owner name (13)
        let rtype_start = 12 + 17 + 13;
        assert_eq!(&bytes[rtype_start..rtype_start + 4], &[0, 1, 0, 1]);

        let ttl = u32::from_be_bytes([
            bytes[rtype_start + 4],
            bytes[rtype_start + 5],
            bytes[rtype_start + 6],
            bytes[rtype_start + 7],
        ]);
        assert_eq!(ttl, 300);

        // Data length 4, then the address
        assert_eq!(&bytes[rtype_start + 8..rtype_start + 10], &[0, 4]);
        assert_eq!(&bytes[rtype_start + 10..rtype_start + 14], &[192, 168, 1, 1]);

        // 12 (header) + 17 (question) + 27 (answer)
        assert_eq!(bytes.len(), 56);
    }

    #[test]
    fn test_dns_codec_round_trip_multiple_questions() {
        let mut codec = DnsCodec::new();

        let original_packet = Packet {
            header: Header {
                id: 0x5678,
                recursion_desired: true,
                rescode: ResultCode::NoError,
                ..Header::default()
            },
            questions: vec![
                Question::new("example.com", QueryType::A),
                Question::new("test.org", QueryType::AAAA),
            ],
            ..Packet::default()
        };

        let mut encoded_buf = BytesMut::new();
        codec
            .encode(original_packet.clone(), &mut encoded_buf)
            .unwrap();

        let decoded_packet = codec.decode(&mut encoded_buf).unwrap().unwrap();

        assert_eq!(decoded_packet.header.id, original_packet.header.id);
        assert!(decoded_packet.header.recursion_desired);
        assert_eq!(decoded_packet.header.questions, 2);
        assert_eq!(decoded_packet.questions, original_packet.questions);

        // The datagram was consumed whole
        assert!(encoded_buf.is_empty());
    }

    #[test]
    fn test_dns_codec_qdcount_correction() {
        let mut codec = DnsCodec::new();

        let packet = Packet {
            header: Header {
                id: 0x1234,
                questions: 99, // Incorrect count - corrected to 3
                ..Header::default()
            },
            questions: vec![
                Question::new("example.com", QueryType::A),
                Question::new("test.org", QueryType::AAAA),
                Question::new("foo.bar", QueryType::MX),
            ],
            ..Packet::default()
        };

        let mut encoded_buf = BytesMut::new();
        codec.encode(packet, &mut encoded_buf).unwrap();

        let bytes = encoded_buf.as_ref();
        let qdcount_encoded = u16::from_be_bytes([bytes[4], bytes[5]]);
        assert_eq!(
            qdcount_encoded, 3,
            "QDCOUNT should be corrected to match actual questions count"
        );

        let decoded_packet = codec.decode(&mut encoded_buf).unwrap().unwrap();
        assert_eq!(decoded_packet.header.questions, 3);
        assert_eq!(decoded_packet.questions.len(), 3);
    }

    #[test]
    fn test_dns_codec_rejects_long_label() {
        let mut codec = DnsCodec::new();
        let mut buf = BytesMut::new();

        let packet = Packet {
            questions: vec![Question::new(
                format!("{}.com", "x".repeat(64)),
                QueryType::A,
            )],
            ..Packet::default()
        };

        assert!(matches!(
            codec.encode(packet, &mut buf),
            Err(DnsCodecError::Buffer(BufferError::LabelTooLong { .. }))
        ));
    }
}
