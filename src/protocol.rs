// Define DNS packet structure and the logic to read and write it

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::buffer::WireBuffer;
use crate::errors::BufferError;

// DNS Class Constants
pub const DNS_CLASS_IN: u16 = 1; // Internet

/// Response code carried in the low nibble of the second flag byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultCode {
    #[default]
    NoError,
    FormErr,
    ServFail,
    NxDomain,
    NotImp,
    Refused,
    /// Codes 6-15, kept so they survive a relay unchanged
    Other(u8),
}

impl ResultCode {
    pub fn from_num(num: u8) -> Self {
        match num & 0x0F {
            0 => ResultCode::NoError,
            1 => ResultCode::FormErr,
            2 => ResultCode::ServFail,
            3 => ResultCode::NxDomain,
            4 => ResultCode::NotImp,
            5 => ResultCode::Refused,
            n => ResultCode::Other(n),
        }
    }

    pub fn to_num(self) -> u8 {
        match self {
            ResultCode::NoError => 0,
            ResultCode::FormErr => 1,
            ResultCode::ServFail => 2,
            ResultCode::NxDomain => 3,
            ResultCode::NotImp => 4,
            ResultCode::Refused => 5,
            ResultCode::Other(n) => n & 0x0F,
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultCode::NoError => write!(f, "NOERROR"),
            ResultCode::FormErr => write!(f, "FORMERR"),
            ResultCode::ServFail => write!(f, "SERVFAIL"),
            ResultCode::NxDomain => write!(f, "NXDOMAIN"),
            ResultCode::NotImp => write!(f, "NOTIMP"),
            ResultCode::Refused => write!(f, "REFUSED"),
            ResultCode::Other(n) => write!(f, "RCODE{}", n),
        }
    }
}

/// Record types this resolver understands. Anything else is `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QueryType {
    #[default]
    Unknown,
    A,     // IPv4 address
    NS,    // Name server
    CNAME, // Canonical name
    MX,    // Mail exchange
    AAAA,  // IPv6 address
}

impl QueryType {
    pub fn from_num(num: u16) -> Self {
        match num {
            1 => QueryType::A,
            2 => QueryType::NS,
            5 => QueryType::CNAME,
            15 => QueryType::MX,
            28 => QueryType::AAAA,
            _ => QueryType::Unknown,
        }
    }

    pub fn to_num(self) -> u16 {
        match self {
            QueryType::Unknown => 0,
            QueryType::A => 1,
            QueryType::NS => 2,
            QueryType::CNAME => 5,
            QueryType::MX => 15,
            QueryType::AAAA => 28,
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryType::Unknown => "UNKNOWN",
            QueryType::A => "A",
            QueryType::NS => "NS",
            QueryType::CNAME => "CNAME",
            QueryType::MX => "MX",
            QueryType::AAAA => "AAAA",
        };
        f.write_str(name)
    }
}

/// The 12-byte message header.
///
/// The four counts mirror the wire after a decode. On encode they are always
/// recomputed from the packet's sections, so setting them has no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    pub id: u16, // Identifier, 16 bits

    pub recursion_desired: bool,    // 1 bit
    pub truncated_message: bool,    // 1 bit
    pub authoritative_answer: bool, // 1 bit
    pub opcode: u8,                 // 4 bits
    pub response: bool,             // 1 bit

    pub rescode: ResultCode,       // 4 bits
    pub checking_disabled: bool,   // 1 bit
    pub authed_data: bool,         // 1 bit
    pub z: bool,                   // 1 bit
    pub recursion_available: bool, // 1 bit

    pub questions: u16,             // Number of questions
    pub answers: u16,               // Number of answers
    pub authoritative_entries: u16, // Number of authority records
    pub resource_entries: u16,      // Number of additional records
}

impl Header {
    pub fn decode(buffer: &mut WireBuffer) -> Result<Self, BufferError> {
        let id = buffer.read_u16()?;

        let flags = buffer.read_u16()?;
        let a = (flags >> 8) as u8;
        let b = (flags & 0xFF) as u8;

        Ok(Header {
            id,
            recursion_desired: (a & (1 << 0)) > 0,
            truncated_message: (a & (1 << 1)) > 0,
            authoritative_answer: (a & (1 << 2)) > 0,
            opcode: (a >> 3) & 0x0F,
            response: (a & (1 << 7)) > 0,

            rescode: ResultCode::from_num(b & 0x0F),
            checking_disabled: (b & (1 << 4)) > 0,
            authed_data: (b & (1 << 5)) > 0,
            z: (b & (1 << 6)) > 0,
            recursion_available: (b & (1 << 7)) > 0,

            questions: buffer.read_u16()?,
            answers: buffer.read_u16()?,
            authoritative_entries: buffer.read_u16()?,
            resource_entries: buffer.read_u16()?,
        })
    }

    pub fn encode(&self, buffer: &mut WireBuffer) -> Result<usize, BufferError> {
        let start = buffer.pos();

        buffer.write_u16(self.id)?;

        buffer.write(
            (self.recursion_desired as u8)
                | ((self.truncated_message as u8) << 1)
                | ((self.authoritative_answer as u8) << 2)
                | ((self.opcode & 0x0F) << 3)
                | ((self.response as u8) << 7),
        )?;

        buffer.write(
            self.rescode.to_num()
                | ((self.checking_disabled as u8) << 4)
                | ((self.authed_data as u8) << 5)
                | ((self.z as u8) << 6)
                | ((self.recursion_available as u8) << 7),
        )?;

        buffer.write_u16(self.questions)?;
        buffer.write_u16(self.answers)?;
        buffer.write_u16(self.authoritative_entries)?;
        buffer.write_u16(self.resource_entries)?;

        Ok(buffer.pos() - start)
    }
}

// Define the DNS question section structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub name: String, // Domain name, represented as a sequence of "labels"
    pub qtype: QueryType,
}

impl Question {
    pub fn new(name: impl Into<String>, qtype: QueryType) -> Self {
        Self {
            name: name.into(),
            qtype,
        }
    }

    pub fn decode(buffer: &mut WireBuffer) -> Result<Self, BufferError> {
        let mut name = String::new();
        buffer.read_qname(&mut name)?;
        let qtype = QueryType::from_num(buffer.read_u16()?);
        let _ = buffer.read_u16()?; // class

        Ok(Question { name, qtype })
    }

    pub fn encode(&self, buffer: &mut WireBuffer) -> Result<usize, BufferError> {
        let start = buffer.pos();

        buffer.write_qname(&self.name)?;
        buffer.write_u16(self.qtype.to_num())?;
        buffer.write_u16(DNS_CLASS_IN)?;

        Ok(buffer.pos() - start)
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} IN {}", self.name, self.qtype)
    }
}

/// A resource record from the answer, authority or additional section
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    A {
        domain: String,
        addr: Ipv4Addr,
        ttl: u32,
    },
    NS {
        domain: String,
        host: String,
        ttl: u32,
    },
    CNAME {
        domain: String,
        host: String,
        ttl: u32,
    },
    MX {
        domain: String,
        priority: u16,
        host: String,
        ttl: u32,
    },
    AAAA {
        domain: String,
        addr: Ipv6Addr,
        ttl: u32,
    },
    /// Any other type. The payload is skipped on read and not retained.
    Unknown {
        domain: String,
        qtype: u16,
        data_len: u16,
        ttl: u32,
    },
}

impl Record {
    pub fn decode(buffer: &mut WireBuffer) -> Result<Self, BufferError> {
        let mut domain = String::new();
        buffer.read_qname(&mut domain)?;

        let qtype_num = buffer.read_u16()?;
        let _ = buffer.read_u16()?; // class
        let ttl = buffer.read_u32()?;
        let data_len = buffer.read_u16()?;

        let record = match QueryType::from_num(qtype_num) {
            QueryType::A => Record::A {
                domain,
                addr: Ipv4Addr::from(buffer.read_u32()?),
                ttl,
            },
            QueryType::AAAA => {
                let mut octets = [0u8; 16];
                for octet in octets.iter_mut() {
                    *octet = buffer.read()?;
                }
                Record::AAAA {
                    domain,
                    addr: Ipv6Addr::from(octets),
                    ttl,
                }
            }
            QueryType::NS => {
                let mut host = String::new();
                buffer.read_qname(&mut host)?;
                Record::NS { domain, host, ttl }
            }
            QueryType::CNAME => {
                let mut host = String::new();
                buffer.read_qname(&mut host)?;
                Record::CNAME { domain, host, ttl }
            }
            QueryType::MX => {
                let priority = buffer.read_u16()?;
                let mut host = String::new();
                buffer.read_qname(&mut host)?;
                Record::MX {
                    domain,
                    priority,
                    host,
                    ttl,
                }
            }
            QueryType::Unknown => {
                buffer.step(data_len as usize)?;
                Record::Unknown {
                    domain,
                    qtype: qtype_num,
                    data_len,
                    ttl,
                }
            }
        };

        Ok(record)
    }

    pub fn encode(&self, buffer: &mut WireBuffer) -> Result<usize, BufferError> {
        let start = buffer.pos();

        match self {
            Record::A { domain, addr, ttl } => {
                write_preamble(buffer, domain, QueryType::A.to_num(), *ttl)?;
                buffer.write_u16(4)?;
                for octet in addr.octets() {
                    buffer.write(octet)?;
                }
            }
            Record::AAAA { domain, addr, ttl } => {
                write_preamble(buffer, domain, QueryType::AAAA.to_num(), *ttl)?;
                buffer.write_u16(16)?;
                for octet in addr.octets() {
                    buffer.write(octet)?;
                }
            }
            Record::NS { domain, host, ttl } => {
                write_preamble(buffer, domain, QueryType::NS.to_num(), *ttl)?;
                with_data_len(buffer, |buffer| buffer.write_qname(host))?;
            }
            Record::CNAME { domain, host, ttl } => {
                write_preamble(buffer, domain, QueryType::CNAME.to_num(), *ttl)?;
                with_data_len(buffer, |buffer| buffer.write_qname(host))?;
            }
            Record::MX {
                domain,
                priority,
                host,
                ttl,
            } => {
                write_preamble(buffer, domain, QueryType::MX.to_num(), *ttl)?;
                with_data_len(buffer, |buffer| {
                    buffer.write_u16(*priority)?;
                    buffer.write_qname(host)
                })?;
            }
            Record::Unknown {
                domain, qtype, ttl, ..
            } => {
                // The payload was never kept, so relay the record with an empty one
                tracing::debug!(%domain, qtype, "writing unknown record without payload");
                write_preamble(buffer, domain, *qtype, *ttl)?;
                buffer.write_u16(0)?;
            }
        }

        Ok(buffer.pos() - start)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Record::A { domain, addr, ttl } => write!(f, "{} {} IN A {}", domain, ttl, addr),
            Record::NS { domain, host, ttl } => write!(f, "{} {} IN NS {}", domain, ttl, host),
            Record::CNAME { domain, host, ttl } => {
                write!(f, "{} {} IN CNAME {}", domain, ttl, host)
            }
            Record::MX {
                domain,
                priority,
                host,
                ttl,
            } => write!(f, "{} {} IN MX {} {}", domain, ttl, priority, host),
            Record::AAAA { domain, addr, ttl } => {
                write!(f, "{} {} IN AAAA {}", domain, ttl, addr)
            }
            Record::Unknown {
                domain,
                qtype,
                data_len,
                ttl,
            } => write!(f, "{} {} IN TYPE{} ({} bytes)", domain, ttl, qtype, data_len),
        }
    }
}

/// Owner name, type, class and TTL: everything before the data length
fn write_preamble(
    buffer: &mut WireBuffer,
    domain: &str,
    qtype: u16,
    ttl: u32,
) -> Result<(), BufferError> {
    buffer.write_qname(domain)?;
    buffer.write_u16(qtype)?;
    buffer.write_u16(DNS_CLASS_IN)?;
    buffer.write_u32(ttl)
}

/// Reserve the data length field, write the payload, then backpatch the
/// real length once it is known.
fn with_data_len<F>(buffer: &mut WireBuffer, write_payload: F) -> Result<(), BufferError>
where
    F: FnOnce(&mut WireBuffer) -> Result<(), BufferError>,
{
    let len_pos = buffer.pos();
    buffer.write_u16(0)?;

    write_payload(buffer)?;

    let size = buffer.pos() - (len_pos + 2);
    buffer.set_u16(len_pos, size as u16)
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Packet {
    pub header: Header,
    pub questions: Vec<Question>,
    pub answers: Vec<Record>,
    pub authorities: Vec<Record>,
    pub resources: Vec<Record>,
}

impl Packet {
    pub fn decode(buffer: &mut WireBuffer) -> Result<Self, BufferError> {
        let header = Header::decode(buffer)?;

        let mut questions = Vec::with_capacity(header.questions as usize);
        for _ in 0..header.questions {
            questions.push(Question::decode(buffer)?);
        }

        let answers = decode_records(buffer, header.answers)?;
        let authorities = decode_records(buffer, header.authoritative_entries)?;
        let resources = decode_records(buffer, header.resource_entries)?;

        Ok(Packet {
            header,
            questions,
            answers,
            authorities,
            resources,
        })
    }

    pub fn encode(&self, buffer: &mut WireBuffer) -> Result<usize, BufferError> {
        let start = buffer.pos();

        // Create a corrected header with the actual section sizes
        let mut corrected_header = self.header;
        corrected_header.questions = self.questions.len() as u16;
        corrected_header.answers = self.answers.len() as u16;
        corrected_header.authoritative_entries = self.authorities.len() as u16;
        corrected_header.resource_entries = self.resources.len() as u16;

        corrected_header.encode(buffer)?;

        for question in &self.questions {
            question.encode(buffer)?;
        }
        for record in self
            .answers
            .iter()
            .chain(&self.authorities)
            .chain(&self.resources)
        {
            record.encode(buffer)?;
        }

        Ok(buffer.pos() - start)
    }

    /// Decode a packet from a received datagram
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BufferError> {
        let mut buffer = WireBuffer::from_bytes(bytes)?;
        Self::decode(&mut buffer)
    }

    /// Encode the packet into a datagram ready to send
    pub fn to_bytes(&self) -> Result<Vec<u8>, BufferError> {
        let mut buffer = WireBuffer::new();
        self.encode(&mut buffer)?;
        Ok(buffer.filled().to_vec())
    }

    /// Any IPv4 address from the answer section; the first one found
    pub fn random_a(&self) -> Option<Ipv4Addr> {
        self.answers.iter().find_map(|record| match record {
            Record::A { addr, .. } => Some(*addr),
            _ => None,
        })
    }

    /// `(zone, host)` pairs for every NS record in the authority section
    /// whose zone is a suffix of `qname`
    pub fn name_servers<'a>(&'a self, qname: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.authorities
            .iter()
            .filter_map(|record| match record {
                Record::NS { domain, host, .. } => Some((domain.as_str(), host.as_str())),
                _ => None,
            })
            .filter(move |(domain, _)| ends_with_ignore_case(qname, domain))
    }

    /// The glue address for a delegated name server, if the additional
    /// section carries one
    pub fn resolved_name_server(&self, qname: &str) -> Option<Ipv4Addr> {
        self.name_servers(qname).find_map(|(_, host)| {
            self.resources.iter().find_map(|record| match record {
                Record::A { domain, addr, .. } if domain.eq_ignore_ascii_case(host) => Some(*addr),
                _ => None,
            })
        })
    }

    /// The first delegated name server host, for when no glue is present
    pub fn unresolved_name_server_host<'a>(&'a self, qname: &'a str) -> Option<&'a str> {
        self.name_servers(qname).map(|(_, host)| host).next()
    }
}

fn decode_records(buffer: &mut WireBuffer, count: u16) -> Result<Vec<Record>, BufferError> {
    let mut records = Vec::with_capacity(count as usize);
    for _ in 0..count {
        records.push(Record::decode(buffer)?);
    }
    Ok(records)
}

fn ends_with_ignore_case(name: &str, suffix: &str) -> bool {
    let (name, suffix) = (name.as_bytes(), suffix.as_bytes());
    name.len() >= suffix.len() && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}
