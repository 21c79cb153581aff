use crate::protocol::{Header, Packet, Question, Record, ResultCode};

/// Builder for the reply sent back to the original requester
pub struct DnsResponseBuilder {
    // Pre-allocated response header template
    response_header: Header,
    questions: Vec<Question>,
    answers: Vec<Record>,
    authorities: Vec<Record>,
    resources: Vec<Record>,
}

impl DnsResponseBuilder {
    /// Create a new response builder
    pub fn new() -> Self {
        Self {
            response_header: Header {
                response: true,            // Always a response
                recursion_desired: true,   // We recurse on the client's behalf
                recursion_available: true, // Recursion available
                ..Header::default()
            },
            questions: Vec::new(),
            answers: Vec::new(),
            authorities: Vec::new(),
            resources: Vec::new(),
        }
    }

    /// Start a reply to `query_packet`, echoing its id
    pub fn build_custom_response<'a>(
        &'a mut self,
        query_packet: &'a Packet,
    ) -> ResponseBuilder<'a> {
        self.response_header.id = query_packet.header.id;
        ResponseBuilder {
            builder: self,
            query_packet,
        }
    }

    /// A bare error reply for a request that could not be decoded at all
    pub fn build_error_response(&mut self, query_id: u16, rescode: ResultCode) -> Packet {
        self.response_header.id = query_id;
        self.response_header.rescode = rescode;

        Packet {
            header: self.response_header,
            ..Packet::default()
        }
    }
}

/// Fluent interface for building custom responses
pub struct ResponseBuilder<'a> {
    builder: &'a mut DnsResponseBuilder,
    query_packet: &'a Packet,
}

impl<'a> ResponseBuilder<'a> {
    /// Set response code
    pub fn with_rcode(self, rcode: ResultCode) -> Self {
        self.builder.response_header.rescode = rcode;
        self
    }

    /// Set the question the reply is about
    pub fn with_question(self, question: Question) -> Self {
        self.builder.questions.clear();
        self.builder.questions.push(question);
        self
    }

    /// Relay the result code and every record section of an upstream reply.
    ///
    /// Records of unsupported types are dropped: their payload was skipped on
    /// decode, so they cannot be written back faithfully.
    pub fn with_upstream(self, upstream: Packet) -> Self {
        self.builder.response_header.rescode = upstream.header.rescode;
        self.builder.answers = relayable(upstream.answers);
        self.builder.authorities = relayable(upstream.authorities);
        self.builder.resources = relayable(upstream.resources);
        self
    }

    /// Build the final response
    pub fn build(self) -> Packet {
        let packet = Packet {
            header: self.builder.response_header,
            questions: std::mem::take(&mut self.builder.questions),
            answers: std::mem::take(&mut self.builder.answers),
            authorities: std::mem::take(&mut self.builder.authorities),
            resources: std::mem::take(&mut self.builder.resources),
        };

        tracing::debug!(
            query_id = self.query_packet.header.id,
            "DNS Response built with custom settings: {:?}",
            packet.header
        );

        packet
    }
}

fn relayable(records: Vec<Record>) -> Vec<Record> {
    records
        .into_iter()
        .filter(|record| match record {
            Record::Unknown { domain, qtype, .. } => {
                tracing::debug!(%domain, qtype, "dropping unsupported record from reply");
                false
            }
            _ => true,
        })
        .collect()
}

impl Default for DnsResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}
