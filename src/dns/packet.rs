use bitstream_io::{BigEndian, BitReader, BitWrite, BitWriter};
use thiserror::Error;

use super::header::DnsHeader;
use super::question::DnsQuestion;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unexpected end of packet")]
    Truncated,
    #[error("invalid label in domain name")]
    InvalidLabel,
    #[error("packet has no question section")]
    NoQuestion,
}

impl From<std::io::Error> for ParseError {
    fn from(_: std::io::Error) -> Self {
        ParseError::Truncated
    }
}

const RCODE_NOERROR: u8 = 0;
const RCODE_SERVFAIL: u8 = 2;
const RCODE_FORMERR: u8 = 1;

const BLOCKED_ANSWER_TTL: u32 = 60;

/// The header plus the question section of a parsed query. Answer/authority/
/// additional sections are never parsed -- responses forwarded upstream are
/// returned to the client as raw bytes, and the only sections this proxy
/// ever synthesizes are its own block/error answers.
#[derive(Clone, Debug, Default)]
pub struct DnsPacket {
    pub header: DnsHeader,
    pub questions: Vec<DnsQuestion>,
}

impl DnsPacket {
    pub fn parse(buf: &[u8]) -> Result<Self, ParseError> {
        let mut reader = BitReader::<_, BigEndian>::new(buf);
        let header = DnsHeader::read(&mut reader)?;

        if header.qr {
            return Err(ParseError::NoQuestion);
        }

        let mut questions = Vec::with_capacity(header.qdcount as usize);
        for _ in 0..header.qdcount {
            questions.push(DnsQuestion::read(&mut reader)?);
        }

        Ok(Self { header, questions })
    }

    /// The canonical name of the first question, if any.
    pub fn qname(&self) -> Option<String> {
        self.questions.first().map(DnsQuestion::canonical_name)
    }

    pub fn serialize(&self) -> Result<Vec<u8>, ParseError> {
        let mut buf = Vec::new();
        let mut writer = BitWriter::<_, BigEndian>::new(&mut buf);
        self.header.write(&mut writer)?;
        for question in &self.questions {
            question.write(&mut writer)?;
        }
        writer.byte_align()?;
        Ok(buf)
    }

    /// Build the `A 0.0.0.0` answer synthesized for blocked domains. This
    /// always answers with an `A` record regardless of the query's actual
    /// qtype, preserving the reference implementation's behavior rather
    /// than silently diverging to e.g. `AAAA ::` for `AAAA` queries.
    pub fn blocking_response(&self) -> Result<Vec<u8>, ParseError> {
        let question = self.questions.first().ok_or(ParseError::NoQuestion)?;

        let mut buf = Vec::new();
        let mut writer = BitWriter::<_, BigEndian>::new(&mut buf);

        let mut header = self.header.clone();
        header.qr = true;
        header.ra = true;
        header.aa = false;
        header.rcode = RCODE_NOERROR;
        header.qdcount = 1;
        header.ancount = 1;
        header.nscount = 0;
        header.arcount = 0;
        header.write(&mut writer)?;

        question.write(&mut writer)?;

        // Answer record: name, type=A, class=IN, ttl, rdlength=4, rdata.
        super::question::write_labels(&mut writer, &question.labels)?;
        writer.write_var::<u16>(16, 1)?; // A
        writer.write_var::<u16>(16, 1)?; // IN
        writer.write_var::<u32>(32, BLOCKED_ANSWER_TTL)?;
        writer.write_var::<u16>(16, 4)?; // rdlength
        writer.write_bytes(&[0, 0, 0, 0])?;

        writer.byte_align()?;
        Ok(buf)
    }

    fn error_response(&self, rcode: u8) -> Result<Vec<u8>, ParseError> {
        let mut buf = Vec::new();
        let mut writer = BitWriter::<_, BigEndian>::new(&mut buf);

        let mut header = self.header.clone();
        header.qr = true;
        header.ra = true;
        header.aa = false;
        header.rcode = rcode;
        header.ancount = 0;
        header.nscount = 0;
        header.arcount = 0;
        header.write(&mut writer)?;

        for question in &self.questions {
            question.write(&mut writer)?;
        }

        writer.byte_align()?;
        Ok(buf)
    }

    pub fn servfail_response(&self) -> Result<Vec<u8>, ParseError> {
        self.error_response(RCODE_SERVFAIL)
    }

    pub fn formerr_response(&self) -> Result<Vec<u8>, ParseError> {
        self.error_response(RCODE_FORMERR)
    }
}
