use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter};

use super::enums::{DnsClass, DnsType};
use super::packet::ParseError;

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DnsQuestion {
    pub labels: Vec<String>,
    pub qtype: DnsType,
    pub qclass: DnsClass,
}

impl Default for DnsType {
    fn default() -> Self {
        DnsType::Other(0)
    }
}

impl Default for DnsClass {
    fn default() -> Self {
        DnsClass::Other(0)
    }
}

impl DnsQuestion {
    /// Read a single question. The question name can never legitimately
    /// carry a compression pointer -- it is the first name in the packet,
    /// so there is nothing earlier for a pointer to reference.
    pub fn read(reader: &mut BitReader<&[u8], BigEndian>) -> Result<Self, ParseError> {
        let labels = read_labels(reader)?;
        let qtype = DnsType::from(reader.read_var::<u16>(16)?);
        let qclass = DnsClass::from(reader.read_var::<u16>(16)?);
        Ok(Self {
            labels,
            qtype,
            qclass,
        })
    }

    pub fn write(&self, writer: &mut BitWriter<&mut Vec<u8>, BigEndian>) -> Result<(), ParseError> {
        write_labels(writer, &self.labels)?;
        writer.write_var::<u16>(16, self.qtype.into())?;
        writer.write_var::<u16>(16, self.qclass.into())?;
        Ok(())
    }

    /// The canonical lowercase, trailing-dot domain name for this question.
    pub fn canonical_name(&self) -> String {
        if self.labels.is_empty() {
            return ".".to_string();
        }
        format!("{}.", self.labels.join(".")).to_lowercase()
    }
}

pub(super) fn read_labels(reader: &mut BitReader<&[u8], BigEndian>) -> Result<Vec<String>, ParseError> {
    let mut labels = Vec::new();
    loop {
        let len = reader.read_var::<u8>(8)?;
        if len == 0 {
            break;
        }
        if (len & 0xC0) == 0xC0 {
            return Err(ParseError::InvalidLabel);
        }
        if len > 63 {
            return Err(ParseError::InvalidLabel);
        }
        let mut buf = vec![0u8; len as usize];
        reader.read_bytes(&mut buf)?;
        let label = String::from_utf8(buf).map_err(|_| ParseError::InvalidLabel)?;
        labels.push(label);
    }
    Ok(labels)
}

pub(super) fn write_labels(
    writer: &mut BitWriter<&mut Vec<u8>, BigEndian>,
    labels: &[String],
) -> Result<(), ParseError> {
    for label in labels {
        if label.is_empty() || label.len() > 63 {
            return Err(ParseError::InvalidLabel);
        }
        writer.write_var::<u8>(8, label.len() as u8)?;
        writer.write_bytes(label.as_bytes())?;
    }
    writer.write_var::<u8>(8, 0)?;
    Ok(())
}
