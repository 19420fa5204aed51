use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter};

use super::packet::ParseError;

/// The fixed 12-byte RFC 1035 message header.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DnsHeader {
    pub id: u16,
    pub qr: bool,
    pub opcode: u8,
    pub aa: bool,
    pub tc: bool,
    pub rd: bool,
    pub ra: bool,
    pub z: u8,
    pub rcode: u8,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

impl DnsHeader {
    pub fn read(reader: &mut BitReader<&[u8], BigEndian>) -> Result<Self, ParseError> {
        let id = reader.read_var::<u16>(16)?;
        let qr = reader.read_var::<u8>(1)? == 1;
        let opcode = reader.read_var::<u8>(4)?;
        let aa = reader.read_var::<u8>(1)? == 1;
        let tc = reader.read_var::<u8>(1)? == 1;
        let rd = reader.read_var::<u8>(1)? == 1;
        let ra = reader.read_var::<u8>(1)? == 1;
        let z = reader.read_var::<u8>(3)?;
        let rcode = reader.read_var::<u8>(4)?;
        let qdcount = reader.read_var::<u16>(16)?;
        let ancount = reader.read_var::<u16>(16)?;
        let nscount = reader.read_var::<u16>(16)?;
        let arcount = reader.read_var::<u16>(16)?;

        Ok(Self {
            id,
            qr,
            opcode,
            aa,
            tc,
            rd,
            ra,
            z,
            rcode,
            qdcount,
            ancount,
            nscount,
            arcount,
        })
    }

    pub fn write(&self, writer: &mut BitWriter<&mut Vec<u8>, BigEndian>) -> Result<(), ParseError> {
        writer.write_var::<u16>(16, self.id)?;
        writer.write_var::<u8>(1, self.qr as u8)?;
        writer.write_var::<u8>(4, self.opcode)?;
        writer.write_var::<u8>(1, self.aa as u8)?;
        writer.write_var::<u8>(1, self.tc as u8)?;
        writer.write_var::<u8>(1, self.rd as u8)?;
        writer.write_var::<u8>(1, self.ra as u8)?;
        writer.write_var::<u8>(3, self.z)?;
        writer.write_var::<u8>(4, self.rcode)?;
        writer.write_var::<u16>(16, self.qdcount)?;
        writer.write_var::<u16>(16, self.ancount)?;
        writer.write_var::<u16>(16, self.nscount)?;
        writer.write_var::<u16>(16, self.arcount)?;
        Ok(())
    }
}
