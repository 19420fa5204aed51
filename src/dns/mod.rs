//! Minimal RFC 1035 wire-format support: just enough to parse a query's
//! header and question section, and to synthesize the handful of response
//! shapes the Resolver ever builds locally (blocking answers and error
//! codes). Forwarded responses are never parsed -- the Upstream Forwarder's
//! bytes are returned to the client verbatim.

mod enums;
mod header;
mod packet;
mod question;

pub use enums::{DnsClass, DnsType};
pub use header::DnsHeader;
pub use packet::{DnsPacket, ParseError};
pub use question::DnsQuestion;
