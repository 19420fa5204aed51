use serde::{Deserialize, Serialize};

/// Query/resource record type. Only `A` and `AAAA` are given dedicated
/// variants since they're the only ones this proxy's logic branches on;
/// every other type still round-trips through its raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DnsType {
    A,
    Aaaa,
    Other(u16),
}

impl From<u16> for DnsType {
    fn from(value: u16) -> Self {
        match value {
            1 => DnsType::A,
            28 => DnsType::Aaaa,
            other => DnsType::Other(other),
        }
    }
}

impl From<DnsType> for u16 {
    fn from(value: DnsType) -> Self {
        match value {
            DnsType::A => 1,
            DnsType::Aaaa => 28,
            DnsType::Other(v) => v,
        }
    }
}

/// Query/resource record class. Only `IN` is meaningful here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DnsClass {
    In,
    Other(u16),
}

impl From<u16> for DnsClass {
    fn from(value: u16) -> Self {
        match value {
            1 => DnsClass::In,
            other => DnsClass::Other(other),
        }
    }
}

impl From<DnsClass> for u16 {
    fn from(value: DnsClass) -> Self {
        match value {
            DnsClass::In => 1,
            DnsClass::Other(v) => v,
        }
    }
}
