//! Typed record model shared by the Store, Resolver, Classifier and Control API.
//!
//! These mirror the dynamic ORM rows of the reference implementation as plain,
//! declared-field structs rather than dynamically-typed row objects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    Whitelist,
    Blacklist,
}

impl ListType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListType::Whitelist => "whitelist",
            ListType::Blacklist => "blacklist",
        }
    }
}

impl fmt::Display for ListType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ListType {
    type Err = crate::error::FirewallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "whitelist" => Ok(ListType::Whitelist),
            "blacklist" => Ok(ListType::Blacklist),
            other => Err(crate::error::FirewallError::Config(format!(
                "invalid list_type: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListSource {
    Manual,
    Llm,
}

impl ListSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListSource::Manual => "manual",
            ListSource::Llm => "llm",
        }
    }
}

impl fmt::Display for ListSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ListSource {
    type Err = crate::error::FirewallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(ListSource::Manual),
            "llm" => Ok(ListSource::Llm),
            other => Err(crate::error::FirewallError::Config(format!(
                "invalid source: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainStatus {
    Allowed,
    Blocked,
    Reviewed,
}

impl DomainStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainStatus::Allowed => "allowed",
            DomainStatus::Blocked => "blocked",
            DomainStatus::Reviewed => "reviewed",
        }
    }
}

impl fmt::Display for DomainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classification rule: `domain` is unique across the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainList {
    pub domain: String,
    pub list_type: ListType,
    pub source: ListSource,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl DomainList {
    pub fn is_active_at(&self, t: DateTime<Utc>) -> bool {
        match self.expires_at {
            None => true,
            Some(exp) => exp > t,
        }
    }
}

/// One append-only record of a DNS query decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainLog {
    pub domain: String,
    pub status: DomainStatus,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub hashed_password: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MetaResponse {
    pub total: i64,
    pub offset: i64,
    pub limit: i64,
}

/// Normalize a domain to the canonical lowercase, trailing-dot form the
/// Store, Resolver and Classifier all key on.
pub fn canonical_domain(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('.').to_lowercase();
    format!("{trimmed}.")
}
