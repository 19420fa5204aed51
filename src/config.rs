use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Process-wide configuration, read once from the environment at startup
/// into an immutable struct -- there is no hot-reload path, since nothing
/// here is safe to change without restarting the listeners it governs.
#[derive(Debug, Clone)]
pub struct Config {
    /// DNS server bind address.
    pub dns_bind_addr: SocketAddr,

    /// HTTP control surface bind address.
    pub api_bind_addr: SocketAddr,

    /// Single upstream DNS server queries are forwarded to.
    pub upstream_addr: SocketAddr,

    /// Hard timeout waiting for the upstream's response.
    pub upstream_timeout: Duration,

    /// Database URL consumed by the Store (sqlx).
    pub database_url: String,

    /// Moderation oracle API key; empty disables the Moderator.
    pub openai_api_key: String,

    /// Symmetric secret used to sign and verify bearer tokens.
    pub secret_key: String,

    /// Classification queue capacity (domains in flight + queued).
    pub queue_capacity: usize,

    /// Lifetime of an `llm`-sourced DomainList entry.
    pub llm_entry_ttl: chrono::Duration,

    /// Per-scheme timeout given to the Fetcher.
    pub fetch_timeout: Duration,

    /// Maximum bytes of fetched text the Fetcher returns.
    pub fetch_max_bytes: usize,

    /// Maximum crawl depth for the Fetcher's bounded site crawl.
    pub fetch_max_depth: u8,

    /// Maximum number of pages the Fetcher will visit per scheme.
    pub fetch_max_pages: u8,

    /// Timeout on a single moderation oracle call.
    pub moderator_timeout: Duration,

    /// Grace period given to the Classifier to drain in-flight work on shutdown.
    pub shutdown_grace: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dns_bind_addr: "127.0.0.1:5353".parse().expect("valid default DNS addr"),
            api_bind_addr: "127.0.0.1:8000".parse().expect("valid default API addr"),
            upstream_addr: "8.8.8.8:53".parse().expect("valid default upstream addr"),
            upstream_timeout: Duration::from_secs(4),
            database_url: "sqlite://firewall.db".to_string(),
            openai_api_key: String::new(),
            secret_key: "placeholder_secret_key".to_string(),
            queue_capacity: 1024,
            llm_entry_ttl: chrono::Duration::hours(24),
            fetch_timeout: Duration::from_secs(5),
            fetch_max_bytes: 5000,
            fetch_max_depth: 3,
            fetch_max_pages: 5,
            moderator_timeout: Duration::from_secs(5),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// Load configuration from the environment, falling back to defaults
    /// for any variable that is unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let dns_ip = env_or("DNS_IP", defaults.dns_bind_addr.ip().to_string());
        let dns_port = env_or("DNS_PORT", defaults.dns_bind_addr.port().to_string());
        let api_ip = env_or("API_IP", defaults.api_bind_addr.ip().to_string());
        let api_port = env_or("API_PORT", defaults.api_bind_addr.port().to_string());

        let dns_bind_addr = parse_socket_addr(&dns_ip, &dns_port, defaults.dns_bind_addr);
        let api_bind_addr = parse_socket_addr(&api_ip, &api_port, defaults.api_bind_addr);

        let database_url = env_or("SQLALCHEMY_DATABASE_URL", defaults.database_url);
        let openai_api_key = env_or("OPENAI_API_KEY", defaults.openai_api_key);
        let secret_key = env_or("SECRET_KEY", defaults.secret_key);

        Self {
            dns_bind_addr,
            api_bind_addr,
            database_url,
            openai_api_key,
            secret_key,
            ..defaults
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn parse_socket_addr(ip: &str, port: &str, fallback: SocketAddr) -> SocketAddr {
    let parsed_ip: Option<IpAddr> = ip.parse().ok();
    let parsed_port: Option<u16> = port.parse().ok();
    match (parsed_ip, parsed_port) {
        (Some(ip), Some(port)) => SocketAddr::new(ip, port),
        _ => {
            tracing::warn!(ip, port, "invalid bind address in environment, using default");
            fallback
        }
    }
}
