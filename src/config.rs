//! Configuration for Understudy
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use uuid::Uuid;

/// Understudy - stateful mock of a professional-network API
///
/// Stands in for the real service so clients can rehearse against it.
#[derive(Parser, Debug, Clone)]
#[command(name = "understudy")]
#[command(about = "Stateful mock of a professional-network API")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8088")]
    pub listen: SocketAddr,

    /// Directory holding workspace files (one JSON document per workspace)
    #[arg(long, env = "DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Workspace name; selects which data file this instance serves
    #[arg(long, env = "WORKSPACE", default_value = "default")]
    pub workspace: String,

    /// Keep all state in memory instead of on disk (ephemeral runs)
    #[arg(long, env = "MEMORY_STORE", default_value = "false")]
    pub memory_store: bool,

    /// Service prefix stripped from inbound paths before routing
    /// (e.g. "/linkedin" so /linkedin/api/v1/chats and /api/v1/chats both work)
    #[arg(long, env = "ROUTE_PREFIX", default_value = "/linkedin")]
    pub route_prefix: String,

    /// Account id recorded as the sender on outbound entities
    #[arg(long, env = "ACCOUNT_ID", default_value = "self")]
    pub account_id: String,

    /// Base URL of the real upstream service (optional)
    /// When unset, cache misses degrade to not-found and proxy passthrough
    /// answers with a fixed not-implemented response
    #[arg(long, env = "UPSTREAM_BASE_URL")]
    pub upstream_base_url: Option<String>,

    /// API key sent to the upstream service (optional)
    #[arg(long, env = "UPSTREAM_API_KEY")]
    pub upstream_api_key: Option<String>,

    /// Header name carrying the upstream API key
    #[arg(long, env = "UPSTREAM_API_KEY_HEADER", default_value = "X-API-KEY")]
    pub upstream_api_key_header: String,

    /// Upstream request timeout in milliseconds
    #[arg(long, env = "UPSTREAM_TIMEOUT_MS", default_value = "30000")]
    pub upstream_timeout_ms: u64,

    /// Fixed page size for the global message listing
    #[arg(long, env = "MESSAGE_PAGE_SIZE", default_value = "100")]
    pub message_page_size: usize,

    /// Write two demo profiles into an empty workspace on startup
    #[arg(long, env = "SEED_DEMO_DATA", default_value = "true")]
    pub seed_demo_data: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Whether both upstream settings are present
    pub fn upstream_configured(&self) -> bool {
        self.upstream_base_url.is_some() && self.upstream_api_key.is_some()
    }

    /// Path of this workspace's data file
    pub fn workspace_file(&self) -> PathBuf {
        self.data_dir.join(format!("{}.json", self.workspace))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.route_prefix.is_empty() && !self.route_prefix.starts_with('/') {
            return Err("ROUTE_PREFIX must start with '/' or be empty".to_string());
        }
        if self.route_prefix.ends_with('/') {
            return Err("ROUTE_PREFIX must not end with '/'".to_string());
        }
        if self.message_page_size == 0 {
            return Err("MESSAGE_PAGE_SIZE must be at least 1".to_string());
        }
        if self.workspace.is_empty()
            || self.workspace.contains('/')
            || self.workspace.contains("..")
        {
            return Err("WORKSPACE must be a plain name".to_string());
        }
        if let Some(ref url) = self.upstream_base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("UPSTREAM_BASE_URL must be an http(s) URL".to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["understudy"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_defaults_validate() {
        let args = args(&[]);
        assert!(args.validate().is_ok());
        assert!(!args.upstream_configured());
        assert_eq!(args.route_prefix, "/linkedin");
        assert_eq!(args.message_page_size, 100);
    }

    #[test]
    fn test_workspace_file_path() {
        let args = args(&["--data-dir", "/tmp/understudy", "--workspace", "team-a"]);
        assert_eq!(
            args.workspace_file(),
            PathBuf::from("/tmp/understudy/team-a.json")
        );
    }

    #[test]
    fn test_bad_route_prefix_rejected() {
        assert!(args(&["--route-prefix", "linkedin"]).validate().is_err());
        assert!(args(&["--route-prefix", "/linkedin/"]).validate().is_err());
        assert!(args(&["--route-prefix", ""]).validate().is_ok());
    }

    #[test]
    fn test_upstream_needs_both_settings() {
        let partial = args(&["--upstream-base-url", "https://api.example.com"]);
        assert!(!partial.upstream_configured());

        let full = args(&[
            "--upstream-base-url",
            "https://api.example.com",
            "--upstream-api-key",
            "k",
        ]);
        assert!(full.upstream_configured());
    }

    #[test]
    fn test_bad_upstream_url_rejected() {
        let bad = args(&["--upstream-base-url", "ftp://api.example.com"]);
        assert!(bad.validate().is_err());
    }
}
