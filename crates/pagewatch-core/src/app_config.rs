use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Upper bound on the number of monitored resources.
    pub max_resources: i64,
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
    /// Wall-clock budget for one check. External timeouts must fit inside it.
    pub check_budget_secs: u64,
    /// `None` disables summarization; every summary is then reported as unavailable.
    pub summarizer_api_key: Option<String>,
    pub summarizer_base_url: String,
    pub summarizer_model: String,
    pub summarizer_timeout_secs: u64,
    pub summarizer_max_retries: u32,
    pub check_rate_limit: usize,
    pub check_rate_window_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("max_resources", &self.max_resources)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("check_budget_secs", &self.check_budget_secs)
            .field(
                "summarizer_api_key",
                &self.summarizer_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("summarizer_base_url", &self.summarizer_base_url)
            .field("summarizer_model", &self.summarizer_model)
            .field("summarizer_timeout_secs", &self.summarizer_timeout_secs)
            .field("summarizer_max_retries", &self.summarizer_max_retries)
            .field("check_rate_limit", &self.check_rate_limit)
            .field("check_rate_window_secs", &self.check_rate_window_secs)
            .finish()
    }
}
