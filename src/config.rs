use clap::Parser;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "lightblog")]
#[command(about = "lightblog - a small blog engine\nFront controller + SQLite gateway + sessions", long_about = None)]
pub struct Config {
    // Basic configuration
    #[arg(short, long, default_value = "8080", env = "LIGHTBLOG_PORT")]
    pub port: u16,

    #[arg(short, long, default_value = "blog.db", env = "LIGHTBLOG_DATABASE")]
    pub database: String,

    #[arg(long, default_value = "info", env = "LIGHTBLOG_LOG_LEVEL")]
    pub log_level: String,

    #[arg(long, env = "LIGHTBLOG_IN_MEMORY", help = "Use an in-memory SQLite database (for testing only)")]
    pub in_memory: bool,

    // Routing configuration
    #[arg(long, default_value = "start,post,login", env = "LIGHTBLOG_ALLOWED_CONTROLLERS", help = "Comma-separated whitelist of URL-addressable controllers")]
    pub allowed_controllers: String,

    #[arg(long, default_value = "start", env = "LIGHTBLOG_DEFAULT_CONTROLLER", help = "Controller used when the path names none")]
    pub default_controller: String,

    #[arg(long, default_value = "index", env = "LIGHTBLOG_DEFAULT_ACTION", help = "Action used when the path names none")]
    pub default_action: String,

    // Session configuration
    #[arg(long, default_value = "lightblog_", env = "LIGHTBLOG_SESSION_PREFIX", help = "Namespace prefix for session keys and the session cookie")]
    pub session_prefix: String,

    #[arg(long, default_value = "1800", env = "LIGHTBLOG_SESSION_TIMEOUT", help = "Session inactivity and id-rotation window in seconds")]
    pub session_timeout_secs: u64,

    // Diagnostics
    #[arg(long, env = "LIGHTBLOG_SEND_ERRORS_TO", help = "Operator address to flag on database failures")]
    pub error_notification_address: Option<String>,

    #[arg(long, env = "LIGHTBLOG_DISPLAY_DEBUG", help = "Show failure detail on error pages (never enable in production)")]
    pub debug_display: bool,
}

impl Config {
    /// Get a configuration instance with all values resolved from CLI args and environment variables
    pub fn load() -> Self {
        Config::parse()
    }

    /// Get the session timeout as Duration
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    /// Get the name of the session cookie
    pub fn session_cookie_name(&self) -> String {
        format!("{}session", self.session_prefix)
    }
}
