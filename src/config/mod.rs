mod env;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete authflow configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthflowConfig {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub files: FilesConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub wait: WaitConfig,
}

/// Provider application registration (key, secret, endpoints)
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_website")]
    pub website: String,
}

fn default_app_name() -> String {
    "authflow_oauth_demo".to_string()
}

fn default_authorize_url() -> String {
    "https://www.dropbox.com/oauth2/authorize".to_string()
}

fn default_token_url() -> String {
    "https://api.dropboxapi.com/oauth2/token".to_string()
}

fn default_website() -> String {
    "https://www.dropbox.com/developers/apps".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            key: String::new(),
            secret: String::new(),
            authorize_url: default_authorize_url(),
            token_url: default_token_url(),
            website: default_website(),
        }
    }
}

/// Locations of the credential, session and latest-URL artifacts
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Directory holding every artifact below (created on startup)
    #[serde(default = "default_files_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_credential_file")]
    pub credential_file: String,
    #[serde(default = "default_session_file")]
    pub session_file: String,
    #[serde(default = "default_expired_session_file")]
    pub expired_session_file: String,
    #[serde(default = "default_latest_url_file")]
    pub latest_url_file: String,
    /// Static documentation served under /doc/
    #[serde(default = "default_doc_directory")]
    pub doc_directory: PathBuf,
}

fn default_files_directory() -> PathBuf {
    PathBuf::from("files")
}

fn default_credential_file() -> String {
    "access_token.json".to_string()
}

fn default_session_file() -> String {
    "httpd_session.json".to_string()
}

fn default_expired_session_file() -> String {
    "httpd_session.EXPIRED.json".to_string()
}

fn default_latest_url_file() -> String {
    "httpd_latest_url.log".to_string()
}

fn default_doc_directory() -> PathBuf {
    PathBuf::from("doc")
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            directory: default_files_directory(),
            credential_file: default_credential_file(),
            session_file: default_session_file(),
            expired_session_file: default_expired_session_file(),
            latest_url_file: default_latest_url_file(),
            doc_directory: default_doc_directory(),
        }
    }
}

impl FilesConfig {
    pub fn credential_path(&self) -> PathBuf {
        self.directory.join(&self.credential_file)
    }

    pub fn session_path(&self) -> PathBuf {
        self.directory.join(&self.session_file)
    }

    pub fn expired_session_path(&self) -> PathBuf {
        self.directory.join(&self.expired_session_file)
    }

    pub fn latest_url_path(&self) -> PathBuf {
        self.directory.join(&self.latest_url_file)
    }
}

/// Callback listener address and page names
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_home_page")]
    pub home_page: String,
    #[serde(default = "default_finish_page")]
    pub finish_page: String,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    55510
}

fn default_home_page() -> String {
    "home".to_string()
}

fn default_finish_page() -> String {
    "dropbox-auth-finish".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            home_page: default_home_page(),
            finish_page: default_finish_page(),
        }
    }
}

impl HttpConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn home_url(&self) -> String {
        format!("{}/{}", self.base_url(), self.home_page)
    }

    /// Callback URL registered with the provider
    pub fn finish_url(&self) -> String {
        format!("{}/{}", self.base_url(), self.finish_page)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Poll cadence for "wait until the credential file appears"
#[derive(Debug, Clone, Deserialize)]
pub struct WaitConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    #[serde(default = "default_progress_interval")]
    pub progress_interval_seconds: u64,
    /// Absent means wait indefinitely
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

fn default_poll_interval() -> u64 {
    1
}

fn default_progress_interval() -> u64 {
    5
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_poll_interval(),
            progress_interval_seconds: default_progress_interval(),
            timeout_seconds: None,
        }
    }
}

impl WaitConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_secs(self.progress_interval_seconds)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

/// Load configuration from TOML file
pub fn load_config(path: impl AsRef<Path>) -> Result<AuthflowConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: AuthflowConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}
