use super::AuthflowConfig;
use std::path::PathBuf;

impl AuthflowConfig {
    /// Overlay `AUTHFLOW_*` environment variables. Unparsable values are ignored.
    pub fn apply_env(mut self) -> Self {
        self.apply_vars(|name| std::env::var(name).ok());
        self
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("AUTHFLOW_APP_KEY") {
            self.app.key = v;
        }
        if let Some(v) = var("AUTHFLOW_APP_SECRET") {
            self.app.secret = v;
        }
        if let Some(v) = var("AUTHFLOW_FILES_DIR") {
            self.files.directory = PathBuf::from(v);
        }
        if let Some(v) = var("AUTHFLOW_HTTP_HOST") {
            self.http.host = v;
        }
        if let Some(v) = var("AUTHFLOW_HTTP_PORT") {
            if let Ok(port) = v.parse::<u16>() {
                self.http.port = port;
            }
        }
        if let Some(v) = var("AUTHFLOW_WAIT_TIMEOUT_SECONDS") {
            if let Ok(secs) = v.parse::<u64>() {
                self.wait.timeout_seconds = Some(secs);
            }
        }
    }
}
