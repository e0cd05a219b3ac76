// Shared fakes and fixtures for integration tests
#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use authflow::credentials::CredentialStore;
use authflow::latest_url::LatestUrlFile;
use authflow::listener::{create_listener_router, ListenerState, SiteInfo};
use authflow::provider::dropbox::split_state;
use authflow::provider::{AuthorizationProvider, ProviderError, ProviderGrant};
use authflow::remote::{DirEntry, RemoteStorage};
use authflow::session::CsrfSessionStore;
use authflow::workflow::{NoRedirectWorkflow, RedirectWorkflow};
use axum::Router;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const CALLBACK_URL: &str = "http://localhost:55510/dropbox-auth-finish";
pub const RESTART_URL: &str = "http://localhost:55510/home";
pub const VALID_CODE: &str = "validcode";
pub const FAKE_TOKEN: &str = "fake_access_token";
pub const FAKE_OWNER: &str = "owner_1";

/// Provider double: accepts `VALID_CODE` for the no-redirect flow and
/// returns a configurable outcome for the redirect flow.
pub struct FakeProvider {
    redirect_outcome: Mutex<Result<ProviderGrant, ProviderError>>,
    finish_delay: Mutex<Duration>,
    pub finish_redirect_calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            redirect_outcome: Mutex::new(Ok(grant())),
            finish_delay: Mutex::new(Duration::ZERO),
            finish_redirect_calls: AtomicUsize::new(0),
        }
    }

    pub fn fail_redirect_with(&self, error: ProviderError) {
        *self.redirect_outcome.lock().unwrap() = Err(error);
    }

    /// Make every redirect exchange take `delay`, like a slow token endpoint
    pub fn set_finish_delay(&self, delay: Duration) {
        *self.finish_delay.lock().unwrap() = delay;
    }

    pub fn finish_redirect_calls(&self) -> usize {
        self.finish_redirect_calls.load(Ordering::SeqCst)
    }
}

pub fn grant() -> ProviderGrant {
    ProviderGrant {
        token: FAKE_TOKEN.to_string(),
        owner_id: FAKE_OWNER.to_string(),
    }
}

#[async_trait]
impl AuthorizationProvider for FakeProvider {
    fn start_no_redirect(&self) -> String {
        "https://provider.test/oauth2/authorize?response_type=code&client_id=key".to_string()
    }

    async fn finish_no_redirect(&self, code: &str) -> Result<ProviderGrant, ProviderError> {
        if code == VALID_CODE {
            Ok(grant())
        } else {
            Err(ProviderError::BadRequest(format!("invalid code {code:?}")))
        }
    }

    fn start_redirect(&self, callback_url: &str, csrf_token: &str) -> String {
        format!(
            "https://provider.test/oauth2/authorize?redirect_uri={}&state={}",
            urlencoding::encode(callback_url),
            csrf_token
        )
    }

    async fn finish_redirect(
        &self,
        _callback_url: &str,
        query: &HashMap<String, String>,
        csrf_token: &str,
    ) -> Result<ProviderGrant, ProviderError> {
        self.finish_redirect_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.finish_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let echoed = query.get("state").map(|s| split_state(s).0);
        if echoed != Some(csrf_token) {
            return Err(ProviderError::Csrf("state mismatch".to_string()));
        }
        self.redirect_outcome.lock().unwrap().clone()
    }
}

/// In-memory remote storage
#[derive(Default)]
pub struct MemoryStorage {
    pub files: Mutex<BTreeMap<String, Vec<u8>>>,
    pub fail: bool,
}

impl MemoryStorage {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl RemoteStorage for MemoryStorage {
    async fn upload_file(&self, path: &str, contents: Vec<u8>) -> Result<()> {
        if self.fail {
            bail!("remote storage unavailable");
        }
        self.files.lock().unwrap().insert(path.to_string(), contents);
        Ok(())
    }

    async fn create_folder(&self, _path: &str) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        bail!("path {path} not found")
    }

    async fn account_info(&self) -> Result<Vec<(String, String)>> {
        if self.fail {
            bail!("remote storage unavailable");
        }
        Ok(vec![("country".to_string(), "GB".to_string())])
    }

    async fn list_folder(&self, _path: &str) -> Result<Vec<DirEntry>> {
        Ok(Vec::new())
    }
}

/// Stores, workflows and fakes wired together over a temp directory
pub struct TestEnv {
    pub dir: TempDir,
    pub provider: Arc<FakeProvider>,
    pub storage: Arc<MemoryStorage>,
    pub credentials: Arc<CredentialStore>,
    pub sessions: Arc<CsrfSessionStore>,
    pub redirect: Arc<RedirectWorkflow>,
    pub no_redirect: NoRedirectWorkflow,
    pub latest_url: Arc<LatestUrlFile>,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_storage(MemoryStorage::default())
    }

    pub fn with_storage(storage: MemoryStorage) -> Self {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(FakeProvider::new());
        let storage = Arc::new(storage);
        let credentials = credential_store(dir.path());
        let sessions = session_store(dir.path());
        let redirect = Arc::new(
            redirect_workflow(provider.clone(), credentials.clone(), sessions.clone())
                .with_remote_storage(storage.clone()),
        );
        let no_redirect = NoRedirectWorkflow::new(provider.clone(), credentials.clone())
            .with_remote_storage(storage.clone());
        let latest_url = Arc::new(LatestUrlFile::new(dir.path().join("httpd_latest_url.log")));

        Self {
            dir,
            provider,
            storage,
            credentials,
            sessions,
            redirect,
            no_redirect,
            latest_url,
        }
    }

    pub fn doc_dir(&self) -> PathBuf {
        self.dir.path().join("doc")
    }

    pub fn site(&self) -> SiteInfo {
        SiteInfo {
            app_name: "test_app".to_string(),
            app_key: "key".to_string(),
            app_website: "https://provider.test/developers/apps".to_string(),
            base_url: "http://localhost:55510".to_string(),
            home_page: "home".to_string(),
            finish_page: "dropbox-auth-finish".to_string(),
            finish_url: CALLBACK_URL.to_string(),
            files_directory: self.dir.path().to_path_buf(),
            credential_file: self.credentials.path().to_path_buf(),
            doc_directory: self.doc_dir(),
        }
    }

    pub fn router(&self) -> Router {
        self.router_for(self.redirect.clone())
    }

    /// Router driving `workflow` with this environment's site and artifacts
    pub fn router_for(&self, workflow: Arc<RedirectWorkflow>) -> Router {
        create_listener_router(ListenerState {
            workflow,
            latest_url: self.latest_url.clone(),
            site: Arc::new(self.site()),
        })
    }

    /// A second redirect workflow over the same files with its own store
    /// instances, as a separately started listener process would build it.
    pub fn listener_process(&self) -> Arc<RedirectWorkflow> {
        Arc::new(redirect_workflow(
            self.provider.clone(),
            credential_store(self.dir.path()),
            session_store(self.dir.path()),
        ))
    }
}

pub fn credential_store(dir: &Path) -> Arc<CredentialStore> {
    Arc::new(CredentialStore::new(dir.join("access_token.json")))
}

pub fn session_store(dir: &Path) -> Arc<CsrfSessionStore> {
    Arc::new(CsrfSessionStore::new(
        dir.join("httpd_session.json"),
        dir.join("httpd_session.EXPIRED.json"),
    ))
}

fn redirect_workflow(
    provider: Arc<FakeProvider>,
    credentials: Arc<CredentialStore>,
    sessions: Arc<CsrfSessionStore>,
) -> RedirectWorkflow {
    RedirectWorkflow::new(provider, credentials, sessions, CALLBACK_URL, RESTART_URL)
}

/// Value of `name` in a URL's query string
pub fn query_param(url: &str, name: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == name).then(|| v.to_string())
    })
}
