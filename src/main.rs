use anyhow::{bail, Context, Result};
use authflow::client::{self, Browser};
use authflow::config::{load_config, AuthflowConfig};
use authflow::credentials::CredentialStore;
use authflow::latest_url::LatestUrlFile;
use authflow::listener::{create_listener_router, serve, ListenerState, SiteInfo};
use authflow::provider::{AuthorizationProvider, DropboxProvider};
use authflow::session::CsrfSessionStore;
use authflow::wait::WaitSchedule;
use authflow::workflow::{NoRedirectWorkflow, RedirectWorkflow, WorkflowError};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Prints the authorization URL for the user to open
struct PrintBrowser;

impl Browser for PrintBrowser {
    fn open(&self, url: &str) -> Result<()> {
        println!("Open this URL in your browser and click 'Allow':\n\n  {url}\n");
        Ok(())
    }
}

/// Stores and workflows built once at startup and passed down explicitly
struct App {
    config: AuthflowConfig,
    credentials: Arc<CredentialStore>,
    sessions: Arc<CsrfSessionStore>,
    redirect: Arc<RedirectWorkflow>,
    no_redirect: NoRedirectWorkflow,
}

impl App {
    fn new(config: AuthflowConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.files.directory).with_context(|| {
            format!(
                "Failed to create files directory {}",
                config.files.directory.display()
            )
        })?;

        let provider: Arc<dyn AuthorizationProvider> =
            Arc::new(DropboxProvider::new(config.app.clone()));
        let credentials = Arc::new(CredentialStore::new(config.files.credential_path()));
        let sessions = Arc::new(CsrfSessionStore::new(
            config.files.session_path(),
            config.files.expired_session_path(),
        ));

        let redirect = Arc::new(RedirectWorkflow::new(
            Arc::clone(&provider),
            Arc::clone(&credentials),
            Arc::clone(&sessions),
            config.http.finish_url(),
            config.http.home_url(),
        ));
        let no_redirect = NoRedirectWorkflow::new(provider, Arc::clone(&credentials));

        Ok(Self {
            config,
            credentials,
            sessions,
            redirect,
            no_redirect,
        })
    }

    async fn spawn_listener(
        &self,
        shutdown: CancellationToken,
    ) -> Result<tokio::task::JoinHandle<()>> {
        let state = ListenerState {
            workflow: Arc::clone(&self.redirect),
            latest_url: Arc::new(LatestUrlFile::new(self.config.files.latest_url_path())),
            site: Arc::new(SiteInfo::from_config(&self.config)),
        };
        let router = create_listener_router(state);

        let addr = self.config.http.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind callback listener to {addr}"))?;
        info!(
            home_url = %self.config.http.home_url(),
            "Browse to the home page to test the listener"
        );

        Ok(tokio::spawn(async move {
            if let Err(e) = serve(listener, router, shutdown).await {
                tracing::error!(error = %e, "Callback listener error");
            }
        }))
    }
}

fn load() -> Result<AuthflowConfig> {
    let config = match std::env::var("AUTHFLOW_CONFIG") {
        Ok(path) => load_config(&path)?,
        Err(_) => AuthflowConfig::default(),
    };
    Ok(config.apply_env())
}

/// Cancel `token` on Ctrl-C.
///
/// Installing this replaces the default Ctrl-C exit, so every mode that
/// calls it must observe `token`.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => warn!(error = %e, "Failed to listen for ctrl_c signal"),
        }
        token.cancel();
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "authflow=info".into()),
        )
        .init();

    let mode = std::env::args().nth(1).unwrap_or_else(|| "serve".to_string());
    let config = load()?;
    info!(
        mode = %mode,
        files_directory = %config.files.directory.display(),
        finish_url = %config.http.finish_url(),
        "Configuration loaded"
    );
    let app = App::new(config)?;

    let shutdown = CancellationToken::new();
    if matches!(mode.as_str(), "serve" | "redirect" | "no-redirect") {
        cancel_on_ctrl_c(shutdown.clone());
    }

    match mode.as_str() {
        "serve" => {
            let handle = app.spawn_listener(shutdown.clone()).await?;
            info!("Press <Ctrl-C> to stop the listener");
            handle.await.context("Callback listener task failed")?;
        }
        "redirect" => {
            let home_url = app.config.http.home_url();
            let listener_shutdown = shutdown.child_token();
            let handle = if client::listener_running(&home_url).await {
                info!(home_url = %home_url, "Using the callback listener already running");
                None
            } else {
                Some(app.spawn_listener(listener_shutdown.clone()).await?)
            };

            let schedule = WaitSchedule::from(&app.config.wait);
            let result = client::authorise_redirect(
                &app.redirect,
                &app.credentials,
                &PrintBrowser,
                schedule,
                &shutdown,
            )
            .await;

            listener_shutdown.cancel();
            if let Some(handle) = handle {
                handle.await.context("Callback listener task failed")?;
            }
            let credential = result?;
            println!(
                "REDIRECT AUTHORISATION COMPLETED SUCCESSFULLY (user {})",
                credential.owner_id
            );
        }
        "no-redirect" => {
            let result = client::authorise_no_redirect(
                &app.no_redirect,
                &app.credentials,
                &PrintBrowser,
                || {
                    println!("Enter the authorisation code shown by the provider:");
                    let mut line = String::new();
                    std::io::stdin().read_line(&mut line)?;
                    Ok(line)
                },
                &shutdown,
            )
            .await;
            let credential = match result {
                Ok(credential) => credential,
                Err(WorkflowError::Cancelled) => {
                    eprintln!("Authorisation cancelled");
                    // The stdin read cannot be interrupted and the runtime
                    // would wait for it on shutdown
                    std::process::exit(130);
                }
                Err(e) => return Err(e.into()),
            };
            println!(
                "NO-REDIRECT AUTHORISATION COMPLETED SUCCESSFULLY (user {})",
                credential.owner_id
            );
        }
        "status" => {
            println!("{}", client::describe_credential_file(&app.credentials));
        }
        "logout" => {
            client::logout(&app.credentials, &app.sessions)?;
            println!("Access token and session files removed; re-authorisation will be required");
        }
        other => bail!(
            "unknown mode {other:?} (expected serve, redirect, no-redirect, status or logout)"
        ),
    }

    Ok(())
}
