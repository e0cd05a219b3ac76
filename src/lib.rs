// Clock and timestamps
pub mod clock;

// Configuration (TOML + environment)
pub mod config;

// Single-record file storage
pub mod files;
pub mod wait;

// Credential, CSRF session and latest-URL stores
pub mod credentials;
pub mod latest_url;
pub mod session;

// Remote collaborators
pub mod provider;
pub mod remote;

// Authorization workflows
pub mod workflow;

// HTTP callback listener
pub mod listener;

// Client-side flow drivers
pub mod client;
