//! Session attachments
//!
//! Client-side material made available to the build engine for the
//! duration of one build: registry credentials, secrets and forwarded
//! SSH agents.

pub mod auth;
pub mod secrets;
pub mod ssh;

pub use auth::AuthProvider;
pub use secrets::SecretStore;
pub use ssh::SshAgentProvider;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One piece of session material
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Attachable {
    Auth(AuthProvider),
    Secrets(SecretStore),
    Ssh(SshAgentProvider),
}

impl Attachable {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Attachable::Auth(_) => "auth",
            Attachable::Secrets(_) => "secrets",
            Attachable::Ssh(_) => "ssh",
        }
    }
}

/// The attachments for one build invocation
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    /// Unique session ID
    pub id: Uuid,

    /// When the session was created
    pub created_at: DateTime<Utc>,

    /// Attached material, auth first
    pub attachables: Vec<Attachable>,
}

impl Session {
    /// Create a session with only the auth provider attached
    pub fn new(auth: AuthProvider) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            attachables: vec![Attachable::Auth(auth)],
        }
    }

    /// Attach additional material
    pub fn attach(&mut self, attachable: Attachable) {
        self.attachables.push(attachable);
    }
}
