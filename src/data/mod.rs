//! Data structures

use std::fmt::{Debug, Formatter};
use std::path::PathBuf;
use std::time::Duration;

mod config;

pub use config::*;

/// The default time a single signing process may take.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Credentials of the signing account.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<hidden>")
            .finish()
    }
}

/// A request to sign a batch of files.
///
/// Only the files and the credentials are required. Optional values which are absent (or empty)
/// are left out of the tool invocation.
#[derive(Clone)]
pub struct SigningRequest {
    /// The files to sign, in order. Each of them is replaced by its signed version.
    pub files: Vec<PathBuf>,
    pub credentials: Credentials,
    /// The credential to use, required if the account holds more than one certificate.
    pub credential_id: Option<String>,
    /// The OAuth TOTP secret, for unattended signing.
    pub totp_secret: Option<String>,
    /// The program name shown in the confirmation dialog when signing MSI installers.
    pub program_name: Option<String>,
    /// Overrides the `JAVA_HOME` environment variable.
    pub java_home: Option<PathBuf>,
    /// Maximum time a single signing process may run before it gets killed.
    pub timeout: Duration,
    /// Treat an empty list of files as an error instead of a no-op.
    pub error_on_no_files: bool,
}

impl SigningRequest {
    pub fn new(
        files: Vec<PathBuf>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            files,
            credentials: Credentials {
                username: username.into(),
                password: password.into(),
            },
            credential_id: None,
            totp_secret: None,
            program_name: None,
            java_home: None,
            timeout: DEFAULT_TIMEOUT,
            error_on_no_files: false,
        }
    }

    pub fn credential_id(&self) -> Option<&str> {
        non_empty(&self.credential_id)
    }

    pub fn totp_secret(&self) -> Option<&str> {
        non_empty(&self.totp_secret)
    }

    pub fn program_name(&self) -> Option<&str> {
        non_empty(&self.program_name)
    }
}

impl Debug for SigningRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningRequest")
            .field("files", &self.files)
            .field("credentials", &self.credentials)
            .field("credential_id", &self.credential_id)
            .field("totp_secret", &self.totp_secret.as_ref().map(|_| "<hidden>"))
            .field("program_name", &self.program_name)
            .field("java_home", &self.java_home)
            .field("timeout", &self.timeout)
            .field("error_on_no_files", &self.error_on_no_files)
            .finish()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}
