use super::{Entry, Level, LogSink};
use crate::data::SigningRequest;
use std::fmt::Arguments;
use std::sync::Arc;

/// The text replacing a secret.
pub const MASK: &str = "********";

/// The secrets to mask, in the order they get replaced.
#[derive(Clone, PartialEq, Eq)]
pub struct Redactions {
    secrets: Vec<String>,
}

impl std::fmt::Debug for Redactions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Redactions")
            .field("secrets", &self.secrets.len())
            .finish()
    }
}

impl Redactions {
    /// Empty secrets are dropped, as they would match everywhere.
    pub fn new<I, S>(secrets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            secrets: secrets
                .into_iter()
                .map(Into::into)
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Username, password, credential id and TOTP secret, in that order.
    pub fn from_request(request: &SigningRequest) -> Self {
        let credentials = &request.credentials;
        Self::new(
            [
                Some(credentials.username.as_str()),
                Some(credentials.password.as_str()),
                request.credential_id(),
                request.totp_secret(),
            ]
            .into_iter()
            .flatten(),
        )
    }

    /// Replace each secret, one after the other.
    ///
    /// A later secret is searched in the already masked text. So a secret which is part of another
    /// one might still get masked inside of it, if the other one wasn't masked before.
    pub fn redact(&self, text: &str) -> String {
        self.secrets
            .iter()
            .fold(text.to_string(), |text, secret| text.replace(secret, MASK))
    }
}

/// Redacts everything before handing it to the sink.
#[derive(Clone)]
pub struct Censor {
    redactions: Arc<Redactions>,
    sink: Arc<dyn LogSink>,
}

impl Censor {
    pub fn new(redactions: Redactions, sink: Arc<dyn LogSink>) -> Self {
        Self {
            redactions: Arc::new(redactions),
            sink,
        }
    }

    pub fn message(&self, text: impl AsRef<str>) {
        self.append(Level::Message, text.as_ref());
    }

    pub fn error(&self, text: impl AsRef<str>) {
        self.append(Level::Error, text.as_ref());
    }

    pub fn message_fmt(&self, args: Arguments<'_>) {
        self.append(Level::Message, &args.to_string());
    }

    pub fn error_fmt(&self, args: Arguments<'_>) {
        self.append(Level::Error, &args.to_string());
    }

    fn append(&self, level: Level, text: &str) {
        self.sink.append(Entry {
            level,
            text: self.redactions.redact(text),
        });
    }
}

/// Report an informational message through a [`Censor`].
macro_rules! censored_message {
    ($censor:expr, $($arg:tt)+) => {
        $censor.message_fmt(format_args!($($arg)+))
    };
}

/// Report an error through a [`Censor`].
macro_rules! censored_error {
    ($censor:expr, $($arg:tt)+) => {
        $censor.error_fmt(format_args!($($arg)+))
    };
}

pub(crate) use censored_error;
pub(crate) use censored_message;
