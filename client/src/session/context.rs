//! Explicit session context, replacing ambient key-value storage
//!
//! The user identity, the feed locator, and the last-seen stream session id
//! are held in one context object that is constructed once, injected into
//! the sync engine and the frame channel client, and persisted to a small
//! JSON state file across runs.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::error::ClientError;

/// Client-side session state that survives reloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    /// User identity chosen at login/registration
    pub user_name: String,
    /// Upstream feed locator, opaque to this client
    #[serde(default)]
    pub rtsp_url: Option<String>,
    /// Last stream session id assigned by the frame producer
    #[serde(default)]
    pub sid: Option<String>,
}

impl SessionContext {
    pub fn new(user_name: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            rtsp_url: None,
            sid: None,
        }
    }
}

/// Shared, file-backed session context handle
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<SessionContext>>,
    state_path: PathBuf,
}

impl SessionHandle {
    /// Load the context for `user_name` from the state file, or create a
    /// fresh one. A stored context for a different user is discarded.
    pub fn load_or_create(state_path: &Path, user_name: &str) -> Result<Self, ClientError> {
        let context = match Self::read_file(state_path) {
            Some(stored) if stored.user_name == user_name => {
                debug!(user = %user_name, "restored session context");
                stored
            }
            Some(_) | None => SessionContext::new(user_name),
        };
        let handle = Self {
            inner: Arc::new(Mutex::new(context)),
            state_path: state_path.to_path_buf(),
        };
        handle.persist()?;
        Ok(handle)
    }

    fn read_file(path: &Path) -> Option<SessionContext> {
        let raw = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(context) => Some(context),
            Err(e) => {
                warn!(path = %path.display(), %e, "discarding unreadable session state");
                None
            }
        }
    }

    /// Write the current context back to the state file
    pub fn persist(&self) -> Result<(), ClientError> {
        let snapshot = self.snapshot();
        let raw = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| ClientError::Persistence(e.to_string()))?;
        fs::write(&self.state_path, raw).map_err(|e| {
            ClientError::Persistence(format!(
                "failed to write session state {}: {}",
                self.state_path.display(),
                e
            ))
        })
    }

    pub fn snapshot(&self) -> SessionContext {
        self.inner.lock().expect("session context poisoned").clone()
    }

    pub fn user_name(&self) -> String {
        self.snapshot().user_name
    }

    pub fn rtsp_url(&self) -> Option<String> {
        self.snapshot().rtsp_url
    }

    pub fn sid(&self) -> Option<String> {
        self.snapshot().sid
    }

    /// Record the feed locator returned by the persistence store
    pub fn set_rtsp_url(&self, rtsp_url: impl Into<String>) -> Result<(), ClientError> {
        {
            let mut context = self.inner.lock().expect("session context poisoned");
            context.rtsp_url = Some(rtsp_url.into());
        }
        self.persist()
    }

    /// Adopt a producer-assigned stream session id
    pub fn adopt_sid(&self, sid: impl Into<String>) -> Result<(), ClientError> {
        {
            let mut context = self.inner.lock().expect("session context poisoned");
            context.sid = Some(sid.into());
        }
        self.persist()
    }
}
