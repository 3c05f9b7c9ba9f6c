// Platform ports for the orientation sensor.
//
// The manager never touches a process-wide event API directly. It is handed
// an `OrientationSource` (capability check + listener registration) and an
// optional `PermissionPrompt`; the bridge supplies browser-backed versions,
// tests supply the fakes in `crate::testing`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::PromptError;
use crate::reading::RotationReading;

pub type ListenerId = u64;

/// Callback invoked for every orientation event.
pub type OrientationListener = Arc<dyn Fn(RotationReading) + Send + Sync>;

// ---------------------------------------------------------------------------
// Event source
// ---------------------------------------------------------------------------

pub trait OrientationSource: Send + Sync {
    /// Presence test for the orientation event type.
    fn is_supported(&self) -> bool;

    fn add_listener(&self, listener: OrientationListener) -> ListenerId;

    /// Removing an unknown or already removed id is a no-op.
    fn remove_listener(&self, id: ListenerId);
}

/// Listener bookkeeping shared by every `OrientationSource` implementation.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<ListenerId, OrientationListener>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: OrientationListener) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(id, listener);
        id
    }

    pub fn remove(&self, id: ListenerId) -> bool {
        self.lock().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver one reading to every registered listener. Returns how many
    /// listeners saw it.
    pub fn dispatch(&self, reading: RotationReading) -> usize {
        // Snapshot first so a listener may (un)register without deadlocking.
        let listeners: Vec<OrientationListener> = self.lock().values().cloned().collect();
        for listener in &listeners {
            listener(reading);
        }
        listeners.len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ListenerId, OrientationListener>> {
        match self.listeners.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

// ---------------------------------------------------------------------------
// Permission
// ---------------------------------------------------------------------------

/// Outcome string of a platform permission request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
    /// Anything else the platform answers with (e.g. "prompt").
    Other(String),
}

impl From<&str> for PermissionState {
    fn from(value: &str) -> Self {
        match value {
            "granted" => PermissionState::Granted,
            "denied" => PermissionState::Denied,
            other => PermissionState::Other(other.to_string()),
        }
    }
}

/// Explicit platform permission API. Awaited without timeout.
#[async_trait]
pub trait PermissionPrompt: Send + Sync {
    async fn request(&self) -> Result<PermissionState, PromptError>;
}

/// How permission is obtained on this platform, chosen once by feature
/// detection.
#[derive(Clone)]
pub enum PermissionRequester {
    /// No explicit permission model; access is implicitly granted.
    AlwaysGranted,
    PromptRequired(Arc<dyn PermissionPrompt>),
}

impl PermissionRequester {
    pub fn detect(prompt: Option<Arc<dyn PermissionPrompt>>) -> Self {
        match prompt {
            Some(prompt) => PermissionRequester::PromptRequired(prompt),
            None => PermissionRequester::AlwaysGranted,
        }
    }

    pub fn requires_prompt(&self) -> bool {
        matches!(self, PermissionRequester::PromptRequired(_))
    }
}

impl std::fmt::Debug for PermissionRequester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionRequester::AlwaysGranted => f.write_str("AlwaysGranted"),
            PermissionRequester::PromptRequired(_) => f.write_str("PromptRequired"),
        }
    }
}
