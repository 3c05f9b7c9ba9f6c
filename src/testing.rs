//! Test doubles for the platform ports.
//!
//! [`FakeSource`] stands in for the ambient orientation event stream and
//! [`ScriptedPrompt`] for the platform permission API, so the manager and the
//! display can be exercised without a browser.
//!
//! ```
//! use std::sync::Arc;
//! use tilt_view::testing::FakeSource;
//! use tilt_view::{RotationReading, SensorManager};
//!
//! let source = Arc::new(FakeSource::supported());
//! let manager = SensorManager::new(source.clone(), None);
//! manager.initialize();
//!
//! source.dispatch(RotationReading::new(Some(45.0), Some(0.0), Some(0.0), Some(true)));
//! assert_eq!(manager.snapshot().reading.alpha, Some(45.0));
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::PromptError;
use crate::platform::{
    ListenerId, ListenerRegistry, OrientationListener, OrientationSource, PermissionPrompt,
    PermissionState,
};
use crate::reading::RotationReading;

/// In-memory orientation source that counts (un)registrations.
pub struct FakeSource {
    supported: bool,
    registry: ListenerRegistry,
    registrations: AtomicUsize,
    removals: AtomicUsize,
}

impl FakeSource {
    pub fn supported() -> Self {
        Self::new(true)
    }

    pub fn unsupported() -> Self {
        Self::new(false)
    }

    fn new(supported: bool) -> Self {
        Self {
            supported,
            registry: ListenerRegistry::new(),
            registrations: AtomicUsize::new(0),
            removals: AtomicUsize::new(0),
        }
    }

    /// Push one event to whoever is listening.
    pub fn dispatch(&self, reading: RotationReading) -> usize {
        self.registry.dispatch(reading)
    }

    pub fn listener_count(&self) -> usize {
        self.registry.len()
    }

    /// Total successful `add_listener` calls over the source's life.
    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    /// Total `remove_listener` calls that actually removed something.
    pub fn removals(&self) -> usize {
        self.removals.load(Ordering::SeqCst)
    }
}

impl OrientationSource for FakeSource {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn add_listener(&self, listener: OrientationListener) -> ListenerId {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        self.registry.add(listener)
    }

    fn remove_listener(&self, id: ListenerId) {
        if self.registry.remove(id) {
            self.removals.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Permission prompt answering with a preset outcome.
pub struct ScriptedPrompt {
    answer: Mutex<Result<String, String>>,
    calls: AtomicUsize,
}

impl ScriptedPrompt {
    /// Resolve every request with `state` ("granted", "denied", ...).
    pub fn answering(state: &str) -> Self {
        Self {
            answer: Mutex::new(Ok(state.to_string())),
            calls: AtomicUsize::new(0),
        }
    }

    /// Reject every request with `reason`.
    pub fn failing(reason: &str) -> Self {
        Self {
            answer: Mutex::new(Err(reason.to_string())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_answer(&self, state: &str) {
        *self.lock() = Ok(state.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Result<String, String>> {
        match self.answer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl PermissionPrompt for ScriptedPrompt {
    async fn request(&self) -> Result<PermissionState, PromptError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &*self.lock() {
            Ok(state) => Ok(PermissionState::from(state.as_str())),
            Err(reason) => Err(PromptError(reason.clone())),
        }
    }
}
