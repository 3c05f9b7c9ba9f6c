use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::SensorFailure;
use crate::platform::{
    ListenerId, OrientationListener, OrientationSource, PermissionPrompt, PermissionRequester,
    PermissionState,
};
use crate::reading::RotationReading;

/// Lifecycle of one manager instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    /// No orientation capability. Terminal for this instance.
    Unavailable,
    /// Listener attached, platform wants an explicit grant first.
    AwaitingPermission,
    Granted,
    /// User refused; a later request may still succeed.
    Denied,
    Receiving,
    TornDown,
}

/// Read-only view of the manager state handed to the display.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorSnapshot {
    pub reading: RotationReading,
    pub failure: Option<SensorFailure>,
    pub available: bool,
    pub phase: Phase,
}

struct SensorState {
    reading: RotationReading,
    failure: Option<SensorFailure>,
    phase: Phase,
}

impl SensorState {
    fn new() -> Self {
        Self {
            reading: RotationReading::default(),
            failure: None,
            phase: Phase::Uninitialized,
        }
    }

    fn apply_event(&mut self, reading: RotationReading) {
        self.reading = reading;
        self.failure = None;
        if self.phase != Phase::TornDown {
            self.phase = Phase::Receiving;
        }
    }

    /// Phase changes never leave `TornDown`, and a grant/denial does not
    /// demote a stream that is already delivering.
    fn move_to(&mut self, phase: Phase) {
        match self.phase {
            Phase::TornDown => {}
            Phase::Receiving if phase == Phase::Granted => {}
            _ => self.phase = phase,
        }
    }
}

/// Bridges a push-based orientation source into a pollable snapshot.
///
/// The capability flag and the permission strategy are fixed at
/// construction. `initialize` attaches at most one listener, `teardown`
/// detaches it; both may be repeated safely.
pub struct SensorManager {
    source: Arc<dyn OrientationSource>,
    requester: PermissionRequester,
    available: bool,
    listener: Mutex<Option<ListenerId>>,
    state: Arc<Mutex<SensorState>>,
}

impl SensorManager {
    pub fn new(
        source: Arc<dyn OrientationSource>,
        prompt: Option<Arc<dyn PermissionPrompt>>,
    ) -> Self {
        // Evaluated once; unlikely to change during the manager's life.
        let available = source.is_supported();
        let requester = PermissionRequester::detect(prompt);
        tracing::debug!(
            "SensorManager: available={} requester={:?}",
            available,
            requester
        );

        Self {
            source,
            requester,
            available,
            listener: Mutex::new(None),
            state: Arc::new(Mutex::new(SensorState::new())),
        }
    }

    pub fn is_sensor_available(&self) -> bool {
        self.available
    }

    pub fn initialize(&self) {
        let mut listener = lock(&self.listener);
        if listener.is_some() {
            tracing::warn!("SensorManager: already subscribed, ignoring initialize");
            return;
        }

        let mut state = lock(&self.state);
        *state = SensorState::new();

        if !self.available {
            tracing::warn!("SensorManager: orientation events not supported");
            state.failure = Some(SensorFailure::Unavailable);
            state.phase = Phase::Unavailable;
            return;
        }

        let shared = self.state.clone();
        let callback: OrientationListener = Arc::new(move |reading| {
            lock(&shared).apply_event(reading);
        });
        *listener = Some(self.source.add_listener(callback));

        state.phase = if self.requester.requires_prompt() {
            Phase::AwaitingPermission
        } else {
            Phase::Granted
        };
        tracing::info!("SensorManager: listening for orientation ({:?})", state.phase);
    }

    pub fn teardown(&self) {
        if let Some(id) = lock(&self.listener).take() {
            self.source.remove_listener(id);
            tracing::info!("SensorManager: listener {} detached", id);
        }
        lock(&self.state).phase = Phase::TornDown;
    }

    /// Replace the reading with one platform event and clear any failure.
    pub fn on_event(&self, reading: RotationReading) {
        lock(&self.state).apply_event(reading);
    }

    /// Ask the platform for orientation access. Failures are recorded in the
    /// snapshot rather than returned.
    pub async fn request_permission(&self) -> bool {
        if !self.available {
            self.fail(SensorFailure::Unavailable);
            return false;
        }

        let prompt = match &self.requester {
            PermissionRequester::AlwaysGranted => {
                tracing::debug!("SensorManager: no permission model, implicit grant");
                return true;
            }
            PermissionRequester::PromptRequired(prompt) => prompt.clone(),
        };

        // The lock is not held across the await.
        match prompt.request().await {
            Ok(PermissionState::Granted) => {
                let mut state = lock(&self.state);
                state.failure = None;
                state.move_to(Phase::Granted);
                tracing::info!("SensorManager: permission granted");
                true
            }
            Ok(other) => {
                tracing::info!("SensorManager: permission not granted ({:?})", other);
                self.fail(SensorFailure::Denied);
                lock(&self.state).move_to(Phase::Denied);
                false
            }
            Err(e) => {
                tracing::warn!("SensorManager: {}", e);
                self.fail(SensorFailure::RequestFailed);
                false
            }
        }
    }

    pub fn snapshot(&self) -> SensorSnapshot {
        let state = lock(&self.state);
        SensorSnapshot {
            reading: state.reading,
            failure: state.failure,
            available: self.available,
            phase: state.phase,
        }
    }

    pub fn phase(&self) -> Phase {
        lock(&self.state).phase
    }

    fn fail(&self, failure: SensorFailure) {
        lock(&self.state).failure = Some(failure);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
