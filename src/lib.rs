pub mod bridge;
pub mod config;
pub mod display;
pub mod error;
pub mod platform;
pub mod reading;
pub mod sensors;
pub mod testing;

pub use bridge::{BridgeInfo, OrientationBridge};
pub use config::Config;
pub use display::RotationDisplay;
pub use error::{BridgeError, PromptError, SensorFailure};
pub use platform::{OrientationSource, PermissionPrompt, PermissionRequester, PermissionState};
pub use reading::RotationReading;
pub use sensors::{Phase, SensorManager, SensorSnapshot};
