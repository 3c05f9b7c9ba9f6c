use crate::sensors::{SensorManager, SensorSnapshot};

pub const START_BUTTON_ID: &str = "start-sensor";

/// One rendered section of the view. Several may show at once.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Failure(String),
    Unavailable,
    StartControl,
    Readings(ReadingRows),
}

/// Display-ready reading: angles to two decimals, absolute as Yes/No.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingRows {
    pub alpha: String,
    pub beta: String,
    pub gamma: String,
    pub absolute: &'static str,
}

pub fn blocks(snapshot: &SensorSnapshot) -> Vec<Block> {
    let mut out = Vec::new();
    if let Some(failure) = &snapshot.failure {
        out.push(Block::Failure(failure.to_string()));
    }
    if !snapshot.available {
        out.push(Block::Unavailable);
    }
    let reading = &snapshot.reading;
    if snapshot.available && !reading.has_arrived() {
        out.push(Block::StartControl);
    }
    if reading.has_arrived() {
        out.push(Block::Readings(ReadingRows {
            alpha: angle(reading.alpha),
            beta: angle(reading.beta),
            gamma: angle(reading.gamma),
            absolute: if reading.absolute == Some(true) { "Yes" } else { "No" },
        }));
    }
    out
}

fn angle(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_default()
}

/// HTML fragment for the page's view container.
pub fn render(snapshot: &SensorSnapshot) -> String {
    let mut html = String::from("<div>");
    for block in blocks(snapshot) {
        match block {
            Block::Failure(message) => {
                html.push_str(&format!(r#"<p style="color: red">Error: {}</p>"#, message));
            }
            Block::Unavailable => {
                html.push_str("<p>Sensor Not Available on this device / browser.</p>");
            }
            Block::StartControl => {
                html.push_str(&format!(
                    r#"<button id="{}">Request Sensor Permissions and Start</button>"#,
                    START_BUTTON_ID
                ));
            }
            Block::Readings(rows) => {
                html.push_str(&format!(
                    "<table>\
                     <thead><tr><th>Axis</th><th>Angle (Degrees)</th></tr></thead>\
                     <tbody>\
                     <tr><td>Alpha (Z-axis)</td><td>{}</td></tr>\
                     <tr><td>Beta (X-axis)</td><td>{}</td></tr>\
                     <tr><td>Gamma (Y-axis)</td><td>{}</td></tr>\
                     <tr><td>Absolute</td><td>{}</td></tr>\
                     </tbody></table>",
                    rows.alpha, rows.beta, rows.gamma, rows.absolute
                ));
            }
        }
    }
    html.push_str("</div>");
    html
}

/// The rotation view. Owns its manager: mounting subscribes, unmounting or
/// dropping the view unsubscribes.
pub struct RotationDisplay {
    manager: SensorManager,
}

impl RotationDisplay {
    pub fn mount(manager: SensorManager) -> Self {
        manager.initialize();
        Self { manager }
    }

    pub fn unmount(&self) {
        self.manager.teardown();
    }

    /// Start control handler.
    pub async fn handle_start(&self) -> bool {
        let granted = self.manager.request_permission().await;
        if granted {
            tracing::info!("Started observing rotation updates.");
        }
        granted
    }

    pub fn render(&self) -> String {
        render(&self.manager.snapshot())
    }

    pub fn manager(&self) -> &SensorManager {
        &self.manager
    }
}

impl Drop for RotationDisplay {
    fn drop(&mut self) {
        self.manager.teardown();
    }
}
