// Browser bridge: embedded HTTP server hosting the rotation view.
//
// The page served at `/` is the platform adapter. It feature-detects
// `DeviceOrientationEvent`, mounts a view, forwards every
// `deviceorientation` event and relays the result of
// `DeviceOrientationEvent.requestPermission()`. The manager and the display
// run here; the page only polls the rendered fragment.
//
// Flow:
//   1. Page loads → POST /mount {supported, prompt} → {session, html};
//      every later request carries ?session=<id>
//   2. Page listens for deviceorientation → POST /orientation per event
//   3. User taps the start control → page asks the browser for permission,
//      POST /permission {state|error} → manager.request_permission()
//   4. Page polls GET /view and swaps the fragment in; a 409 means the view
//      is gone and the page mounts again
//   5. pagehide → POST /unmount, which only ever drops that page's view

use std::collections::BTreeMap;
use std::io::Read;
use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use qrcode::QrCode;
use serde::Deserialize;
use tiny_http::{Header, Method, Response, Server};

use crate::config::Config;
use crate::display::{RotationDisplay, START_BUTTON_ID};
use crate::error::{BridgeError, PromptError};
use crate::platform::{
    ListenerId, ListenerRegistry, OrientationListener, OrientationSource, PermissionPrompt,
    PermissionState,
};
use crate::reading::RotationReading;
use crate::sensors::SensorManager;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Where the page can be reached.
#[derive(Clone, Debug)]
pub struct BridgeInfo {
    pub local_addr: SocketAddr,
    /// URL a phone on the same network should open
    pub url: String,
    /// QR code of `url` drawn with unicode half blocks, for the terminal
    pub qr_terminal: String,
}

/// Manages the lifecycle of the bridge server thread.
pub struct OrientationBridge {
    shutdown: Arc<AtomicBool>,
    info: BridgeInfo,
    handle: Option<thread::JoinHandle<()>>,
}

impl OrientationBridge {
    /// Bind the server and spawn its worker thread.
    pub fn start(config: &Config) -> Result<Self, BridgeError> {
        let server = Server::http(config.bind).map_err(|e| BridgeError::Bind(e.to_string()))?;
        let local_addr = server.server_addr().to_ip().ok_or(BridgeError::NoPort)?;

        let host = if local_addr.ip().is_unspecified() {
            detect_local_ip()
        } else {
            local_addr.ip()
        };
        let url = format!("http://{}/", SocketAddr::new(host, local_addr.port()));
        let code = QrCode::new(url.as_bytes())?;

        let state = BridgeState::new(config.poll_interval(), &code)?;
        let info = BridgeInfo {
            local_addr,
            url,
            qr_terminal: terminal_qr(&code),
        };
        tracing::info!("OrientationBridge: serving {} (bound {})", info.url, local_addr);

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let handle = thread::spawn(move || {
            server_loop(server, state, shutdown_clone);
        });

        Ok(Self {
            shutdown,
            info,
            handle: Some(handle),
        })
    }

    pub fn info(&self) -> &BridgeInfo {
        &self.info
    }

    /// Signal the worker to exit and wait for it. Mounted views are torn
    /// down on the way out.
    pub fn stop(mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("OrientationBridge: server thread panicked");
            }
        }
    }
}

impl Drop for OrientationBridge {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Browser-backed ports
// ---------------------------------------------------------------------------

/// Orientation source fed by events the page posts.
pub struct BrowserSource {
    supported: bool,
    registry: ListenerRegistry,
}

impl BrowserSource {
    pub fn new(supported: bool) -> Self {
        Self {
            supported,
            registry: ListenerRegistry::new(),
        }
    }

    pub fn dispatch(&self, reading: RotationReading) -> usize {
        self.registry.dispatch(reading)
    }
}

impl OrientationSource for BrowserSource {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn add_listener(&self, listener: OrientationListener) -> ListenerId {
        self.registry.add(listener)
    }

    fn remove_listener(&self, id: ListenerId) {
        self.registry.remove(id);
    }
}

/// What the page learned from `DeviceOrientationEvent.requestPermission()`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PermissionReport {
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Permission prompt answered by the page. The browser only allows the
/// prompt inside a user gesture, so the page runs it and reports back; each
/// request consumes the latest report.
#[derive(Default)]
pub struct BrowserPrompt {
    pending: Mutex<Option<PermissionReport>>,
}

impl BrowserPrompt {
    pub fn report(&self, report: PermissionReport) {
        match self.pending.lock() {
            Ok(mut p) => *p = Some(report),
            Err(poisoned) => *poisoned.into_inner() = Some(report),
        }
    }

    fn take(&self) -> Option<PermissionReport> {
        match self.pending.lock() {
            Ok(mut p) => p.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

#[async_trait]
impl PermissionPrompt for BrowserPrompt {
    async fn request(&self) -> Result<PermissionState, PromptError> {
        match self.take() {
            Some(PermissionReport { error: Some(e), .. }) => Err(PromptError(e)),
            Some(PermissionReport {
                state: Some(state), ..
            }) => Ok(PermissionState::from(state.as_str())),
            _ => Err(PromptError("page reported no permission outcome".to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Request handling
// ---------------------------------------------------------------------------

/// Identifies one page load. Handed out by `/mount`, required by every
/// per-view route.
pub type SessionId = u64;

/// Views kept alive at once. Pages that vanish without their `pagehide`
/// beacon are evicted oldest first.
pub const MAX_SESSIONS: usize = 16;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MountReport {
    supported: bool,
    prompt: bool,
}

/// One page load's worth of state.
struct Session {
    source: Arc<BrowserSource>,
    prompt: Option<Arc<BrowserPrompt>>,
    display: RotationDisplay,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Reply {
    fn html(body: String) -> Self {
        Self::with(200, "text/html; charset=utf-8", body)
    }

    fn json(value: serde_json::Value) -> Self {
        Self::with(200, "application/json", value.to_string())
    }

    fn text(status: u16, body: &str) -> Self {
        Self::with(status, "text/plain; charset=utf-8", body.to_string())
    }

    fn no_content() -> Self {
        Self::with(204, "text/plain; charset=utf-8", String::new())
    }

    fn with(status: u16, content_type: &'static str, body: String) -> Self {
        Self {
            status,
            content_type,
            body,
        }
    }
}

/// Routing and session state owned by the server thread.
pub struct BridgeState {
    page: String,
    qr_svg: String,
    sessions: BTreeMap<SessionId, Session>,
    next_session: SessionId,
    runtime: tokio::runtime::Runtime,
}

impl BridgeState {
    pub fn new(poll_interval: Duration, code: &QrCode) -> Result<Self, BridgeError> {
        // Permission requests are the only async work; one thread is enough.
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(BridgeError::Runtime)?;

        Ok(Self {
            page: build_page_html(poll_interval),
            qr_svg: code
                .render::<qrcode::render::svg::Color>()
                .min_dimensions(200, 200)
                .build(),
            sessions: BTreeMap::new(),
            next_session: 1,
            runtime,
        })
    }

    pub fn is_mounted(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn handle(&mut self, method: &Method, url: &str, body: &str) -> Reply {
        let path = url.split('?').next().unwrap_or("");
        match (method, path) {
            (Method::Get, "/") => Reply::html(self.page.clone()),
            (Method::Get, "/qr.svg") => Reply::with(200, "image/svg+xml", self.qr_svg.clone()),
            (Method::Post, "/mount") => self.mount(body),
            (Method::Get, "/view") => self.with_session(url, |state, id| state.view(id)),
            (Method::Post, "/orientation") => {
                self.with_session(url, |state, id| state.orientation(id, body))
            }
            (Method::Post, "/permission") => {
                self.with_session(url, |state, id| state.permission(id, body))
            }
            (Method::Post, "/unmount") => self.with_session(url, |state, id| state.unmount(id)),
            _ => Reply::text(404, "Not Found"),
        }
    }

    fn with_session<F>(&mut self, url: &str, route: F) -> Reply
    where
        F: FnOnce(&mut Self, SessionId) -> Reply,
    {
        match extract_session(url) {
            Some(id) => route(self, id),
            None => Reply::text(400, "missing or malformed session"),
        }
    }

    fn mount(&mut self, body: &str) -> Reply {
        let report: MountReport = match serde_json::from_str(body) {
            Ok(r) => r,
            Err(e) => return Reply::text(400, &format!("bad mount report: {}", e)),
        };

        while self.sessions.len() >= MAX_SESSIONS {
            let Some(oldest) = self.sessions.keys().next().copied() else {
                break;
            };
            tracing::warn!("OrientationBridge: evicting abandoned view {}", oldest);
            self.unmount(oldest);
        }

        let id = self.next_session;
        self.next_session += 1;

        let source = Arc::new(BrowserSource::new(report.supported));
        let prompt = report.prompt.then(|| Arc::new(BrowserPrompt::default()));
        let manager = SensorManager::new(
            source.clone(),
            prompt.clone().map(|p| p as Arc<dyn PermissionPrompt>),
        );
        tracing::info!(
            "OrientationBridge: mounting view {} (supported={}, prompt={})",
            id,
            report.supported,
            report.prompt
        );

        let display = RotationDisplay::mount(manager);
        let html = display.render();
        self.sessions.insert(
            id,
            Session {
                source,
                prompt,
                display,
            },
        );
        Reply::json(serde_json::json!({ "session": id, "html": html }))
    }

    /// Only the named view is torn down; unknown ids are a no-op.
    fn unmount(&mut self, id: SessionId) -> Reply {
        if let Some(session) = self.sessions.remove(&id) {
            session.display.unmount();
            tracing::info!("OrientationBridge: view {} unmounted", id);
        } else {
            tracing::debug!("OrientationBridge: ignoring unmount of unknown view {}", id);
        }
        Reply::no_content()
    }

    fn unmount_all(&mut self) {
        let ids: Vec<SessionId> = self.sessions.keys().copied().collect();
        for id in ids {
            self.unmount(id);
        }
    }

    fn orientation(&self, id: SessionId, body: &str) -> Reply {
        let Some(session) = self.sessions.get(&id) else {
            return Reply::text(409, "view not mounted");
        };
        let reading: RotationReading = match serde_json::from_str(body) {
            Ok(r) => r,
            Err(e) => return Reply::text(400, &format!("bad orientation event: {}", e)),
        };
        session.source.dispatch(reading);
        Reply::no_content()
    }

    fn permission(&self, id: SessionId, body: &str) -> Reply {
        let Some(session) = self.sessions.get(&id) else {
            return Reply::text(409, "view not mounted");
        };
        let report: PermissionReport = match serde_json::from_str(body) {
            Ok(r) => r,
            Err(e) => return Reply::text(400, &format!("bad permission report: {}", e)),
        };
        if let Some(prompt) = &session.prompt {
            prompt.report(report);
        }

        let granted = self.runtime.block_on(session.display.handle_start());
        Reply::json(serde_json::json!({ "granted": granted }))
    }

    fn view(&self, id: SessionId) -> Reply {
        match self.sessions.get(&id) {
            Some(session) => Reply::html(session.display.render()),
            None => Reply::text(409, "view not mounted"),
        }
    }
}

/// Extract the session parameter from a URL like "/view?session=3"
fn extract_session(url: &str) -> Option<SessionId> {
    let query = url.split_once('?')?.1;
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("session="))
        .and_then(|value| value.parse().ok())
}

// ---------------------------------------------------------------------------
// Server loop
// ---------------------------------------------------------------------------

fn server_loop(server: Server, mut state: BridgeState, shutdown: Arc<AtomicBool>) {
    loop {
        if shutdown.load(Ordering::Acquire) {
            break;
        }

        match server.recv_timeout(Duration::from_secs(1)) {
            Ok(Some(request)) => dispatch_request(request, &mut state),
            Ok(None) => { /* timeout, loop again */ }
            Err(e) => {
                tracing::warn!("OrientationBridge: recv error: {}", e);
                break;
            }
        }
    }

    state.unmount_all();
    tracing::info!("OrientationBridge: server thread exiting");
}

fn dispatch_request(mut request: tiny_http::Request, state: &mut BridgeState) {
    let method = request.method().clone();
    let url = request.url().to_string();

    let mut body = String::new();
    let reply = match request.as_reader().read_to_string(&mut body) {
        Ok(_) => state.handle(&method, &url, &body),
        Err(e) => Reply::text(400, &format!("unreadable body: {}", e)),
    };
    tracing::debug!("OrientationBridge: {} {} -> {}", method, url, reply.status);

    let mut response = Response::from_string(reply.body).with_status_code(reply.status);
    if let Ok(header) = Header::from_bytes("Content-Type", reply.content_type) {
        response.add_header(header);
    }
    if let Err(e) = request.respond(response) {
        tracing::warn!("OrientationBridge: failed to respond to {}: {}", url, e);
    }
}

// ---------------------------------------------------------------------------
// Utilities
// ---------------------------------------------------------------------------

/// Detect the local LAN IP address using the UDP socket trick.
/// Connecting a UDP socket sends no packet; it only picks a route.
fn detect_local_ip() -> IpAddr {
    UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| {
            socket.connect("8.8.8.8:80")?;
            Ok(socket.local_addr()?.ip())
        })
        .unwrap_or(IpAddr::from([127, 0, 0, 1]))
}

fn terminal_qr(code: &QrCode) -> String {
    use qrcode::render::unicode::Dense1x2;

    code.render::<Dense1x2>()
        .dark_color(Dense1x2::Light)
        .light_color(Dense1x2::Dark)
        .build()
}

// ---------------------------------------------------------------------------
// Rotation page (served to the browser)
// ---------------------------------------------------------------------------

fn build_page_html(poll_interval: Duration) -> String {
    PAGE_HTML_TEMPLATE
        .replace("__POLL_MS__", &poll_interval.as_millis().to_string())
        .replace("__BUTTON_ID__", START_BUTTON_ID)
}

const PAGE_HTML_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Device Rotation</title>
</head>
<body>
<div id="view"></div>

<script>
(function(){
  var POLL_MS=__POLL_MS__,BUTTON_ID='__BUTTON_ID__';
  var view=document.getElementById('view');
  var supported='DeviceOrientationEvent' in window;
  var prompt=supported&&typeof DeviceOrientationEvent.requestPermission==='function';
  var session=null,mounting=false;

  function post(path,body){
    return fetch(path,{
      method:'POST',
      headers:{'Content-Type':'application/json'},
      body:JSON.stringify(body)
    });
  }

  function mount(){
    if(mounting)return Promise.resolve();
    mounting=true;
    return post('/mount',{supported:supported,prompt:prompt})
      .then(function(r){return r.json()})
      .then(function(res){session=res.session;view.innerHTML=res.html})
      .catch(function(){})
      .then(function(){mounting=false});
  }

  function refresh(){
    if(session===null)return;
    fetch('/view?session='+session).then(function(r){
      // The server dropped this view (restart or eviction): start over.
      if(r.status===409){session=null;mount();return null}
      return r.ok?r.text():null;
    }).then(function(html){
      if(html!==null&&html!==view.innerHTML){view.innerHTML=html}
    }).catch(function(){});
  }

  function onOrientation(e){
    if(session===null)return;
    post('/orientation?session='+session,{alpha:e.alpha,beta:e.beta,gamma:e.gamma,absolute:e.absolute})
      .catch(function(){});
  }

  // The start control is re-rendered by the server, so listen on the container.
  view.addEventListener('click',function(ev){
    if(!ev.target||ev.target.id!==BUTTON_ID||session===null)return;
    var id=session;
    // iOS 13+ only allows the prompt from a user gesture
    var outcome=prompt
      ? DeviceOrientationEvent.requestPermission().then(
          function(s){return {state:s}},
          function(err){return {error:String((err&&err.message)||err)}})
      : Promise.resolve({});
    outcome.then(function(report){return post('/permission?session='+id,report)})
      .then(function(r){return r.json()})
      .then(function(res){
        if(res.granted){console.log('Started observing rotation updates.')}
        refresh();
      }).catch(function(){});
  });

  mount().then(function(){
    if(supported){window.addEventListener('deviceorientation',onOrientation)}
    window.addEventListener('pagehide',function(){
      window.removeEventListener('deviceorientation',onOrientation);
      if(session!==null){navigator.sendBeacon('/unmount?session='+session)}
    });
    setInterval(refresh,POLL_MS);
  });
})();
</script>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> BridgeState {
        let code = QrCode::new(b"http://127.0.0.1:8080/").unwrap();
        BridgeState::new(Duration::from_millis(100), &code).unwrap()
    }

    fn mount(state: &mut BridgeState, report: &str) -> SessionId {
        let reply = state.handle(&Method::Post, "/mount", report);
        assert_eq!(reply.status, 200, "{}", reply.body);
        let body: serde_json::Value = serde_json::from_str(&reply.body).unwrap();
        body["session"].as_u64().unwrap()
    }

    fn call(
        state: &mut BridgeState,
        method: Method,
        path: &str,
        id: SessionId,
        body: &str,
    ) -> Reply {
        state.handle(&method, &format!("{}?session={}", path, id), body)
    }

    #[test]
    fn serves_page_with_settings() {
        let mut state = state();
        let reply = state.handle(&Method::Get, "/", "");
        assert_eq!(reply.status, 200);
        assert!(reply.body.contains("POLL_MS=100"));
        assert!(reply.body.contains("BUTTON_ID='start-sensor'"));
        assert!(!reply.body.contains("__POLL_MS__"));
    }

    #[test]
    fn serves_qr_svg() {
        let mut state = state();
        let reply = state.handle(&Method::Get, "/qr.svg", "");
        assert_eq!(reply.content_type, "image/svg+xml");
        assert!(reply.body.contains("<svg"));
    }

    #[test]
    fn session_parameter_parsing() {
        assert_eq!(extract_session("/view?session=7"), Some(7));
        assert_eq!(extract_session("/view?t=1&session=12"), Some(12));
        assert_eq!(extract_session("/view?session=abc"), None);
        assert_eq!(extract_session("/view"), None);
    }

    #[test]
    fn per_view_routes_need_a_known_session() {
        let mut state = state();
        assert_eq!(state.handle(&Method::Get, "/view", "").status, 400);
        assert_eq!(call(&mut state, Method::Get, "/view", 1, "").status, 409);
        assert_eq!(
            call(&mut state, Method::Post, "/orientation", 1, r#"{"alpha":1.0}"#).status,
            409
        );
        assert_eq!(call(&mut state, Method::Post, "/permission", 1, "{}").status, 409);
    }

    #[test]
    fn unknown_route_is_not_found() {
        let mut state = state();
        assert_eq!(state.handle(&Method::Get, "/nope", "").status, 404);
        assert_eq!(state.handle(&Method::Get, "/mount", "").status, 404);
    }

    #[test]
    fn malformed_bodies_are_bad_requests() {
        let mut state = state();
        assert_eq!(state.handle(&Method::Post, "/mount", "not json").status, 400);
        let id = mount(&mut state, r#"{"supported":true}"#);
        assert_eq!(call(&mut state, Method::Post, "/orientation", id, "{").status, 400);
    }

    #[test]
    fn unsupported_mount_renders_notice() {
        let mut state = state();
        let reply = state.handle(&Method::Post, "/mount", r#"{"supported":false,"prompt":false}"#);
        let body: serde_json::Value = serde_json::from_str(&reply.body).unwrap();
        let html = body["html"].as_str().unwrap();
        assert!(html.contains("Sensor Not Available on this device / browser."));
        assert!(html.contains("Device Orientation Sensor Not Available."));

        let id = body["session"].as_u64().unwrap();
        let reply = call(&mut state, Method::Post, "/permission", id, "{}");
        assert_eq!(reply.body, r#"{"granted":false}"#);
    }

    #[test]
    fn prompt_flow_end_to_end() {
        let mut state = state();
        let id = mount(&mut state, r#"{"supported":true,"prompt":true}"#);

        let reply = call(&mut state, Method::Post, "/permission", id, r#"{"state":"denied"}"#);
        assert_eq!(reply.body, r#"{"granted":false}"#);
        assert!(call(&mut state, Method::Get, "/view", id, "")
            .body
            .contains("Device orientation access denied by user."));

        let reply = call(&mut state, Method::Post, "/permission", id, r#"{"state":"granted"}"#);
        assert_eq!(reply.body, r#"{"granted":true}"#);

        let event = r#"{"alpha":45.12345,"beta":-10.2,"gamma":5.0,"absolute":true}"#;
        assert_eq!(call(&mut state, Method::Post, "/orientation", id, event).status, 204);

        let view = state.handle(&Method::Get, &format!("/view?t=1&session={}", id), "").body;
        assert!(!view.contains("Error"));
        for expected in ["45.12", "-10.20", "5.00", "Yes"] {
            assert!(view.contains(expected), "missing {} in {}", expected, view);
        }
    }

    #[test]
    fn prompt_error_is_reported_as_request_failure() {
        let mut state = state();
        let id = mount(&mut state, r#"{"supported":true,"prompt":true}"#);
        let report = r#"{"error":"NotAllowedError"}"#;
        let reply = call(&mut state, Method::Post, "/permission", id, report);
        assert_eq!(reply.body, r#"{"granted":false}"#);
        assert!(call(&mut state, Method::Get, "/view", id, "")
            .body
            .contains("Permission request failed."));
    }

    #[test]
    fn late_unmount_from_reloaded_page_leaves_new_view_alone() {
        let mut state = state();
        let old = mount(&mut state, r#"{"supported":true}"#);
        let new = mount(&mut state, r#"{"supported":true}"#);
        assert_ne!(old, new);

        // The old page's pagehide beacon lands after the new page mounted.
        assert_eq!(call(&mut state, Method::Post, "/unmount", old, "").status, 204);
        assert!(!state.is_mounted(old));
        assert!(state.is_mounted(new));

        assert_eq!(
            call(&mut state, Method::Post, "/orientation", new, r#"{"alpha":10.0}"#).status,
            204
        );
        let view = call(&mut state, Method::Get, "/view", new, "");
        assert_eq!(view.status, 200);
        assert!(view.body.contains("10.00"));

        // Anything still addressed to the old page is refused without side effects.
        assert_eq!(
            call(&mut state, Method::Post, "/orientation", old, r#"{"alpha":99.0}"#).status,
            409
        );
        assert!(!call(&mut state, Method::Get, "/view", new, "").body.contains("99.00"));
    }

    #[test]
    fn unmount_before_remount_then_remount() {
        let mut state = state();
        let old = mount(&mut state, r#"{"supported":true}"#);
        call(&mut state, Method::Post, "/orientation", old, r#"{"alpha":10.0}"#);
        assert_eq!(call(&mut state, Method::Post, "/unmount", old, "").status, 204);

        let new = mount(&mut state, r#"{"supported":true}"#);
        let view = call(&mut state, Method::Get, "/view", new, "").body;
        assert!(!view.contains("10.00"));
        assert!(view.contains("Request Sensor Permissions and Start"));
        assert_eq!(state.session_count(), 1);
    }

    #[test]
    fn permission_reports_reach_only_their_own_view() {
        let mut state = state();
        let phone = mount(&mut state, r#"{"supported":true,"prompt":true}"#);
        let desktop = mount(&mut state, r#"{"supported":true,"prompt":false}"#);

        let reply = call(&mut state, Method::Post, "/permission", phone, r#"{"state":"denied"}"#);
        assert_eq!(reply.body, r#"{"granted":false}"#);
        assert!(call(&mut state, Method::Get, "/view", phone, "")
            .body
            .contains("Device orientation access denied by user."));
        assert!(!call(&mut state, Method::Get, "/view", desktop, "")
            .body
            .contains("Error"));

        let reply = call(&mut state, Method::Post, "/permission", desktop, "{}");
        assert_eq!(reply.body, r#"{"granted":true}"#);
    }

    #[test]
    fn unmount_is_idempotent() {
        let mut state = state();
        let id = mount(&mut state, r#"{"supported":true}"#);
        assert_eq!(call(&mut state, Method::Post, "/unmount", id, "").status, 204);
        assert!(!state.is_mounted(id));
        assert_eq!(call(&mut state, Method::Post, "/unmount", id, "").status, 204);
    }

    #[test]
    fn abandoned_views_are_evicted_oldest_first() {
        let mut state = state();
        let first = mount(&mut state, r#"{"supported":true}"#);
        for _ in 1..MAX_SESSIONS {
            mount(&mut state, r#"{"supported":true}"#);
        }
        assert_eq!(state.session_count(), MAX_SESSIONS);

        let latest = mount(&mut state, r#"{"supported":true}"#);
        assert_eq!(state.session_count(), MAX_SESSIONS);
        assert!(!state.is_mounted(first));
        assert!(state.is_mounted(latest));
    }

    #[test]
    fn browser_prompt_consumes_reports() {
        let prompt = BrowserPrompt::default();
        prompt.report(PermissionReport {
            state: Some("granted".to_string()),
            error: None,
        });
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        assert_eq!(rt.block_on(prompt.request()), Ok(PermissionState::Granted));
        assert!(rt.block_on(prompt.request()).is_err());
    }
}
