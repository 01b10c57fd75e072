//! Server discovery and spawn-on-demand.
//!
//! Maps an adjustment-method/site selector pair to a server socket and, when
//! no server is reachable, spawns one and waits for it to become ready.

use std::env;
use std::ffi::OsString;
use std::io;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::error::CoopError;

/// Environment variable overriding the resolved socket path.
pub const SOCKET_ENV: &str = "COOPGAMMAD_SOCKET";

const DEFAULT_PROGRAM: &str = "coopgammad";
const DEFAULT_SPAWN_TIMEOUT: Duration = Duration::from_secs(5);
const READY_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Resolves which server a session talks to.
///
/// `method` selects the adjustment backend (e.g. `"randr"`, `"drm"`) and
/// `site` the display-server instance; both default to automatic discovery
/// on the server side when unset.
#[derive(Debug, Clone)]
pub struct Discovery {
    method: Option<String>,
    site: Option<String>,
    socket_path: Option<PathBuf>,
    program: OsString,
    spawn_timeout: Duration,
}

impl Default for Discovery {
    fn default() -> Self {
        Self {
            method: None,
            site: None,
            socket_path: None,
            program: OsString::from(DEFAULT_PROGRAM),
            spawn_timeout: DEFAULT_SPAWN_TIMEOUT,
        }
    }
}

impl Discovery {
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn site(mut self, site: impl Into<String>) -> Self {
        self.site = Some(site.into());
        self
    }

    /// Connect to an explicit socket path, bypassing path resolution.
    pub fn socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket_path = Some(path.into());
        self
    }

    /// The server program spawned when no server is reachable.
    pub fn program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    /// How long to wait for a spawned server to become ready.
    pub fn spawn_timeout(mut self, timeout: Duration) -> Self {
        self.spawn_timeout = timeout;
        self
    }

    /// The socket path this discovery resolves to.
    pub fn resolve_socket_path(&self) -> PathBuf {
        if let Some(path) = &self.socket_path {
            return path.clone();
        }
        if let Some(path) = env::var_os(SOCKET_ENV) {
            return PathBuf::from(path);
        }
        let base = env::var_os("XDG_RUNTIME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir);
        let method = self.method.as_deref().unwrap_or("auto");
        let site = self.site.as_deref().unwrap_or("default");
        base.join("coopgammad")
            .join(format!("{method}.{site}.socket"))
    }

    /// Connect to the server, spawning one if none is reachable.
    pub fn connect(&self) -> Result<UnixStream, CoopError> {
        let path = self.resolve_socket_path();
        debug!(path = %path.display(), "connecting to coopgamma server");
        match UnixStream::connect(&path) {
            Ok(stream) => Ok(stream),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused
                ) =>
            {
                self.spawn_and_wait(&path)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn spawn_and_wait(&self, path: &std::path::Path) -> Result<UnixStream, CoopError> {
        let mut command = Command::new(&self.program);
        if let Some(method) = &self.method {
            command.arg("-m").arg(method);
        }
        if let Some(site) = &self.site {
            command.arg("-s").arg(site);
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        debug!(program = ?self.program, "spawning coopgamma server");
        let mut child = command.spawn().map_err(|e| {
            CoopError::ServerStart(format!(
                "failed to spawn {}: {e}",
                self.program.to_string_lossy()
            ))
        })?;

        let deadline = Instant::now() + self.spawn_timeout;
        loop {
            match UnixStream::connect(path) {
                Ok(stream) => {
                    trace!(path = %path.display(), "spawned server became ready");
                    return Ok(stream);
                }
                Err(_) if Instant::now() < deadline => {
                    // A zero exit is fine: the server daemonizes. A failure
                    // exit means readiness will never come.
                    if let Ok(Some(status)) = child.try_wait() {
                        if !status.success() {
                            return Err(CoopError::ServerStart(format!(
                                "{} exited with {status} before becoming ready",
                                self.program.to_string_lossy()
                            )));
                        }
                    }
                    std::thread::sleep(READY_POLL_INTERVAL);
                }
                Err(e) => {
                    return Err(CoopError::ServerStart(format!(
                        "server socket {} not ready: {e}",
                        path.display()
                    )));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_socket_path_wins() {
        let discovery = Discovery::default()
            .method("randr")
            .socket_path("/tmp/test.socket");
        assert_eq!(
            discovery.resolve_socket_path(),
            PathBuf::from("/tmp/test.socket")
        );
    }

    #[test]
    fn default_path_uses_method_and_site() {
        let discovery = Discovery::default().method("drm").site("seat0");
        let path = discovery.resolve_socket_path();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(name, "drm.seat0.socket");
        assert!(path.parent().unwrap().ends_with("coopgammad"));
    }

    #[test]
    fn automatic_selectors_have_defaults() {
        let path = Discovery::default().resolve_socket_path();
        if env::var_os(SOCKET_ENV).is_none() {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            assert_eq!(name, "auto.default.socket");
        }
    }

    #[test]
    fn spawn_failure_reports_server_start() {
        let discovery = Discovery::default()
            .socket_path("/nonexistent/dir/for/sure.socket")
            .program("/nonexistent/coopgammad-binary")
            .spawn_timeout(Duration::from_millis(50));
        match discovery.connect() {
            Err(CoopError::ServerStart(msg)) => {
                assert!(msg.contains("coopgammad-binary"));
            }
            other => panic!("expected ServerStart, got {other:?}"),
        }
    }

    #[test]
    fn unready_server_reports_server_start() {
        // `/bin/true` exits 0 immediately and never creates the socket.
        let discovery = Discovery::default()
            .socket_path("/tmp/coopgamma-never-created.socket")
            .program("true")
            .spawn_timeout(Duration::from_millis(100));
        assert!(matches!(
            discovery.connect(),
            Err(CoopError::ServerStart(_))
        ));
    }
}
