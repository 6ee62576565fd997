use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for one client connection.
///
/// Defaults come from `config.toml`, baked in at compile time by `build.rs`;
/// paths are resolved at runtime unless overridden.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ClientConfig {
    /// Socket to connect to; `None` means the per-user PulseAudio socket.
    pub socket_path: Option<PathBuf>,
    /// Cookie file; `None` means `<user config dir>/pulse/cookie`.
    pub cookie_path: Option<PathBuf>,
    /// Sent as `application.name`; `None` means the executable's file name.
    pub application_name: Option<String>,
    pub application_version: String,
    pub language: String,
    /// Per-request deadline; `None` waits forever.
    pub request_timeout: Option<Duration>,
}

impl ClientConfig {
    /// 从编译时设置的环境变量创建配置
    pub fn new() -> Result<Self, &'static str> {
        let timeout_ms: u64 = env!("CLIENT_REQUEST_TIMEOUT_MS")
            .parse()
            .map_err(|_| "Failed to parse CLIENT_REQUEST_TIMEOUT_MS")?;

        Ok(Self {
            socket_path: None,
            cookie_path: None,
            application_name: None,
            application_version: env!("APP_VERSION").to_string(),
            language: env!("CLIENT_LANGUAGE").to_string(),
            request_timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
        })
    }

    pub fn with_socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket_path = Some(path.into());
        self
    }

    pub fn with_cookie_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cookie_path = Some(path.into());
        self
    }

    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// `$XDG_RUNTIME_DIR/pulse/native`, else `/run/user/<uid>/pulse/native`.
    pub fn resolved_socket_path(&self) -> PathBuf {
        if let Some(path) = &self.socket_path {
            return path.clone();
        }
        let runtime = dirs::runtime_dir().unwrap_or_else(|| {
            // SAFETY: getuid has no preconditions and cannot fail.
            let uid = unsafe { libc::getuid() };
            PathBuf::from(format!("/run/user/{uid}"))
        });
        runtime.join("pulse").join("native")
    }

    pub fn resolved_cookie_path(&self) -> PathBuf {
        if let Some(path) = &self.cookie_path {
            return path.clone();
        }
        let config_dir = dirs::config_dir().unwrap_or_else(|| {
            PathBuf::from(std::env::var("HOME").unwrap_or_default()).join(".config")
        });
        config_dir.join("pulse").join("cookie")
    }

    /// The name announced to the server.
    pub fn resolved_application_name(&self) -> String {
        if let Some(name) = &self.application_name {
            return name.clone();
        }
        std::env::args()
            .next()
            .and_then(|arg0| {
                PathBuf::from(arg0)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| env!("APP_NAME").to_string())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new().expect("Failed to create default ClientConfig from build-time environment variables")
    }
}
