//! Authentication and client identity, run once right after connecting.

use std::path::Path;

use crate::config::ClientConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::protocol::{Command, COOKIE_LENGTH, PROTOCOL_VERSION, PROTOCOL_VERSION_MASK};
use crate::tagstruct::{PropList, TagStructReader};
use crate::transport::Request;

/// Reads the shared secret; it must be exactly 256 bytes.
pub async fn read_cookie(path: &Path) -> Result<Vec<u8>> {
    let cookie = tokio::fs::read(path).await.map_err(|e| Error::BadCookie {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    if cookie.len() != COOKIE_LENGTH {
        return Err(Error::BadCookie {
            path: path.to_path_buf(),
            reason: format!(
                "incorrect length {}, expected {}",
                cookie.len(),
                COOKIE_LENGTH
            ),
        });
    }
    Ok(cookie)
}

/// Sends `Auth` and returns the negotiated protocol version.
pub async fn authenticate(dispatcher: &Dispatcher, config: &ClientConfig) -> Result<u32> {
    let cookie = read_cookie(&config.resolved_cookie_path()).await?;

    let mut req = Request::new(Command::Auth);
    req.args().put_u32(PROTOCOL_VERSION).put_arbitrary(&cookie);
    let reply = dispatcher.request(req, config.request_timeout).await?;

    let server = TagStructReader::new(reply).read_u32()? & PROTOCOL_VERSION_MASK;
    if server < PROTOCOL_VERSION {
        return Err(Error::VersionUnsupported {
            server,
            required: PROTOCOL_VERSION,
        });
    }
    Ok(server)
}

/// Properties announcing who we are.
pub fn identity(config: &ClientConfig) -> PropList {
    let mut props = PropList::new();
    props.insert("application.name", config.resolved_application_name());
    props.insert("application.version", config.application_version.as_str());
    props.insert("application.process.id", std::process::id().to_string());
    if let Some(binary) = std::env::args().next() {
        props.insert("application.process.binary", binary);
    }
    props.insert("application.language", config.language.as_str());

    let user = login_user()
        .or_else(|| std::env::var("USER").ok())
        .or_else(|| std::env::var("LOGNAME").ok());
    if let Some(user) = user {
        props.insert("application.process.user", user);
    }
    if let Ok(host) = hostname::get() {
        props.insert("application.process.host", host.to_string_lossy());
    }
    // empty values are dropped on write
    if let Ok(display) = std::env::var("DISPLAY") {
        props.insert("window.x11.display", display);
    }
    props
}

/// Name of the user this process runs as, from the password database.
fn login_user() -> Option<String> {
    let mut buf = vec![0 as libc::c_char; 4096];
    // SAFETY: all pointers reference live locals; `pw_name` points into `buf`
    // and is copied out before `buf` is dropped.
    unsafe {
        let mut pwd: libc::passwd = std::mem::zeroed();
        let mut result = std::ptr::null_mut();
        let rc = libc::getpwuid_r(
            libc::getuid(),
            &mut pwd,
            buf.as_mut_ptr(),
            buf.len(),
            &mut result,
        );
        if rc != 0 || result.is_null() || pwd.pw_name.is_null() {
            return None;
        }
        let name = std::ffi::CStr::from_ptr(pwd.pw_name).to_string_lossy();
        (!name.is_empty()).then(|| name.into_owned())
    }
}

/// Sends `SetClientName` and returns the index the server assigned us.
pub async fn announce(dispatcher: &Dispatcher, config: &ClientConfig) -> Result<u32> {
    let mut req = Request::new(Command::SetClientName);
    req.args().put_proplist(&identity(config));
    let reply = dispatcher.request(req, config.request_timeout).await?;
    TagStructReader::new(reply).read_u32()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn cookie_must_be_256_bytes() {
        let mut short = tempfile::NamedTempFile::new().unwrap();
        short.write_all(&[7u8; 255]).unwrap();
        let err = read_cookie(short.path()).await.unwrap_err();
        assert!(matches!(err, Error::BadCookie { .. }));

        let mut good = tempfile::NamedTempFile::new().unwrap();
        good.write_all(&[7u8; 256]).unwrap();
        assert_eq!(read_cookie(good.path()).await.unwrap().len(), 256);
    }

    #[tokio::test]
    async fn missing_cookie_is_bad_cookie() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_cookie(&dir.path().join("cookie")).await.unwrap_err();
        assert!(matches!(err, Error::BadCookie { .. }));
    }

    #[test]
    fn identity_carries_the_mandatory_properties() {
        let config = ClientConfig::default().with_application_name("noisetorch-test");
        let props = identity(&config);
        assert_eq!(props.get("application.name"), Some("noisetorch-test"));
        assert_eq!(props.get("application.language"), Some("en_US.UTF-8"));
        let pid = std::process::id().to_string();
        assert_eq!(props.get("application.process.id"), Some(pid.as_str()));
        assert!(props.get("application.process.binary").is_some());
    }

    #[test]
    fn process_user_comes_from_the_password_database() {
        let user = login_user().unwrap();
        assert!(!user.is_empty());
        let props = identity(&ClientConfig::default());
        assert_eq!(props.get("application.process.user"), Some(user.as_str()));
    }
}
