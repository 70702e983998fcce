//! Best-effort "open this URL in the default browser".

use std::io;
use std::process::Command;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Program and arguments that open `url` on `os` (as in [`std::env::consts::OS`]).
pub fn launcher_command(os: &str, url: &str) -> Option<(&'static str, Vec<String>)> {
    match os {
        "linux" | "freebsd" | "openbsd" | "netbsd" => Some(("xdg-open", vec![url.to_string()])),
        "macos" => Some(("open", vec![url.to_string()])),
        "windows" => Some((
            "rundll32",
            vec!["url.dll,FileProtocolHandler".to_string(), url.to_string()],
        )),
        _ => None,
    }
}

/// Start the platform's opener for `url` without waiting for it.
pub fn open_browser(url: &str) -> io::Result<()> {
    let (program, args) = launcher_command(std::env::consts::OS, url).ok_or_else(|| {
        io::Error::new(io::ErrorKind::Unsupported, "unsupported platform")
    })?;
    Command::new(program).args(args).spawn()?;
    Ok(())
}

/// Fire-and-forget browser launch. Failures are only logged.
pub fn launch_detached(url: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        match open_browser(&url) {
            Ok(()) => info!(%url, "Opened browser"),
            Err(e) => warn!(%url, error = %e, "Error opening browser"),
        }
    })
}
