use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

/// Hand `path` to the platform's default viewer. Purely cosmetic: returns
/// whether a viewer could be started and never fails the caller.
pub fn open_in_viewer(path: &Path) -> bool {
    match spawn_reaped(viewer_command(path)) {
        Ok(_) => true,
        Err(e) => {
            log::debug!("could not open {} in a viewer: {e}", path.display());
            false
        }
    }
}

/// Start `cmd` detached from our stdio and wait for it on a background
/// thread so the finished process does not linger as a zombie.
fn spawn_reaped(mut cmd: Command) -> std::io::Result<JoinHandle<Option<ExitStatus>>> {
    cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());
    let mut child = cmd.spawn()?;
    Ok(thread::spawn(move || child.wait().ok()))
}

#[cfg(target_os = "windows")]
fn viewer_command(path: &Path) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg("start").arg("").arg(path);
    cmd
}

#[cfg(target_os = "macos")]
fn viewer_command(path: &Path) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg(path);
    cmd
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn viewer_command(path: &Path) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(path);
    cmd
}
