//! PID-file based process lifecycle for `node stop`.
//!
//! There is no daemon/IPC layer in this node (it always runs in the
//! foreground under `node start`), so `stop` is implemented the
//! conventional Unix way: `start` writes its own process id to
//! `<data-dir>/node.pid` on launch and registers a `SIGINT`/`SIGTERM`
//! handler that removes the file before exiting; `stop` reads the pid
//! file and signals the recorded process via the `kill` utility.

use std::path::Path;
use std::process::Command;

use crate::error::NodeError;

pub fn write(pid_file: &Path) -> std::io::Result<()> {
    std::fs::write(pid_file, std::process::id().to_string())
}

pub fn remove(pid_file: &Path) {
    let _ = std::fs::remove_file(pid_file);
}

fn read_pid(pid_file: &Path) -> Result<String, NodeError> {
    let contents = std::fs::read_to_string(pid_file)
        .map_err(|_| NodeError::NoRunningNode(pid_file.to_string_lossy().to_string()))?;
    let pid = contents.trim();
    if pid.is_empty() || pid.parse::<u32>().is_err() {
        return Err(NodeError::NoRunningNode(
            pid_file.to_string_lossy().to_string(),
        ));
    }
    Ok(pid.to_string())
}

/// Sends `SIGTERM` to the process recorded in `pid_file` (via the
/// `kill` utility), then removes the file. Returns
/// [`NodeError::NoRunningNode`] if the file is missing, malformed, or
/// names a process that is no longer alive.
pub fn stop(pid_file: &Path) -> Result<(), NodeError> {
    let pid = read_pid(pid_file)?;

    let status = Command::new("kill")
        .arg("-TERM")
        .arg(&pid)
        .status()
        .map_err(NodeError::Io)?;

    std::fs::remove_file(pid_file).ok();

    if !status.success() {
        return Err(NodeError::NoRunningNode(
            pid_file.to_string_lossy().to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_pid_roundtrips_the_current_process_id() {
        let tmp = tempfile::TempDir::new().unwrap();
        let pid_file = tmp.path().join("node.pid");

        write(&pid_file).unwrap();
        let pid = read_pid(&pid_file).unwrap();
        assert_eq!(pid, std::process::id().to_string());
    }

    #[test]
    fn read_pid_rejects_a_missing_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let pid_file = tmp.path().join("node.pid");
        assert!(matches!(
            read_pid(&pid_file),
            Err(NodeError::NoRunningNode(_))
        ));
    }

    #[test]
    fn read_pid_rejects_malformed_contents() {
        let tmp = tempfile::TempDir::new().unwrap();
        let pid_file = tmp.path().join("node.pid");
        std::fs::write(&pid_file, "not-a-pid").unwrap();
        assert!(matches!(
            read_pid(&pid_file),
            Err(NodeError::NoRunningNode(_))
        ));
    }

    #[test]
    fn stop_on_a_pid_that_is_no_longer_alive_reports_no_running_node() {
        let tmp = tempfile::TempDir::new().unwrap();
        let pid_file = tmp.path().join("node.pid");
        // A pid so large it is exceedingly unlikely to name a live process.
        std::fs::write(&pid_file, "999999999").unwrap();
        assert!(matches!(stop(&pid_file), Err(NodeError::NoRunningNode(_))));
    }

    #[test]
    fn remove_is_a_no_op_when_the_file_does_not_exist() {
        let tmp = tempfile::TempDir::new().unwrap();
        let pid_file = tmp.path().join("node.pid");
        remove(&pid_file);
    }
}
