//! PID file tracking the running dashboard server.
//!
//! Lives in the dashboard data directory as `server.pid`:
//! ```text
//! PID=12345
//! PORT=3001
//! HOST=127.0.0.1
//! ```

use std::fs;
use std::io::{self, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

const PID_FILE_NAME: &str = "server.pid";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerPidInfo {
    pub pid: u32,
    pub port: u16,
    pub host: String,
}

/// State of the process a PID file points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// Process alive and its port accepts connections.
    Running,
    /// Process gone.
    NotRunning,
    /// Process alive but not serving the recorded port (PID reused).
    Stale,
}

impl ProcessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::NotRunning => "not_running",
            Self::Stale => "stale",
        }
    }
}

#[derive(Debug)]
pub struct ServerPidFile {
    path: PathBuf,
}

impl ServerPidFile {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(PID_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the PID file, creating the parent directory if needed.
    pub fn write(&self, info: &ServerPidInfo) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = format!("PID={}\nPORT={}\nHOST={}\n", info.pid, info.port, info.host);

        let mut file = fs::File::create(&self.path)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;

        Ok(())
    }

    /// `Ok(None)` when there is no PID file.
    pub fn read(&self) -> io::Result<Option<ServerPidInfo>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(Self::parse_contents(&contents)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Remove the PID file; a missing file is not an error.
    pub fn delete(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the PID file and probe the process it names.
    pub fn check_running(&self) -> io::Result<Option<(ProcessStatus, ServerPidInfo)>> {
        let Some(info) = self.read()? else {
            return Ok(None);
        };

        let status = if !is_process_alive(info.pid) {
            ProcessStatus::NotRunning
        } else if is_port_open(&info.host, info.port) {
            ProcessStatus::Running
        } else {
            ProcessStatus::Stale
        };

        Ok(Some((status, info)))
    }

    fn parse_contents(contents: &str) -> io::Result<ServerPidInfo> {
        let mut pid: Option<u32> = None;
        let mut port: Option<u16> = None;
        let mut host: Option<String> = None;

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                match key {
                    "PID" => {
                        pid = Some(value.parse().map_err(|_| {
                            io::Error::new(io::ErrorKind::InvalidData, "Invalid PID value")
                        })?);
                    }
                    "PORT" => {
                        port = Some(value.parse().map_err(|_| {
                            io::Error::new(io::ErrorKind::InvalidData, "Invalid PORT value")
                        })?);
                    }
                    "HOST" => host = Some(value.to_string()),
                    _ => {}
                }
            }
        }

        let missing = |field: &str| io::Error::new(io::ErrorKind::InvalidData, format!("Missing {} field", field));
        Ok(ServerPidInfo {
            pid: pid.ok_or_else(|| missing("PID"))?,
            port: port.ok_or_else(|| missing("PORT"))?,
            host: host.ok_or_else(|| missing("HOST"))?,
        })
    }
}

/// Whether a process with `pid` exists.
#[cfg(unix)]
pub fn is_process_alive(pid: u32) -> bool {
    std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_process_alive(pid: u32) -> bool {
    std::process::Command::new("tasklist")
        .args(["/FI", &format!("PID eq {}", pid), "/NH"])
        .output()
        .map(|out| String::from_utf8_lossy(&out.stdout).contains(&pid.to_string()))
        .unwrap_or(false)
}

fn is_port_open(host: &str, port: u16) -> bool {
    let Ok(ip) = host.parse::<std::net::IpAddr>() else {
        return false;
    };
    let ip = if ip.is_unspecified() {
        std::net::IpAddr::from([127, 0, 0, 1])
    } else {
        ip
    };
    TcpStream::connect_timeout(&SocketAddr::from((ip, port)), Duration::from_millis(500)).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ServerPidFile) {
        let temp_dir = TempDir::new().unwrap();
        let pid_file = ServerPidFile::new(temp_dir.path());
        (temp_dir, pid_file)
    }

    fn info(pid: u32, port: u16) -> ServerPidInfo {
        ServerPidInfo {
            pid,
            port,
            host: "127.0.0.1".to_string(),
        }
    }

    #[test]
    fn test_path_name() {
        let (_temp_dir, pid_file) = setup();
        assert!(pid_file.path().ends_with("server.pid"));
    }

    #[test]
    fn test_write_and_read() {
        let (_temp_dir, pid_file) = setup();
        pid_file.write(&info(12345, 3001)).unwrap();
        assert_eq!(pid_file.read().unwrap(), Some(info(12345, 3001)));

        let raw = fs::read_to_string(pid_file.path()).unwrap();
        assert_eq!(raw, "PID=12345\nPORT=3001\nHOST=127.0.0.1\n");
    }

    #[test]
    fn test_read_nonexistent_returns_none() {
        let (_temp_dir, pid_file) = setup();
        assert_eq!(pid_file.read().unwrap(), None);
        assert!(pid_file.check_running().unwrap().is_none());
    }

    #[test]
    fn test_delete() {
        let (_temp_dir, pid_file) = setup();
        pid_file.delete().unwrap();

        pid_file.write(&info(1, 3001)).unwrap();
        assert!(pid_file.exists());
        pid_file.delete().unwrap();
        assert!(!pid_file.exists());
    }

    #[test]
    fn test_write_creates_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let pid_file = ServerPidFile::new(&temp_dir.path().join("nested").join("dir"));
        pid_file.write(&info(1, 3001)).unwrap();
        assert!(pid_file.exists());
    }

    #[test]
    fn test_parse_ignores_unknown_keys_and_blank_lines() {
        let parsed = ServerPidFile::parse_contents("PID=100\n\nFUTURE=x\nPORT=8080\nHOST=::1\n").unwrap();
        assert_eq!(parsed.pid, 100);
        assert_eq!(parsed.port, 8080);
        assert_eq!(parsed.host, "::1");
    }

    #[test]
    fn test_parse_errors() {
        assert!(ServerPidFile::parse_contents("PORT=8080\nHOST=h\n").is_err());
        assert!(ServerPidFile::parse_contents("PID=1\nHOST=h\n").is_err());
        assert!(ServerPidFile::parse_contents("PID=1\nPORT=8080\n").is_err());
        assert!(ServerPidFile::parse_contents("PID=x\nPORT=8080\nHOST=h\n").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_own_process_without_listener_is_stale() {
        let (_temp_dir, pid_file) = setup();
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        pid_file.write(&info(std::process::id(), port)).unwrap();
        let (status, _) = pid_file.check_running().unwrap().unwrap();
        assert_eq!(status, ProcessStatus::Stale);
    }

    #[cfg(unix)]
    #[test]
    fn test_own_process_with_listener_is_running() {
        let (_temp_dir, pid_file) = setup();
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        pid_file.write(&info(std::process::id(), port)).unwrap();
        let (status, _) = pid_file.check_running().unwrap().unwrap();
        assert_eq!(status, ProcessStatus::Running);
    }
}
