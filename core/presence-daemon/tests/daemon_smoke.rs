use presence_core::ledger::{Ledger, SqliteLedger};
use presence_core::rcon::{read_packet, write_packet};
use presence_core::roster::Roster;
use presence_core::snapshot::{load_snapshot, write_snapshot};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread::{self, sleep};
use std::time::{Duration, Instant};
use tempfile::TempDir;

const PASSWORD: &str = "hunter2";

struct DaemonGuard {
    child: Child,
}

impl Drop for DaemonGuard {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn daemon(home: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_presence-daemon"));
    command
        .env("HOME", home)
        .env_remove("PRESENCE_RCON_PASSWORD")
        .env_remove("PRESENCE_DEBUG_LOG");
    command
}

fn state_dir(home: &Path) -> PathBuf {
    home.join(".presence")
}

fn write_config(home: &Path, body: &str) -> PathBuf {
    let path = state_dir(home).join("config.toml");
    std::fs::create_dir_all(state_dir(home)).expect("state dir");
    std::fs::write(&path, body).expect("write config");
    path
}

fn run_status(home: &Path, json: bool) -> Output {
    let mut command = daemon(home);
    command.arg("status");
    if json {
        command.arg("--json");
    }
    command.output().expect("Failed to run presence-daemon status")
}

/// Fake RCON server answering every `list` with `reply`.
fn serve_list(reply: &'static str) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        let Ok(login) = read_packet(&mut stream) else {
            return;
        };
        let login_id = if login.body == PASSWORD {
            login.request_id
        } else {
            -1
        };
        if write_packet(&mut stream, login_id, 2, "").is_err() {
            return;
        }
        while let Ok(command) = read_packet(&mut stream) {
            if write_packet(&mut stream, command.request_id, 0, reply).is_err() {
                return;
            }
        }
    });
    port
}

fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("addr").port()
}

fn wait_for(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        sleep(Duration::from_millis(50));
    }
    false
}

#[test]
fn status_json_reports_snapshot_and_ledger() {
    let home = TempDir::new().expect("temp home");
    write_snapshot(
        &state_dir(home.path()).join("players.json"),
        &Roster::from_names(["alice", "bob"]),
    )
    .expect("snapshot");
    let mut ledger =
        SqliteLedger::open(state_dir(home.path()).join("last_seen.db")).expect("ledger");
    ledger.put("carol", "01/02/2026 08:00:00").expect("put");
    ledger.put("dave", "03/02/2026 08:00:00").expect("put");

    let output = run_status(home.path(), true);

    assert!(output.status.success(), "status failed: {output:?}");
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("status output is JSON");
    assert_eq!(
        report,
        serde_json::json!({
            "online": ["alice", "bob"],
            "recently_offline": [
                {"username": "dave", "last_seen": "03/02/2026 08:00:00"},
                {"username": "carol", "last_seen": "01/02/2026 08:00:00"}
            ]
        })
    );
}

#[test]
fn status_without_state_reports_nobody() {
    let home = TempDir::new().expect("temp home");

    let output = run_status(home.path(), false);

    assert!(output.status.success(), "status failed: {output:?}");
    let text = String::from_utf8(output.stdout).expect("utf8");
    assert!(text.contains("Online (0):"), "unexpected output: {text}");
    assert!(text.contains("Recently offline (0):"), "unexpected output: {text}");
    assert!(!state_dir(home.path()).join("last_seen.db").exists());
}

#[test]
fn malformed_config_exits_with_failure() {
    let home = TempDir::new().expect("temp home");
    write_config(home.path(), "[rcon\nport = ");

    let output = run_status(home.path(), false);

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn run_fails_when_server_is_unreachable() {
    let home = TempDir::new().expect("temp home");
    let config = format!(
        "[rcon]\nhost = \"127.0.0.1\"\nport = {}\ntimeout_ms = 500\n\n[display]\nkind = \"file\"\n",
        closed_port()
    );
    write_config(home.path(), &config);

    let output = daemon(home.path())
        .arg("run")
        .stdout(Stdio::null())
        .output()
        .expect("Failed to run presence-daemon");

    assert_eq!(output.status.code(), Some(1));
    let state = state_dir(home.path());
    assert!(!state.join("players.json").exists());
    assert!(!state.join("last_seen.db").exists());
    assert!(!state.join("display.txt").exists());
}

#[test]
fn run_publishes_roster_and_stops_on_sigterm() {
    let home = TempDir::new().expect("temp home");
    let port = serve_list("There are 2 of a max of 20 players online: alice, bob");
    let config = format!(
        "[rcon]\nhost = \"127.0.0.1\"\nport = {port}\npassword = \"{PASSWORD}\"\ntimeout_ms = 2000\n\n\
         [poll]\ninterval_secs = 1\n\n[display]\nkind = \"file\"\n"
    );
    let config_path = write_config(home.path(), &config);

    let child = daemon(home.path())
        .arg("--config")
        .arg(&config_path)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to spawn presence-daemon");
    let mut guard = DaemonGuard { child };

    let snapshot_path = state_dir(home.path()).join("players.json");
    let display_path = state_dir(home.path()).join("display.txt");
    let published = wait_for(Duration::from_secs(10), || {
        load_snapshot(&snapshot_path)
            .map(|roster| roster.len() == 2)
            .unwrap_or(false)
    });
    assert!(published, "snapshot never published");
    assert!(wait_for(Duration::from_secs(5), || {
        std::fs::read_to_string(&display_path)
            .map(|text| text.starts_with("Players online: 2"))
            .unwrap_or(false)
    }));

    // SAFETY: plain kill(2) on our own child process.
    let rc = unsafe { libc::kill(guard.child.id() as libc::pid_t, libc::SIGTERM) };
    assert_eq!(rc, 0);

    let mut status = None;
    let stopped = wait_for(Duration::from_secs(10), || {
        status = guard.child.try_wait().expect("try_wait");
        status.is_some()
    });
    assert!(stopped, "daemon ignored SIGTERM");
    assert!(status.map(|status| status.success()).unwrap_or(false));

    assert_eq!(
        std::fs::read_to_string(&display_path).expect("display file"),
        ""
    );
    assert_eq!(
        load_snapshot(&snapshot_path).expect("snapshot").names(),
        &["alice".to_string(), "bob".to_string()]
    );
    assert!(state_dir(home.path()).join("logs").is_dir());
}
