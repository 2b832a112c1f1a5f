use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use stackup_core::config;
use stackup_core::{ConfigError, ReadinessCheck, ServiceState, StopMethod};

static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

fn write_config(name: &str, content: &str) -> PathBuf {
	let n = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
	let dir = std::env::temp_dir().join(format!("stackup-core-test-{}-{}", n, name));
	let _ = std::fs::create_dir_all(&dir);
	let path = dir.join("stackup.toml");
	std::fs::write(&path, content).unwrap();
	path
}

// --- Types ---

#[test]
fn service_state_is_ready() {
	assert!(ServiceState::Ready.is_ready());
	assert!(!ServiceState::Pending.is_ready());
	assert!(!ServiceState::Starting.is_ready());
	assert!(!ServiceState::Failed { exit_code: Some(1) }.is_ready());
	assert!(!ServiceState::Stopped.is_ready());
}

#[test]
fn service_state_has_started() {
	assert!(!ServiceState::Pending.has_started());
	assert!(ServiceState::Starting.has_started());
	assert!(ServiceState::Ready.has_started());
	assert!(ServiceState::Failed { exit_code: None }.has_started());
	assert!(!ServiceState::Stopped.has_started());
}

#[test]
fn readiness_check_describe() {
	let check = ReadinessCheck::Tcp("127.0.0.1:2601".parse().unwrap());
	assert_eq!(check.describe(), "tcp 127.0.0.1:2601");

	let check = ReadinessCheck::File(PathBuf::from("/run/up"));
	assert_eq!(check.describe(), "file /run/up");
}

// --- Loading ---

#[test]
fn load_resolves_services_in_order() {
	let path = write_config(
		"order",
		r#"
[session]
probe_interval_ms = 100
log_dir = "/tmp/stackup-test-logs"

[defaults]
startup_timeout_secs = 7
stop_grace_secs = 3

[[service]]
name = "frr"
command = "/usr/lib/frr/frrinit.sh start"
ready = { file = "/var/run/frr/watchfrr.started" }
stop_command = "/usr/lib/frr/frrinit.sh stop"

[[service]]
name = "snmpd"
command = "snmpd -f"
ready = { tcp = "127.0.0.1:1161" }
startup_timeout_secs = 15
"#,
	);

	let cfg = config::load(&path).unwrap();
	assert_eq!(cfg.probe_interval, Duration::from_millis(100));
	assert_eq!(cfg.log_dir, PathBuf::from("/tmp/stackup-test-logs"));
	assert_eq!(cfg.services.len(), 2);

	let frr = &cfg.services[0];
	assert_eq!(frr.name, "frr");
	assert_eq!(frr.startup_timeout, Duration::from_secs(7));
	assert_eq!(
		frr.stop,
		StopMethod::Command {
			command: "/usr/lib/frr/frrinit.sh stop".into(),
			grace: Duration::from_secs(3),
		}
	);

	let snmpd = &cfg.services[1];
	assert_eq!(snmpd.name, "snmpd");
	assert_eq!(snmpd.startup_timeout, Duration::from_secs(15));
	assert_eq!(
		snmpd.stop,
		StopMethod::Signal {
			grace: Duration::from_secs(3)
		}
	);
	assert_eq!(
		snmpd.ready,
		ReadinessCheck::Tcp("127.0.0.1:1161".parse().unwrap())
	);
}

#[test]
fn load_applies_builtin_defaults() {
	let path = write_config(
		"defaults",
		r#"
[[service]]
name = "only"
command = "sleep 60"
ready = { file = "/tmp/up" }
"#,
	);

	let cfg = config::load(&path).unwrap();
	assert_eq!(cfg.probe_interval, Duration::from_millis(250));
	assert_eq!(cfg.max_log_size, 10 * 1024 * 1024);

	let svc = &cfg.services[0];
	assert_eq!(svc.startup_timeout, Duration::from_secs(30));
	assert_eq!(
		svc.stop,
		StopMethod::Signal {
			grace: Duration::from_secs(5)
		}
	);
}

#[test]
fn load_merges_env_service_wins() {
	let path = write_config(
		"env",
		r#"
[defaults]
env = { SHARED = "base", KEPT = "yes" }

[[service]]
name = "svc"
command = "env"
ready = { command = "true" }
env = { SHARED = "override" }
"#,
	);

	let cfg = config::load(&path).unwrap();
	let env = &cfg.services[0].env;
	assert_eq!(env.get("SHARED").map(String::as_str), Some("override"));
	assert_eq!(env.get("KEPT").map(String::as_str), Some("yes"));
}

#[test]
fn load_parses_log_line_check() {
	let path = write_config(
		"logline",
		r#"
[[service]]
name = "router"
command = "router -f"
ready = { log_line = { path = "/var/log/router.log", contains = "listening" } }
"#,
	);

	let cfg = config::load(&path).unwrap();
	assert_eq!(
		cfg.services[0].ready,
		ReadinessCheck::LogLine {
			path: PathBuf::from("/var/log/router.log"),
			contains: "listening".into(),
		}
	);
}

// --- Validation ---

#[test]
fn load_rejects_duplicate_names() {
	let path = write_config(
		"dup",
		r#"
[[service]]
name = "twin"
command = "sleep 1"
ready = { command = "true" }

[[service]]
name = "twin"
command = "sleep 2"
ready = { command = "true" }
"#,
	);

	let err = config::load(&path).unwrap_err();
	assert!(matches!(err, ConfigError::DuplicateName(name) if name == "twin"));
}

#[test]
fn load_rejects_empty_command() {
	let path = write_config(
		"empty-cmd",
		r#"
[[service]]
name = "mute"
command = "  "
ready = { command = "true" }
"#,
	);

	let err = config::load(&path).unwrap_err();
	assert!(matches!(err, ConfigError::EmptyCommand(name) if name == "mute"));
}

#[test]
fn load_rejects_empty_service_list() {
	let path = write_config("no-services", "[session]\nprobe_interval_ms = 100\n");
	let err = config::load(&path).unwrap_err();
	assert!(matches!(err, ConfigError::NoServices));
}

#[test]
fn load_reports_parse_errors() {
	let path = write_config("bad-toml", "[[service]\nname = oops");
	let err = config::load(&path).unwrap_err();
	assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn load_reports_missing_file() {
	let path = std::env::temp_dir().join("stackup-core-test-nonexistent.toml");
	let err = config::load(&path).unwrap_err();
	assert!(matches!(err, ConfigError::Read { .. }));
}
