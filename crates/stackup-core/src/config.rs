use crate::error::ConfigError;
use crate::types::{ReadinessCheck, ServiceSpec, StopMethod};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Resolved session: ordered specs plus session-wide settings.
/// Loaded once at process start, never mutated.
#[derive(Debug, Clone)]
pub struct SessionConfig {
	pub probe_interval: Duration,
	pub log_dir: PathBuf,
	pub max_log_size: u64,
	pub services: Vec<ServiceSpec>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct ConfigFile {
	#[serde(default)]
	session: SessionSection,
	#[serde(default)]
	defaults: DefaultsSection,
	#[serde(default)]
	service: Vec<ServiceSection>,
}

#[derive(Debug, Clone, Deserialize)]
struct SessionSection {
	#[serde(default = "default_probe_interval_ms")]
	probe_interval_ms: u64,
	log_dir: Option<String>,
	#[serde(default = "default_max_log_size")]
	max_log_size: u64,
}

impl Default for SessionSection {
	fn default() -> Self {
		Self {
			probe_interval_ms: default_probe_interval_ms(),
			log_dir: None,
			max_log_size: default_max_log_size(),
		}
	}
}

fn default_probe_interval_ms() -> u64 {
	250
}
fn default_max_log_size() -> u64 {
	10 * 1024 * 1024
}

#[derive(Debug, Clone, Deserialize)]
struct DefaultsSection {
	#[serde(default = "default_startup_timeout")]
	startup_timeout_secs: u64,
	#[serde(default = "default_stop_grace")]
	stop_grace_secs: u64,
	#[serde(default)]
	env: HashMap<String, String>,
}

impl Default for DefaultsSection {
	fn default() -> Self {
		Self {
			startup_timeout_secs: default_startup_timeout(),
			stop_grace_secs: default_stop_grace(),
			env: HashMap::new(),
		}
	}
}

fn default_startup_timeout() -> u64 {
	30
}
fn default_stop_grace() -> u64 {
	5
}

#[derive(Debug, Clone, Deserialize)]
struct ServiceSection {
	name: String,
	command: String,
	ready: ReadinessCheck,
	startup_timeout_secs: Option<u64>,
	stop_command: Option<String>,
	stop_grace_secs: Option<u64>,
	#[serde(default)]
	env: HashMap<String, String>,
	dir: Option<String>,
}

pub fn load(path: &Path) -> Result<SessionConfig, ConfigError> {
	let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
		path: path.to_path_buf(),
		source,
	})?;
	let file: ConfigFile = toml::from_str(&content).map_err(|source| ConfigError::Parse {
		path: path.to_path_buf(),
		source,
	})?;
	resolve(file)
}

fn resolve(file: ConfigFile) -> Result<SessionConfig, ConfigError> {
	if file.service.is_empty() {
		return Err(ConfigError::NoServices);
	}

	let defaults = &file.defaults;
	let mut seen: HashSet<String> = HashSet::new();
	let mut services = Vec::with_capacity(file.service.len());

	for svc in file.service {
		if svc.name.trim().is_empty() {
			return Err(ConfigError::EmptyName);
		}
		if !seen.insert(svc.name.clone()) {
			return Err(ConfigError::DuplicateName(svc.name));
		}
		if svc.command.trim().is_empty() {
			return Err(ConfigError::EmptyCommand(svc.name));
		}

		let grace = Duration::from_secs(svc.stop_grace_secs.unwrap_or(defaults.stop_grace_secs));
		let stop = match svc.stop_command {
			Some(command) => StopMethod::Command { command, grace },
			None => StopMethod::Signal { grace },
		};

		// Service env wins over defaults.
		let mut env = defaults.env.clone();
		env.extend(svc.env);

		services.push(ServiceSpec {
			name: svc.name,
			command: svc.command,
			ready: svc.ready,
			startup_timeout: Duration::from_secs(
				svc.startup_timeout_secs.unwrap_or(defaults.startup_timeout_secs),
			),
			stop,
			env,
			dir: svc.dir.as_deref().map(expand_tilde),
		});
	}

	Ok(SessionConfig {
		probe_interval: Duration::from_millis(file.session.probe_interval_ms),
		log_dir: file
			.session
			.log_dir
			.as_deref()
			.map(expand_tilde)
			.unwrap_or_else(default_log_dir),
		max_log_size: file.session.max_log_size,
		services,
	})
}

pub fn default_log_dir() -> PathBuf {
	if let Ok(dir) = std::env::var("XDG_STATE_HOME") {
		PathBuf::from(dir).join("stackup").join("logs")
	} else if let Some(home) = home_dir() {
		home.join(".local").join("state").join("stackup").join("logs")
	} else {
		PathBuf::from("/tmp/stackup/logs")
	}
}

fn home_dir() -> Option<PathBuf> {
	std::env::var("HOME").ok().map(PathBuf::from)
}

fn expand_tilde(path: &str) -> PathBuf {
	if let Some(rest) = path.strip_prefix("~/") {
		if let Some(home) = home_dir() {
			return home.join(rest);
		}
	}
	PathBuf::from(path)
}
