use std::path::{Path, PathBuf};

use owo_colors::OwoColorize;
use stackup::{ShutdownSignal, StartOutcome, Supervisor, SupervisorConfig};
use stackup_core::{config, ShutdownError, StopMethod};

const EXIT_STARTUP: i32 = 1;
const EXIT_SHUTDOWN: i32 = 2;
const EXIT_CONFIG: i32 = 3;

fn main() {
	let args: Vec<String> = std::env::args().skip(1).collect();

	if args.is_empty() {
		print_usage();
		std::process::exit(EXIT_CONFIG);
	}

	match args[0].as_str() {
		"help" | "--help" | "-h" => print_usage(),
		"version" | "--version" | "-V" => println!("stackup {}", env!("CARGO_PKG_VERSION")),
		"check" => {
			let code = match args.get(1) {
				Some(path) => cmd_check(Path::new(path)),
				None => {
					eprintln!("usage: stackup check <config.toml>");
					EXIT_CONFIG
				}
			};
			std::process::exit(code);
		}
		_ => std::process::exit(cmd_run(&args)),
	}
}

fn cmd_run(args: &[String]) -> i32 {
	let mut config_path: Option<PathBuf> = None;
	let mut log_dir: Option<PathBuf> = None;

	let mut iter = args.iter();
	while let Some(arg) = iter.next() {
		match arg.as_str() {
			"--log-dir" => match iter.next() {
				Some(dir) => log_dir = Some(PathBuf::from(dir)),
				None => {
					eprintln!("--log-dir requires a value");
					return EXIT_CONFIG;
				}
			},
			flag if flag.starts_with('-') => {
				eprintln!("unknown option: {}", flag);
				return EXIT_CONFIG;
			}
			path => {
				if config_path.is_some() {
					eprintln!("unexpected argument: {}", path);
					return EXIT_CONFIG;
				}
				config_path = Some(PathBuf::from(path));
			}
		}
	}

	let Some(config_path) = config_path else {
		eprintln!("usage: stackup [options] <config.toml>");
		return EXIT_CONFIG;
	};

	let mut cfg = match config::load(&config_path) {
		Ok(c) => c,
		Err(e) => {
			eprintln!("{}", e);
			return EXIT_CONFIG;
		}
	};
	if let Some(dir) = log_dir {
		cfg.log_dir = dir;
	}

	tracing_subscriber::fmt().init();
	run(cfg)
}

#[tokio::main]
async fn run(cfg: config::SessionConfig) -> i32 {
	let shutdown = ShutdownSignal::install();
	let sup = Supervisor::new(SupervisorConfig {
		probe_interval: cfg.probe_interval,
		log_dir: cfg.log_dir.clone(),
		max_log_size: cfg.max_log_size,
	});

	match sup.start(&cfg.services, &shutdown).await {
		StartOutcome::Ready(mut session) => {
			tracing::info!("all services ready");
			sup.idle(&mut session, &shutdown).await;
			tracing::info!("shutting down");
			finish(sup.shutdown(session).await)
		}
		StartOutcome::Failed(session, error) => {
			tracing::error!("startup failed: {}", error);
			if let Err(e) = sup.shutdown(session).await {
				log_stop_failures(&e);
			}
			EXIT_STARTUP
		}
		StartOutcome::Interrupted(session) => {
			tracing::info!("interrupted during startup, shutting down");
			finish(sup.shutdown(session).await)
		}
	}
}

fn finish(result: Result<(), ShutdownError>) -> i32 {
	match result {
		Ok(()) => 0,
		Err(e) => {
			log_stop_failures(&e);
			EXIT_SHUTDOWN
		}
	}
}

fn log_stop_failures(error: &ShutdownError) {
	for failure in &error.failures {
		tracing::error!("{}", failure);
	}
}

fn cmd_check(path: &Path) -> i32 {
	let cfg = match config::load(path) {
		Ok(c) => c,
		Err(e) => {
			eprintln!("{}", e);
			return EXIT_CONFIG;
		}
	};

	println!(
		"{}: {} service(s), probe interval {:?}",
		"ok".green().bold(),
		cfg.services.len(),
		cfg.probe_interval
	);
	println!("log dir: {}", cfg.log_dir.display());

	for (i, svc) in cfg.services.iter().enumerate() {
		println!();
		println!("{}. {}", i + 1, svc.name.bold());
		println!("   run:   {}", svc.command);
		println!(
			"   ready: {} (timeout {:?})",
			svc.ready.describe(),
			svc.startup_timeout
		);
		match &svc.stop {
			StopMethod::Signal { grace } => {
				println!("   stop:  SIGTERM, SIGKILL after {:?}", grace)
			}
			StopMethod::Command { command, grace } => {
				println!("   stop:  `{}` ({:?} deadline)", command, grace)
			}
		}
	}
	0
}

fn print_usage() {
	eprintln!(
		"{} {} — ordered service bring-up supervisor",
		"stackup".bold(),
		env!("CARGO_PKG_VERSION")
	);
	eprintln!();
	eprintln!("usage: {} [options] <config.toml>", "stackup".bold());
	eprintln!("   or: {} check <config.toml>", "stackup".bold());
	eprintln!();
	eprintln!("{}", "options".cyan().bold());
	eprintln!("  {} <dir>   Override the session log directory", "--log-dir".bold());
	eprintln!("  {}, {}       Show this help", "-h".bold(), "--help".bold());
	eprintln!("  {}, {}    Show version", "-V".bold(), "--version".bold());
	eprintln!();
	eprintln!("{}", "exit codes".cyan().bold());
	eprintln!("  0  clean shutdown");
	eprintln!("  1  a service failed to become ready");
	eprintln!("  2  one or more services failed to stop");
	eprintln!("  3  configuration or usage error");
}
