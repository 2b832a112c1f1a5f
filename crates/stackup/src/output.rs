use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Combined stdout/stderr of one service, appended to `<log_dir>/<name>.log`
/// with size-based rotation to `<name>.old.log`.
#[derive(Clone)]
pub struct LogSink {
	inner: Arc<Mutex<LogWriter>>,
}

struct LogWriter {
	file: Option<File>,
	path: PathBuf,
	old_path: PathBuf,
	bytes_written: u64,
	max_size: u64,
}

impl LogSink {
	pub fn new(log_dir: &Path, service: &str, max_size: u64) -> Self {
		let _ = fs::create_dir_all(log_dir);

		let path = log_dir.join(format!("{}.log", service));
		let old_path = log_dir.join(format!("{}.old.log", service));

		let file = OpenOptions::new().create(true).append(true).open(&path).ok();
		let bytes_written = file
			.as_ref()
			.and_then(|f| f.metadata().ok())
			.map(|m| m.len())
			.unwrap_or(0);

		Self {
			inner: Arc::new(Mutex::new(LogWriter {
				file,
				path,
				old_path,
				bytes_written,
				max_size,
			})),
		}
	}

	pub async fn write(&self, data: &[u8]) {
		let mut writer = self.inner.lock().await;
		writer.write(data);
	}

	pub async fn path(&self) -> PathBuf {
		self.inner.lock().await.path.clone()
	}
}

impl LogWriter {
	fn write(&mut self, data: &[u8]) {
		if let Some(ref mut file) = self.file {
			let _ = file.write_all(data);
			self.bytes_written += data.len() as u64;

			if self.max_size > 0 && self.bytes_written >= self.max_size {
				self.rotate();
			}
		}
	}

	fn rotate(&mut self) {
		if let Some(file) = self.file.take() {
			drop(file);
		}
		let _ = fs::rename(&self.path, &self.old_path);
		self.file = OpenOptions::new()
			.create(true)
			.append(true)
			.open(&self.path)
			.ok();
		self.bytes_written = 0;
	}
}
