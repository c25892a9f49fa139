use std::{path::PathBuf, time::Duration};

use clap::Parser;
use hemavision_core::Mode;

/// Server settings, read from flags or the environment (a `.env` file is loaded first).
#[derive(Debug, Clone, Parser)]
#[command(name = "hemavision-server", version, about = "Blood cell classification service")]
pub struct Config {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,
    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,
    #[arg(long, env = "UPLOAD_FOLDER", default_value = "uploads")]
    pub upload_folder: PathBuf,
    /// Largest accepted request body, in bytes.
    #[arg(long, env = "MAX_FILE_SIZE", default_value_t = 16 * 1024 * 1024)]
    pub max_file_size: usize,
    #[arg(long, env = "MODEL_PATH", default_value = "models/hemavision.bin")]
    pub model_path: PathBuf,
    /// `model` runs the network, `demo` simulates predictions from the filename.
    #[arg(long, env = "HEMAVISION_MODE", default_value = "model")]
    pub mode: Mode,
    /// Uploads older than this many seconds are purged on the next upload. Unset keeps everything.
    #[arg(long, env = "UPLOAD_RETENTION_SECS")]
    pub upload_retention_secs: Option<u64>,
    /// TrueType font for chart text.
    #[arg(long, env = "CHART_FONT")]
    pub chart_font: Option<PathBuf>,
}

impl Config {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn retention(&self) -> Option<Duration> {
        self.upload_retention_secs.map(Duration::from_secs)
    }
}
