use ringlog::Level;
use serde::Deserialize;

fn level() -> String {
    "info".into()
}

/// Logging configuration, consumed by `main` to build a [`ringlog::LogBuilder`].
#[derive(Deserialize)]
pub struct Log {
    #[serde(default = "level")]
    level: String,
}

impl Default for Log {
    fn default() -> Self {
        Self { level: level() }
    }
}

impl Log {
    pub fn check(&self) -> Result<(), String> {
        self.level().ok_or_else(|| format!("invalid log level: {}", self.level))?;
        Ok(())
    }

    pub fn level(&self) -> Option<Level> {
        match self.level.to_lowercase().as_str() {
            "error" => Some(Level::Error),
            "warn" => Some(Level::Warn),
            "info" => Some(Level::Info),
            "debug" => Some(Level::Debug),
            "trace" => Some(Level::Trace),
            _ => None,
        }
    }
}
