use std::path::Path;

use serde::Deserialize;

mod general;
mod log;
mod sampler;

pub use general::General;
pub use log::Log;
pub use sampler::SamplerConfig;

/// The on-disk configuration: general settings, logging, and the wallclock
/// sampler. Validating a `Config` never mutates process state -- callers
/// decide what to do with a validation error (the demo binary prints it and
/// exits; an embedder might retry with a different file).
#[derive(Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    general: General,
    #[serde(default)]
    log: Log,
    #[serde(default)]
    wallclock: SamplerConfig,
}

impl Config {
    pub fn load(path: &dyn AsRef<Path>) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("unable to open config file: {e}"))?;

        let config: Config =
            toml::from_str(&content).map_err(|e| format!("failed to parse config file: {e}"))?;

        config.check()?;

        Ok(config)
    }

    pub fn check(&self) -> Result<(), String> {
        self.general.check()?;
        self.log.check()?;
        self.wallclock.check("wallclock")?;
        Ok(())
    }

    pub fn general(&self) -> &General {
        &self.general
    }

    pub fn log(&self) -> &Log {
        &self.log
    }

    pub fn wallclock(&self) -> &SamplerConfig {
        &self.wallclock
    }

    /// Builds the `Args` the wallclock engine should start with.
    pub fn wallclock_args(&self) -> Result<crate::wallclock::Args, String> {
        self.wallclock.to_args("wallclock")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_from_empty_document() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.check().is_ok());
        assert_eq!(config.wallclock().event_name(), "wall");
    }

    #[test]
    fn rejects_unparseable_interval() {
        let config: Config = toml::from_str(
            r#"
            [wallclock]
            wall_interval = "not a duration"
            "#,
        )
        .unwrap();
        assert!(config.check().is_err());
    }

    #[test]
    fn accepts_explicit_intervals_and_tids() {
        let config: Config = toml::from_str(
            r#"
            [general]
            allowed_tids = [100, 102]

            [log]
            level = "debug"

            [wallclock]
            wall_interval = "5ms"
            event_name = "wall"
            "#,
        )
        .unwrap();
        assert!(config.check().is_ok());
        assert_eq!(config.general().allowed_tids(), &[100, 102]);
        assert_eq!(config.log().level(), Some(ringlog::Level::Debug));
        let args = config.wallclock_args().unwrap();
        assert_eq!(args.wall_interval, Some(std::time::Duration::from_millis(5)));
    }
}
