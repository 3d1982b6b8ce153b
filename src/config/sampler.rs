use serde::Deserialize;

fn event_name() -> String {
    "wall".into()
}

/// `[wallclock]` section: the on-disk shape of the values an
/// [`Args`](crate::wallclock::Args) is built from.
#[derive(Deserialize, Default)]
pub struct SamplerConfig {
    #[serde(default)]
    wall_interval: Option<String>,
    #[serde(default)]
    default_interval: Option<String>,
    #[serde(default = "event_name")]
    event_name: String,
}

impl SamplerConfig {
    pub fn check(&self, name: &str) -> Result<(), String> {
        self.parsed_wall_interval(name)?;
        self.parsed_default_interval(name)?;
        Ok(())
    }

    fn parsed_wall_interval(&self, name: &str) -> Result<Option<std::time::Duration>, String> {
        self.wall_interval
            .as_ref()
            .map(|v| {
                v.parse::<humantime::Duration>()
                    .map(|d| std::time::Duration::from_nanos(d.as_nanos() as u64))
                    .map_err(|e| format!("{name}.wall_interval is not valid: {e}"))
            })
            .transpose()
    }

    fn parsed_default_interval(&self, name: &str) -> Result<Option<std::time::Duration>, String> {
        self.default_interval
            .as_ref()
            .map(|v| {
                v.parse::<humantime::Duration>()
                    .map(|d| std::time::Duration::from_nanos(d.as_nanos() as u64))
                    .map_err(|e| format!("{name}.default_interval is not valid: {e}"))
            })
            .transpose()
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Builds the `Args` this section describes. Errors here mean the TOML
    /// held an unparseable duration string; [`check`](Self::check) should be
    /// called first so this never fails in practice.
    pub fn to_args(&self, name: &str) -> Result<crate::wallclock::Args, String> {
        Ok(crate::wallclock::Args {
            wall_interval: self.parsed_wall_interval(name)?,
            default_interval: self.parsed_default_interval(name)?,
            event_name: self.event_name.clone(),
        })
    }
}
