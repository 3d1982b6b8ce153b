use std::time::Duration;

use super::error::Error;

/// The default sampling interval when neither a wall interval nor a
/// default interval is supplied to `start`.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(10);

/// `{ wall_interval, default_interval, event_name }`. Mirrors the
/// shape of a CLI's parsed arguments so the demo binary and a config file
/// can both produce one.
#[derive(Clone, Debug, Default)]
pub struct Args {
    pub wall_interval: Option<Duration>,
    pub default_interval: Option<Duration>,
    pub event_name: String,
}

impl Args {
    /// `sample_idle = (wall_interval is set) or (event_name == "wall")`.
    pub fn sample_idle(&self) -> bool {
        self.wall_interval.is_some() || self.event_name == "wall"
    }

    /// Effective interval: `wall_interval` if set; else `default_interval`
    /// if set; else `5x DEFAULT` when idle-sampling, else `DEFAULT`.
    pub fn effective_interval(&self) -> Duration {
        if let Some(wall) = self.wall_interval {
            return wall;
        }
        if let Some(default) = self.default_interval {
            return default;
        }
        if self.sample_idle() {
            DEFAULT_INTERVAL * 5
        } else {
            DEFAULT_INTERVAL
        }
    }

    /// Rejects intervals too short to be meaningful or negative durations
    /// that would indicate a malformed config, without mutating any engine
    /// state -- per the `ConfigurationError` contract.
    pub fn validate(&self) -> Result<(), Error> {
        let interval = self.effective_interval();

        if interval < super::timer::MIN_INTERVAL {
            return Err(Error::InvalidInterval(format!(
                "{:?} is shorter than the minimum interval {:?}",
                interval,
                super::timer::MIN_INTERVAL
            )));
        }

        if self.event_name.is_empty() {
            return Err(Error::InvalidEvent("event name must not be empty".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wall_interval_wins_when_set() {
        let args = Args {
            wall_interval: Some(Duration::from_millis(5)),
            default_interval: Some(Duration::from_millis(20)),
            event_name: "wall".into(),
        };
        assert_eq!(args.effective_interval(), Duration::from_millis(5));
        assert!(args.sample_idle());
    }

    #[test]
    fn default_interval_used_when_no_wall_interval() {
        let args = Args {
            wall_interval: None,
            default_interval: Some(Duration::from_millis(20)),
            event_name: "cpu".into(),
        };
        assert_eq!(args.effective_interval(), Duration::from_millis(20));
        assert!(!args.sample_idle());
    }

    #[test]
    fn falls_back_to_5x_default_when_idle_and_nothing_set() {
        let args = Args {
            wall_interval: None,
            default_interval: None,
            event_name: "wall".into(),
        };
        assert!(args.sample_idle());
        assert_eq!(args.effective_interval(), DEFAULT_INTERVAL * 5);
    }

    #[test]
    fn falls_back_to_default_when_not_idle_and_nothing_set() {
        let args = Args {
            wall_interval: None,
            default_interval: None,
            event_name: "cpu".into(),
        };
        assert!(!args.sample_idle());
        assert_eq!(args.effective_interval(), DEFAULT_INTERVAL);
    }

    #[test]
    fn rejects_interval_below_minimum() {
        let args = Args {
            wall_interval: Some(Duration::from_micros(1)),
            default_interval: None,
            event_name: "wall".into(),
        };
        assert!(args.validate().is_err());
    }
}
