use serde::Deserialize;

/// Top-level, engine-independent settings.
#[derive(Deserialize, Default)]
pub struct General {
    /// Restricts sampling to this set of thread ids when non-empty. An empty
    /// list means every target thread is eligible, per the default
    /// [`NoFilter`](crate::wallclock::traits::NoFilter) behavior.
    #[serde(default)]
    allowed_tids: Vec<i32>,
}

impl General {
    pub fn check(&self) -> Result<(), String> {
        Ok(())
    }

    pub fn allowed_tids(&self) -> &[i32] {
        &self.allowed_tids
    }
}
