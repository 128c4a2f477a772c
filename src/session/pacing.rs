use std::time::Duration;

use serde::Deserialize;

/// Longest single pause a range may ask for
pub(crate) const MAX_DELAY_SECS: f64 = 300.0;


/// A uniformly random pause, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub(crate) struct DelayRange {
    pub(crate) min_secs: f64,
    pub(crate) max_secs: f64
}


impl DelayRange {
    #[cfg(test)]
    pub(crate) const ZERO: Self = Self::new(0.0, 0.0);

    pub(crate) const fn new(min_secs: f64, max_secs: f64) -> Self {
        Self { min_secs, max_secs }
    }

    pub(crate) fn is_valid(&self) -> bool {
        0.0 <= self.min_secs && self.min_secs <= self.max_secs && self.max_secs <= MAX_DELAY_SECS
    }

    pub(crate) fn sample(&self) -> Duration {
        if self.max_secs <= 0.0 {
            return Duration::ZERO;
        }
        let secs = self.min_secs + fastrand::f64() * (self.max_secs - self.min_secs);
        Duration::try_from_secs_f64(secs.clamp(0.0, MAX_DELAY_SECS)).unwrap_or(Duration::ZERO)
    }

    /// Blocks the current thread for a random duration within the range
    pub(crate) fn pause(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            tracing::trace!(?delay, "Pausing");
            std::thread::sleep(delay);
        }
    }
}


/// Randomised delays that keep request timing from looking uniform.
///
/// These only shape traffic, nothing depends on them for correctness.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct Pacing {
    /// After a navigation, before anything else happens
    pub(crate) initial: DelayRange,
    /// After each progressive scroll step
    pub(crate) scroll: DelayRange,
    /// After each card is extracted
    pub(crate) card: DelayRange,
    /// Between two results pages
    pub(crate) page: DelayRange
}


impl Default for Pacing {
    fn default() -> Self {
        Self {
            initial: DelayRange::new(5.0, 7.0),
            scroll: DelayRange::new(1.0, 2.0),
            card: DelayRange::new(0.5, 1.0),
            page: DelayRange::new(2.0, 4.0)
        }
    }
}


impl Pacing {
    #[cfg(test)]
    pub(crate) const fn none() -> Self {
        Self {
            initial: DelayRange::ZERO,
            scroll: DelayRange::ZERO,
            card: DelayRange::ZERO,
            page: DelayRange::ZERO
        }
    }

    /// Name of the first malformed range, if any
    pub(crate) fn invalid_range(&self) -> Option<&'static str> {
        [("initial", self.initial), ("scroll", self.scroll), ("card", self.card), ("page", self.page)]
            .into_iter()
            .find(|(_, range)| !range.is_valid())
            .map(|(name, _)| name)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_stay_within_range() {
        let range = DelayRange::new(0.5, 1.0);
        for _ in 0..100 {
            let delay = range.sample();
            assert!(delay >= Duration::from_millis(500) && delay <= Duration::from_secs(1));
        }
        assert_eq!(DelayRange::ZERO.sample(), Duration::ZERO);
    }

    #[test]
    fn malformed_ranges_are_reported() {
        let mut pacing = Pacing::default();
        assert_eq!(pacing.invalid_range(), None);

        pacing.card = DelayRange::new(2.0, 1.0);
        assert_eq!(pacing.invalid_range(), Some("card"));

        pacing.card = DelayRange::new(-1.0, 1.0);
        assert_eq!(pacing.invalid_range(), Some("card"));

        pacing.card = DelayRange::new(0.5, f64::NAN);
        assert_eq!(pacing.invalid_range(), Some("card"));
    }

    #[test]
    fn huge_ranges_are_rejected_and_never_panic() {
        let pacing: Pacing = toml::from_str("page = { min_secs = 0.0, max_secs = 1e300 }").unwrap();
        assert_eq!(pacing.invalid_range(), Some("page"));

        assert!(pacing.page.sample() <= Duration::from_secs_f64(MAX_DELAY_SECS));
        assert!(DelayRange::new(f64::NAN, f64::INFINITY).sample() <= Duration::from_secs_f64(MAX_DELAY_SECS));
    }

    #[test]
    fn partial_tables_keep_defaults() {
        let pacing: Pacing = toml::from_str("page = { min_secs = 0.0, max_secs = 0.5 }").unwrap();

        assert_eq!(pacing.page, DelayRange::new(0.0, 0.5));
        assert_eq!(pacing.initial, Pacing::default().initial);
    }
}
