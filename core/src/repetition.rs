//! Repetition bounds: how many times an item must or may match.

use std::fmt;

/// `min..max` bounds with an optional `%step`.
///
/// # INV (Dijkstra): `min <= max` when `max` is bounded; `step`, when present, is non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Repetition {
    /// Minimum number of matches.
    pub min: u32,
    /// Maximum number of matches; `None` is unbounded.
    pub max: Option<u32>,
    /// Accepted counts must satisfy `(count - min) % step == 0`.
    pub step: Option<u32>,
}

/// Why an accepted count violates a [`Repetition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepetitionError {
    /// Fewer matches than `min`.
    BelowMinimum,
    /// More matches than `max`.
    AboveMaximum,
    /// Count in bounds but off the step grid.
    StepMismatch,
}

impl Repetition {
    /// No operator: exactly once.
    pub const ONCE: Self = Self::new(1, Some(1));
    /// `?`
    pub const OPTIONAL: Self = Self::new(0, Some(1));
    /// `+`
    pub const ONE_OR_MORE: Self = Self::new(1, None);
    /// `*`
    pub const ZERO_OR_MORE: Self = Self::new(0, None);

    /// Create bounds without a step.
    #[must_use]
    pub const fn new(min: u32, max: Option<u32>) -> Self {
        Self {
            min,
            max,
            step: None,
        }
    }

    /// Exactly `n` times (`*n`).
    #[must_use]
    pub const fn exactly(n: u32) -> Self {
        Self::new(n, Some(n))
    }

    /// Add a step (builder pattern). A zero step is ignored.
    #[must_use]
    pub const fn with_step(mut self, step: u32) -> Self {
        self.step = if step == 0 { None } else { Some(step) };
        self
    }

    /// Returns `true` while another match is still allowed after `count` matches.
    #[must_use]
    pub fn allows_more(&self, count: u32) -> bool {
        self.max.map_or(true, |max| count < max)
    }

    /// Returns `true` when `max` is zero, i.e. the item must never match.
    #[must_use]
    pub fn forbids(&self) -> bool {
        self.max == Some(0)
    }

    /// Check the number of accepted matches.
    ///
    /// # Errors
    ///
    /// Returns the first violated bound, checked in the order minimum,
    /// maximum, step.
    pub fn check(&self, count: u32) -> Result<(), RepetitionError> {
        if count < self.min {
            return Err(RepetitionError::BelowMinimum);
        }
        if self.max.is_some_and(|max| count > max) {
            return Err(RepetitionError::AboveMaximum);
        }
        if let Some(step) = self.step {
            if (count - self.min) % step != 0 {
                return Err(RepetitionError::StepMismatch);
            }
        }
        Ok(())
    }
}

impl Default for Repetition {
    fn default() -> Self {
        Self::ONCE
    }
}

impl fmt::Display for RepetitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BelowMinimum => f.write_str("not enough"),
            Self::AboveMaximum => f.write_str("too many"),
            Self::StepMismatch => f.write_str("step mismatch"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(Repetition::default(), Repetition::ONCE);
        assert_eq!(Repetition::ONCE.check(1), Ok(()));
        assert_eq!(Repetition::ONCE.check(0), Err(RepetitionError::BelowMinimum));
        assert_eq!(Repetition::ONCE.check(2), Err(RepetitionError::AboveMaximum));
    }

    #[test]
    fn test_unbounded() {
        assert!(Repetition::ZERO_OR_MORE.allows_more(u32::MAX - 1));
        assert_eq!(Repetition::ZERO_OR_MORE.check(0), Ok(()));
        assert_eq!(Repetition::ONE_OR_MORE.check(0), Err(RepetitionError::BelowMinimum));
        assert_eq!(Repetition::ONE_OR_MORE.check(1000), Ok(()));
    }

    #[test]
    fn test_step() {
        let rep = Repetition::new(1, Some(7)).with_step(3);
        assert_eq!(rep.check(1), Ok(()));
        assert_eq!(rep.check(4), Ok(()));
        assert_eq!(rep.check(7), Ok(()));
        assert_eq!(rep.check(2), Err(RepetitionError::StepMismatch));
        assert_eq!(rep.check(8), Err(RepetitionError::AboveMaximum));
    }

    #[test]
    fn test_zero_step_ignored() {
        assert_eq!(Repetition::ZERO_OR_MORE.with_step(0).step, None);
    }

    #[test]
    fn test_allows_more() {
        let rep = Repetition::new(0, Some(2));
        assert!(rep.allows_more(0));
        assert!(rep.allows_more(1));
        assert!(!rep.allows_more(2));
        assert!(Repetition::exactly(0).forbids());
    }
}
