/// Bounds how often a frame that failed to deserialize is recombined with
/// the next buffer from the same source.
///
/// The attempt counter lives in the caller's session; the budget only holds
/// the limit. The default allows no retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryBudget {
    max_attempts: u32,
}

impl RetryBudget {
    /// Allow up to `max_attempts` retries per frame.
    pub const fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Configured retry limit.
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Consume one retry if any remain.
    ///
    /// Returns `false` once the budget is spent and resets `attempts` so the
    /// next failing frame starts with a full budget.
    pub fn should_retry(&self, attempts: &mut u32) -> bool {
        if *attempts < self.max_attempts {
            *attempts += 1;
            true
        } else {
            *attempts = 0;
            false
        }
    }

    /// Forget previous attempts after a successful parse.
    pub fn reset(&self, attempts: &mut u32) {
        *attempts = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_budget_never_retries() {
        let budget = RetryBudget::default();
        let mut attempts = 0;
        assert!(!budget.should_retry(&mut attempts));
        assert_eq!(attempts, 0);
    }

    #[test]
    fn retries_up_to_limit_then_resets() {
        let budget = RetryBudget::new(3);
        let mut attempts = 0;

        assert!(budget.should_retry(&mut attempts));
        assert!(budget.should_retry(&mut attempts));
        assert!(budget.should_retry(&mut attempts));
        assert_eq!(attempts, 3);

        assert!(!budget.should_retry(&mut attempts));
        assert_eq!(attempts, 0);
        assert!(budget.should_retry(&mut attempts));
    }

    #[test]
    fn reset_clears_attempts() {
        let budget = RetryBudget::new(2);
        let mut attempts = 0;
        budget.should_retry(&mut attempts);
        budget.reset(&mut attempts);
        assert_eq!(attempts, 0);
    }
}
