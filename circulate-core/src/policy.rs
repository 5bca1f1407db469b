use chrono::{Duration, NaiveDate};

/// Circulation policy knobs. Injected into the engine so deployments can
/// tune limits without a rebuild.
#[derive(Debug, Clone, Copy)]
pub struct LendingPolicy {
    /// Maximum simultaneous loans per member.
    pub max_loans: u32,
    /// Loan period in days, applied to new loans and hand-offs alike.
    pub loan_days: i64,
}

impl Default for LendingPolicy {
    fn default() -> Self {
        Self {
            max_loans: 5,
            loan_days: 14,
        }
    }
}

impl LendingPolicy {
    /// Due date for a loan starting on `start`.
    pub fn due_date_from(&self, start: NaiveDate) -> NaiveDate {
        start + Duration::days(self.loan_days)
    }
}
