use chrono::{DateTime, SubsecRound, Utc};

/// Current time at the microsecond precision storage keeps.
pub(crate) fn current_time() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
