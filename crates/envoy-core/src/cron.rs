use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

/// `cron` (the crate) parses 6/7-field expressions with a leading seconds
/// field. Accept standard 5-field unix cron too by prepending `"0 "`.
fn to_six_field(expr: &str) -> String {
    let fields = expr.split_whitespace().count();
    if fields == 5 {
        format!("0 {expr}")
    } else {
        expr.to_string()
    }
}

/// Validates a cron expression, accepting both standard 5-field and
/// 6-field-with-seconds forms. Used at task creation time so a bad
/// expression is rejected immediately rather than silently never firing.
pub fn validate(expr: &str) -> Result<(), String> {
    Schedule::from_str(&to_six_field(expr))
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Computes the next fire time strictly after `from`, or `None` if the
/// expression is malformed or has no future occurrence.
pub fn compute_next_run(expr: &str, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let schedule = Schedule::from_str(&to_six_field(expr)).ok()?;
    schedule.after(&from).next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_standard_five_field_expression() {
        assert!(validate("0 9 * * *").is_ok());
    }

    #[test]
    fn rejects_malformed_expression() {
        assert!(validate("not a cron expression").is_err());
    }

    #[test]
    fn computes_next_run_in_the_future() {
        let from = Utc::now();
        let next = compute_next_run("* * * * *", from).unwrap();
        assert!(next > from);
    }

    #[test]
    fn malformed_expression_returns_none_for_next_run() {
        assert!(compute_next_run("garbage", Utc::now()).is_none());
    }
}
