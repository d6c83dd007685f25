use super::check::TestResult;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Percentage of passing checks; `None` when nothing ran.
    pub pass_rate: Option<f64>,
    /// `"{name}: {message}"` for each failure, in run order.
    pub failed_tests: Vec<String>,
}

impl TestSummary {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

pub fn summarize(results: &[TestResult]) -> TestSummary {
    let total = results.len();
    let passed = results.iter().filter(|r| r.success).count();
    let failed = total - passed;
    let pass_rate = (total > 0).then(|| passed as f64 / total as f64 * 100.0);
    let failed_tests = results
        .iter()
        .filter(|r| !r.success)
        .map(|r| format!("{}: {}", r.name, r.message))
        .collect();

    TestSummary { total, passed, failed, pass_rate, failed_tests }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, success: bool, message: &str) -> TestResult {
        TestResult {
            name: name.to_string(),
            success,
            message: message.to_string(),
            duration: 1.5,
        }
    }

    #[test]
    fn test_empty_run_has_no_pass_rate() {
        let s = summarize(&[]);
        assert_eq!(s.total, 0);
        assert_eq!(s.passed + s.failed, 0);
        assert_eq!(s.pass_rate, None);
        assert!(s.failed_tests.is_empty());
        assert!(s.all_passed());
    }

    #[test]
    fn test_counts_and_failed_order() {
        let results = vec![
            result("a", false, "first"),
            result("b", true, "ok"),
            result("c", false, "second"),
            result("d", true, "ok"),
        ];
        let s = summarize(&results);

        assert_eq!(s.total, 4);
        assert_eq!(s.passed, 2);
        assert_eq!(s.failed, 2);
        assert_eq!(s.pass_rate, Some(50.0));
        assert_eq!(s.failed_tests, vec!["a: first", "c: second"]);
        assert_eq!(s.failed_tests.len(), s.failed);
        assert!(!s.all_passed());
    }

    #[test]
    fn test_one_failure_in_seven() {
        let mut results: Vec<_> = (0..6).map(|i| result(&format!("ok{i}"), true, "ok")).collect();
        results.insert(2, result("opt", false, "quota exceeded"));
        let s = summarize(&results);

        let rate = s.pass_rate.unwrap();
        assert!((rate - 85.714).abs() < 0.01);
        assert_eq!(s.failed_tests, vec!["opt: quota exceeded"]);
        // Input untouched.
        assert_eq!(results.len(), 7);
    }
}
