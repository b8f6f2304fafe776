//! Line-oriented analysis of captured instrumentation output.
//!
//! Two text formats are recognized:
//!
//! - Instrumentation mode: one `am instrument` invocation per case, each
//!   printing an `OK (1 test)` marker on success. The number of requested
//!   cases is the total; cases without a marker (including crashed or hung
//!   runs) count as failures.
//! - Legacy unit mode: a single bulk run printing a
//!   `Tests run: N, Failures: M` summary line.
//!
//! Both functions are pure over their input text, so re-analyzing the same
//! captured file always yields identical counts.

use crate::types::ResultSummary;

/// Marker printed by the instrumentation runner when a single test passes.
pub const SINGLE_PASS_MARKER: &str = "OK (1 test)";

/// Marker printed when at least one test in an invocation failed.
pub const FAILURE_MARKER: &str = "FAILURES!!!";

/// Markers indicating the harness itself fell over rather than a test
/// assertion failing.
const ERROR_MARKERS: &[&str] = &["INSTRUMENTATION_FAILED", "Process crashed"];

/// Analyzes instrumentation-mode output.
///
/// `expected` is the number of cases requested for the module; it becomes
/// the summary's `total`. A case counts as succeeded only when its
/// invocation printed the single-test pass marker, so a run that crashed
/// before printing anything is a failure, not something to retry.
pub fn analyze_instrumentation(output: &str, expected: u32) -> ResultSummary {
    let mut succeeded = 0u32;
    let mut errored = 0u32;

    for line in output.lines() {
        if line.contains(SINGLE_PASS_MARKER) {
            succeeded += 1;
        }
        if line.contains(FAILURE_MARKER)
            || ERROR_MARKERS.iter().any(|marker| line.contains(marker))
        {
            errored += 1;
        }
    }

    // More markers than requested cases means the result file was appended
    // to by an earlier run; cap at the requested count.
    let succeeded = succeeded.min(expected);

    ResultSummary {
        total: expected,
        succeeded,
        failed: expected - succeeded,
        errored,
    }
}

/// Analyzes legacy unit-test output of the form `Tests run: N, Failures: M`.
///
/// The first summary line wins. Output without a summary line yields zero
/// counts, which the orchestrator treats as a module failure.
pub fn analyze_unit_text(output: &str) -> ResultSummary {
    for line in output.lines() {
        let Some(total) = field_value(line, "Tests run:") else {
            continue;
        };
        let failed = field_value(line, "Failures:").unwrap_or(0);
        let errored = field_value(line, "Errors:").unwrap_or(0);
        let succeeded = total.saturating_sub(failed).saturating_sub(errored);
        return ResultSummary {
            total,
            succeeded,
            failed,
            errored,
        };
    }
    ResultSummary::default()
}

/// Extracts the integer following `label` in `line`, if present.
fn field_value(line: &str, label: &str) -> Option<u32> {
    let start = line.find(label)? + label.len();
    let rest = line[start..].trim_start();
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_one_marker_per_passed_case() {
        let output = "\
INSTRUMENTATION_STATUS_CODE: 0
OK (1 test)
some logcat noise
OK (1 test)
";
        let summary = analyze_instrumentation(output, 2);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 0);
        assert!(summary.passed());
    }

    #[test]
    fn missing_marker_counts_as_failure() {
        let output = "OK (1 test)\nFAILURES!!!\nTests run: 1,  Failures: 1\n";
        let summary = analyze_instrumentation(output, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errored, 1);
        assert!(!summary.passed());
    }

    #[test]
    fn failure_banner_bumps_the_error_count() {
        let summary = analyze_instrumentation("FAILURES!!!\n", 1);
        assert_eq!(summary.errored, 1);
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn crashed_run_reconciles_against_expected_count() {
        let output = "INSTRUMENTATION_FAILED: com.rtc.test.base/runner\n";
        let summary = analyze_instrumentation(output, 3);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.failed, 3);
        assert_eq!(summary.errored, 1);
    }

    #[test]
    fn marker_surplus_is_capped_at_expected() {
        let output = "OK (1 test)\nOK (1 test)\nOK (1 test)\n";
        let summary = analyze_instrumentation(output, 2);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 0);
    }

    #[test]
    fn analysis_is_idempotent() {
        let output = "OK (1 test)\nFAILURES!!!\n";
        let first = analyze_instrumentation(output, 2);
        let second = analyze_instrumentation(output, 2);
        assert_eq!(first, second);
    }

    #[test]
    fn parses_unit_summary_line() {
        let output = "junk\nTests run: 5,  Failures: 2\nTests run: 9,  Failures: 9\n";
        let summary = analyze_unit_text(output);
        assert_eq!(summary.total, 5);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.succeeded, 3);
    }

    #[test]
    fn unit_summary_with_errors_field() {
        let summary = analyze_unit_text("Tests run: 10, Failures: 2, Errors: 1\n");
        assert_eq!(summary.total, 10);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.errored, 1);
        assert_eq!(summary.succeeded, 7);
    }

    #[test]
    fn unit_output_without_summary_is_zero() {
        let summary = analyze_unit_text("no summary here\n");
        assert_eq!(summary, ResultSummary::default());
        assert!(!summary.passed());
    }
}
