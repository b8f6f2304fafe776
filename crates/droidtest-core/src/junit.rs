//! Structured analysis of JUnit XML test reports.
//!
//! Bulk (unit-test) runs write a JUnit-style report on the device, which the
//! driver pulls into the log directory. The counts live on the root
//! `<testsuite>` element's `tests`, `failures`, and `errors` attributes;
//! reports wrapped in a `<testsuites>` container are handled by taking the
//! first suite.
//!
//! A missing or malformed report is not fatal to the run: it degrades to a
//! zero summary, which the orchestrator counts as a module failure.

use crate::types::ResultSummary;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::path::Path;

/// Analyzes the JUnit report at `path`.
///
/// Never fails: parse problems are reported as a console warning and yield
/// zero counts. Analysis is a pure function of the file content.
pub fn analyze_report(path: &Path) -> ResultSummary {
    match parse_report(path) {
        Ok(Some(summary)) => summary,
        Ok(None) => {
            println!(
                "Warning: no <testsuite> element found in {}",
                path.display()
            );
            ResultSummary::default()
        }
        Err(e) => {
            println!(
                "Warning: failed to parse test report {}: {}",
                path.display(),
                e
            );
            ResultSummary::default()
        }
    }
}

fn parse_report(path: &Path) -> Result<Option<ResultSummary>, quick_xml::Error> {
    let mut reader = Reader::from_file(path)?;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(element) | Event::Empty(element) => {
                if element.name().as_ref() == b"testsuite" {
                    let mut tests: Option<u32> = None;
                    let mut failures = 0u32;
                    let mut errors = 0u32;

                    for attribute in element.attributes() {
                        let attribute = attribute?;
                        let value = attribute.unescape_value()?;
                        match attribute.key.as_ref() {
                            b"tests" => tests = value.parse().ok(),
                            b"failures" => failures = value.parse().unwrap_or(0),
                            b"errors" => errors = value.parse().unwrap_or(0),
                            _ => {}
                        }
                    }

                    // A suite without a tests attribute is unusable.
                    let Some(total) = tests else {
                        return Ok(None);
                    };
                    let succeeded = total.saturating_sub(failures).saturating_sub(errors);
                    return Ok(Some(ResultSummary {
                        total,
                        succeeded,
                        failed: failures,
                        errored: errors,
                    }));
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
        buf.clear();
    }
}
