//! Catalog generation by scanning test sources.
//!
//! Instrumentation test methods follow the JUnit 3 convention: public,
//! void-returning, zero-argument methods whose names start with `test`.
//! Scanning the module's source directory for that pattern produces the
//! `ClassName#methodName` identifiers the catalog expects, without compiling
//! anything.

use crate::catalog::CatalogEntry;
use crate::types::DroidtestError;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Matches `public void testXxx()` declarations anywhere on a line, so
/// same-line annotations or modifiers before `public` are tolerated.
const CASE_PATTERN: &str = r"public\s+void\s+(test\w*)\s*\(\s*\)";

/// Scans `source_dir` for test methods and builds a catalog entry for
/// `module`.
///
/// Files are visited in name order so repeated runs over the same tree
/// produce the same case order. Only `.java` files directly inside
/// `source_dir` are considered, matching the flat layout of the test
/// modules.
pub fn generate(module: &str, source_dir: &Path) -> Result<CatalogEntry, DroidtestError> {
    let case_regex = Regex::new(CASE_PATTERN).expect("case pattern is a valid regex");

    let mut files: Vec<_> = fs::read_dir(source_dir)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "java"))
        .collect();
    files.sort();

    let mut cases = Vec::new();
    for path in files {
        let Some(class_name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let contents = fs::read_to_string(&path)?;
        for line in contents.lines() {
            if let Some(captures) = case_regex.captures(line) {
                cases.push(format!("{}#{}", class_name, &captures[1]));
            }
        }
    }

    Ok(CatalogEntry {
        module: module.to_string(),
        cases,
    })
}

/// Writes a generated catalog to `output` as pretty-printed JSON.
pub fn write_catalog(entries: &[CatalogEntry], output: &Path) -> Result<(), DroidtestError> {
    let json = serde_json::to_string_pretty(entries)?;
    fs::write(output, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use tempfile::TempDir;

    const SAMPLE_TEST_CLASS: &str = r#"
public class StreamTest extends TestBase {
    public void testCreate() {
        assertTrue(true);
    }

    private void helper() {
    }

    public void testClose () {
    }

    public int testNotVoid() {
        return 0;
    }
}
"#;

    #[test]
    fn finds_test_methods() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("StreamTest.java"), SAMPLE_TEST_CLASS).unwrap();

        let entry = generate("base", temp_dir.path()).unwrap();
        assert_eq!(entry.module, "base");
        assert_eq!(
            entry.cases,
            vec!["StreamTest#testCreate", "StreamTest#testClose"]
        );
    }

    #[test]
    fn accepts_prefixed_declarations() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("TaggedTest.java"),
            "@MediumTest public void testTagged() {}\nfinal public void testFinal() {}\n",
        )
        .unwrap();

        let entry = generate("base", temp_dir.path()).unwrap();
        assert_eq!(
            entry.cases,
            vec!["TaggedTest#testTagged", "TaggedTest#testFinal"]
        );
    }

    #[test]
    fn visits_files_in_name_order() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("ZTest.java"),
            "public void testZ() {}\n",
        )
        .unwrap();
        fs::write(
            temp_dir.path().join("ATest.java"),
            "public void testA() {}\n",
        )
        .unwrap();

        let entry = generate("base", temp_dir.path()).unwrap();
        assert_eq!(entry.cases, vec!["ATest#testA", "ZTest#testZ"]);
    }

    #[test]
    fn ignores_non_java_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("notes.txt"),
            "public void testBogus() {}\n",
        )
        .unwrap();

        let entry = generate("base", temp_dir.path()).unwrap();
        assert!(entry.cases.is_empty());
    }

    #[test]
    fn written_catalog_round_trips_through_loader() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("case_list.json");
        let entries = vec![CatalogEntry {
            module: "p2p".to_string(),
            cases: vec!["ConnectTest#testConnect".to_string()],
        }];

        write_catalog(&entries, &output).unwrap();
        let loaded = catalog::load(&output).unwrap();
        assert_eq!(loaded, entries);
    }
}
