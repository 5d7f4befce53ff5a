//! Classification of raw toolchain output.
//!
//! cl.exe, link.exe and rc.exe print diagnostics as plain text lines. Lines
//! are tagged by substring; anything else is noise shown only in verbose
//! mode.

/// How a single output line was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Error,
    Warning,
    Other,
}

/// Classify one trimmed output line.
pub fn classify_line(line: &str) -> LineKind {
    if line.contains(": error ") || line.contains(": fatal error ") || line.starts_with("error ") {
        LineKind::Error
    } else if line.contains(": warning ") {
        LineKind::Warning
    } else {
        LineKind::Other
    }
}

/// Output lines of one stage, split by classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedOutput {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub other: Vec<String>,
}

/// Classify captured stdout and stderr.
///
/// Blank lines are dropped. Order within each class is preserved.
pub fn classify(stdout: &str, stderr: &str) -> ClassifiedOutput {
    let mut out = ClassifiedOutput::default();
    for line in stdout.lines().chain(stderr.lines()) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match classify_line(line) {
            LineKind::Error => out.errors.push(line.to_string()),
            LineKind::Warning => out.warnings.push(line.to_string()),
            LineKind::Other => out.other.push(line.to_string()),
        }
    }
    out
}
