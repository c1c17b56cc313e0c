// src/services/formatter.rs

//! Change report formatting.
//!
//! openapi-diff prints its report framed in ASCII art:
//!
//! ```text
//! ==========================================================================
//! ==                            API CHANGE LOG                            ==
//! ==========================================================================
//!                              Users API
//! --------------------------------------------------------------------------
//! --                              What's New                              --
//! --------------------------------------------------------------------------
//! - POST   /users
//! ```
//!
//! Chat channels render runs of `=` and framed `--` lines as markup, so the
//! frames are flattened and the banner is swapped for an alert header. Change
//! entries pass through untouched.

use crate::models::{ChangeReport, DiffResult, NotifyConfig};

/// Turns diff engine output into a deliverable [`ChangeReport`].
#[derive(Debug, Clone)]
pub struct ReportFormatter {
    header: String,
    banner: String,
}

impl ReportFormatter {
    pub fn new(header: impl Into<String>, banner: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            banner: banner.into(),
        }
    }

    pub fn from_config(config: &NotifyConfig) -> Self {
        Self::new(config.header.clone(), config.banner.clone())
    }

    pub fn format(&self, result: &DiffResult) -> ChangeReport {
        match result {
            DiffResult::NoDifferences => ChangeReport::NoChange,
            DiffResult::Differences(raw) => ChangeReport::Changed(self.format_raw(raw)),
        }
    }

    /// Format a raw report; the output always starts with the header line.
    pub fn format_raw(&self, raw: &str) -> String {
        let lines: Vec<&str> = raw.lines().collect();
        let banner_at = lines.iter().position(|line| self.is_banner(line));

        let mut out: Vec<String> = Vec::with_capacity(lines.len() + 1);
        out.push(self.header.clone());

        for (idx, line) in lines.iter().enumerate() {
            match banner_at {
                // The banner frame is dropped; other preamble output follows the header
                Some(at) if idx < at && (line.trim().is_empty() || is_separator(line)) => {}
                Some(at) if idx == at => {}
                _ => out.push(normalize_line(line)),
            }
        }

        while out.last().is_some_and(|l| l.trim().is_empty()) {
            out.pop();
        }
        out.join("\n")
    }

    fn is_banner(&self, line: &str) -> bool {
        let title = framed_title(line).unwrap_or_else(|| line.trim());
        !self.banner.is_empty() && title == self.banner
    }
}

/// A line made only of `=` or `-` characters.
fn is_separator(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 3 && trimmed.chars().all(|c| c == '=' || c == '-')
}

/// Inner text of a `== title ==` or `-- title --` line.
fn framed_title(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    ["==", "--"].iter().find_map(|frame| {
        trimmed
            .strip_prefix(*frame)
            .and_then(|rest| rest.strip_suffix(*frame))
            .map(str::trim)
            .filter(|inner| !inner.is_empty() && !is_separator(inner))
    })
}

fn normalize_line(line: &str) -> String {
    if is_separator(line) {
        let width = line.trim_end().chars().count();
        return "-".repeat(width);
    }
    if let Some(title) = framed_title(line) {
        // Keep the column the title was centred at
        let lead = line.find(title).unwrap_or(0);
        return format!("{}{}", " ".repeat(lead), title);
    }
    line.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "🚨 API change detected 🚨";

    fn formatter() -> ReportFormatter {
        ReportFormatter::new(HEADER, "API CHANGE LOG")
    }

    const RAW: &str = "\
==========================================================================
==                            API CHANGE LOG                            ==
==========================================================================
                                 Users API
--------------------------------------------------------------------------
--                              What's New                              --
--------------------------------------------------------------------------
- POST   /users

--------------------------------------------------------------------------
--                            What's Changed                            --
--------------------------------------------------------------------------
- GET    /users?page=1
  Parameter:
    - Add limit in query
--------------------------------------------------------------------------
--                                Result                                --
--------------------------------------------------------------------------
                 API changes are backward compatible
--------------------------------------------------------------------------
";

    #[test]
    fn test_no_differences_is_no_change() {
        assert_eq!(formatter().format(&DiffResult::NoDifferences), ChangeReport::NoChange);
    }

    #[test]
    fn test_report_starts_with_header() {
        let report = formatter().format(&DiffResult::Differences(RAW.to_string()));
        let text = report.text().unwrap();
        assert!(text.starts_with(HEADER));
        assert!(text.contains("- POST   /users"));
        assert!(!text.contains("API CHANGE LOG"));
    }

    #[test]
    fn test_engine_preamble_follows_header() {
        let raw = "Picked up JAVA_TOOL_OPTIONS: -Xmx512m\n==========\n==  API CHANGE LOG  ==\n==========\n- POST /users\n";
        let text = formatter().format_raw(raw);
        assert_eq!(
            text,
            format!("{HEADER}\nPicked up JAVA_TOOL_OPTIONS: -Xmx512m\n----------\n- POST /users")
        );
    }

    #[test]
    fn test_separators_and_frames_are_flattened() {
        let text = formatter().format_raw(RAW);
        assert!(!text.lines().any(|l| l.contains("==")));
        assert!(!text.contains("-- "));
        assert!(!text.contains(" --"));
        assert!(text.lines().any(|l| l == "-".repeat(74)));
        assert!(
            text.lines()
                .any(|l| l.trim() == "What's New" && l.starts_with("  "))
        );
    }

    #[test]
    fn test_change_entries_preserved_verbatim() {
        let text = formatter().format_raw(RAW);
        let out: Vec<&str> = text.lines().collect();
        for line in RAW.lines() {
            if is_separator(line) || framed_title(line).is_some() || line.trim().is_empty() {
                continue;
            }
            assert!(out.contains(&line), "missing line: {line:?}");
        }
        // '=' inside an entry is not a separator
        assert!(out.contains(&"- GET    /users?page=1"));
    }

    #[test]
    fn test_header_prepended_without_banner() {
        let text = formatter().format_raw("- DELETE /users/{id}\n");
        assert_eq!(text, format!("{HEADER}\n- DELETE /users/{{id}}"));
    }

    #[test]
    fn test_crlf_output() {
        let raw = "==========\r\n==  API CHANGE LOG  ==\r\n==========\r\n- POST /users\r\n";
        let text = formatter().format_raw(raw);
        assert_eq!(text, format!("{HEADER}\n----------\n- POST /users"));
    }

    #[test]
    fn test_single_dash_entries_are_not_frames() {
        assert_eq!(framed_title("- GET /users"), None);
        assert_eq!(framed_title("--  What's Deleted  --"), Some("What's Deleted"));
        assert!(!is_separator("- -"));
        assert!(is_separator("   ======   "));
    }
}
