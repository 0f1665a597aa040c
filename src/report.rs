//! Output formatting for fetched deprecation data.

use crate::executor::Outcome;
use crate::model::{BuildpackIdentity, ManifestResult};
use crate::traits::FetchError;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// `name version` header followed by tab-indented records.
    #[default]
    Text,
    /// One JSON object per buildpack per line.
    Json,
}

/// Writes one block per buildpack that has deprecation records.
pub struct Reporter<W: Write> {
    out: W,
    format: OutputFormat,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self { out, format }
    }

    /// Emits a fetched result; results without records print nothing.
    pub fn emit(&mut self, result: &ManifestResult) -> io::Result<()> {
        if result.is_empty() {
            return Ok(());
        }

        match self.format {
            OutputFormat::Text => {
                writeln!(self.out, "{}", result.identity)?;
                for record in &result.records {
                    writeln!(
                        self.out,
                        "\t{} - {} {}",
                        record.date, record.name, record.version_line
                    )?;
                }
            }
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.out, result)?;
                writeln!(self.out)?;
            }
        }
        self.out.flush()
    }

    /// Emits successful outcomes; failures are left for [`write_failure_summary`].
    pub fn emit_outcome(&mut self, outcome: &Outcome) -> io::Result<()> {
        match outcome {
            Outcome::Fetched(result) => self.emit(result),
            Outcome::Failed { .. } => Ok(()),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Writes one diagnostic line per failed buildpack plus a count line.
pub fn write_failure_summary<'a, W, I>(err: &mut W, failures: I, total: usize) -> io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = (&'a BuildpackIdentity, &'a FetchError)>,
{
    let mut failed = 0;
    for (identity, error) in failures {
        writeln!(err, "error: {}: {}", identity, error)?;
        failed += 1;
    }
    if failed > 0 {
        writeln!(err, "{} of {} buildpacks could not be checked", failed, total)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DeprecationRecord;

    fn record(date: &str, name: &str, line: &str) -> DeprecationRecord {
        DeprecationRecord {
            date: date.to_string(),
            name: name.to_string(),
            version_line: line.to_string(),
            link: None,
        }
    }

    fn ruby_result() -> ManifestResult {
        ManifestResult::new(
            BuildpackIdentity::new("ruby_buildpack", "v1.7.28"),
            vec![
                record("2020-05-01", "ruby", "2.4.x"),
                record("2019-11-01", "bundler", "1.x"),
            ],
        )
    }

    fn render(format: OutputFormat, result: &ManifestResult) -> String {
        let mut reporter = Reporter::new(Vec::new(), format);
        reporter.emit(result).unwrap();
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    #[test]
    fn test_text_output_sorted_by_date() {
        assert_eq!(
            render(OutputFormat::Text, &ruby_result()),
            "ruby-buildpack v1.7.28\n\t2019-11-01 - bundler 1.x\n\t2020-05-01 - ruby 2.4.x\n"
        );
    }

    #[test]
    fn test_empty_result_emits_nothing() {
        let empty = ManifestResult::new(
            BuildpackIdentity::new("binary_buildpack", "v1.0.36"),
            vec![],
        );
        assert_eq!(render(OutputFormat::Text, &empty), "");
        assert_eq!(render(OutputFormat::Json, &empty), "");
    }

    #[test]
    fn test_json_output_is_one_line_per_buildpack() {
        let output = render(OutputFormat::Json, &ruby_result());
        assert_eq!(output.lines().count(), 1);

        let value: serde_json::Value = serde_json::from_str(output.trim_end()).unwrap();
        assert_eq!(value["name"], "ruby-buildpack");
        assert_eq!(value["version"], "v1.7.28");
        assert_eq!(value["deprecations"][0]["date"], "2019-11-01");
        assert_eq!(value["deprecations"][1]["version_line"], "2.4.x");
    }

    #[test]
    fn test_failed_outcome_prints_nothing_on_stdout() {
        let mut reporter = Reporter::new(Vec::new(), OutputFormat::Text);
        reporter
            .emit_outcome(&Outcome::Failed {
                identity: BuildpackIdentity::new("go_buildpack", "v1.9.0"),
                error: FetchError::Task("cancelled".to_string()),
            })
            .unwrap();
        assert!(reporter.into_inner().is_empty());
    }

    #[test]
    fn test_failure_summary() {
        let identity = BuildpackIdentity::new("go_buildpack", "v1.9.0");
        let error = FetchError::Status {
            url: "https://example.test/go-buildpack/v1.9.0/manifest.yml".to_string(),
            status: 404,
        };
        let mut err = Vec::new();
        write_failure_summary(&mut err, vec![(&identity, &error)], 3).unwrap();

        let text = String::from_utf8(err).unwrap();
        assert_eq!(
            text,
            "error: go-buildpack v1.9.0: HTTP 404 from https://example.test/go-buildpack/v1.9.0/manifest.yml\n\
             1 of 3 buildpacks could not be checked\n"
        );
    }

    #[test]
    fn test_failure_summary_silent_without_failures() {
        let mut err = Vec::new();
        let none: Vec<(&BuildpackIdentity, &FetchError)> = Vec::new();
        write_failure_summary(&mut err, none, 4).unwrap();
        assert!(err.is_empty());
    }
}
