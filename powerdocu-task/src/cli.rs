//! Command line of the `powerdocu-task` binary.
//!
//! The agent passes task inputs as `INPUT_<NAME>` environment variables;
//! every input can also be given as a flag when running by hand.

use clap::builder::{PossibleValuesParser, TypedValueParser};
use clap::{ArgAction, Parser};
use powerdocu_task::config::{AgentContext, PipelineConfig, ReleaseSettings, StderrPolicy, ToolOptions};
use powerdocu_task::errors::TaskError;
use powerdocu_task::retry::RetryPolicy;
use std::path::PathBuf;

/// Generate documentation for Power Platform flows and apps with PowerDocu.
#[derive(Debug, Parser)]
#[command(name = "powerdocu-task", version, about, long_about = None)]
pub struct Cli {
    /// File or folder with the flows and apps to document.
    #[arg(short = 'p', long, env = "INPUT_ITEMSTODOCUMENT")]
    pub items_to_document: Option<PathBuf>,

    /// Where documentation is written.
    #[arg(short = 'o', long, env = "INPUT_OUTPUTPATH")]
    pub output_path: Option<PathBuf>,

    /// Produce Markdown output.
    #[arg(
        short = 'm',
        long,
        env = "INPUT_MARKDOWN",
        action = ArgAction::Set,
        value_parser = parse_bool_input,
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true"
    )]
    pub markdown: bool,

    /// Produce Word output.
    #[arg(
        short = 'w',
        long,
        env = "INPUT_WORD",
        action = ArgAction::Set,
        value_parser = parse_bool_input,
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true"
    )]
    pub word: bool,

    /// Only document changes from default values.
    #[arg(
        short = 'c',
        long,
        env = "INPUT_CHANGESONLY",
        action = ArgAction::Set,
        value_parser = parse_bool_input,
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true"
    )]
    pub changes_only: bool,

    /// Document default values.
    #[arg(
        short = 'd',
        long,
        env = "INPUT_DEFAULTVALUES",
        action = ArgAction::Set,
        value_parser = parse_bool_input,
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true"
    )]
    pub default_values: bool,

    /// Sort flows by name.
    #[arg(
        short = 's',
        long,
        env = "INPUT_SORTFLOWSBYNAME",
        action = ArgAction::Set,
        value_parser = parse_bool_input,
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true"
    )]
    pub sort_flows_by_name: bool,

    /// Word template to use.
    #[arg(short = 't', long, env = "INPUT_WORDTEMPLATE")]
    pub word_template: Option<PathBuf>,

    /// Release settings file (`config.json`).
    #[arg(long, env = "POWERDOCU_CONFIG")]
    pub config: Option<PathBuf>,

    /// Additional attempts for release lookup and download.
    #[arg(long, env = "INPUT_RETRYCOUNT")]
    pub retry_count: Option<u32>,

    /// How output on the tool's error stream is judged (`fail` or `warn`).
    #[arg(
        long,
        env = "INPUT_STDERRPOLICY",
        default_value = "fail",
        ignore_case = true,
        value_parser = PossibleValuesParser::new(["fail", "warn"]).try_map(|s| s.parse::<StderrPolicy>())
    )]
    pub stderr_policy: StderrPolicy,

    /// Write diagnostics as JSON.
    #[arg(long)]
    pub log_json: bool,
}

impl Cli {
    /// Builds the run configuration from the parsed arguments.
    pub fn into_config(self, agent: AgentContext) -> Result<PipelineConfig, TaskError> {
        let release = match &self.config {
            Some(path) => ReleaseSettings::load(path)?,
            None => ReleaseSettings::default(),
        };

        let tool = ToolOptions {
            items_to_document: self.items_to_document.unwrap_or_default(),
            output_path: self.output_path,
            markdown: self.markdown,
            word: self.word,
            changes_only: self.changes_only,
            default_values: self.default_values,
            sort_flows_by_name: self.sort_flows_by_name,
            word_template: self.word_template,
        };

        let mut config =
            PipelineConfig::new(release, tool, agent).with_stderr_policy(self.stderr_policy);
        if let Some(retry_count) = self.retry_count {
            let delay = config.retry.delay();
            config =
                config.with_retry_policy(RetryPolicy::from_retry_count(retry_count).with_delay(delay));
        }

        config.validate()?;
        Ok(config)
    }
}

/// Reads a boolean task input the way the agent supplies it.
///
/// Case is ignored and an empty value means `false`.
fn parse_bool_input(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "false" | "no" | "off" | "0" => Ok(false),
        "true" | "yes" | "on" | "1" => Ok(true),
        other => Err(format!("'{other}' is not a boolean, expected 'true' or 'false'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    static ENV: parking_lot::Mutex<()> = parking_lot::Mutex::new(());

    fn try_parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("powerdocu-task").chain(args.iter().copied()))
    }

    fn parse(args: &[&str]) -> Cli {
        try_parse(args).unwrap()
    }

    fn items() -> (TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().display().to_string();
        (dir, path)
    }

    #[test]
    fn test_flags_map_to_tool_options() {
        let _env = ENV.lock();
        let (_dir, items) = items();
        let cli = parse(&["-p", &items, "-o", "docs", "--markdown", "--sort-flows-by-name"]);
        let config = cli.into_config(AgentContext::default()).unwrap();

        assert_eq!(
            config.tool.tool_arguments(),
            vec!["-p", items.as_str(), "-o", "docs", "-m", "-s"]
        );
        assert_eq!(config.stderr_policy, StderrPolicy::Fail);
        assert_eq!(config.retry.retry_count(), 3);
    }

    #[test]
    fn test_retry_count_and_policy() {
        let (_dir, items) = items();
        let cli = parse(&["-p", &items, "--retry-count", "0", "--stderr-policy", "Warn"]);
        let config = cli.into_config(AgentContext::default()).unwrap();

        assert_eq!(config.retry.max_attempts(), 1);
        assert_eq!(config.stderr_policy, StderrPolicy::Warn);
    }

    #[test]
    fn test_missing_items_is_config_error() {
        let cli = parse(&[]);
        assert!(matches!(
            cli.into_config(AgentContext::default()),
            Err(TaskError::Config(_))
        ));
    }

    #[test]
    fn test_nonexistent_items_is_config_error() {
        let (dir, _) = items();
        let missing = dir.path().join("solution.zip").display().to_string();
        let cli = parse(&["-p", &missing]);

        assert!(matches!(
            cli.into_config(AgentContext::default()),
            Err(TaskError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_stderr_policy_is_rejected() {
        let err = try_parse(&["-p", "flows", "--stderr-policy", "ignore"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }

    #[test]
    fn test_boolean_values_ignore_case() {
        assert!(parse(&["--word", "True"]).word);
        assert!(parse(&["--word=TRUE"]).word);
        assert!(!parse(&["--word", "false"]).word);
        assert!(!parse(&[]).word);
        assert!(try_parse(&["--word", "maybe"]).is_err());
    }

    #[test]
    fn test_boolean_inputs_from_agent_environment() {
        let _env = ENV.lock();
        for (value, expected) in [("true", true), ("True", true), ("TRUE", true), ("", false)] {
            std::env::set_var("INPUT_CHANGESONLY", value);
            let cli = try_parse(&["-p", "flows"]);
            std::env::remove_var("INPUT_CHANGESONLY");

            assert_eq!(cli.unwrap().changes_only, expected, "INPUT_CHANGESONLY={value:?}");
        }
    }

    #[test]
    fn test_parse_bool_input() {
        assert_eq!(parse_bool_input(" Yes "), Ok(true));
        assert_eq!(parse_bool_input("0"), Ok(false));
        assert!(parse_bool_input("sometimes").is_err());
    }
}
