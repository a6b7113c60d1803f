//! `powerdocu-task` entry point.
//!
//! Parses task inputs, installs logging, then runs the release pipeline once.
//! Exit status: 0 on success, 1 when the run failed, 2 when the task is
//! misconfigured.

mod cli;

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use powerdocu_task::config::AgentContext;
use powerdocu_task::errors::TaskError;
use powerdocu_task::host::{ConsoleHost, TaskHost, TaskResult};
use powerdocu_task::pipeline::ReleasePipeline;

const EXIT_FAILED: u8 = 1;
const EXIT_CONFIG: u8 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let agent = AgentContext::from_env();
    let host: Arc<dyn TaskHost> = Arc::new(ConsoleHost::stdout());

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => {
            init_tracing(agent.debug(), false);
            let _ = err.print();
            let rendered = err.to_string();
            let reason = rendered.lines().next().unwrap_or_default();
            let err = TaskError::config(reason.trim_start_matches("error: "));
            return Ok(report_setup_failure(host.as_ref(), &err));
        }
    };

    init_tracing(agent.debug(), cli.log_json);

    let pipeline = match cli
        .into_config(agent)
        .and_then(|config| ReleasePipeline::from_config(config, Arc::clone(&host)))
    {
        Ok(pipeline) => pipeline,
        Err(err) => return Ok(report_setup_failure(host.as_ref(), &err)),
    };

    let summary = pipeline.run().await;
    tracing::debug!(
        run_id = %summary.run_id,
        state = %summary.state,
        stages = summary.stage_results.len(),
        "Run finished"
    );

    if summary.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_FAILED))
    }
}

fn report_setup_failure(host: &dyn TaskHost, err: &TaskError) -> ExitCode {
    tracing::error!(error = %err, kind = err.kind(), "Task setup failed");
    host.set_result(TaskResult::Failed, &err.to_string());

    match err {
        TaskError::Config(_) => ExitCode::from(EXIT_CONFIG),
        _ => ExitCode::from(EXIT_FAILED),
    }
}

fn init_tracing(debug: bool, json: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
