//! Benchmarks for invocation building and the retry fast path.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use powerdocu_task::config::{AgentContext, PipelineConfig, ReleaseSettings, ToolOptions};
use powerdocu_task::process::build_invocation_with;
use powerdocu_task::retry::{RetryExecutor, RetryPolicy};
use std::path::PathBuf;

fn config() -> PipelineConfig {
    let tool = ToolOptions {
        output_path: Some(PathBuf::from("docs")),
        markdown: true,
        word: true,
        word_template: Some(PathBuf::from("template.docx")),
        ..ToolOptions::new("solution.zip")
    };
    PipelineConfig::new(
        ReleaseSettings::default(),
        tool,
        AgentContext::default().with_variable("Agent.TempDirectory", "/agent/_temp"),
    )
}

fn invocation_benchmark(c: &mut Criterion) {
    let config = config();
    c.bench_function("build_invocation", |b| {
        b.iter(|| build_invocation_with(black_box("pwsh"), black_box(&config)));
    });
}

fn retry_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let executor = RetryExecutor::new(RetryPolicy::default());

    c.bench_function("retry_first_attempt_succeeds", |b| {
        b.iter(|| {
            runtime.block_on(executor.execute("bench", || async {
                Ok::<_, String>(black_box(42))
            }))
        });
    });
}

criterion_group!(benches, invocation_benchmark, retry_benchmark);
criterion_main!(benches);
