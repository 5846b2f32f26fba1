mod replay;

use std::process::ExitCode;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "agent-replay")]
#[command(about = "Replay a recorded agent event stream and verify its final result")]
struct Cli {
    #[command(flatten)]
    args: replay::Args,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    match replay::run(cli.args).await {
        Ok(report) => {
            println!(
                "PASS after {} event(s), {} skipped line(s) in {} attempt(s): {}",
                report.run.events_seen,
                report.malformed_lines,
                report.run.attempts,
                report.verdict.result
            );
            for warning in &report.verdict.warnings {
                println!("WARN: {warning}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("FAIL: {err}");
            ExitCode::FAILURE
        }
    }
}
