//! Datapump entry point.
//!
//! Reads newline-delimited JSON from stdin or a file and bulk loads it into
//! an OpenSearch index. Configured through environment variables, see
//! [`Settings::from_env`].

use std::env;
use std::process::ExitCode;

use datapump::{DatapumpError, Dependencies, Input, NdjsonSource, Settings};
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Datapump failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn open_input(input: &Input) -> Result<Box<dyn AsyncBufRead + Unpin + Send>, DatapumpError> {
    match input {
        Input::Stdin => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
        Input::File(path) => {
            let file = tokio::fs::File::open(path).await?;
            Ok(Box::new(BufReader::new(file)))
        }
    }
}

async fn run() -> Result<(), DatapumpError> {
    let settings = Settings::from_env()?;
    let reader = open_input(&settings.input).await?;
    let dependencies = Dependencies::new(&settings).await?;

    let (sender, completion) = dependencies
        .pipeline(settings.pipeline_config())
        .start()
        .await?;

    let fed = NdjsonSource::new(reader, settings.id_field.as_str())
        .pump(sender)
        .await;

    // A source that stopped early still lets the run drain and restore
    // settings before its error is reported.
    let report = completion.wait().await?;
    let summary = fed?;

    if settings.make_permanent {
        dependencies
            .index_manager
            .make_permanent(&report.index)
            .await?;
        info!(index = %report.index, "Index made permanent");
    }

    info!(
        index = %report.index,
        sent = summary.sent,
        skipped = summary.skipped,
        succeeded = report.stats.succeeded,
        failed = report.stats.failed,
        elapsed_ms = report.elapsed().num_milliseconds(),
        "Load finished"
    );
    Ok(())
}
