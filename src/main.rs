use std::process::ExitCode;

use anyhow::Context;

use xmlvalidator::{BatchValidator, Cli, ConfigManager, DiagnosticReporter, LibXml2Engine};

#[tokio::main]
async fn main() -> ExitCode {
    // clap handles -h/--help (exit 0) and unknown options (usage error,
    // exit 2) before we ever get here.
    let cli = Cli::parse_args();

    match run(cli).await {
        // Validation problems were already reported line by line; the exit
        // code tells scripts whether any error-severity event occurred.
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(err) => {
            eprintln!("xmlvalidator: {:#}", err);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<usize> {
    let options = ConfigManager::load_options(&cli)
        .await
        .context("failed to load configuration")?;

    let mut reporter = DiagnosticReporter::new(options.color, options.warn);
    let validator = BatchValidator::new(LibXml2Engine::new());
    validator
        .run(&options, &mut reporter)
        .await
        .context("validation run failed")?;

    Ok(reporter.error_count())
}
