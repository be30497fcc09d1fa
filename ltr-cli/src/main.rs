use clap::Parser;
use ltr_cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.json_logs {
        ltr_telemetry::init_json_telemetry(&cli.log_level)?;
    } else {
        ltr_telemetry::init_telemetry(&cli.log_level)?;
    }
    ltr_cli::run(cli).await
}
