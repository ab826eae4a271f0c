use bulk_verify::config::cli::required_setting;
use bulk_verify::core::endpoint::find_endpoint;
use bulk_verify::core::row_source::{InputFormat, RowSource};
use bulk_verify::domain::ports::Storage;
use bulk_verify::utils::error::{ErrorSeverity, VerifyError};
use bulk_verify::utils::{logger, validation::Validate};
use bulk_verify::{
    BatchEngine, CliArgs, HttpTransport, LocalStorage, VerificationClient, VerificationPipeline,
    VerificationSession, VerifyConfig,
};
use clap::Parser;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    if args.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Starting bulk-verify CLI");

    if let Err(e) = run(&args).await {
        tracing::error!(
            "❌ Verification run failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn run(args: &CliArgs) -> Result<(), VerifyError> {
    let config = args.load_config()?;
    config.validate()?;
    if args.verbose {
        tracing::debug!("Config: {:?}", config);
    }

    let catalog = config.catalog();
    if args.list_endpoints {
        print_catalog(&config);
        return Ok(());
    }

    let endpoint_name = required_setting(&config.run.endpoint, "run.endpoint")?;
    let input_path = required_setting(&config.run.input, "run.input")?;
    let descriptor = find_endpoint(&catalog, &endpoint_name)?.clone();

    let input_storage = LocalStorage::new(".".to_string());

    if args.dry_run {
        let format = InputFormat::from_path(&input_path)?;
        let data = input_storage.read_file(&input_path).await?;
        let batch = RowSource::parse(&data, format, &descriptor.required_columns())?;
        let missing_serial = batch.records.iter().filter(|r| r.serial.is_empty()).count();
        println!(
            "✅ {} rows ready for '{}' ({} without a serial number)",
            batch.records.len(),
            descriptor.name,
            missing_serial
        );
        return Ok(());
    }

    let settings = config.load_settings(&descriptor.name)?;
    let run_options = config.run_options(&args.option_overrides());
    let client = VerificationClient::new(
        Arc::new(descriptor),
        Arc::new(HttpTransport::new()),
        config.credentials(),
        &run_options,
    );
    let session = VerificationSession::new(client, config.processing.concurrent_requests);

    let pipeline = VerificationPipeline::new(
        input_storage,
        LocalStorage::new(config.load.output_path.clone()),
        input_path,
        session,
        settings,
    );

    let report = BatchEngine::new(pipeline).run().await?;

    let output = format!("{}/{}", config.load.output_path, report.output_path);
    tracing::info!("✅ Verification run completed successfully!");
    println!("✅ Verification run completed successfully!");
    println!(
        "📊 {} rows: {} verified, {} failed, {} expanded",
        report.summary.total_rows,
        report.summary.verified_rows,
        report.summary.failed_rows,
        report.summary.expanded_rows
    );
    println!("📁 Output saved to: {}", output);

    Ok(())
}

fn print_catalog(config: &VerifyConfig) {
    for endpoint in config.catalog() {
        let inputs: Vec<&str> = endpoint.input_columns().collect();
        let mut notes = Vec::new();
        if endpoint.is_async() {
            notes.push("async");
        }
        if endpoint.expand.is_some() {
            notes.push("expands");
        }
        println!(
            "{:<18} {:<11} [{}] {}{}",
            endpoint.name,
            endpoint.provider.as_str(),
            inputs.join(", "),
            endpoint.description,
            if notes.is_empty() {
                String::new()
            } else {
                format!(" ({})", notes.join(", "))
            }
        );
    }
}
