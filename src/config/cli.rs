use crate::config::toml_config::VerifyConfig;
use crate::utils::error::{Result, VerifyError};
use clap::Parser;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Parser)]
#[command(name = "bulk-verify")]
#[command(about = "Bulk identity and business verification over spreadsheet uploads")]
pub struct CliArgs {
    /// TOML configuration file
    #[arg(long)]
    pub config: Option<String>,

    /// Endpoint name, see --list-endpoints
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Upload to verify (.csv, .xlsx, .xls)
    #[arg(long)]
    pub input: Option<String>,

    /// Output directory, overrides load.output_path
    #[arg(long)]
    pub output: Option<String>,

    /// Request option as key=value; values are parsed as JSON when possible
    #[arg(long = "option", value_parser = parse_option)]
    pub options: Vec<(String, Value)>,

    /// Rows verified in parallel, overrides processing.concurrent_requests
    #[arg(long)]
    pub concurrency: Option<usize>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,

    #[arg(long, help = "Print the endpoint catalog and exit")]
    pub list_endpoints: bool,

    #[arg(long, help = "Parse and check the upload without calling any API")]
    pub dry_run: bool,
}

fn parse_option(raw: &str) -> std::result::Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing option name in '{}'", raw));
    }
    let value = serde_json::from_str(value.trim())
        .unwrap_or_else(|_| Value::String(value.trim().to_string()));
    Ok((key.to_string(), value))
}

impl CliArgs {
    pub fn load_config(&self) -> Result<VerifyConfig> {
        let mut config = match &self.config {
            Some(path) => VerifyConfig::from_file(path)?,
            None => VerifyConfig::default(),
        };

        if let Some(output) = &self.output {
            config.load.output_path = output.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.processing.concurrent_requests = concurrency;
        }
        if let Some(endpoint) = &self.endpoint {
            config.run.endpoint = Some(endpoint.clone());
        }
        if let Some(input) = &self.input {
            config.run.input = Some(input.clone());
        }

        Ok(config)
    }

    pub fn option_overrides(&self) -> BTreeMap<String, Value> {
        self.options.iter().cloned().collect()
    }
}

pub fn required_setting(value: &Option<String>, field: &str) -> Result<String> {
    value
        .clone()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| VerifyError::MissingConfigError {
            field: field.to_string(),
        })
}
