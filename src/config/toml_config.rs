use crate::core::client::{Credentials, RunOptions};
use crate::core::endpoint::{merged_catalog, EndpointDescriptor};
use crate::core::output::OutputFormat;
use crate::core::pipeline::LoadSettings;
use crate::utils::error::{Result, VerifyError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyConfig {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub polling: Option<PollingOverrides>,
    #[serde(default)]
    pub load: LoadConfig,
    /// Custom endpoints, or built-ins replaced by name.
    #[serde(default)]
    pub endpoints: Vec<EndpointDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_run_name")]
    pub name: String,
    pub endpoint: Option<String>,
    pub input: Option<String>,
    /// Request options merged into every call, e.g. `fetchFilings = true`.
    #[serde(default)]
    pub options: BTreeMap<String, Value>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            name: default_run_name(),
            endpoint: None,
            input: None,
            options: BTreeMap::new(),
        }
    }
}

fn default_run_name() -> String {
    "bulk-verify".to_string()
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    pub attestr_auth_token: Option<String>,
    pub invincible_client_id: Option<String>,
    pub invincible_secret_key: Option<String>,
    pub probe42_api_key: Option<String>,
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.resolve())
    }
}

impl CredentialsConfig {
    /// Values still of the form `${VAR}` had no environment value.
    pub fn resolve(&self) -> Credentials {
        let usable = |v: &Option<String>| {
            v.as_ref()
                .filter(|s| !(s.starts_with("${") && s.ends_with('}')))
                .cloned()
        };
        Credentials {
            attestr_auth_token: usable(&self.attestr_auth_token),
            invincible_client_id: usable(&self.invincible_client_id),
            invincible_secret_key: usable(&self.invincible_secret_key),
            probe42_api_key: usable(&self.probe42_api_key),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Used for endpoints that declare no timeout of their own.
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    #[serde(default = "default_concurrency")]
    pub concurrent_requests: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            concurrent_requests: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    1
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollingOverrides {
    pub interval_seconds: Option<u64>,
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    #[serde(default = "default_output_path")]
    pub output_path: String,
    #[serde(default = "default_output_formats")]
    pub output_formats: Vec<String>,
    #[serde(default)]
    pub bundle: bool,
    /// Output file stem; defaults to `<endpoint>_results`.
    pub file_stem: Option<String>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
            output_formats: default_output_formats(),
            bundle: false,
            file_stem: None,
        }
    }
}

fn default_output_path() -> String {
    "./output".to_string()
}

fn default_output_formats() -> Vec<String> {
    vec!["csv".to_string()]
}

impl VerifyConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(VerifyError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| VerifyError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unset variables stay
    /// verbatim.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| {
            VerifyError::ConfigValidationError {
                field: "environment".to_string(),
                message: e.to_string(),
            }
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn catalog(&self) -> Vec<EndpointDescriptor> {
        merged_catalog(&self.endpoints)
    }

    pub fn credentials(&self) -> Credentials {
        self.credentials.resolve()
    }

    pub fn run_options(&self, overrides: &BTreeMap<String, Value>) -> RunOptions {
        let mut options = self.run.options.clone();
        options.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));

        let polling = self.polling.clone().unwrap_or_default();
        RunOptions {
            options,
            poll_interval: polling.interval_seconds.map(Duration::from_secs),
            poll_max_attempts: polling.max_attempts,
            default_timeout_secs: self.http.timeout_seconds,
        }
    }

    pub fn load_settings(&self, endpoint: &str) -> Result<LoadSettings> {
        let formats = self
            .load
            .output_formats
            .iter()
            .map(|f| OutputFormat::parse(f))
            .collect::<Result<Vec<_>>>()?;

        Ok(LoadSettings {
            stem: self
                .load
                .file_stem
                .clone()
                .unwrap_or_else(|| format!("{}_results", endpoint.replace('-', "_"))),
            formats,
            bundle: self.load.bundle,
        })
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("run.name", &self.run.name)?;
        validation::validate_path("load.output_path", &self.load.output_path)?;
        validation::validate_positive_number(
            "processing.concurrent_requests",
            self.processing.concurrent_requests,
            1,
        )?;

        if self.load.output_formats.is_empty() {
            return Err(VerifyError::ConfigValidationError {
                field: "load.output_formats".to_string(),
                message: "At least one output format is required".to_string(),
            });
        }
        for format in &self.load.output_formats {
            validation::validate_one_of(
                "load.output_formats",
                &format.to_ascii_lowercase(),
                &OutputFormat::ALL,
            )?;
        }

        if let Some(timeout) = self.http.timeout_seconds {
            validation::validate_positive_number("http.timeout_seconds", timeout as usize, 1)?;
        }

        if let Some(max_attempts) = self.polling.as_ref().and_then(|p| p.max_attempts) {
            validation::validate_positive_number("polling.max_attempts", max_attempts as usize, 1)?;
        }

        for endpoint in &self.endpoints {
            endpoint.validate()?;
        }

        Ok(())
    }
}

impl Validate for VerifyConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::endpoint::{find_endpoint, Provider};
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_minimal_config_uses_defaults() {
        let config = VerifyConfig::from_toml_str("").unwrap();

        assert_eq!(config.run.name, "bulk-verify");
        assert_eq!(config.processing.concurrent_requests, 1);
        assert_eq!(config.load.output_path, "./output");
        assert_eq!(config.load.output_formats, vec!["csv"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution_for_credentials() {
        std::env::set_var("BULK_VERIFY_TEST_TOKEN", "secret-token");

        let toml_content = r#"
[credentials]
attestr_auth_token = "${BULK_VERIFY_TEST_TOKEN}"
invincible_client_id = "${BULK_VERIFY_TEST_UNSET_ID}"
invincible_secret_key = "key"
"#;

        let config = VerifyConfig::from_toml_str(toml_content).unwrap();
        let credentials = config.credentials();
        assert_eq!(credentials.attestr_auth_token.as_deref(), Some("secret-token"));
        assert_eq!(credentials.invincible_client_id, None);
        assert!(credentials.headers_for(Provider::Invincible).is_none());
        assert!(!format!("{:?}", config.credentials).contains("secret-token"));

        std::env::remove_var("BULK_VERIFY_TEST_TOKEN");
    }

    #[test]
    fn test_config_validation() {
        let config = VerifyConfig::from_toml_str(
            r#"
[processing]
concurrent_requests = 0
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config = VerifyConfig::from_toml_str(
            r#"
[load]
output_formats = ["csv", "xml"]
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_output_formats_are_case_insensitive() {
        let config = VerifyConfig::from_toml_str(
            r#"
[load]
output_formats = ["CSV", "Json"]
"#,
        )
        .unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_probe42_key_resolves() {
        let config = VerifyConfig::from_toml_str(
            r#"
[credentials]
probe42_api_key = "probe-key"
"#,
        )
        .unwrap();
        let headers = config.credentials().headers_for(Provider::Probe42).unwrap();
        assert_eq!(headers[0], ("x-api-key".to_string(), "probe-key".to_string()));
        assert!(!format!("{:?}", config.credentials).contains("probe-key"));
    }

    #[test]
    fn test_custom_endpoint_and_override() {
        let toml_content = r#"
[[endpoints]]
name = "pan"
provider = "attestr"
url = "https://sandbox.example.com/pan"
inputs = [{ column = "pan", label = "PAN" }]
body = { pan = "{pan}" }
expected_keys = ["valid", "name"]

[[endpoints]]
name = "company-lookup"
provider = "open"
method = "GET"
url = "https://registry.example.com/companies/{cin}"
inputs = [{ column = "cin" }]
expected_keys = ["status", { column = "city", path = "address.city" }]
expand = { list_field = "officers" }
"#;

        let config = VerifyConfig::from_toml_str(toml_content).unwrap();
        config.validate().unwrap();
        let catalog = config.catalog();

        let pan = find_endpoint(&catalog, "pan").unwrap();
        assert_eq!(pan.url, "https://sandbox.example.com/pan");
        assert_eq!(pan.body, Some(json!({"pan": "{pan}"})));

        let lookup = find_endpoint(&catalog, "company-lookup").unwrap();
        assert_eq!(lookup.provider, Provider::Open);
        assert_eq!(lookup.inputs[0].label(), "cin");
        assert_eq!(lookup.expected_keys[1].path(), "address.city");
        assert!(lookup.body.is_none());
    }

    #[test]
    fn test_invalid_endpoint_url_fails_validation() {
        let toml_content = r#"
[[endpoints]]
name = "broken"
provider = "open"
url = "not-a-url"
inputs = [{ column = "id" }]
"#;
        let config = VerifyConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_run_options_and_load_settings() {
        let toml_content = r#"
[run]
options = { fetchFilings = true }

[http]
timeout_seconds = 45

[polling]
interval_seconds = 2
max_attempts = 3

[load]
output_formats = ["csv", "json"]
bundle = true
"#;
        let config = VerifyConfig::from_toml_str(toml_content).unwrap();

        let mut overrides = BTreeMap::new();
        overrides.insert("fy".to_string(), json!("2023-24"));
        let run = config.run_options(&overrides);
        assert_eq!(run.options["fetchFilings"], json!(true));
        assert_eq!(run.options["fy"], json!("2023-24"));
        assert_eq!(run.poll_interval, Some(Duration::from_secs(2)));
        assert_eq!(run.poll_max_attempts, Some(3));
        assert_eq!(run.default_timeout_secs, Some(45));

        let settings = config.load_settings("bank-account").unwrap();
        assert_eq!(settings.stem, "bank_account_results");
        assert_eq!(settings.formats, vec![OutputFormat::Csv, OutputFormat::Json]);
        assert!(settings.bundle);
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[run]\nname = \"file-test\"\nendpoint = \"gstin\"\n")
            .unwrap();

        let config = VerifyConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.run.name, "file-test");
        assert_eq!(config.run.endpoint.as_deref(), Some("gstin"));
    }
}
