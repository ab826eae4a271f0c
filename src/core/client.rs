use crate::core::cache::fingerprint;
use crate::core::endpoint::{
    fill_template, whole_placeholder, EndpointDescriptor, Provider, PROBE42_API_VERSION,
};
use crate::core::flatten::{data_root, is_falsy};
use crate::core::poller::AsyncPoller;
use crate::domain::model::{
    FailureKind, LookupKey, VerificationResult, MSG_AUTH_MISSING, MSG_NO_DATA,
};
use crate::domain::ports::{ApiRequest, HttpMethod, Transport};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Provider secrets for one run. Blank values count as absent.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub attestr_auth_token: Option<String>,
    pub invincible_client_id: Option<String>,
    pub invincible_secret_key: Option<String>,
    pub probe42_api_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| if present(v).is_some() { "***" } else { "<unset>" };
        f.debug_struct("Credentials")
            .field("attestr_auth_token", &mask(&self.attestr_auth_token))
            .field("invincible_client_id", &mask(&self.invincible_client_id))
            .field("invincible_secret_key", &mask(&self.invincible_secret_key))
            .field("probe42_api_key", &mask(&self.probe42_api_key))
            .finish()
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Credentials {
    /// Auth headers for `provider`, or `None` when a secret is missing.
    pub fn headers_for(&self, provider: Provider) -> Option<Vec<(String, String)>> {
        match provider {
            Provider::Attestr => {
                let token = present(&self.attestr_auth_token)?;
                Some(vec![(
                    "Authorization".to_string(),
                    format!("Basic {}", token),
                )])
            }
            Provider::Invincible => {
                let client_id = present(&self.invincible_client_id)?;
                let secret_key = present(&self.invincible_secret_key)?;
                Some(vec![
                    ("clientId".to_string(), client_id.to_string()),
                    ("secretKey".to_string(), secret_key.to_string()),
                ])
            }
            Provider::Probe42 => {
                let api_key = present(&self.probe42_api_key)?;
                Some(vec![
                    ("x-api-key".to_string(), api_key.to_string()),
                    ("x-api-version".to_string(), PROBE42_API_VERSION.to_string()),
                ])
            }
            Provider::Open => Some(Vec::new()),
        }
    }

    pub fn fingerprint(&self, provider: Provider) -> u64 {
        match provider {
            Provider::Attestr => fingerprint(&present(&self.attestr_auth_token)),
            Provider::Invincible => fingerprint(&(
                present(&self.invincible_client_id),
                present(&self.invincible_secret_key),
            )),
            Provider::Probe42 => fingerprint(&present(&self.probe42_api_key)),
            Provider::Open => 0,
        }
    }
}

/// Per-run overrides layered over an endpoint's defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOptions {
    pub options: BTreeMap<String, Value>,
    pub poll_interval: Option<Duration>,
    pub poll_max_attempts: Option<u32>,
    pub default_timeout_secs: Option<u64>,
}

/// One endpoint's request/response round trip. Never fails: every error
/// becomes a failed `VerificationResult`.
pub struct VerificationClient {
    descriptor: Arc<EndpointDescriptor>,
    transport: Arc<dyn Transport>,
    credentials: Credentials,
    options: BTreeMap<String, Value>,
    timeout: Duration,
    poller: Option<AsyncPoller>,
}

impl VerificationClient {
    pub fn new(
        descriptor: Arc<EndpointDescriptor>,
        transport: Arc<dyn Transport>,
        credentials: Credentials,
        run: &RunOptions,
    ) -> Self {
        let options = descriptor.effective_options(&run.options);
        let timeout = descriptor.timeout(
            run.default_timeout_secs
                .unwrap_or(crate::core::endpoint::DEFAULT_TIMEOUT_SECS),
        );
        let poller = descriptor.polling.as_ref().map(|p| {
            AsyncPoller::new(
                run.poll_interval
                    .unwrap_or(Duration::from_secs(p.interval_seconds)),
                run.poll_max_attempts.unwrap_or(p.max_attempts),
            )
        });

        Self {
            descriptor,
            transport,
            credentials,
            options,
            timeout,
            poller,
        }
    }

    pub fn descriptor(&self) -> &EndpointDescriptor {
        &self.descriptor
    }

    pub fn options(&self) -> &BTreeMap<String, Value> {
        &self.options
    }

    pub fn credential_fingerprint(&self) -> u64 {
        self.credentials.fingerprint(self.descriptor.provider)
    }

    pub async fn call(&self, key: &LookupKey) -> VerificationResult {
        let Some(headers) = self.credentials.headers_for(self.descriptor.provider) else {
            tracing::error!(
                "❌ No {} credentials configured for '{}'",
                self.descriptor.provider.as_str(),
                self.descriptor.name
            );
            return VerificationResult::failed(FailureKind::AuthMissing, MSG_AUTH_MISSING);
        };

        let request = self.build_request(key, headers.clone());

        if let (Some(poller), Some(polling)) = (&self.poller, &self.descriptor.polling) {
            let result = poller
                .run(
                    self.transport.as_ref(),
                    &request,
                    &polling.job_id_field,
                    |job_id| self.status_request(&polling.status_url, job_id, headers.clone()),
                )
                .await;
            return self.check_payload(result, key);
        }

        match self.transport.execute(&request).await {
            Ok(payload) => self.check_payload(VerificationResult::succeeded(payload), key),
            Err(e) => {
                tracing::error!(
                    "❌ {} call failed for {}: {}",
                    self.descriptor.name,
                    key.describe(),
                    e
                );
                VerificationResult::failed(FailureKind::TransportFailure, MSG_NO_DATA)
            }
        }
    }

    fn check_payload(&self, result: VerificationResult, key: &LookupKey) -> VerificationResult {
        if result.success && is_falsy(data_root(&result.payload, &self.descriptor)) {
            tracing::warn!(
                "⚠️ {} returned no data for {}",
                self.descriptor.name,
                key.describe()
            );
            return VerificationResult::failed(FailureKind::NoDataReturned, MSG_NO_DATA);
        }
        result
    }

    pub fn build_request(&self, key: &LookupKey, headers: Vec<(String, String)>) -> ApiRequest {
        let (url, unresolved) = fill_template(&self.descriptor.url, |name| {
            self.lookup_text(key, name)
                .map(|v| url::form_urlencoded::byte_serialize(v.as_bytes()).collect())
        });
        if !unresolved.is_empty() {
            tracing::warn!(
                "⚠️ URL placeholders without values: {}",
                unresolved.join(", ")
            );
        }

        let body = match self.descriptor.method {
            HttpMethod::Get => None,
            HttpMethod::Post => Some(self.build_body(key)),
        };

        ApiRequest {
            method: self.descriptor.method,
            url,
            headers,
            body,
            timeout: self.timeout,
        }
    }

    fn status_request(
        &self,
        status_url: &str,
        job_id: &str,
        headers: Vec<(String, String)>,
    ) -> ApiRequest {
        let (url, _) = fill_template(status_url, |name| {
            (name == "job_id").then(|| job_id.to_string())
        });
        ApiRequest {
            method: HttpMethod::Get,
            url,
            headers,
            body: None,
            timeout: self.timeout,
        }
    }

    fn lookup_text(&self, key: &LookupKey, name: &str) -> Option<String> {
        key.get(name).map(str::to_string).or_else(|| {
            self.options.get(name).map(crate::core::flatten::render_scalar)
        })
    }

    fn build_body(&self, key: &LookupKey) -> Value {
        let mut body = match &self.descriptor.body {
            Some(template) => self.fill_value(template, key).unwrap_or(Value::Null),
            None => Value::Object(Map::new()),
        };

        if let Value::Object(map) = &mut body {
            for (name, value) in &self.options {
                map.insert(name.clone(), value.clone());
            }
        }
        body
    }

    /// `None` drops the enclosing object entry: a lone placeholder with no
    /// value behind it.
    fn fill_value(&self, template: &Value, key: &LookupKey) -> Option<Value> {
        match template {
            Value::String(s) => match whole_placeholder(s) {
                Some(name) => key
                    .get(name)
                    .map(|v| Value::String(v.to_string()))
                    .or_else(|| self.options.get(name).cloned()),
                None => {
                    let (filled, _) = fill_template(s, |name| self.lookup_text(key, name));
                    Some(Value::String(filled))
                }
            },
            Value::Object(map) => Some(Value::Object(
                map.iter()
                    .filter_map(|(k, v)| self.fill_value(v, key).map(|v| (k.clone(), v)))
                    .collect(),
            )),
            Value::Array(items) => Some(Value::Array(
                items
                    .iter()
                    .map(|v| self.fill_value(v, key).unwrap_or(Value::Null))
                    .collect(),
            )),
            other => Some(other.clone()),
        }
    }
}
