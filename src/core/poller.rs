use crate::core::flatten::render_scalar;
use crate::domain::model::{
    AsyncJob, FailureKind, JobStatus, VerificationResult, MSG_ASYNC_ERRORED,
    MSG_FAILED_TO_INITIATE, MSG_TIMED_OUT,
};
use crate::domain::ports::{ApiRequest, Transport};
use serde_json::Value;
use std::time::Duration;

/// Fixed-interval status polling for submit-then-poll endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsyncPoller {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl AsyncPoller {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Submits the job, then polls until a terminal status or the attempt
    /// budget runs out.
    pub async fn run<F>(
        &self,
        transport: &dyn Transport,
        submit: &ApiRequest,
        job_id_field: &str,
        status_request_for: F,
    ) -> VerificationResult
    where
        F: Fn(&str) -> ApiRequest,
    {
        let submission = match transport.execute(submit).await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("❌ Async submission to {} failed: {}", submit.url, e);
                return VerificationResult::failed(
                    FailureKind::SubmissionFailed,
                    MSG_FAILED_TO_INITIATE,
                );
            }
        };

        let job_id = submission
            .get(job_id_field)
            .map(render_scalar)
            .filter(|id| !id.is_empty());
        let Some(job_id) = job_id else {
            tracing::warn!("⚠️ Submission response carried no '{}' job id", job_id_field);
            return VerificationResult::failed(FailureKind::SubmissionFailed, MSG_FAILED_TO_INITIATE);
        };

        let mut job = AsyncJob::new(job_id);
        tracing::info!(job_id = %job.job_id, "Async verification submitted");

        let status_request = status_request_for(&job.job_id);
        self.poll(transport, &mut job, &status_request).await
    }

    pub async fn poll(
        &self,
        transport: &dyn Transport,
        job: &mut AsyncJob,
        status_request: &ApiRequest,
    ) -> VerificationResult {
        while job.attempts < self.max_attempts {
            tokio::time::sleep(self.interval).await;

            let body = match transport.execute(status_request).await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(job_id = %job.job_id, "Status poll failed: {}", e);
                    job.record_poll(JobStatus::Pending);
                    continue;
                }
            };

            let status = JobStatus::from_remote(body.get("status").and_then(Value::as_str));
            match job.record_poll(status) {
                JobStatus::Completed => {
                    tracing::info!(
                        job_id = %job.job_id,
                        attempts = job.attempts,
                        "Async verification completed"
                    );
                    let output = body.get("output").cloned().unwrap_or(Value::Null);
                    return VerificationResult::succeeded(output);
                }
                JobStatus::Errored => {
                    let message = body
                        .get("error")
                        .and_then(|e| e.get("message"))
                        .and_then(Value::as_str)
                        .filter(|m| !m.trim().is_empty())
                        .unwrap_or(MSG_ASYNC_ERRORED);
                    tracing::warn!(job_id = %job.job_id, "Async verification errored: {}", message);
                    return VerificationResult::failed(FailureKind::AsyncErrored, message);
                }
                _ => {
                    tracing::debug!(
                        job_id = %job.job_id,
                        "Attempt {}/{}: still pending",
                        job.attempts,
                        self.max_attempts
                    );
                }
            }
        }

        job.time_out();
        tracing::warn!(
            job_id = %job.job_id,
            "Async verification timed out after {} attempts",
            job.attempts
        );
        VerificationResult::failed(FailureKind::AsyncTimedOut, MSG_TIMED_OUT)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::ports::{HttpMethod, TransportError};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted responses in order and records every request URL.
    pub(crate) struct ScriptedTransport {
        responses: Mutex<VecDeque<std::result::Result<Value, TransportError>>>,
        pub(crate) calls: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new(responses: Vec<std::result::Result<Value, TransportError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn execute(&self, request: &ApiRequest) -> std::result::Result<Value, TransportError> {
            self.calls.lock().unwrap().push(request.url.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(json!({"status": "IN_PROGRESS"})))
        }
    }

    fn request(url: &str) -> ApiRequest {
        ApiRequest {
            method: HttpMethod::Get,
            url: url.to_string(),
            headers: Vec::new(),
            body: None,
            timeout: Duration::from_secs(1),
        }
    }

    fn poller(max_attempts: u32) -> AsyncPoller {
        AsyncPoller::new(Duration::from_millis(1), max_attempts)
    }

    async fn run(poller: AsyncPoller, transport: &ScriptedTransport) -> VerificationResult {
        poller
            .run(transport, &request("http://api/submit"), "_id", |id| {
                request(&format!("http://api/async/{}", id))
            })
            .await
    }

    #[tokio::test]
    async fn test_completes_on_last_attempt() {
        let transport = ScriptedTransport::new(vec![
            Ok(json!({"_id": "job-1"})),
            Ok(json!({"status": "PENDING"})),
            Ok(json!({"status": "IN_PROGRESS"})),
            Ok(json!({"status": "COMPLETED", "output": {"valid": true, "owner": "Jane"}})),
        ]);

        let result = run(poller(3), &transport).await;

        assert!(result.success);
        assert_eq!(result.payload["owner"], "Jane");
        assert_eq!(transport.call_count(), 4);
        assert_eq!(transport.calls.lock().unwrap()[1], "http://api/async/job-1");
    }

    #[tokio::test]
    async fn test_times_out_after_exactly_max_attempts() {
        let transport = ScriptedTransport::new(vec![Ok(json!({"_id": "job-2"}))]);

        let result = run(poller(4), &transport).await;

        assert!(!result.success);
        assert_eq!(result.failure, Some(FailureKind::AsyncTimedOut));
        assert_eq!(result.message, MSG_TIMED_OUT);
        assert_eq!(transport.call_count(), 1 + 4);
    }

    #[tokio::test]
    async fn test_errored_uses_remote_message() {
        let transport = ScriptedTransport::new(vec![
            Ok(json!({"_id": "job-3"})),
            Ok(json!({"status": "ERRORED", "error": {"message": "Invalid DOB"}})),
        ]);
        let result = run(poller(5), &transport).await;
        assert_eq!(result.failure, Some(FailureKind::AsyncErrored));
        assert_eq!(result.message, "Invalid DOB");

        let transport = ScriptedTransport::new(vec![
            Ok(json!({"_id": "job-4"})),
            Ok(json!({"status": "ERRORED"})),
        ]);
        let result = run(poller(5), &transport).await;
        assert_eq!(result.message, MSG_ASYNC_ERRORED);
    }

    #[tokio::test]
    async fn test_missing_job_id_never_polls() {
        let transport = ScriptedTransport::new(vec![Ok(json!({"message": "bad request"}))]);

        let result = run(poller(5), &transport).await;

        assert_eq!(result.failure, Some(FailureKind::SubmissionFailed));
        assert_eq!(result.message, MSG_FAILED_TO_INITIATE);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_status_poll_counts_as_attempt() {
        let transport = ScriptedTransport::new(vec![
            Ok(json!({"_id": 99})),
            Err(TransportError::HttpStatus { status: 502 }),
            Ok(json!({"status": "COMPLETED", "output": {"valid": true}})),
        ]);

        let result = run(poller(2), &transport).await;

        assert!(result.success);
        assert_eq!(transport.calls.lock().unwrap()[2], "http://api/async/99");
    }
}
