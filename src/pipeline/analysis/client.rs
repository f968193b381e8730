use super::types::{AnalysisError, AnalysisRequest, AnalysisResult, EngineEnvelope};
use crate::config;

/// Fixed timeout for one analysis call: 5 minutes.
const ANALYSIS_TIMEOUT_SECS: u64 = 300;

/// One outbound call to the external analysis engine. Implementations must
/// surface timeouts and non-success responses as errors, never as empty
/// results.
pub trait AnalysisClient: Send + Sync {
    fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError>;
}

/// HTTP adapter for the analysis engine (`POST /api/generate-insights`).
pub struct HttpAnalysisClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl HttpAnalysisClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        }
    }

    /// Engine URL from `ANALYSIS_ENGINE_URL`, default local instance,
    /// with the standard 5-minute timeout.
    pub fn from_env() -> Self {
        Self::new(&config::analysis_engine_url(), ANALYSIS_TIMEOUT_SECS)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl AnalysisClient for HttpAnalysisClient {
    fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        let url = format!("{}/api/generate-insights", self.base_url);

        let response = self.client.post(&url).json(request).send().map_err(|e| {
            if e.is_connect() {
                AnalysisError::Connection(self.base_url.clone())
            } else if e.is_timeout() {
                AnalysisError::Timeout(self.timeout_secs)
            } else {
                AnalysisError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AnalysisError::EngineStatus {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: EngineEnvelope = response
            .json()
            .map_err(|e| AnalysisError::ResponseParsing(e.to_string()))?;

        if !envelope.success {
            return Err(AnalysisError::Rejected(
                envelope
                    .message
                    .unwrap_or_else(|| "analysis engine reported failure".into()),
            ));
        }

        envelope
            .data
            .ok_or_else(|| AnalysisError::ResponseParsing("success envelope without data".into()))
    }
}

/// Mock analysis client for testing — scripted outcome plus a call counter.
#[cfg(test)]
pub struct MockAnalysisClient {
    outcome: std::sync::Mutex<MockOutcome>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
enum MockOutcome {
    Success(AnalysisResult),
    Failure(String),
}

#[cfg(test)]
impl MockAnalysisClient {
    pub fn succeeding(result: AnalysisResult) -> Self {
        Self {
            outcome: std::sync::Mutex::new(MockOutcome::Success(result)),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: std::sync::Mutex::new(MockOutcome::Failure(message.into())),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn set_failure(&self, message: &str) {
        *self.outcome.lock().unwrap() = MockOutcome::Failure(message.into());
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl AnalysisClient for MockAnalysisClient {
    fn analyze(&self, _request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        match &*self.outcome.lock().unwrap() {
            MockOutcome::Success(result) => Ok(result.clone()),
            MockOutcome::Failure(message) => Err(AnalysisError::Rejected(message.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_trims_trailing_slash() {
        let client = HttpAnalysisClient::new("http://localhost:8000/", 60);
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[test]
    fn constructor_keeps_timeout() {
        let client = HttpAnalysisClient::new("http://localhost:8000", 120);
        assert_eq!(client.timeout_secs, 120);
    }

    #[test]
    fn from_env_uses_standard_timeout() {
        let client = HttpAnalysisClient::from_env();
        assert_eq!(client.timeout_secs, ANALYSIS_TIMEOUT_SECS);
    }

    #[test]
    fn mock_success_returns_result_and_counts() {
        let mock = MockAnalysisClient::succeeding(AnalysisResult {
            ai_summary: "All clear.".into(),
            ..Default::default()
        });
        let req = AnalysisRequest::new("tr-1", &Default::default());
        assert_eq!(mock.analyze(&req).unwrap().ai_summary, "All clear.");
        assert_eq!(mock.analyze(&req).unwrap().ai_summary, "All clear.");
        assert_eq!(mock.call_count(), 2);
    }

    #[test]
    fn mock_failure_surfaces_message() {
        let mock = MockAnalysisClient::failing("engine unavailable");
        let req = AnalysisRequest::new("tr-1", &Default::default());
        let err = mock.analyze(&req).unwrap_err();
        assert!(err.to_string().contains("engine unavailable"));
    }
}
