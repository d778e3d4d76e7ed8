use std::time::Duration;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Maximum time `connect` may take to resolve. Default: 5000 ms.
    pub connection_timeout: Duration,
    /// Maximum time a synchronous call waits for its response.
    /// Default: 3000 ms.
    pub request_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_millis(5000),
            request_timeout: Duration::from_millis(3000),
        }
    }
}
