mod requests_logging;

pub use requests_logging::{log_requests, redact_query, RequestsLoggingLevel};
