//! Domain constants
//!
//! Centralized location for values shared by the engine and its adapters.

// Composite identifiers
pub const FIELD_DELIMITER: &str = "#";

// Pagination
pub const DEFAULT_PAGE_SIZE: u64 = 20;

// Submission acknowledgement
pub const ACCEPTED_RETURN_CODE: &str = "0";

// A task handle of "0" means the submission finished synchronously
pub const NULL_HANDLE: &str = "0";

// Rate limiting
pub const DEFAULT_RATE_BUDGET: u64 = 20;
pub const DEFAULT_RATE_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_RATE_MAX_WAIT_MS: u64 = 60_000;

// Retry profiles
pub const SHORT_READ_INTERVAL_MS: u64 = 2_000;
pub const SHORT_READ_DEADLINE_MS: u64 = 3 * 60 * 1_000;
pub const WRITE_INTERVAL_MS: u64 = 2_000;
pub const WRITE_DEADLINE_MS: u64 = 5 * 60 * 1_000;
pub const LONG_CONVERGE_INTERVAL_MS: u64 = 10_000;
pub const LONG_CONVERGE_DEADLINE_MS: u64 = 4 * WRITE_DEADLINE_MS;

// Error codes synthesized by client adapters
pub const NETWORK_ERROR_CODE: &str = "ClientError.NetworkError";
pub const HTTP_STATUS_ERROR_CODE: &str = "ClientError.HttpStatusCodeError";
pub const DECODE_ERROR_CODE: &str = "ClientError.DecodeError";

// HTTP adapter
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;
pub const ACTION_HEADER: &str = "X-Action";
