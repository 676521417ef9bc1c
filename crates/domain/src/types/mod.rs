//! Domain types for remote calls and their convergence

pub mod page;
pub mod poll;
pub mod remote;
pub mod submission;

pub use page::{Page, PageRequest};
pub use poll::{PollOutcome, StatusCode, StatusReport, StatusTable, TaskState};
pub use remote::RemoteError;
pub use submission::{AsyncHandle, NotFoundPolicy, OrderRef, OrderResolution, Submission};
