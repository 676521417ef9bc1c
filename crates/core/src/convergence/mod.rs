//! Driving asynchronous submissions to a terminal state
//!
//! ```text
//! Submitted ──(order)──► resolve order ──► Polling ──► Succeeded
//!     │                                     │   ▲
//!     └──────────(task handle)──────────────┘   └─ Pending
//!                                           └──► Failed
//! ```
//!
//! The [`TaskProtocol`] says which actions and fields carry orders, handles
//! and status codes; the [`StatusTable`](convergent_domain::StatusTable)
//! passed per call says which codes are terminal.

pub mod protocol;
pub mod workflow;

pub use protocol::{JsonTaskProtocol, TaskProtocol};
pub use workflow::{ConvergenceWorkflow, ResolvedOrder};
