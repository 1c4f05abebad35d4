//! Execution engine.
//!
//! # Architecture
//!
//! ```text
//! Executor::run(items, operation)
//!     │
//!     ├── RunSignal (caller's AbortHandle + run-local abort)
//!     │
//!     └── Pool of min(parallel_limit, len) workers, joined with join_all
//!             │
//!             ├── claim index from shared cursor (Mutex<Pool>)
//!             ├── publish Started ──────────────► ProgressBus
//!             ├── operation(&items[i], i, items)
//!             ├── Throttle::remaining → sleep (interruptible by abort)
//!             ├── publish Completed / Failed ───► ProgressBus
//!             └── (index, Slot) collected per worker
//!
//!     Slots assembled by index after the join → RunOutput / RunAborted
//! ```
//!
//! # Module Structure
//!
//! - `abort` - AbortHandle and abort reasons
//! - `executor` - Executor and the worker loop
//! - `output` - Result slots and run statistics
//! - `throttle` - Minimum per-task duration

mod abort;
mod executor;
mod output;
mod throttle;

pub use abort::{AbortHandle, AbortReason};
pub use executor::Executor;
pub use output::{RunOutput, RunStats, Slot};
pub use throttle::Throttle;
