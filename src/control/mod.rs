// Control module - bounded retry and polling loops shared by all call sites

pub mod poll;
pub mod retry;

pub use poll::{PollError, PollPolicy, poll_until};
pub use retry::{RetryPolicy, retry_when};
