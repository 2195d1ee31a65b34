//! Concurrency primitives for coordinating pipeline stages.
//!
//! Every stage is built from the same three pieces:
//!
//! - [`queue`]: typed unbounded channels between stages, closed by dropping every sender.
//! - [`barrier`]: fan-in over exactly the tasks a stage (or a single item) has spawned.
//! - [`guard`]: injectable mutual exclusion around the expensive signing primitive.
//!
//! The structural rule tying them together is that a component drops its output sender only
//! after its barrier has resolved, so the downstream consumer never observes a truncated
//! stream.

pub mod barrier;
pub mod guard;
pub mod queue;
