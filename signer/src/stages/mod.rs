//! Pipeline stages.
//!
//! [`base::Stage`] defines the contract every stage follows. The three signing stages are:
//!
//! - [`first_hash`]: `i64 -> String`, one task per item plus two branch tasks, the expensive
//!   branch serialized by the resource guard.
//! - [`multi_hash`]: `String -> String`, one task per item plus six hash tasks, concatenated in
//!   index order.
//! - [`combine`]: `String -> String`, collects everything and emits one sorted, joined item.

pub mod base;
pub mod combine;
pub mod first_hash;
pub mod multi_hash;

pub use base::Stage;
pub use combine::CombineStage;
pub use first_hash::FirstHashStage;
pub use multi_hash::MultiHashStage;
