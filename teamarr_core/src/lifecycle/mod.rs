//! Channel lifecycle: numbering, ordering, keyword enforcement, and
//! scheduled creation/deletion.
//!
//! Channels are mutated exclusively through this module, inside a
//! serialized critical section per downstream channel.

pub mod keywords;
pub mod manager;
pub mod numbering;
pub mod ordering;

pub use keywords::{KeywordBehavior, KeywordEnforcer};
pub use manager::{ChannelLifecycleManager, LifecycleDecision};
pub use numbering::{compute_external_occupied, NumberAssigner};
pub use ordering::KeywordOrderingEnforcer;
