//! Action primitives over a [`cdp_adapter::PageDriver`].
//!
//! - Declarative element descriptors resolved to the first *visible* match
//! - Bounded polling for elements that render asynchronously
//! - Navigation followed by a mandatory network-idle wait

pub mod errors;
mod locator;
mod primitives;
pub mod types;
mod waiting;

pub use errors::*;
pub use locator::*;
pub use primitives::*;
pub use types::*;
pub use waiting::*;
