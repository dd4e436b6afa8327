//! Thread-scoped accessor contexts.
//!
//! Production code reaches its collaborators through [`get`]; tests establish
//! a [`MockableAccessorContext`] on their own thread and swap accessors in it
//! without touching the call sites.

pub mod context;
pub mod domain;
pub mod errors;
pub mod mockable;

pub use context::{depth, establish, get, release, scoped, with_context, AccessorContext, ContextGuard};
pub use domain::{Dongle, DongleAccessor, DongleService, Widget, WidgetAccessor, WidgetService};
pub use errors::{ContextError, Result};
pub use mockable::{establish_mockable, get_mockable, MockableAccessorContext};
