//! Example domain reached through the accessor slots of a context.
//!
//! Accessors are stateless handles for fetching domain objects. Services never
//! hold one; they look it up on the active context at call time, which is what
//! lets a test substitute its own.

use serde::Serialize;

mod services;

pub use services::{DongleService, WidgetService};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Widget {
    pub id: u64,
    pub standardized: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Dongle {
    pub id: u64,
    pub name: String,
    pub customized: bool,
}

/// Fetches widgets.
#[cfg_attr(test, mockall::automock)]
pub trait WidgetAccessor: Send + Sync {
    fn get_widget(&self) -> Option<Widget>;
}

/// Fetches dongles by id.
#[cfg_attr(test, mockall::automock)]
pub trait DongleAccessor: Send + Sync {
    fn get_by_id(&self, id: u64) -> Option<Dongle>;
}

/// Accessors installed in every context unless a test swaps them out.
pub mod store {
    use super::*;

    #[derive(Debug, Default)]
    pub struct StoreWidgetAccessor;
    impl WidgetAccessor for StoreWidgetAccessor {
        fn get_widget(&self) -> Option<Widget> {
            Some(Widget { id: 1, standardized: false })
        }
    }

    #[derive(Debug, Default)]
    pub struct StoreDongleAccessor;
    impl DongleAccessor for StoreDongleAccessor {
        fn get_by_id(&self, id: u64) -> Option<Dongle> {
            Some(Dongle { id, name: format!("dongle-{id}"), customized: false })
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn store_accessors_return_unprocessed_values() {
            assert_eq!(
                StoreWidgetAccessor.get_widget(),
                Some(Widget { id: 1, standardized: false })
            );
            let dongle = StoreDongleAccessor.get_by_id(7).unwrap();
            assert_eq!(dongle.name, "dongle-7");
            assert!(!dongle.customized);
        }
    }
}
