//! Context whose accessors can be swapped, for tests.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::context::{self, AccessorContext, ContextGuard};
use crate::domain::store::{StoreDongleAccessor, StoreWidgetAccessor};
use crate::domain::{DongleAccessor, WidgetAccessor};
use crate::errors::{ContextError, Result};

/// Starts out with the same accessors as the default context; any slot can
/// then be replaced, typically with a mock.
///
/// Be sure to release it when done, either explicitly, through a
/// [`ContextGuard`], or with [`context::with_context`].
pub struct MockableAccessorContext {
    widget: RwLock<Arc<dyn WidgetAccessor>>,
    dongle: RwLock<Arc<dyn DongleAccessor>>,
}

impl MockableAccessorContext {
    pub fn new() -> Self {
        Self {
            widget: RwLock::new(Arc::new(StoreWidgetAccessor)),
            dongle: RwLock::new(Arc::new(StoreDongleAccessor)),
        }
    }

    pub fn set_widget(&self, widget: Arc<dyn WidgetAccessor>) -> Arc<dyn WidgetAccessor> {
        *self.widget.write() = Arc::clone(&widget);
        widget
    }

    pub fn set_dongle(&self, dongle: Arc<dyn DongleAccessor>) -> Arc<dyn DongleAccessor> {
        *self.dongle.write() = Arc::clone(&dongle);
        dongle
    }

    /// Pushes this context onto the current thread's stack.
    pub fn establish(self: &Arc<Self>) -> Arc<Self> {
        context::establish(Arc::clone(self) as Arc<dyn AccessorContext>);
        Arc::clone(self)
    }

    /// Same as [`context::scoped`] for this context.
    pub fn scoped(self: &Arc<Self>) -> ContextGuard {
        context::scoped(Arc::clone(self) as Arc<dyn AccessorContext>)
    }

    /// Pops this context off the current thread's stack.
    pub fn release(&self) -> Result<()> {
        context::release(self)
    }
}

impl Default for MockableAccessorContext {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessorContext for MockableAccessorContext {
    fn name(&self) -> &'static str { "MockableAccessorContext" }
    fn widget(&self) -> Arc<dyn WidgetAccessor> { self.widget.read().clone() }
    fn dongle(&self) -> Arc<dyn DongleAccessor> { self.dongle.read().clone() }
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> { self }
}

impl fmt::Debug for MockableAccessorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockableAccessorContext").finish_non_exhaustive()
    }
}

/// Creates a fresh [`MockableAccessorContext`] and establishes it on the
/// current thread.
pub fn establish_mockable() -> Arc<MockableAccessorContext> {
    Arc::new(MockableAccessorContext::new()).establish()
}

/// Returns the current context if it is a [`MockableAccessorContext`].
pub fn get_mockable() -> Result<Arc<MockableAccessorContext>> {
    context::get()
        .into_any()
        .downcast::<MockableAccessorContext>()
        .map_err(|_| ContextError::NoMockableContext)
}
