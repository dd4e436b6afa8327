//! Thread-scoped stack of accessor contexts.
//!
//! Each thread owns a stack of contexts kept in a thread local. Normally the
//! stack is absent and [`get`] hands out one shared default context; that is
//! fine across threads because accessors carry no state. Tests push their own
//! context with [`establish`] and must pop it again with [`release`], either
//! by hand or through a [`ContextGuard`] / [`with_context`].
//!
//! Slot getters are deliberately short so call sites stay compact:
//!
//! ```
//! # use accessor_context::{AccessorContext, WidgetAccessor};
//! let widget = accessor_context::get().widget().get_widget();
//! assert!(widget.is_some());
//! ```

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, LazyLock};

use tracing::{debug, error, warn};

use crate::domain::store::{StoreDongleAccessor, StoreWidgetAccessor};
use crate::domain::{DongleAccessor, WidgetAccessor};
use crate::errors::{ContextError, Result};

/// Holder for every accessor slot. Adding a collaborator means adding one
/// getter here and a matching field in each implementation.
pub trait AccessorContext: Send + Sync + 'static {
    fn name(&self) -> &'static str;
    fn widget(&self) -> Arc<dyn WidgetAccessor>;
    fn dongle(&self) -> Arc<dyn DongleAccessor>;

    /// Upcast used to recover the concrete context type.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// The process-wide default. Its slots are fixed at construction and it has
/// no setters, so sharing it between threads needs no synchronisation.
struct FinalAccessorContext {
    widget: Arc<dyn WidgetAccessor>,
    dongle: Arc<dyn DongleAccessor>,
}

impl FinalAccessorContext {
    fn new() -> Self {
        Self {
            widget: Arc::new(StoreWidgetAccessor),
            dongle: Arc::new(StoreDongleAccessor),
        }
    }
}

impl AccessorContext for FinalAccessorContext {
    fn name(&self) -> &'static str { "FinalAccessorContext" }
    fn widget(&self) -> Arc<dyn WidgetAccessor> { Arc::clone(&self.widget) }
    fn dongle(&self) -> Arc<dyn DongleAccessor> { Arc::clone(&self.dongle) }
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> { self }
}

impl fmt::Debug for FinalAccessorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinalAccessorContext").finish_non_exhaustive()
    }
}

static DEFAULT: LazyLock<Arc<dyn AccessorContext>> =
    LazyLock::new(|| Arc::new(FinalAccessorContext::new()));

thread_local! {
    // `None` means no context was ever established, or every one was released.
    static STACK: RefCell<Option<Vec<Arc<dyn AccessorContext>>>> = const { RefCell::new(None) };
}

/// Returns the current context: the top of this thread's stack, or the
/// shared default when nothing is established. Once the thread's stack has
/// been torn down, the default is returned as well.
pub fn get() -> Arc<dyn AccessorContext> {
    STACK
        .try_with(|cell| cell.borrow().as_ref().and_then(|stack| stack.last().cloned()))
        .ok()
        .flatten()
        .unwrap_or_else(|| Arc::clone(&DEFAULT))
}

/// Pushes `context` onto this thread's stack so [`get`] returns it.
///
/// Every call must be matched by a [`release`] of the same context, in
/// reverse order of establishment. Establishing the same context twice is
/// allowed and needs two releases.
pub fn establish(context: Arc<dyn AccessorContext>) -> Arc<dyn AccessorContext> {
    let depth = STACK.with(|cell| {
        let mut slot = cell.borrow_mut();
        let stack = slot.get_or_insert_with(Vec::new);
        stack.push(Arc::clone(&context));
        stack.len()
    });
    debug!(context = context.name(), depth, "established accessor context");
    context
}

/// Pops `context` off this thread's stack.
///
/// Fails with [`ContextError::NothingToRelease`] when the stack is empty and
/// with [`ContextError::NotCurrent`] when `context` is not on top. The stack
/// is left untouched on failure.
pub fn release<C>(context: &C) -> Result<()>
where
    C: AccessorContext + ?Sized,
{
    let target = address(context);
    let outcome = STACK.with(|cell| {
        let mut slot = cell.borrow_mut();
        let Some(stack) = slot.as_mut() else {
            return Err(ContextError::NothingToRelease);
        };
        match stack.last() {
            None => return Err(ContextError::NothingToRelease),
            Some(top) if address(&**top) != target => {
                return Err(ContextError::NotCurrent { context: describe(context) });
            }
            Some(_) => {}
        }
        stack.pop();
        let depth = stack.len();
        if depth == 0 {
            *slot = None;
        }
        Ok(depth)
    });

    match outcome {
        Ok(depth) => {
            debug!(context = context.name(), depth, "released accessor context");
            Ok(())
        }
        Err(err) => {
            warn!(context = context.name(), %err, "accessor context release rejected");
            Err(err)
        }
    }
}

/// Number of contexts established on this thread; zero when the stack is absent.
pub fn depth() -> usize {
    STACK
        .try_with(|cell| cell.borrow().as_ref().map_or(0, Vec::len))
        .unwrap_or(0)
}

/// Establishes `context` and returns a guard that releases it when dropped.
pub fn scoped(context: Arc<dyn AccessorContext>) -> ContextGuard {
    ContextGuard {
        context: establish(context),
        released: false,
        _thread_bound: PhantomData,
    }
}

/// Runs `body` with `context` established, releasing it afterwards even if
/// `body` panics.
pub fn with_context<R>(context: Arc<dyn AccessorContext>, body: impl FnOnce() -> R) -> Result<R> {
    let guard = scoped(context);
    let out = body();
    guard.close()?;
    Ok(out)
}

/// Releases its context on drop. Dropping it on a thread other than the one
/// that established the context is impossible since the guard is `!Send`.
#[must_use = "dropping the guard immediately releases the context"]
pub struct ContextGuard {
    context: Arc<dyn AccessorContext>,
    released: bool,
    _thread_bound: PhantomData<*const ()>,
}

impl ContextGuard {
    pub fn context(&self) -> &Arc<dyn AccessorContext> {
        &self.context
    }

    /// Releases the context now and reports misuse instead of panicking.
    pub fn close(mut self) -> Result<()> {
        self.released = true;
        release(&*self.context)
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(err) = release(&*self.context) {
            if std::thread::panicking() {
                error!(context = self.context.name(), %err, "accessor context not released during unwind");
            } else {
                panic!("failed to release accessor context: {err}");
            }
        }
    }
}

impl fmt::Debug for ContextGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextGuard")
            .field("context", &describe(&*self.context))
            .field("released", &self.released)
            .finish()
    }
}

fn address<C: ?Sized>(context: &C) -> *const () {
    (context as *const C).cast()
}

fn describe<C: AccessorContext + ?Sized>(context: &C) -> String {
    format!("{}@{:p}", context.name(), address(context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mockable::MockableAccessorContext;
    use pretty_assertions::assert_eq;
    use std::sync::mpsc;
    use std::thread;

    fn stack_is_absent() -> bool {
        STACK.with(|cell| cell.borrow().is_none())
    }

    #[test]
    fn default_is_shared_singleton() {
        let a = get();
        let b = get();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.name(), "FinalAccessorContext");
    }

    #[test]
    fn storage_is_dropped_when_last_context_released() {
        assert!(stack_is_absent());
        let ctx: Arc<dyn AccessorContext> = Arc::new(MockableAccessorContext::new());
        establish(Arc::clone(&ctx));
        assert!(!stack_is_absent());
        release(&*ctx).unwrap();
        assert!(stack_is_absent());
    }

    #[test]
    fn failed_release_leaves_stack_untouched() {
        let outer: Arc<dyn AccessorContext> = Arc::new(MockableAccessorContext::new());
        let inner: Arc<dyn AccessorContext> = Arc::new(MockableAccessorContext::new());
        establish(Arc::clone(&outer));
        establish(Arc::clone(&inner));

        let err = release(&*outer).unwrap_err();
        assert!(matches!(err, ContextError::NotCurrent { .. }));
        assert_eq!(depth(), 2);
        assert!(Arc::ptr_eq(&get(), &inner));

        release(&*inner).unwrap();
        release(&*outer).unwrap();
        assert!(stack_is_absent());
    }

    #[test]
    fn mismatch_message_names_the_context() {
        let ctx = MockableAccessorContext::new();
        let stranger: Arc<dyn AccessorContext> = Arc::new(MockableAccessorContext::new());
        establish(Arc::clone(&stranger));
        let err = release(&ctx).unwrap_err();
        assert!(err.to_string().starts_with("MockableAccessorContext@"));
        assert!(err.to_string().ends_with("is not the current context"));
        release(&*stranger).unwrap();
    }

    #[test]
    fn guard_drop_during_panic_does_not_abort() {
        let result = std::panic::catch_unwind(|| {
            let ctx: Arc<dyn AccessorContext> = Arc::new(MockableAccessorContext::new());
            let _guard = scoped(Arc::clone(&ctx));
            // Break the discipline so the guard's own release fails while unwinding.
            release(&*ctx).unwrap();
            panic!("test body failed");
        });
        assert!(result.is_err());
        assert!(stack_is_absent());
    }

    // Reports what `get()` returns from inside a thread-local destructor.
    struct TeardownReporter(mpsc::Sender<&'static str>);

    impl Drop for TeardownReporter {
        fn drop(&mut self) {
            let seen = std::panic::catch_unwind(|| get().name()).unwrap_or("panicked");
            let _ = self.0.send(seen);
        }
    }

    thread_local! {
        static REPORTER: RefCell<Option<TeardownReporter>> = const { RefCell::new(None) };
    }

    #[test]
    fn get_falls_back_to_default_after_stack_teardown() {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            // Registered before the stack, so its destructor runs after the stack's.
            REPORTER.with(|cell| *cell.borrow_mut() = Some(TeardownReporter(tx)));
            let ctx: Arc<dyn AccessorContext> = Arc::new(MockableAccessorContext::new());
            establish(Arc::clone(&ctx));
            release(&*ctx).unwrap();
        })
        .join()
        .unwrap();

        assert_eq!(rx.recv().unwrap(), "FinalAccessorContext");
    }
}
