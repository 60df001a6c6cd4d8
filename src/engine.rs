//! Single-flight engine loading.
//!
//! Typesetting and diagram engines are expensive to bring up and are shared
//! by every render pass. An [`EngineSlot`] owns one engine's lifecycle:
//!
//! - the first caller starts the load; concurrent callers await the same
//!   in-flight future
//! - a successful load is cached for the life of the slot
//! - a failed load clears the slot so the next caller starts a fresh one
//!
//! There is no retry limit and no backoff: repeated failures reload on
//! every call and never block callers that do not need the engine.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::{LocalBoxFuture, Shared};
use tracing::{debug, warn};

use crate::error::Result;

type LoadFuture<E> = Shared<LocalBoxFuture<'static, Result<Rc<E>>>>;
type Loader<E> = Box<dyn Fn() -> LocalBoxFuture<'static, Result<Rc<E>>>>;

enum SlotState<E: ?Sized> {
    Idle,
    Loading { generation: u64, load: LoadFuture<E> },
    Ready(Rc<E>),
}

/// Lazily loaded, shared engine.
pub struct EngineSlot<E: ?Sized> {
    name: &'static str,
    loader: Loader<E>,
    state: RefCell<SlotState<E>>,
    generation: Cell<u64>,
    load_attempts: Cell<usize>,
}

impl<E: ?Sized + 'static> EngineSlot<E> {
    /// Create a slot that loads on first use.
    pub fn new<F>(name: &'static str, loader: F) -> Self
    where
        F: Fn() -> LocalBoxFuture<'static, Result<Rc<E>>> + 'static,
    {
        Self {
            name,
            loader: Box::new(loader),
            state: RefCell::new(SlotState::Idle),
            generation: Cell::new(0),
            load_attempts: Cell::new(0),
        }
    }

    /// Create a slot holding an already constructed engine.
    pub fn ready(name: &'static str, engine: Rc<E>) -> Self {
        let cached = engine.clone();
        let slot = Self::new(name, move || {
            let engine = cached.clone();
            async move { Ok(engine) }.boxed_local()
        });
        *slot.state.borrow_mut() = SlotState::Ready(engine);
        slot
    }

    /// Get the engine, loading it if needed.
    pub async fn get(&self) -> Result<Rc<E>> {
        let (generation, load) = {
            let mut state = self.state.borrow_mut();
            match &*state {
                SlotState::Ready(engine) => return Ok(engine.clone()),
                SlotState::Loading { generation, load } => (*generation, load.clone()),
                SlotState::Idle => {
                    let generation = self.generation.get() + 1;
                    self.generation.set(generation);
                    self.load_attempts.set(self.load_attempts.get() + 1);
                    debug!(engine = self.name, attempt = self.load_attempts.get(), "loading engine");

                    let load = (self.loader)().shared();
                    *state = SlotState::Loading {
                        generation,
                        load: load.clone(),
                    };
                    (generation, load)
                }
            }
        };

        let result = load.await;

        let mut state = self.state.borrow_mut();
        let current = matches!(
            &*state,
            SlotState::Loading { generation: g, .. } if *g == generation
        );
        if current {
            match &result {
                Ok(engine) => {
                    debug!(engine = self.name, "engine ready");
                    *state = SlotState::Ready(engine.clone());
                }
                Err(err) => {
                    warn!(engine = self.name, "engine load failed: {err}");
                    *state = SlotState::Idle;
                }
            }
        }
        result
    }

    /// Whether the engine has loaded.
    pub fn is_ready(&self) -> bool {
        matches!(&*self.state.borrow(), SlotState::Ready(_))
    }

    /// Whether a load is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(&*self.state.borrow(), SlotState::Loading { .. })
    }

    /// Number of times the loader has been started.
    pub fn load_attempts(&self) -> usize {
        self.load_attempts.get()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<E: ?Sized> fmt::Debug for EngineSlot<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.state.borrow() {
            SlotState::Idle => "idle",
            SlotState::Loading { .. } => "loading",
            SlotState::Ready(_) => "ready",
        };
        f.debug_struct("EngineSlot")
            .field("name", &self.name)
            .field("state", &state)
            .field("load_attempts", &self.load_attempts.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use futures::channel::oneshot;
    use futures::executor::block_on;
    use futures::future::join;

    use super::*;
    use crate::error::Error;

    #[test]
    fn test_loads_once_and_caches() {
        let slot: EngineSlot<String> =
            EngineSlot::new("test", || async { Ok(Rc::new("engine".to_string())) }.boxed_local());

        let first = block_on(slot.get()).unwrap();
        let second = block_on(slot.get()).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(slot.load_attempts(), 1);
        assert!(slot.is_ready());
    }

    #[test]
    fn test_concurrent_callers_share_one_load() {
        let (tx, rx) = oneshot::channel::<()>();
        let gate = RefCell::new(Some(rx));
        let slot: EngineSlot<u32> = EngineSlot::new("gated", move || {
            let rx = gate.borrow_mut().take();
            async move {
                if let Some(rx) = rx {
                    let _ = rx.await;
                }
                Ok(Rc::new(7))
            }
            .boxed_local()
        });

        let both = join(slot.get(), async {
            let waiter = slot.get();
            let _ = tx.send(());
            waiter.await
        });
        let (a, b) = block_on(both);
        assert_eq!(*a.unwrap(), 7);
        assert_eq!(*b.unwrap(), 7);
        assert_eq!(slot.load_attempts(), 1);
    }

    #[test]
    fn test_failure_clears_slot_and_retries() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let slot: EngineSlot<u32> = EngineSlot::new("flaky", move || {
            counter.set(counter.get() + 1);
            let attempt = counter.get();
            async move {
                if attempt == 1 {
                    Err(Error::LoadFailure("network".into()))
                } else {
                    Ok(Rc::new(attempt))
                }
            }
            .boxed_local()
        });

        assert_eq!(
            block_on(slot.get()),
            Err(Error::LoadFailure("network".into()))
        );
        assert!(!slot.is_ready());
        assert!(!slot.is_loading());

        assert_eq!(*block_on(slot.get()).unwrap(), 2);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_ready_slot_never_loads() {
        let slot = EngineSlot::ready("preloaded", Rc::new(1u8));
        assert!(slot.is_ready());
        assert_eq!(*block_on(slot.get()).unwrap(), 1);
        assert_eq!(slot.load_attempts(), 0);
    }
}
