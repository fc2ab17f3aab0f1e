//! Routing of decoded events to the slices that subscribe to them.
//!
//! Every slice is owned by exactly one [`Reducer`]. The dispatcher keeps the
//! slices type-erased behind [`SliceOps`] and applies each event to its
//! subscribers in registration order.

use crate::config::EngineConfig;
use crate::error::ReduceError;
use crate::event::{Event, EventKind};
use crate::reducers::{
    BalanceReducer, CargoReducer, CarrierReducer, LoadoutReducer, LocationReducer,
    MaterialsReducer, MiningReducer, Reducer, SliceId, SliceState,
};
use log::warn;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// One slice of derived state and the reducer that owns it.
pub struct Slice<R: Reducer> {
    reducer: R,
    state: Arc<R::State>,
}

impl<R: Reducer> fmt::Debug for Slice<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slice")
            .field("slice", &R::SLICE)
            .field("state", &self.state)
            .finish()
    }
}

impl<R: Reducer> Slice<R> {
    pub fn new(reducer: R) -> Self {
        Slice {
            reducer,
            state: Arc::new(R::State::default()),
        }
    }

    /// Fold one event into the slice.
    ///
    /// Returns whether the state changed, compared structurally. On error the
    /// previous state is kept.
    pub fn apply(&mut self, event: &Event) -> Result<bool, ReduceError> {
        let next = self.reducer.reduce((*self.state).clone(), event)?;
        if next == *self.state {
            return Ok(false);
        }
        self.state = Arc::new(next);
        Ok(true)
    }

    pub fn state(&self) -> &R::State {
        &self.state
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Type-erased slice operations used by the [`Dispatcher`].
///
/// This trait is sealed and cannot be implemented outside of this crate.
pub trait SliceOps: sealed::Sealed + Send {
    fn slice_id(&self) -> SliceId;
    fn subscriptions(&self) -> &'static [EventKind];
    fn apply_event(&mut self, event: &Event) -> Result<bool, ReduceError>;
    /// An immutable copy of the current state.
    fn published(&self) -> SliceState;
    fn needs_bootstrap(&self) -> bool;
    /// Drop all state, back to the initial value.
    fn reset(&mut self);
    fn as_any(&self) -> &dyn Any;
}

impl<R: Reducer> sealed::Sealed for Slice<R> {}

impl<R: Reducer> SliceOps for Slice<R> {
    fn slice_id(&self) -> SliceId {
        R::SLICE
    }

    fn subscriptions(&self) -> &'static [EventKind] {
        self.reducer.subscriptions()
    }

    fn apply_event(&mut self, event: &Event) -> Result<bool, ReduceError> {
        self.apply(event)
    }

    fn published(&self) -> SliceState {
        R::publish(Arc::clone(&self.state))
    }

    fn needs_bootstrap(&self) -> bool {
        R::needs_bootstrap(&self.state)
    }

    fn reset(&mut self) {
        self.state = Arc::new(R::State::default());
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Routes events to the slices subscribed to their kind.
///
/// Each kind maps to an ordered list of slices; an event is applied to every
/// one of them in registration order, synchronously. A reducer error is
/// logged and swallowed so the next subscriber, and the next event, still
/// run. Kinds nobody subscribes to (including
/// [`EventKind::Unrecognized`]) are dropped here.
#[derive(Default)]
pub struct Dispatcher {
    slices: Vec<Box<dyn SliceOps>>,
    routes: HashMap<EventKind, Vec<usize>>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field(
                "slices",
                &self.slices.iter().map(|s| s.slice_id()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher with every built-in reducer registered.
    pub fn with_reducers(config: &EngineConfig) -> Self {
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .register(LoadoutReducer)
            .register(CargoReducer)
            .register(MaterialsReducer)
            .register(BalanceReducer)
            .register(LocationReducer)
            .register(MiningReducer::new(config.mining))
            .register(CarrierReducer::new(config.carrier));
        dispatcher
    }

    /// Register a reducer as the owner of its slice.
    ///
    /// A slice has exactly one owner; registering a second reducer for the
    /// same slice replaces the first.
    pub fn register<R: Reducer>(&mut self, reducer: R) -> &mut Self {
        let slice: Box<dyn SliceOps> = Box::new(Slice::new(reducer));
        match self.slices.iter().position(|s| s.slice_id() == R::SLICE) {
            Some(index) => {
                warn!("replacing the reducer that owns the {} slice", R::SLICE);
                self.slices[index] = slice;
            }
            None => self.slices.push(slice),
        }
        self.rebuild_routes();
        self
    }

    fn rebuild_routes(&mut self) {
        self.routes.clear();
        for (index, slice) in self.slices.iter().enumerate() {
            for kind in slice.subscriptions() {
                self.routes.entry(*kind).or_default().push(index);
            }
        }
    }

    /// Apply `event` to every subscribed slice.
    ///
    /// Returns the published state of each slice that changed, in
    /// subscription order.
    pub fn dispatch(&mut self, event: &Event) -> Vec<SliceState> {
        let Some(targets) = self.routes.get(&event.kind) else {
            return Vec::new();
        };

        let mut changed = Vec::new();
        for &index in targets {
            let slice = &mut self.slices[index];
            if apply_logged(slice.as_mut(), event) {
                changed.push(slice.published());
            }
        }
        changed
    }

    /// Apply `event` to one slice only, if it subscribes to the event's kind.
    pub fn dispatch_to(&mut self, slice: SliceId, event: &Event) -> Option<SliceState> {
        let target = self.slices.iter_mut().find(|s| s.slice_id() == slice)?;
        if !target.subscriptions().contains(&event.kind) {
            warn!(
                "{} slice does not accept {} events",
                slice, event.event_type
            );
            return None;
        }
        apply_logged(target.as_mut(), event).then(|| target.published())
    }

    /// Published copy of one slice.
    pub fn state(&self, slice: SliceId) -> Option<SliceState> {
        self.slices
            .iter()
            .find(|s| s.slice_id() == slice)
            .map(|s| s.published())
    }

    /// Published copies of every registered slice.
    pub fn states(&self) -> Vec<SliceState> {
        self.slices.iter().map(|s| s.published()).collect()
    }

    /// Typed access to the state owned by reducer `R`.
    pub fn get<R: Reducer>(&self) -> Option<&R::State> {
        self.slices
            .iter()
            .find_map(|s| s.as_any().downcast_ref::<Slice<R>>())
            .map(Slice::state)
    }

    pub fn needs_bootstrap(&self, slice: SliceId) -> bool {
        self.slices
            .iter()
            .find(|s| s.slice_id() == slice)
            .is_some_and(|s| s.needs_bootstrap())
    }

    pub fn slice_ids(&self) -> Vec<SliceId> {
        self.slices.iter().map(|s| s.slice_id()).collect()
    }

    /// Reset every slice to its initial, empty state.
    pub fn reset_all(&mut self) {
        for slice in &mut self.slices {
            slice.reset();
        }
    }
}

fn apply_logged(slice: &mut dyn SliceOps, event: &Event) -> bool {
    match slice.apply_event(event) {
        Ok(changed) => changed,
        Err(e) => {
            warn!("{} reducer rejected event: {e}", slice.slice_id());
            false
        }
    }
}
