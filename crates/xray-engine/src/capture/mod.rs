//! Process-wide, invocation-scoped value capture.
//!
//! Every invocation of instrumented code owns one [`CaptureSlice`], keyed by
//! an [`InvocationToken`] threaded explicitly through evaluation. Slices are
//! never shared across invocations, not between threads and not between
//! nested calls on one thread, so binding writes need no coordination.
//!
//! Lifetime: a slice is discarded when its invocation returns normally, and
//! *taken* (moved into the propagating error's frame chain) when an error
//! exits the invocation, which keeps it readable until report generation
//! finishes and releases it with the error itself.

use std::sync::atomic::{AtomicU64, Ordering};

use xray_model::{BindingId, Value};

/// Identity of one active invocation of instrumented code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InvocationToken(u64);

/// Last value recorded per binding for one invocation. `None` means the
/// binding's step never executed (unreached).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureSlice {
    values: Vec<Option<Value>>,
}

impl CaptureSlice {
    pub fn new(binding_count: usize) -> Self {
        Self {
            values: vec![None; binding_count],
        }
    }

    /// Overwrite the entry for `id`; re-executions (loops) keep only the most
    /// recent value. Unknown ids are dropped by the store, not here.
    fn record(&mut self, id: BindingId, value: Value) {
        if let Some(slot) = self.values.get_mut(id.index()) {
            *slot = Some(value);
        }
    }

    pub fn get(&self, id: BindingId) -> Option<&Value> {
        self.values.get(id.index()).and_then(|slot| slot.as_ref())
    }

    pub fn is_reached(&self, id: BindingId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of bindings that were actually reached.
    pub fn reached_count(&self) -> usize {
        self.values.iter().filter(|slot| slot.is_some()).count()
    }
}

#[cfg(feature = "parallel")]
type Slices = dashmap::DashMap<u64, CaptureSlice, ahash::RandomState>;

#[cfg(not(feature = "parallel"))]
type Slices = std::sync::Mutex<ahash::AHashMap<u64, CaptureSlice>>;

/// Capture storage for all in-flight invocations.
#[derive(Debug, Default)]
pub struct CaptureStore {
    next_token: AtomicU64,
    slices: Slices,
}

impl CaptureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a slice for a new invocation with `binding_count` bindings.
    pub fn begin(&self, binding_count: usize) -> InvocationToken {
        let token = InvocationToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        self.insert(token.0, CaptureSlice::new(binding_count));
        token
    }

    /// Record the value produced for `id` during `token`'s invocation.
    ///
    /// Writes against an unknown binding or a closed invocation indicate a
    /// decomposition/capture mismatch; they are dropped, never surfaced to
    /// the host program.
    pub fn record(&self, token: InvocationToken, id: BindingId, value: Value) {
        let mut hit = false;
        self.with_slice_mut(token.0, |slice| {
            if id.index() < slice.len() {
                slice.record(id, value);
                hit = true;
            }
        });
        if !hit {
            log::debug!(
                "dropping capture write for binding {} of invocation {}",
                id.0,
                token.0
            );
        }
    }

    /// Current value of `id` for `token`'s invocation, if reached.
    pub fn read(&self, token: InvocationToken, id: BindingId) -> Option<Value> {
        let mut out = None;
        self.with_slice_mut(token.0, |slice| out = slice.get(id).cloned());
        out
    }

    /// Read-only copy of the invocation's slice; later writes do not affect
    /// the returned snapshot.
    pub fn snapshot(&self, token: InvocationToken) -> Option<CaptureSlice> {
        let mut out = None;
        self.with_slice_mut(token.0, |slice| out = Some(slice.clone()));
        out
    }

    /// Evict the slice, yielding it to the caller. Used when an error exits
    /// the invocation: the slice moves into the error's frame chain.
    pub fn take(&self, token: InvocationToken) -> Option<CaptureSlice> {
        self.remove(token.0)
    }

    /// Evict the slice without keeping it (normal return, or cancellation).
    pub fn discard(&self, token: InvocationToken) {
        self.remove(token.0);
    }

    /// Number of in-flight invocations; exposed for leak tests.
    pub fn active(&self) -> usize {
        self.count()
    }
}

#[cfg(feature = "parallel")]
impl CaptureStore {
    fn insert(&self, key: u64, slice: CaptureSlice) {
        self.slices.insert(key, slice);
    }

    fn with_slice_mut(&self, key: u64, f: impl FnOnce(&mut CaptureSlice)) {
        if let Some(mut entry) = self.slices.get_mut(&key) {
            f(entry.value_mut());
        }
    }

    fn remove(&self, key: u64) -> Option<CaptureSlice> {
        self.slices.remove(&key).map(|(_, slice)| slice)
    }

    fn count(&self) -> usize {
        self.slices.len()
    }
}

#[cfg(not(feature = "parallel"))]
impl CaptureStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, ahash::AHashMap<u64, CaptureSlice>> {
        self.slices
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn insert(&self, key: u64, slice: CaptureSlice) {
        self.lock().insert(key, slice);
    }

    fn with_slice_mut(&self, key: u64, f: impl FnOnce(&mut CaptureSlice)) {
        if let Some(slice) = self.lock().get_mut(&key) {
            f(slice);
        }
    }

    fn remove(&self, key: u64) -> Option<CaptureSlice> {
        self.lock().remove(&key)
    }

    fn count(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_unaffected_by_later_writes() {
        let store = CaptureStore::new();
        let token = store.begin(2);
        store.record(token, BindingId(0), Value::Number(1.0));
        let snapshot = store.snapshot(token).expect("snapshot");
        store.record(token, BindingId(0), Value::Number(2.0));
        assert_eq!(snapshot.get(BindingId(0)), Some(&Value::Number(1.0)));
        assert_eq!(
            store.read(token, BindingId(0)),
            Some(Value::Number(2.0))
        );
    }

    #[test]
    fn writes_to_unknown_bindings_are_dropped() {
        let store = CaptureStore::new();
        let token = store.begin(1);
        store.record(token, BindingId(9), Value::Null);
        let snapshot = store.snapshot(token).expect("snapshot");
        assert_eq!(snapshot.reached_count(), 0);
    }

    #[test]
    fn take_evicts_and_yields_the_slice() {
        let store = CaptureStore::new();
        let token = store.begin(1);
        store.record(token, BindingId(0), Value::Bool(true));
        let slice = store.take(token).expect("slice");
        assert!(slice.is_reached(BindingId(0)));
        assert_eq!(store.active(), 0);
        assert_eq!(store.read(token, BindingId(0)), None);
    }

    #[test]
    fn invocations_never_share_slices() {
        let store = CaptureStore::new();
        let a = store.begin(1);
        let b = store.begin(1);
        store.record(a, BindingId(0), Value::Number(1.0));
        store.record(b, BindingId(0), Value::Number(2.0));
        assert_eq!(store.read(a, BindingId(0)), Some(Value::Number(1.0)));
        assert_eq!(store.read(b, BindingId(0)), Some(Value::Number(2.0)));
    }
}
