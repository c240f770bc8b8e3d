#![forbid(unsafe_code)]

//! Shared form state with change notification.
//!
//! [`FormStore`] is the single source of truth for a logical form: three
//! parallel per-field mappings (`values`, `fields_changed`, `fields_blurred`)
//! sharing one fixed key set, plus a subscriber list for re-render
//! notification.
//!
//! # Architecture
//!
//! `FormStore<V>` uses `Rc<RefCell<..>>` for single-threaded shared ownership.
//! Each mapping is held as an `Rc<HashMap<..>>` and mutated by atomic
//! whole-map replacement: clone the map, touch one key, swap the `Rc`.
//! Observers detect changes by `Rc` identity ([`Rc::ptr_eq`]) on snapshot
//! maps, so a mapping untouched by a mutation keeps its identity.
//!
//! Subscribers are stored as `Weak` function pointers and cleaned up lazily
//! during notification. Notification runs outside the `RefCell` borrow, so
//! callbacks are free to re-read the store.
//!
//! # Invariants
//!
//! 1. The three mappings always share exactly the same key set, fixed at
//!    construction. No field is ever added or removed.
//! 2. `version` increments exactly once per mutation, and every mutation
//!    notifies all live subscribers exactly once, in registration order.
//! 3. [`FormStore::set_value`] always replaces the value and marks the field
//!    changed, even when the new value equals the old one. It is the only
//!    path by which a changed flag becomes `true`.
//! 4. Changed and blurred flags are monotonic `false` → `true` for the life
//!    of the store; the core exposes no reset operation. The whole-map
//!    setters ([`FormStore::set_fields_changed`] etc.) are the caller-level
//!    escape hatch.
//! 5. A mutation of one field leaves every other field's value and flags,
//!    and the `Rc` identity of any untouched mapping, unchanged.
//! 6. Dropping a [`Subscription`] removes its callback before the next
//!    notification cycle.
//!
//! # Failure Modes
//!
//! Supplying a field name outside the fixed key set, or a replacement map
//! with a different key set, is a programmer error: debug builds assert,
//! release builds log a warning and ignore the call.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

type Subscriber<V> = dyn Fn(&FormSnapshot<V>);

/// Point-in-time view of a [`FormStore`]: the three mappings plus the store
/// version at the moment of capture.
///
/// The maps are shared `Rc`s, so capturing a snapshot never deep-copies form
/// data. Compare maps across snapshots with [`Rc::ptr_eq`] to detect which
/// mapping a mutation touched.
pub struct FormSnapshot<V> {
    /// Current value of every field.
    pub values: Rc<HashMap<String, V>>,
    /// Per-field changed flags.
    pub changed: Rc<HashMap<String, bool>>,
    /// Per-field blurred flags.
    pub blurred: Rc<HashMap<String, bool>>,
    /// Mutation counter at capture time.
    pub version: u64,
}

impl<V> Clone for FormSnapshot<V> {
    fn clone(&self) -> Self {
        Self {
            values: Rc::clone(&self.values),
            changed: Rc::clone(&self.changed),
            blurred: Rc::clone(&self.blurred),
            version: self.version,
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for FormSnapshot<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormSnapshot")
            .field("values", &self.values)
            .field("changed", &self.changed)
            .field("blurred", &self.blurred)
            .field("version", &self.version)
            .finish()
    }
}

struct StoreInner<V> {
    values: Rc<HashMap<String, V>>,
    changed: Rc<HashMap<String, bool>>,
    blurred: Rc<HashMap<String, bool>>,
    version: u64,
    subscribers: Vec<Weak<Subscriber<V>>>,
}

impl<V> StoreInner<V> {
    fn snapshot(&self) -> FormSnapshot<V> {
        FormSnapshot {
            values: Rc::clone(&self.values),
            changed: Rc::clone(&self.changed),
            blurred: Rc::clone(&self.blurred),
            version: self.version,
        }
    }
}

/// RAII guard for a [`FormStore`] subscription.
///
/// The guard keeps the callback alive; the store only holds a `Weak`
/// reference. Dropping the guard releases the callback, and the store prunes
/// the dead entry lazily during the next notification.
pub struct Subscription {
    _keep: Box<dyn Any>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish()
    }
}

/// Single source of truth for one logical form instance.
///
/// Cloning a `FormStore` shares the underlying state (shallow `Rc` clone);
/// all clones observe the same values, flags and subscribers.
pub struct FormStore<V> {
    inner: Rc<RefCell<StoreInner<V>>>,
}

impl<V> Clone for FormStore<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for FormStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("FormStore")
            .field("values", &inner.values)
            .field("changed", &inner.changed)
            .field("blurred", &inner.blurred)
            .field("version", &inner.version)
            .finish()
    }
}

impl<V: Clone + 'static> FormStore<V> {
    /// Create a store from a full initial value record.
    ///
    /// Every declared field must be given a concrete value here, regardless
    /// of whether its type has a natural "absent" state; the store never
    /// infers defaults. All changed and blurred flags start `false`.
    pub fn new<K: Into<String>>(initial_values: impl IntoIterator<Item = (K, V)>) -> Self {
        let values: HashMap<String, V> = initial_values
            .into_iter()
            .map(|(k, v)| (k.into(), v))
            .collect();
        let flags: HashMap<String, bool> = values.keys().map(|k| (k.clone(), false)).collect();
        Self {
            inner: Rc::new(RefCell::new(StoreInner {
                values: Rc::new(values),
                changed: Rc::new(flags.clone()),
                blurred: Rc::new(flags),
                version: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Replace `values[field]` and mark the field changed.
    ///
    /// Touches only the named field; every sibling value and flag, and the
    /// `Rc` identity of the blurred mapping, are left as-is. Notifies all
    /// subscribers once.
    pub fn set_value(&self, field: &str, new_value: V) {
        let snapshot = {
            let mut inner = self.inner.borrow_mut();
            if !inner.values.contains_key(field) {
                debug_assert!(false, "set_value on unknown field `{field}`");
                tracing::warn!(field, "set_value on unknown field ignored");
                return;
            }
            let mut values = (*inner.values).clone();
            values.insert(field.to_owned(), new_value);
            inner.values = Rc::new(values);

            let mut changed = (*inner.changed).clone();
            changed.insert(field.to_owned(), true);
            inner.changed = Rc::new(changed);

            inner.version += 1;
            tracing::trace!(field, version = inner.version, "field value set");
            inner.snapshot()
        };
        self.notify(&snapshot);
    }

    /// Mark the field blurred. Idempotent; the flag never returns to `false`
    /// through this API. Notifies all subscribers once.
    pub fn set_blurred(&self, field: &str) {
        let snapshot = {
            let mut inner = self.inner.borrow_mut();
            if !inner.blurred.contains_key(field) {
                debug_assert!(false, "set_blurred on unknown field `{field}`");
                tracing::warn!(field, "set_blurred on unknown field ignored");
                return;
            }
            let mut blurred = (*inner.blurred).clone();
            blurred.insert(field.to_owned(), true);
            inner.blurred = Rc::new(blurred);

            inner.version += 1;
            tracing::trace!(field, version = inner.version, "field blurred");
            inner.snapshot()
        };
        self.notify(&snapshot);
    }

    /// Replace the entire value mapping. The new map must cover exactly the
    /// fixed key set.
    pub fn set_values(&self, values: HashMap<String, V>) {
        self.replace_map(values, |inner, map| inner.values = map, "set_values");
    }

    /// Replace the entire changed-flag mapping. The new map must cover
    /// exactly the fixed key set.
    ///
    /// This is the caller-level path for clearing changed flags (e.g. after
    /// a successful submit); the per-field operations never reset them.
    pub fn set_fields_changed(&self, changed: HashMap<String, bool>) {
        self.replace_map(changed, |inner, map| inner.changed = map, "set_fields_changed");
    }

    /// Replace the entire blurred-flag mapping. The new map must cover
    /// exactly the fixed key set.
    pub fn set_fields_blurred(&self, blurred: HashMap<String, bool>) {
        self.replace_map(blurred, |inner, map| inner.blurred = map, "set_fields_blurred");
    }

    fn replace_map<T: 'static>(
        &self,
        map: HashMap<String, T>,
        apply: impl FnOnce(&mut StoreInner<V>, Rc<HashMap<String, T>>),
        op: &'static str,
    ) {
        let snapshot = {
            let mut inner = self.inner.borrow_mut();
            let same_keys =
                map.len() == inner.values.len() && map.keys().all(|k| inner.values.contains_key(k));
            if !same_keys {
                debug_assert!(false, "{op} with mismatched key set");
                tracing::warn!(op, "whole-map replacement with mismatched key set ignored");
                return;
            }
            apply(&mut *inner, Rc::new(map));
            inner.version += 1;
            tracing::trace!(op, version = inner.version, "mapping replaced");
            inner.snapshot()
        };
        self.notify(&snapshot);
    }

    /// Current value of a field, or `None` for a name outside the key set.
    #[must_use]
    pub fn value(&self, field: &str) -> Option<V> {
        self.inner.borrow().values.get(field).cloned()
    }

    /// Whether the field's value has been replaced since construction.
    #[must_use]
    pub fn is_changed(&self, field: &str) -> bool {
        self.inner
            .borrow()
            .changed
            .get(field)
            .copied()
            .unwrap_or(false)
    }

    /// Whether the field has lost input focus at least once.
    #[must_use]
    pub fn is_blurred(&self, field: &str) -> bool {
        self.inner
            .borrow()
            .blurred
            .get(field)
            .copied()
            .unwrap_or(false)
    }

    /// The current value mapping. The returned `Rc` identity changes on every
    /// `set_value` / `set_values`.
    #[must_use]
    pub fn values(&self) -> Rc<HashMap<String, V>> {
        Rc::clone(&self.inner.borrow().values)
    }

    /// The current changed-flag mapping.
    #[must_use]
    pub fn fields_changed(&self) -> Rc<HashMap<String, bool>> {
        Rc::clone(&self.inner.borrow().changed)
    }

    /// The current blurred-flag mapping.
    #[must_use]
    pub fn fields_blurred(&self) -> Rc<HashMap<String, bool>> {
        Rc::clone(&self.inner.borrow().blurred)
    }

    /// Capture a point-in-time snapshot of the whole store.
    #[must_use]
    pub fn snapshot(&self) -> FormSnapshot<V> {
        self.inner.borrow().snapshot()
    }

    /// Mutation counter. Starts at 0; bumps once per mutation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Whether `field` belongs to the fixed key set.
    #[must_use]
    pub fn contains_field(&self, field: &str) -> bool {
        self.inner.borrow().values.contains_key(field)
    }

    /// Number of declared fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().values.len()
    }

    /// Whether the form has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().values.is_empty()
    }

    /// Register a callback invoked with a fresh snapshot after every
    /// mutation. Hold the returned guard for as long as the callback should
    /// stay live.
    #[must_use = "dropping the Subscription immediately unsubscribes"]
    pub fn subscribe(&self, callback: impl Fn(&FormSnapshot<V>) + 'static) -> Subscription {
        let cb: Rc<Subscriber<V>> = Rc::new(callback);
        self.inner.borrow_mut().subscribers.push(Rc::downgrade(&cb));
        Subscription { _keep: Box::new(cb) }
    }

    /// Number of live subscribers (dead entries are pruned first).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        let mut inner = self.inner.borrow_mut();
        inner.subscribers.retain(|weak| weak.strong_count() > 0);
        inner.subscribers.len()
    }

    /// A cheap handle exposing the read/write subset field bindings need.
    #[must_use]
    pub fn control(&self) -> Control<V> {
        Control {
            store: self.clone(),
        }
    }

    fn notify(&self, snapshot: &FormSnapshot<V>) {
        // Upgrade under the borrow, call outside it: callbacks may re-read
        // the store.
        let live: Vec<Rc<Subscriber<V>>> = {
            let mut inner = self.inner.borrow_mut();
            inner.subscribers.retain(|weak| weak.strong_count() > 0);
            inner.subscribers.iter().filter_map(Weak::upgrade).collect()
        };
        for callback in live {
            callback(snapshot);
        }
    }
}

/// Clonable handle passed to field bindings.
///
/// A `Control` is a thin view over a shared [`FormStore`]: it exposes exactly
/// the operations a binding needs to project and mutate one field. Obtain one
/// via [`FormStore::control`] or [`create_form`].
pub struct Control<V> {
    store: FormStore<V>,
}

impl<V> Clone for Control<V> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for Control<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Control").field("store", &self.store).finish()
    }
}

impl<V: Clone + 'static> Control<V> {
    /// Current value of a field.
    #[must_use]
    pub fn value(&self, field: &str) -> Option<V> {
        self.store.value(field)
    }

    /// Whether the field's value has been replaced since construction.
    #[must_use]
    pub fn is_changed(&self, field: &str) -> bool {
        self.store.is_changed(field)
    }

    /// Whether the field has lost input focus at least once.
    #[must_use]
    pub fn is_blurred(&self, field: &str) -> bool {
        self.store.is_blurred(field)
    }

    /// Whether `field` belongs to the fixed key set.
    #[must_use]
    pub fn contains_field(&self, field: &str) -> bool {
        self.store.contains_field(field)
    }

    /// Replace the field's value and mark it changed.
    pub fn set_value(&self, field: &str, new_value: V) {
        self.store.set_value(field, new_value);
    }

    /// Mark the field blurred.
    pub fn set_blurred(&self, field: &str) {
        self.store.set_blurred(field);
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &FormStore<V> {
        &self.store
    }
}

/// Create a form store plus the control handle bindings consume.
///
/// ```
/// use formbind::create_form;
///
/// let (store, control) = create_form([("email", String::new())]);
/// control.set_value("email", "a@b.com".to_owned());
/// assert!(store.is_changed("email"));
/// ```
pub fn create_form<V: Clone + 'static, K: Into<String>>(
    initial_values: impl IntoIterator<Item = (K, V)>,
) -> (FormStore<V>, Control<V>) {
    let store = FormStore::new(initial_values);
    let control = store.control();
    (store, control)
}
