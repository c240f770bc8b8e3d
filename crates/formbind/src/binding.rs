#![forbid(unsafe_code)]

//! Per-field bindings over a [`FormStore`], with identity-stable handlers.
//!
//! A [`FieldBinding`] wires exactly one field of a form to a UI control: it
//! projects the field's current value and interaction flags, and hands out
//! `on_change` / `on_blur` callbacks that mutate the shared store. The
//! [`bind_field`] / [`bind_field_with`] helpers and the [`crate::bind_field!`] /
//! [`crate::bind_field_map!`] macros provide render-function sugar.
//!
//! # Usage
//!
//! ```
//! use formbind::{FieldBinding, create_form};
//!
//! let (store, control) = create_form([("email", String::new())]);
//!
//! // The binding is the long-lived half; project a view per render.
//! let email = FieldBinding::new(&control, "email");
//! let view = email.view();
//! (view.on_change)("a@b.com".to_owned());
//!
//! assert_eq!(store.value("email").as_deref(), Some("a@b.com"));
//! assert!(email.view().is_changed);
//! ```
//!
//! # Transforms
//!
//! [`FieldBinding::with_transform`] routes the raw UI value through a pure
//! function before storing it, so a control emitting `String` can feed a
//! numerically-typed field:
//!
//! ```
//! use formbind::{FieldBinding, create_form};
//!
//! let (store, control) = create_form([("age", 0i64)]);
//! let age = FieldBinding::with_transform(&control, "age", |raw: String| {
//!     raw.parse().unwrap_or(0)
//! });
//! (age.view().on_change)("42".to_owned());
//! assert_eq!(store.value("age"), Some(42));
//! ```
//!
//! # Invariants
//!
//! 1. `on_change` and `on_blur` are constructed exactly once per binding
//!    instance and handed out as `Rc` clones; repeated [`FieldBinding::view`]
//!    calls return handlers that are [`Rc::ptr_eq`]-identical.
//! 2. The closures capture the field name and transform at construction time
//!    and never re-read them. Controls that memoize on handler identity must
//!    hold the `FieldBinding` across renders and call `view()` each render;
//!    [`bind_field`] builds a fresh binding (and fresh handlers) per call.
//! 3. A view's `value` / `is_changed` / `is_blurred` always reflect the
//!    store's current state at projection time, never a cached one.
//! 4. The binding owns no field state; all state lives in the store, and a
//!    handler outlives its binding (the `Rc` keeps the closure alive).
//!
//! # Failure Modes
//!
//! - Transform panic: propagates to the `on_change` caller. Transforms must
//!   be pure and argument-only.
//! - Binding a name outside the store's fixed key set panics at
//!   construction.
//!
//! [`FormStore`]: crate::store::FormStore

use std::fmt;
use std::rc::Rc;

use crate::store::Control;

/// Read/write handle for one field of a form.
///
/// Construct once per control instance and keep it alive across renders;
/// call [`view`](Self::view) to project the current field state. Cloning a
/// binding shares its handlers (clone and original are identity-equal).
pub struct FieldBinding<R, V> {
    name: Rc<str>,
    control: Control<V>,
    on_change: Rc<dyn Fn(R)>,
    on_blur: Rc<dyn Fn()>,
}

impl<R, V> Clone for FieldBinding<R, V> {
    fn clone(&self) -> Self {
        Self {
            name: Rc::clone(&self.name),
            control: self.control.clone(),
            on_change: Rc::clone(&self.on_change),
            on_blur: Rc::clone(&self.on_blur),
        }
    }
}

impl<R, V: Clone + fmt::Debug + 'static> fmt::Debug for FieldBinding<R, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldBinding")
            .field("name", &self.name)
            .field("value", &self.control.value(&self.name))
            .finish()
    }
}

impl<V: Clone + 'static> FieldBinding<V, V> {
    /// Bind `name` with no transform: the raw value is stored verbatim.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not one of the store's declared fields.
    #[must_use]
    pub fn new(control: &Control<V>, name: &str) -> Self {
        assert!(
            control.contains_field(name),
            "FieldBinding on unknown field `{name}`"
        );
        let name: Rc<str> = Rc::from(name);
        let on_change: Rc<dyn Fn(V)> = {
            let control = control.clone();
            let name = Rc::clone(&name);
            Rc::new(move |raw: V| control.set_value(&name, raw))
        };
        Self {
            on_blur: Self::blur_handler(control, &name),
            control: control.clone(),
            name,
            on_change,
        }
    }
}

impl<R: 'static, V: Clone + 'static> FieldBinding<R, V> {
    /// Bind `name`, routing each raw `on_change` value through `transform`
    /// before storing it.
    ///
    /// `transform` must be pure (no side effects, output depends only on its
    /// argument); it is captured once here and applied on every change.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not one of the store's declared fields.
    #[must_use]
    pub fn with_transform(
        control: &Control<V>,
        name: &str,
        transform: impl Fn(R) -> V + 'static,
    ) -> Self {
        assert!(
            control.contains_field(name),
            "FieldBinding on unknown field `{name}`"
        );
        let name: Rc<str> = Rc::from(name);

        // Handlers are built exactly once; views hand out Rc clones.
        let on_change: Rc<dyn Fn(R)> = {
            let control = control.clone();
            let name = Rc::clone(&name);
            Rc::new(move |raw: R| control.set_value(&name, transform(raw)))
        };
        Self {
            on_blur: Self::blur_handler(control, &name),
            control: control.clone(),
            name,
            on_change,
        }
    }

    fn blur_handler(control: &Control<V>, name: &Rc<str>) -> Rc<dyn Fn()> {
        let control = control.clone();
        let name = Rc::clone(name);
        Rc::new(move || control.set_blurred(&name))
    }

    /// The bound field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Project the field's current state plus the stable handlers.
    #[must_use]
    pub fn view(&self) -> FieldView<R, V> {
        let value = self
            .control
            .value(&self.name)
            .expect("field checked at construction");
        FieldView {
            name: Rc::clone(&self.name),
            value,
            is_changed: self.control.is_changed(&self.name),
            is_blurred: self.control.is_blurred(&self.name),
            on_change: Rc::clone(&self.on_change),
            on_blur: Rc::clone(&self.on_blur),
        }
    }
}

/// Per-render projection of one bound field.
///
/// `value` and the flags are read live at projection time; `on_change` and
/// `on_blur` are shared clones of the binding's one-time handlers.
pub struct FieldView<R, V> {
    /// The bound field name.
    pub name: Rc<str>,
    /// Current stored value.
    pub value: V,
    /// Whether the value has been replaced since store creation.
    pub is_changed: bool,
    /// Whether the field has lost input focus at least once.
    pub is_blurred: bool,
    /// Store the (transformed) raw value and mark the field changed.
    pub on_change: Rc<dyn Fn(R)>,
    /// Mark the field blurred.
    pub on_blur: Rc<dyn Fn()>,
}

impl<R, V: Clone> Clone for FieldView<R, V> {
    fn clone(&self) -> Self {
        Self {
            name: Rc::clone(&self.name),
            value: self.value.clone(),
            is_changed: self.is_changed,
            is_blurred: self.is_blurred,
            on_change: Rc::clone(&self.on_change),
            on_blur: Rc::clone(&self.on_blur),
        }
    }
}

impl<R, V: fmt::Debug> fmt::Debug for FieldView<R, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldView")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("is_changed", &self.is_changed)
            .field("is_blurred", &self.is_blurred)
            .finish()
    }
}

/// Bind a field and render it in one call (no transform).
///
/// Invokes `render` synchronously with the projected view and returns
/// whatever node it produces. Builds a fresh binding per call; see the
/// module docs for the handler-identity implications.
pub fn bind_field<V: Clone + 'static, N>(
    control: &Control<V>,
    name: &str,
    render: impl FnOnce(FieldView<V, V>) -> N,
) -> N {
    render(FieldBinding::new(control, name).view())
}

/// Bind a field with a transform and render it in one call.
pub fn bind_field_with<R: 'static, V: Clone + 'static, N>(
    control: &Control<V>,
    name: &str,
    transform: impl Fn(R) -> V + 'static,
    render: impl FnOnce(FieldView<R, V>) -> N,
) -> N {
    render(FieldBinding::with_transform(control, name, transform).view())
}

/// Bind a field and render it: `bind_field!(control, "email", |view| ...)`.
#[macro_export]
macro_rules! bind_field {
    ($control:expr, $name:expr, $render:expr) => {
        $crate::binding::bind_field(&$control, $name, $render)
    };
}

/// Bind a field with a transform and render it:
/// `bind_field_map!(control, "age", |raw| parse(raw), |view| ...)`.
#[macro_export]
macro_rules! bind_field_map {
    ($control:expr, $name:expr, $transform:expr, $render:expr) => {
        $crate::binding::bind_field_with(&$control, $name, $transform, $render)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::create_form;
    use std::collections::HashMap;

    /// Heterogeneous field value for mixed-type forms.
    #[derive(Debug, Clone, PartialEq)]
    enum Value {
        Str(String),
        Num(i64),
    }

    fn mixed_form() -> (crate::store::FormStore<Value>, Control<Value>) {
        create_form([
            ("email", Value::Str(String::new())),
            ("age", Value::Num(0)),
        ])
    }

    #[test]
    fn view_projects_current_state() {
        let (_store, control) = create_form([("email", String::new())]);
        let binding = FieldBinding::new(&control, "email");

        let view = binding.view();
        assert_eq!(&*view.name, "email");
        assert_eq!(view.value, "");
        assert!(!view.is_changed);
        assert!(!view.is_blurred);
    }

    #[test]
    fn on_change_without_transform_stores_verbatim() {
        let (store, control) = create_form([("email", String::new())]);
        let binding = FieldBinding::new(&control, "email");

        (binding.view().on_change)("a@b.com".to_owned());

        assert_eq!(store.value("email").as_deref(), Some("a@b.com"));
        assert!(store.is_changed("email"));
        assert!(!store.is_blurred("email"));
    }

    #[test]
    fn on_change_applies_transform_and_spares_siblings() {
        let (store, control) = mixed_form();
        let age = FieldBinding::with_transform(&control, "age", |raw: String| {
            Value::Num(raw.parse().unwrap_or(0))
        });

        (age.view().on_change)("42".to_owned());

        assert_eq!(store.value("age"), Some(Value::Num(42)));
        assert_eq!(store.value("email"), Some(Value::Str(String::new())));
        assert!(store.is_changed("age"));
        assert!(!store.is_changed("email"));
        assert!(!store.is_blurred("age"));
        assert!(!store.is_blurred("email"));
    }

    #[test]
    fn on_blur_sets_only_the_blurred_flag() {
        let (store, control) = mixed_form();
        let email = FieldBinding::new(&control, "email");

        (email.view().on_blur)();

        assert!(store.is_blurred("email"));
        assert!(!store.is_changed("email"));
        assert_eq!(store.value("email"), Some(Value::Str(String::new())));
        assert!(!store.is_blurred("age"));
    }

    #[test]
    fn on_blur_twice_is_a_no_op_on_the_flag() {
        let (store, control) = create_form([("email", String::new())]);
        let binding = FieldBinding::new(&control, "email");

        (binding.view().on_blur)();
        (binding.view().on_blur)();

        assert!(store.is_blurred("email"));
    }

    #[test]
    fn handlers_are_identity_stable_across_views() {
        let (_store, control) = create_form([("email", String::new())]);
        let binding = FieldBinding::new(&control, "email");

        let v1 = binding.view();
        let v2 = binding.view();
        assert!(Rc::ptr_eq(&v1.on_change, &v2.on_change));
        assert!(Rc::ptr_eq(&v1.on_blur, &v2.on_blur));
    }

    #[test]
    fn handlers_stay_stable_after_mutations() {
        let (_store, control) = create_form([("email", String::new())]);
        let binding = FieldBinding::new(&control, "email");

        let before = binding.view();
        (before.on_change)("x".to_owned());
        (before.on_blur)();
        let after = binding.view();

        assert!(Rc::ptr_eq(&before.on_change, &after.on_change));
        assert!(Rc::ptr_eq(&before.on_blur, &after.on_blur));
        assert!(after.is_changed);
        assert!(after.is_blurred);
    }

    #[test]
    fn cloned_binding_shares_handler_identity() {
        let (_store, control) = create_form([("email", String::new())]);
        let binding = FieldBinding::new(&control, "email");
        let clone = binding.clone();

        assert!(Rc::ptr_eq(&binding.view().on_change, &clone.view().on_change));
        assert!(Rc::ptr_eq(&binding.view().on_blur, &clone.view().on_blur));
    }

    #[test]
    fn distinct_bindings_have_distinct_handlers() {
        let (_store, control) = mixed_form();
        let a = FieldBinding::new(&control, "email");
        let b = FieldBinding::new(&control, "age");
        assert!(!Rc::ptr_eq(&a.view().on_change, &b.view().on_change));
        assert!(!Rc::ptr_eq(&a.view().on_blur, &b.view().on_blur));
    }

    #[test]
    fn handler_outlives_its_binding() {
        let (store, control) = create_form([("email", String::new())]);
        let view = {
            let binding = FieldBinding::new(&control, "email");
            binding.view()
        };
        (view.on_change)("late".to_owned());
        assert_eq!(store.value("email").as_deref(), Some("late"));
    }

    #[test]
    #[should_panic(expected = "unknown field")]
    fn binding_unknown_field_panics() {
        let (_store, control) = create_form([("email", String::new())]);
        let _ = FieldBinding::new(&control, "missing");
    }

    #[test]
    fn bind_field_renders_the_projection() {
        let (store, control) = create_form([("email", String::new())]);

        let node = bind_field(&control, "email", |view| {
            (view.on_change)("a@b.com".to_owned());
            format!("<input name={} value={}>", view.name, view.value)
        });

        // Render saw the pre-change projection; the store has the new value.
        assert_eq!(node, "<input name=email value=>");
        assert_eq!(store.value("email").as_deref(), Some("a@b.com"));
    }

    #[test]
    fn bind_field_with_applies_the_transform() {
        let (store, control) = mixed_form();

        bind_field_with(
            &control,
            "age",
            |raw: String| Value::Num(raw.parse().unwrap_or(0)),
            |view| (view.on_change)("7".to_owned()),
        );

        assert_eq!(store.value("age"), Some(Value::Num(7)));
    }

    #[test]
    fn bind_field_macro() {
        let (store, control) = create_form([("email", String::new())]);
        bind_field!(control, "email", |view| (view.on_change)("m".to_owned()));
        assert_eq!(store.value("email").as_deref(), Some("m"));
    }

    #[test]
    fn bind_field_map_macro() {
        let (store, control) = create_form([("age", 0i64)]);
        bind_field_map!(
            control,
            "age",
            |raw: String| raw.parse().unwrap_or(0),
            |view| (view.on_change)("42".to_owned())
        );
        assert_eq!(store.value("age"), Some(42));
    }

    #[test]
    fn numeric_transform_touches_only_its_field_maps() {
        let (store, control) = mixed_form();
        let age = FieldBinding::with_transform(&control, "age", |raw: String| {
            Value::Num(raw.parse().unwrap_or(0))
        });

        (age.view().on_change)("42".to_owned());

        let expected_values = HashMap::from([
            ("email".to_owned(), Value::Str(String::new())),
            ("age".to_owned(), Value::Num(42)),
        ]);
        let expected_changed = HashMap::from([
            ("email".to_owned(), false),
            ("age".to_owned(), true),
        ]);
        assert_eq!(*store.values(), expected_values);
        assert_eq!(*store.fields_changed(), expected_changed);
    }
}
