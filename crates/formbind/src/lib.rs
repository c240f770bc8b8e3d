#![forbid(unsafe_code)]

//! Form state management for component-based UIs.
//!
//! `formbind` tracks the current value plus per-field `changed` and `blurred`
//! flags for a fixed set of form fields, and exposes a binding primitive that
//! lets one UI control read and update a single field without re-creating its
//! callbacks on every render.
//!
//! Two halves, tightly coupled:
//!
//! - [`FormStore`]: single source of truth. Three parallel mappings keyed by
//!   field name, mutated by atomic whole-map replacement so observers can do
//!   identity-based change detection, with subscribe/notify for re-renders.
//! - [`FieldBinding`]: a read/write projection of exactly one field, whose
//!   `on_change` / `on_blur` handlers are built once per binding and keep
//!   stable `Rc` identity across repeated projections.
//!
//! # Example
//!
//! ```
//! use formbind::{FieldBinding, create_form};
//!
//! let (store, control) = create_form([("email", String::new())]);
//!
//! // Re-render whenever the form mutates.
//! let _sub = store.subscribe(|snapshot| {
//!     let _ = snapshot.version;
//! });
//!
//! let email = FieldBinding::new(&control, "email");
//! let view = email.view();
//! (view.on_change)("a@b.com".to_owned());
//! (view.on_blur)();
//!
//! assert_eq!(store.value("email").as_deref(), Some("a@b.com"));
//! assert!(store.is_changed("email"));
//! assert!(store.is_blurred("email"));
//! ```
//!
//! # Scope
//!
//! No validation, no schema system, no submission pipeline, no persistence.
//! Everything is single-threaded and synchronous: mutations run inside
//! UI-triggered callbacks and complete before returning.

pub mod binding;
pub mod store;

pub use binding::{FieldBinding, FieldView, bind_field, bind_field_with};
pub use store::{Control, FormSnapshot, FormStore, Subscription, create_form};
