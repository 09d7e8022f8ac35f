//! Named uniform slots and the typed setters on [`ActiveProgram`].
//!
//! [`ActiveProgram`]: crate::render::ActiveProgram

mod binder;

pub use binder::UniformSlot;
