//! # Host runtime for Repose hooks
//!
//! Hooks need a small amount of machinery from the UI runtime that hosts
//! them. This crate is that machinery, independent of any
//! renderer:
//!
//! - `Signal<T>`: observable value cell.
//! - `Composition` + `remember*`: per-component slot storage that survives
//!   recomposition.
//! - `Scope`: disposal; everything a component starts is cleaned up here.
//! - `use_effect` / `use_mount` / `use_unmount`: dependency-array effects
//!   that run after a pass settles.
//! - `Latest<T>`: latest-value holder for long-lived closures.
//! - `provide_local` / `use_local`: values readable by descendants.
//! - clock, timers and a local task executor.
//!
//! ## Composition
//!
//! A `Composition` is one component instance. Each `compose` call is one
//! pass; slots are matched by call order:
//!
//! ```rust
//! use repose_runtime::*;
//!
//! let comp = Composition::new();
//! let read = |comp: &Composition| {
//!     comp.compose(|| {
//!         let count = remember(|| signal(0));
//!         count.update(|c| *c += 1);
//!         count.get()
//!     })
//! };
//! assert_eq!(read(&comp), 1);
//! assert_eq!(read(&comp), 2);
//! ```
//!
//! ## Effects and cleanup
//!
//! ```rust
//! use repose_runtime::*;
//! use std::{cell::Cell, rc::Rc};
//!
//! let runs = Rc::new(Cell::new(0));
//! let comp = Composition::new();
//! for key in [1, 1, 2] {
//!     let runs = runs.clone();
//!     comp.compose(move || use_effect(key, move || runs.set(runs.get() + 1)));
//! }
//! assert_eq!(runs.get(), 2);
//! comp.dispose();
//! ```
//!
//! ## Time and tasks
//!
//! Timers and tasks never run on their own; the host calls [`pump`] each
//! frame. Tests install a [`ManualClock`] and call `advance`, which walks
//! through every timer deadline in order:
//!
//! ```rust
//! use repose_runtime::*;
//! use std::{cell::Cell, rc::Rc};
//! use web_time::Duration;
//!
//! let clock = ManualClock::install();
//! let fired = Rc::new(Cell::new(false));
//! let f = fired.clone();
//! schedule(Duration::from_millis(100), move || f.set(true));
//!
//! clock.advance(Duration::from_millis(99));
//! assert!(!fired.get());
//! clock.advance(Duration::from_millis(1));
//! assert!(fired.get());
//! ```

pub mod clock;
pub mod effects;
pub mod error;
pub mod locals;
pub mod prelude;
pub mod runtime;
pub mod scope;
pub mod signal;
pub mod state;
pub mod task;
pub mod tests;
pub mod timer;

pub use clock::*;
pub use effects::*;
pub use error::*;
pub use locals::*;
pub use runtime::*;
pub use scope::*;
pub use signal::*;
pub use state::*;
pub use task::*;
pub use timer::*;
