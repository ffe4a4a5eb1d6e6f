//! # Beacon Core Kernel
//!
//! Owns the lifecycle of core components.
//!
//! - **Application Bootstrapping**: [`Application`](bootstrap::Application)
//!   registers components, initializes and starts them in order and stops
//!   them in reverse order. It always owns an
//!   [`EventBusComponent`](crate::event::EventBusComponent), whose shutdown
//!   disposes the application's event bus.
//! - **Component Lifecycle**: the [`KernelComponent`](component::KernelComponent)
//!   trait and the [`DependencyRegistry`](component::DependencyRegistry)
//!   used for typed component lookup.
//! - **Error Handling**: kernel error type ([`Error`](error::Error)) and a
//!   `Result` alias.
pub mod bootstrap;
pub mod component;
pub mod constants;
pub mod error;

pub use bootstrap::Application;
pub use component::{DependencyRegistry, KernelComponent};
pub use error::{Error, Result};
