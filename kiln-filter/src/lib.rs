//! Kiln Filter
//!
//! The front controller placed in front of an application: it translates
//! request paths relative to the mount point, serves registered static
//! resources and hands everything else to the application's router.

mod filter;
mod path;
mod registry;
mod traits;

pub use filter::{AppFilter, FilterOutcome};
pub use path::{mount_prefix_from_pattern, translate, EffectiveRequest};
pub use registry::{ApplicationFactory, ApplicationRegistry};
pub use traits::{Application, ApplicationContext, DynamicRouter};
