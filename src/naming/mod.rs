//! Naming & Directory (§4.A): control directory layout, safe-id validation,
//! alias symlinks, and whimsical auto-name generation.

pub mod control_dir;
pub mod validate;
pub mod whimsical;

pub use control_dir::{ControlDir, EndpointNode};
pub use validate::validate_safe_id;
