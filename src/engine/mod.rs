//! Customizer engine
//!
//! One [`Engine`] per product view. It wires the gesture interpreter, the
//! rotation state machine, the material resolver and the asset cache
//! together and publishes a [`ViewSnapshot`] to the render surface.

mod session;
mod view;

pub use session::Engine;
pub use view::{DisplayedResource, ViewSnapshot};
