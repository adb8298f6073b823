pub mod controls;
pub mod marker;
pub mod popup;
pub mod render_target;

pub use controls::{ControlKind, ControlManager, ControlPosition, MapControl};

pub use marker::{Marker, MarkerOptions};

pub use popup::{MapPopup, PopupOptions};

pub use render_target::RenderTarget;
