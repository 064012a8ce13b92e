mod service_view;

pub use service_view::*;
