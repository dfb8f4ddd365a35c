pub mod environment;
pub mod logging;
pub mod paths;
pub mod signals;
pub mod terminal;

pub use environment::default_workers;
pub use logging::init_logging;
pub use paths::{output_file_name, output_path, profile_name, slice_path};
pub use signals::{CancelToken, install_signal_handlers};
pub use terminal::{sanitize_for_display, strip_quotes};
