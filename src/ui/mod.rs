pub mod summary;
pub mod theme;

pub use summary::{print_summary, render_summary};
pub use theme::{theme, Theme};
