pub mod media;

pub use tubegrab_core::models::settings;
pub use tubegrab_core::models::task;
