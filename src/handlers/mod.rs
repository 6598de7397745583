pub mod interview;
pub mod models;

pub use interview::*;
pub use models::*;
