pub mod config;
pub mod error;
pub mod traits;

pub use self::config::*;
pub use self::error::*;
pub use self::traits::*;
