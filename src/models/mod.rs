pub mod common;
pub mod image;
pub mod storage;

pub use self::common::*;
pub use self::image::*;
pub use self::storage::*;
