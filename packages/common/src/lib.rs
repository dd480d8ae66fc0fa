pub mod error;
pub mod record;
pub mod result;
pub mod store;

pub use error::*;
pub use record::*;
pub use result::*;
pub use store::*;
