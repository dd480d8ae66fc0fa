pub mod bundle;
pub mod resolver;
pub mod scanner;

pub use bundle::*;
pub use resolver::*;
pub use scanner::*;
