pub mod check;
pub mod render;
pub mod scan;

pub use check::{check, CheckArgs};
pub use render::{render, RenderArgs};
pub use scan::{scan, ScanArgs};
