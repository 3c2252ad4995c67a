pub mod item;
pub mod record;

pub use item::*;
pub use record::*;
