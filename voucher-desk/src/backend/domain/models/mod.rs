pub mod denomination;
pub mod errors;
pub mod focus;
pub mod line_item;
pub mod permission;

pub use denomination::*;
pub use errors::*;
pub use focus::*;
pub use line_item::*;
pub use permission::*;
