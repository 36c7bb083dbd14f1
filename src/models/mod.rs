pub mod set;
pub mod user;

pub use set::*;
pub use user::*;
