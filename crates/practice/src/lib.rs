pub mod sanitize;
pub mod device;
pub mod attempt;
pub mod schema;

pub use sanitize::*;
pub use device::*;
pub use attempt::*;
pub use schema::*;
