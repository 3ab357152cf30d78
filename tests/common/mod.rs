pub mod builders;
pub mod stubs;
pub mod strategies;

pub use builders::*;
pub use stubs::*;
