pub mod business_hours;
pub mod similarity;

pub use business_hours::*;
pub use similarity::*;
