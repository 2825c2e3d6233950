pub mod customer;
pub mod period;
pub mod reading;
pub mod roi;
pub mod tariff;

pub use customer::*;
pub use period::*;
pub use reading::*;
pub use roi::*;
pub use tariff::*;
