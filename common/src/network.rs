pub mod range;

pub use range::{AddressIter, AddressRange, RangeError};
