mod simple_system;
pub use self::simple_system::SimpleSystem;

#[doc(hidden)]
pub mod test_utils;
