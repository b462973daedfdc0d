//! Calculator implementations shipped with this crate

mod dummy_expansion;
pub use self::dummy_expansion::{DummyExpansion, DummyExpansionOutput, DummyExpansionParameters};
