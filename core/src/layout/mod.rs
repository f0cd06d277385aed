//! Layout management — building documents into sessions and navigating them.
//!
//! The `builder` module walks a layout document and issues the ordered
//! provider calls that reproduce it. The `targeting` module resolves symbolic
//! directions to backend target expressions and dispatches navigation.

pub mod builder;
pub mod targeting;
