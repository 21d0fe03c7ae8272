//! Shared primitive types.
mod asset;
pub use asset::*;

mod fee;
pub use fee::*;

mod recipient;
pub use recipient::*;

mod request;
pub use request::*;

mod tokens;
pub use tokens::*;
