//! Identity primitives shared by credentials and the rules protocol: typed identifiers, OAuth scope
//! sets, and redacted token secrets.

pub mod id;
pub mod scope;
pub mod secret;

pub use id::*;
pub use scope::*;
pub use secret::*;
