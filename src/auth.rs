//! Auth-domain models: issued access tokens, their secrets, and refresh credential lookup.

pub mod credential;
pub mod token;

pub use credential::*;
pub use token::{record::*, secret::*};
