//! Access token records and the redacting secret wrapper they carry.

pub mod record;
pub mod secret;
