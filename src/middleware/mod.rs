/// Middleware module
///
/// Request extractors and other per-request concerns.

mod bearer;

pub use bearer::BearerToken;
