//! HTTP API handlers for vindec-decoder

pub mod connectivity;
pub mod decode;
pub mod decodes;
pub mod health;
pub mod settings;
pub mod submissions;

pub use connectivity::connectivity_routes;
pub use decode::decode_routes;
pub use decodes::decodes_routes;
pub use health::health_routes;
pub use settings::settings_routes;
pub use submissions::submission_routes;
