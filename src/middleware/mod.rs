pub mod admin_auth;
pub mod request_meta;

pub use admin_auth::{admin_auth_layer, AdminGate, AdminIdentity};
pub use request_meta::capture_request_meta;
