//! HTTP controllers, one module per resource.

pub mod devices;
pub mod notify;
pub mod notify_targeted;
pub mod subscribe;
pub mod vapid;
pub mod version;
