// Gateway module for fleet workflows - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod account;
mod membership;
mod service;
mod status;
mod sync;

// Public re-exports - the ONLY way to access fleet functionality
pub use account::{validate_profile, AccountError};
pub use membership::{resolve_groups, MembershipRecord};
pub use service::{
    service_history, ServiceHistoryEntry, ServiceRequest, ServiceRequestError,
    ServiceRequestRecord, SERVICE_ISSUES,
};
pub use status::{describe_status, find_device_by_id, sort_status_by_device_name};
pub use sync::FleetSync;
