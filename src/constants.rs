/// Constants module to avoid magic numbers in the codebase

// Telematics API
pub const DEFAULT_TELEMATICS_ENDPOINT: &str = "https://my.geotab.com/apiv1";
pub const RPC_METHOD_AUTHENTICATE: &str = "Authenticate";
pub const RPC_METHOD_GET: &str = "Get";

// Entity type names understood by the Get method
pub const TYPE_DEVICE: &str = "Device";
pub const TYPE_GROUP: &str = "Group";
pub const TYPE_DEVICE_STATUS_INFO: &str = "DeviceStatusInfo";

// Error names the backend uses when a session token is no longer accepted
pub const DEFAULT_CREDENTIAL_ERROR_NAMES: &[&str] = &["InvalidUserException"];

// Timeouts
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 10;

// Document store collections
pub const COLLECTION_USERS: &str = "users";
pub const COLLECTION_GROUP_MEMBERSHIPS: &str = "group_phone_numbers";
pub const COLLECTION_SERVICE_REQUESTS: &str = "serviceRequests";

// User-facing messages
pub const MSG_GENERIC_FAILURE: &str = "An error occurred";
pub const MSG_NETWORK_FAILURE: &str = "Unable to reach the server, please try again.";
pub const MSG_FORM_INCOMPLETE: &str = "Please fill out entire form prior to submission.";
pub const MSG_INVALID_PHONE: &str =
    "The phone number appears to be invalid, please double check and try again.";

// Service history
pub const DEFAULT_SERVICE_STATUS: &str = "Open";

// Account
pub const MSG_ACCOUNT_INCOMPLETE: &str = "All fields are required.";
