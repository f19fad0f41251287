pub mod app;
pub mod cli;
pub mod constants;
pub mod documents;
pub mod fleet;
pub mod gateway;
pub mod models;
pub mod notify;
pub mod session;
pub mod utils;

pub use app::{load_config, AppState, Config};
pub use gateway::{Gateway, GatewayError, HttpTransport, RpcTransport};
pub use models::{Credentials, Device, DeviceStatusInfo, Group, GroupId, UserProfile};
pub use session::{SessionStore, SessionUpdate};
pub use utils::FleetlinkError;
