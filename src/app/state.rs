use std::sync::Arc;

use crate::app::Config;
use crate::documents::JsonDocumentStore;
use crate::fleet::FleetSync;
use crate::gateway::{Gateway, HttpTransport};
use crate::notify::Notifier;
use crate::session::SessionStore;
use crate::utils::FleetlinkError;

/// Everything a command needs, built once at start-up
pub struct AppState {
    /// Configuration
    pub config: Config,
    /// Shared session state
    pub session: SessionStore,
    /// Telematics API access
    pub gateway: Gateway<HttpTransport>,
    /// Document collections, when a documents file is configured
    pub documents: Option<JsonDocumentStore>,
}

impl AppState {
    /// Create new app state
    pub async fn new(config: Config, notifier: Arc<dyn Notifier>) -> Result<Self, FleetlinkError> {
        let session = SessionStore::new();
        let gateway = Gateway::from_config(config.telematics.clone(), session.clone(), notifier)?;

        let documents = match &config.documents.path {
            Some(path) => Some(JsonDocumentStore::load(path).await?),
            None => None,
        };

        Ok(Self {
            config,
            session,
            gateway,
            documents,
        })
    }

    /// The document store, or a configuration error naming the setting
    pub fn documents(&self) -> Result<&JsonDocumentStore, FleetlinkError> {
        self.documents.as_ref().ok_or_else(|| {
            FleetlinkError::Config(
                "no documents file configured (use --documents or [documents] path)".to_string(),
            )
        })
    }

    pub fn fleet_sync(&self) -> Result<FleetSync<'_, HttpTransport>, FleetlinkError> {
        Ok(FleetSync::new(&self.gateway, self.documents()?))
    }
}
