use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::envelope::{EntityQuery, RpcRequest};
use super::error::GatewayError;
use super::http::HttpTransport;
use super::traits::RpcTransport;
use crate::app::TelematicsConfig;
use crate::models::{Credentials, Device, DeviceStatusInfo, Group, GroupId};
use crate::notify::Notifier;
use crate::session::{SessionStore, SessionUpdate};

#[derive(Debug, Deserialize)]
struct AuthenticateResult {
    credentials: Credentials,
}

/// Where the credentials for a call came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CredentialSource {
    /// Already in the session store when the call started
    Stored,
    /// Obtained by authenticating during this call
    Fresh,
}

/// Authenticated access to the telematics API.
///
/// Every public call marks the session busy for its whole duration, makes
/// sure credentials exist before querying, and reports failures through the
/// notifier exactly once.
pub struct Gateway<T: RpcTransport> {
    transport: T,
    store: SessionStore,
    notifier: Arc<dyn Notifier>,
    config: TelematicsConfig,
}

impl Gateway<HttpTransport> {
    /// Gateway over HTTP using the configured endpoint and timeout
    pub fn from_config(
        config: TelematicsConfig,
        store: SessionStore,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, GatewayError> {
        let transport = HttpTransport::new(config.endpoint.clone(), config.timeout())?;
        Ok(Self::new(transport, store, notifier, config))
    }
}

impl<T: RpcTransport> Gateway<T> {
    pub fn new(
        transport: T,
        store: SessionStore,
        notifier: Arc<dyn Notifier>,
        config: TelematicsConfig,
    ) -> Self {
        Self {
            transport,
            store,
            notifier,
            config,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Exchange the service account for a session token and store it
    pub async fn authenticate(&self) -> Result<Credentials, GatewayError> {
        let _loading = self.store.begin_loading();
        let result = self.authenticate_inner().await;
        self.surface(result)
    }

    /// Stored credentials, or authenticate once to get them
    pub async fn ensure_authenticated(&self) -> Result<Credentials, GatewayError> {
        let _loading = self.store.begin_loading();
        let result = self.credentials_or_authenticate().await;
        self.surface(result.map(|(credentials, _)| credentials))
    }

    /// Run a `Get` query and decode its result
    pub async fn query<R: DeserializeOwned>(&self, query: EntityQuery) -> Result<R, GatewayError> {
        let _loading = self.store.begin_loading();
        let result = self.query_inner(&query).await;
        self.surface(result)
    }

    pub async fn get_group(&self, group_id: &GroupId) -> Result<Vec<Group>, GatewayError> {
        self.query(EntityQuery::group(group_id)).await
    }

    pub async fn get_devices(&self, group_id: &GroupId) -> Result<Vec<Device>, GatewayError> {
        self.get_devices_by_groups(std::slice::from_ref(group_id)).await
    }

    pub async fn get_devices_by_groups(
        &self,
        groups: &[GroupId],
    ) -> Result<Vec<Device>, GatewayError> {
        self.query(EntityQuery::devices_in_groups(groups)).await
    }

    pub async fn get_device_by_id(&self, id: &str) -> Result<Option<Device>, GatewayError> {
        let devices: Vec<Device> = self.query(EntityQuery::device_by_id(id)).await?;
        Ok(devices.into_iter().next())
    }

    pub async fn get_devices_status_info(
        &self,
        group_id: &GroupId,
    ) -> Result<Vec<DeviceStatusInfo>, GatewayError> {
        self.get_devices_status_info_by_groups(std::slice::from_ref(group_id))
            .await
    }

    pub async fn get_devices_status_info_by_groups(
        &self,
        groups: &[GroupId],
    ) -> Result<Vec<DeviceStatusInfo>, GatewayError> {
        self.query(EntityQuery::status_in_groups(groups)).await
    }

    async fn query_inner<R: DeserializeOwned>(&self, query: &EntityQuery) -> Result<R, GatewayError> {
        let (credentials, source) = self.credentials_or_authenticate().await?;

        match self.call(&RpcRequest::get(query, &credentials)).await {
            // A token from an earlier call may have expired server-side.
            // Re-authenticate and re-issue once; a fresh token is never retried.
            Err(err) if source == CredentialSource::Stored && self.is_credential_rejection(&err) => {
                warn!("Stored credentials rejected ({}), re-authenticating", err);
                self.store.update(SessionUpdate::Credentials(None));
                let credentials = self.authenticate_inner().await?;
                self.call(&RpcRequest::get(query, &credentials)).await
            }
            result => result,
        }
    }

    async fn credentials_or_authenticate(
        &self,
    ) -> Result<(Credentials, CredentialSource), GatewayError> {
        match self.store.credentials() {
            Some(credentials) => Ok((credentials, CredentialSource::Stored)),
            None => {
                debug!("No credentials in session, authenticating first");
                let credentials = self.authenticate_inner().await?;
                Ok((credentials, CredentialSource::Fresh))
            }
        }
    }

    async fn authenticate_inner(&self) -> Result<Credentials, GatewayError> {
        let request = RpcRequest::authenticate(
            &self.config.database,
            &self.config.user_name,
            &self.config.password,
        );

        let result: AuthenticateResult = self
            .call(&request)
            .await
            .map_err(|e| GatewayError::Authentication(e.user_message()))?;

        info!("Authenticated against database '{}'", self.config.database);
        self.store
            .update(SessionUpdate::Credentials(Some(result.credentials.clone())));
        Ok(result.credentials)
    }

    /// One round trip: post, classify the envelope, decode the result
    async fn call<R: DeserializeOwned>(&self, request: &RpcRequest) -> Result<R, GatewayError> {
        match request.params.get("typeName") {
            Some(type_name) => debug!("RPC {} typeName={}", request.method, type_name),
            None => debug!("RPC {}", request.method),
        }

        let value = self.transport.post(request).await?.into_result()?;
        serde_json::from_value(value).map_err(|e| GatewayError::Malformed(e.to_string()))
    }

    fn is_credential_rejection(&self, err: &GatewayError) -> bool {
        match err {
            GatewayError::Application {
                name: Some(name), ..
            } => self.config.is_credential_error(name),
            _ => false,
        }
    }

    /// Report a failed call to the user before handing it to the caller
    fn surface<R>(&self, result: Result<R, GatewayError>) -> Result<R, GatewayError> {
        if let Err(err) = &result {
            warn!("Gateway call failed: {}", err);
            self.notifier.show(&err.user_message());
        }
        result
    }
}
