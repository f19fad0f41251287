use tracing::info;

use super::account::validate_profile;
use super::membership::resolve_groups;
use super::service::{ServiceRequest, ServiceRequestRecord};
use crate::constants::{COLLECTION_GROUP_MEMBERSHIPS, COLLECTION_SERVICE_REQUESTS, COLLECTION_USERS};
use crate::documents::{fields_of, DocumentStore};
use crate::gateway::{Gateway, RpcTransport};
use crate::models::{Device, GroupId, UserProfile};
use crate::session::SessionUpdate;
use crate::utils::FleetlinkError;

/// Loads the signed-in user's profile, groups and devices into the session
pub struct FleetSync<'a, T: RpcTransport> {
    gateway: &'a Gateway<T>,
    documents: &'a dyn DocumentStore,
}

impl<'a, T: RpcTransport> FleetSync<'a, T> {
    pub fn new(gateway: &'a Gateway<T>, documents: &'a dyn DocumentStore) -> Self {
        Self { gateway, documents }
    }

    /// Fetch `users/<uid>` and make it the session user
    pub async fn load_user(&self, uid: &str) -> Result<UserProfile, FleetlinkError> {
        let document = self
            .documents
            .get(COLLECTION_USERS, uid)
            .await?
            .ok_or_else(|| FleetlinkError::NotSignedIn(format!("no profile for user '{}'", uid)))?;

        let user: UserProfile = document.decode()?;
        self.gateway
            .store()
            .update(SessionUpdate::User(Some(user.clone())));
        Ok(user)
    }

    /// Resolve the session user's groups and store them
    pub async fn load_groups(&self) -> Result<Vec<GroupId>, FleetlinkError> {
        let store = self.gateway.store();
        let user = store
            .user()
            .ok_or_else(|| FleetlinkError::NotSignedIn("no user in session".to_string()))?;

        let memberships = self.documents.list(COLLECTION_GROUP_MEMBERSHIPS).await?;
        let groups = resolve_groups(&user, &memberships);
        store.update(SessionUpdate::Groups(groups.clone()));
        Ok(groups)
    }

    /// Groups, then the devices in them. A user without groups gets an
    /// empty device list and no network call.
    pub async fn sync(&self) -> Result<Vec<Device>, FleetlinkError> {
        let store = self.gateway.store();
        let _loading = store.begin_loading();

        let groups = self.load_groups().await?;
        let devices = if groups.is_empty() {
            Vec::new()
        } else {
            self.gateway.get_devices_by_groups(&groups).await?
        };

        info!(
            "Synced {} device(s) across {} group(s)",
            devices.len(),
            groups.len()
        );
        store.update(SessionUpdate::Devices(devices.clone()));
        Ok(devices)
    }

    /// Write the profile to `users/<uid>` and make it the session user.
    /// Fields the profile doesn't carry are kept from the stored document.
    pub async fn save_user(&self, uid: &str, profile: UserProfile) -> Result<(), FleetlinkError> {
        validate_profile(&profile)?;
        let _loading = self.gateway.store().begin_loading();

        let mut fields = self
            .documents
            .get(COLLECTION_USERS, uid)
            .await?
            .map(|document| document.fields)
            .unwrap_or_default();
        fields.extend(fields_of(&profile)?);

        self.documents.set(COLLECTION_USERS, uid, fields).await?;
        info!("Saved profile for user '{}'", uid);
        self.gateway
            .store()
            .update(SessionUpdate::User(Some(profile)));
        Ok(())
    }

    /// Validate a request against the session's devices and store it in
    /// `serviceRequests`. Returns the new document id with the record.
    pub async fn submit_request(
        &self,
        uid: &str,
        request: ServiceRequest,
        date_time: i64,
    ) -> Result<(String, ServiceRequestRecord), FleetlinkError> {
        let tractors_available = !self.gateway.store().devices().is_empty();
        let record = request.into_record(uid, date_time, tractors_available)?;

        let _loading = self.gateway.store().begin_loading();
        let id = self
            .documents
            .add(COLLECTION_SERVICE_REQUESTS, fields_of(&record)?)
            .await?;
        info!("Submitted service request '{}'", id);
        Ok((id, record))
    }
}
