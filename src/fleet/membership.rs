use serde::Deserialize;
use tracing::debug;

use crate::documents::Document;
use crate::models::{GroupId, UserProfile};
use crate::utils::format_phone_number;

/// One contact entry inside a group-membership document
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MembershipRecord {
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

impl MembershipRecord {
    /// Active and matching the user's email (case-insensitive) or phone
    /// number (compared after formatting)
    pub fn grants(&self, user: &UserProfile) -> bool {
        if !self.is_active {
            return false;
        }

        let email_match = match (&self.email, &user.email) {
            (Some(a), Some(b)) => {
                let (a, b) = (a.trim(), b.trim());
                !a.is_empty() && a.eq_ignore_ascii_case(b)
            }
            _ => false,
        };

        let phone_match = match (&self.phone_number, &user.phone_number) {
            (Some(a), Some(b)) => {
                let a = format_phone_number(a);
                !a.is_empty() && a == format_phone_number(b)
            }
            _ => false,
        };

        email_match || phone_match
    }
}

/// Groups the user belongs to.
///
/// Each membership document is keyed by group id and maps record ids to
/// [`MembershipRecord`]s. Fields that are not records are ignored. Result
/// order follows the documents, without duplicates.
pub fn resolve_groups(user: &UserProfile, memberships: &[Document]) -> Vec<GroupId> {
    let mut groups: Vec<GroupId> = Vec::new();

    for document in memberships {
        let granted = document
            .fields
            .values()
            .filter(|value| value.is_object())
            .filter_map(|value| MembershipRecord::deserialize(value).ok())
            .any(|record| record.grants(user));

        let group = GroupId::new(document.id.clone());
        if granted && !groups.contains(&group) {
            groups.push(group);
        }
    }

    debug!("Resolved {} group(s) for user", groups.len());
    groups
}
