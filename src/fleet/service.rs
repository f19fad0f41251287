use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

use crate::constants::{DEFAULT_SERVICE_STATUS, MSG_FORM_INCOMPLETE, MSG_INVALID_PHONE};
use crate::documents::{Document, DocumentError};
use crate::utils::{format_phone_number, string_has_value};

/// Problems a driver can report; the last entry needs a free-text description
pub const SERVICE_ISSUES: &[&str] = &[
    "CEL (Check Engine Light) on",
    "SEL (Stop Engine light) on",
    "Unit in De-rate (Least Severe- 15 MPH limit)",
    "Unit in De-rate (Most Severe- 5 MPH limit)",
    "No Start (Engine Cranks but won't start)",
    "No Spin No Start (Engine won't turn over)",
    "Dead Batteries",
    "Service/Emergency air lines",
    "7 way pigtail",
    "Oil leak",
    "Coolant Leak",
    "Air Leak",
    "Transmission Leak",
    "Hydraulic Leak",
    "Heat/AC Inop.",
    "Headlights/ Clearance Lights/ Work lights/ Strobe light Inop.",
    "Windshield/door glass",
    "Windshield Wipers",
    "Horn (Electric or Air)",
    "Accidental Damage",
    "Other",
];

fn other_issue_index() -> usize {
    SERVICE_ISSUES.len() - 1
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceRequestError {
    #[error("{}", MSG_FORM_INCOMPLETE)]
    Incomplete,
    #[error("{}", MSG_INVALID_PHONE)]
    InvalidPhone,
}

/// A service request as filled in by a driver
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceRequest {
    pub full_name: Option<String>,
    pub call_back_phone: Option<String>,
    pub tractor_id: Option<String>,
    /// Indices into [`SERVICE_ISSUES`]
    pub issues: Vec<usize>,
    pub issue_other: Option<String>,
}

/// What gets written to the `serviceRequests` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequestRecord {
    pub full_name: String,
    pub call_back_phone: String,
    pub tractor_id: Option<String>,
    pub issue: String,
    pub issue_other: Option<String>,
    pub uid: String,
    pub date_time: i64,
}

impl ServiceRequest {
    /// Check the form. The tractor is only required when the user has
    /// tractors to pick from.
    pub fn validate(&self, tractors_available: bool) -> Result<(), ServiceRequestError> {
        if !string_has_value(self.full_name.as_deref())
            || !string_has_value(self.call_back_phone.as_deref())
            || (tractors_available && !string_has_value(self.tractor_id.as_deref()))
        {
            return Err(ServiceRequestError::Incomplete);
        }

        if self.issues.is_empty() || self.issues.iter().any(|&i| i >= SERVICE_ISSUES.len()) {
            return Err(ServiceRequestError::Incomplete);
        }

        if self.issues.contains(&other_issue_index())
            && !string_has_value(self.issue_other.as_deref())
        {
            return Err(ServiceRequestError::Incomplete);
        }

        if format_phone_number(self.call_back_phone.as_deref().unwrap_or_default()).is_empty() {
            return Err(ServiceRequestError::InvalidPhone);
        }

        Ok(())
    }

    /// Selected issues joined for display and storage
    pub fn issue_text(&self) -> String {
        self.issues
            .iter()
            .filter_map(|&i| SERVICE_ISSUES.get(i).copied())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Validate and build the stored record
    pub fn into_record(
        self,
        uid: &str,
        date_time: i64,
        tractors_available: bool,
    ) -> Result<ServiceRequestRecord, ServiceRequestError> {
        self.validate(tractors_available)?;
        let issue = self.issue_text();

        Ok(ServiceRequestRecord {
            full_name: self.full_name.unwrap_or_default().trim().to_string(),
            call_back_phone: format_phone_number(&self.call_back_phone.unwrap_or_default()),
            tractor_id: self.tractor_id.filter(|t| !t.trim().is_empty()),
            issue,
            issue_other: self.issue_other.filter(|o| !o.trim().is_empty()),
            uid: uid.to_string(),
            date_time,
        })
    }
}

/// A past service request, as listed in the history view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceHistoryEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub date_time: Option<i64>,
    #[serde(default)]
    pub tractor_id: Option<String>,
    #[serde(default)]
    pub issue: Option<String>,
    #[serde(default)]
    pub issue_other: Option<String>,
    #[serde(default)]
    pub status_name: Option<String>,
}

impl ServiceHistoryEntry {
    pub fn from_document(document: &Document) -> Result<Self, DocumentError> {
        let mut entry: ServiceHistoryEntry = document.decode()?;
        entry.id = document.id.clone();
        if !string_has_value(entry.status_name.as_deref()) {
            entry.status_name = Some(DEFAULT_SERVICE_STATUS.to_string());
        }
        Ok(entry)
    }

    pub fn status(&self) -> &str {
        self.status_name.as_deref().unwrap_or(DEFAULT_SERVICE_STATUS)
    }

    pub fn is_open(&self) -> bool {
        self.status().eq_ignore_ascii_case(DEFAULT_SERVICE_STATUS)
    }
}

/// History entries from documents, newest first
pub fn service_history(documents: &[Document]) -> Result<Vec<ServiceHistoryEntry>, DocumentError> {
    let mut history = documents
        .iter()
        .map(ServiceHistoryEntry::from_document)
        .collect::<Result<Vec<_>, _>>()?;

    history.sort_by_key(|entry| Reverse(entry.date_time));
    Ok(history)
}
