use crate::constants::MSG_ACCOUNT_INCOMPLETE;
use crate::models::UserProfile;
use crate::utils::string_has_value;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
    #[error("{}", MSG_ACCOUNT_INCOMPLETE)]
    Incomplete,
}

/// Name and customer are both required before a profile is saved
pub fn validate_profile(profile: &UserProfile) -> Result<(), AccountError> {
    if !string_has_value(Some(&profile.full_name))
        || !string_has_value(Some(&profile.customer_name))
    {
        return Err(AccountError::Incomplete);
    }
    Ok(())
}
