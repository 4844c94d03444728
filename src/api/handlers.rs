// Request handlers module
// One function per endpoint: call the upstream client, convert the result

use super::error::ApiError;
use super::mapping;
use super::types::{ContactInfo, ProfileDetails, SearchRequest, SearchResponse};
use crate::client::{ProfileClient, ProfileLookup, RawRecord};

/// Maximum number of search hits returned
pub const SEARCH_LIMIT: usize = 10;

/// Parse and validate the search request body
pub fn parse_search_request(body: &[u8]) -> Result<SearchRequest, ApiError> {
    let request: SearchRequest = serde_json::from_slice(body)
        .map_err(|e| ApiError::Validation(format!("Invalid request body: {e}")))?;

    if request.search_string.is_empty() {
        return Err(ApiError::Validation(
            "search_string must be a non-empty string".to_string(),
        ));
    }
    Ok(request)
}

pub async fn search_people(
    client: &dyn ProfileClient,
    request: &SearchRequest,
) -> Result<SearchResponse, ApiError> {
    let hits = client
        .search_people(&request.search_string, SEARCH_LIMIT)
        .await?;
    let results = mapping::to_search_results(hits, SEARCH_LIMIT)?;
    Ok(SearchResponse { results })
}

/// Full profile by public identifier, returned unchanged
pub async fn get_profile(client: &dyn ProfileClient, username: &str) -> Result<RawRecord, ApiError> {
    let lookup = ProfileLookup::PublicId(username.to_string());
    Ok(client.get_profile(&lookup).await?)
}

pub async fn get_profile_details(
    client: &dyn ProfileClient,
    urn_id: &str,
) -> Result<ProfileDetails, ApiError> {
    let lookup = ProfileLookup::UrnId(urn_id.to_string());
    let profile = client.get_profile(&lookup).await?;
    Ok(mapping::to_profile_details(urn_id, profile)?)
}

pub async fn get_profile_contact_info(
    client: &dyn ProfileClient,
    urn_id: &str,
) -> Result<ContactInfo, ApiError> {
    let contact = client.get_profile_contact_info(urn_id).await?;
    Ok(mapping::to_contact_info(urn_id, contact)?)
}
