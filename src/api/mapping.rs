//! Raw record conversion module
//!
//! Turns the loosely-typed mappings returned by the upstream client into
//! the fixed response schemas. Anything that does not fit the schema is a
//! malformed upstream response.

use serde::Deserialize;
use serde_json::Value;

use super::types::{
    ContactInfo, Education, Experience, PhoneNumber, ProfileDetails, ProfilePictureUrls,
    SearchResult, Website,
};
use crate::client::{ClientError, RawRecord};

/// Key holding the base URL that picture fragments are appended to
const DISPLAY_PICTURE_URL: &str = "displayPictureUrl";
const PICTURE_KEY_PREFIX: &str = "img_";

/// Convert search hits, keeping upstream order and at most `limit` entries
pub fn to_search_results(
    hits: Vec<RawRecord>,
    limit: usize,
) -> Result<Vec<SearchResult>, ClientError> {
    hits.into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, hit)| {
            serde_json::from_value(Value::Object(hit))
                .map_err(|e| ClientError::Malformed(format!("search hit {i}: {e}")))
        })
        .collect()
}

/// Build fully qualified picture URLs from a raw profile.
///
/// Returns `None` when the profile has no string `displayPictureUrl`.
/// Non-string `img_*` values are skipped.
pub fn assemble_profile_pictures(profile: &RawRecord) -> Option<ProfilePictureUrls> {
    let base = profile.get(DISPLAY_PICTURE_URL)?.as_str()?;

    let mut pictures = ProfilePictureUrls::default();
    for (key, value) in profile {
        if !key.starts_with(PICTURE_KEY_PREFIX) {
            continue;
        }
        if let Some(fragment) = value.as_str() {
            pictures.insert(key, format!("{base}{fragment}"));
        }
    }
    Some(pictures)
}

#[derive(Deserialize)]
struct RawProfile {
    public_id: Option<String>,
    profile_id: Option<String>,
    member_urn: Option<String>,
    #[serde(rename = "firstName")]
    first_name: Option<String>,
    #[serde(rename = "lastName")]
    last_name: Option<String>,
    headline: Option<String>,
    summary: Option<String>,
    #[serde(rename = "industryName")]
    industry_name: Option<String>,
    #[serde(rename = "locationName")]
    location_name: Option<String>,
    #[serde(rename = "geoLocationName")]
    geo_location_name: Option<String>,
    #[serde(rename = "geoCountryName")]
    geo_country_name: Option<String>,
    experience: Option<Vec<Experience>>,
    education: Option<Vec<Education>>,
}

pub fn to_profile_details(urn_id: &str, profile: RawRecord) -> Result<ProfileDetails, ClientError> {
    let profile_pictures = assemble_profile_pictures(&profile);
    let raw = RawProfile::deserialize(Value::Object(profile))
        .map_err(|e| ClientError::Malformed(format!("profile {urn_id}: {e}")))?;

    Ok(ProfileDetails {
        urn_id: urn_id.to_string(),
        public_id: raw.public_id,
        profile_id: raw.profile_id,
        member_urn: raw.member_urn,
        first_name: raw.first_name,
        last_name: raw.last_name,
        headline: raw.headline,
        summary: raw.summary,
        industry_name: raw.industry_name,
        location_name: raw.location_name,
        geo_location_name: raw.geo_location_name,
        geo_country_name: raw.geo_country_name,
        experience: raw.experience,
        education: raw.education,
        profile_pictures,
    })
}

/// Twitter handles arrive either as bare strings or as `{name, ...}` records
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTwitterHandle {
    Name(String),
    Entry { name: String },
}

impl RawTwitterHandle {
    fn into_name(self) -> String {
        match self {
            Self::Name(name) | Self::Entry { name } => name,
        }
    }
}

#[derive(Deserialize)]
struct RawContactInfo {
    #[serde(rename = "emailAddress", alias = "email_address")]
    email_address: Option<String>,
    #[serde(rename = "phoneNumbers", alias = "phone_numbers")]
    phone_numbers: Option<Vec<PhoneNumber>>,
    #[serde(rename = "twitterHandles", alias = "twitter_handles", alias = "twitter")]
    twitter_handles: Option<Vec<RawTwitterHandle>>,
    websites: Option<Vec<Website>>,
    address: Option<String>,
    #[serde(rename = "birthDate", alias = "birth_date", alias = "birthdate")]
    birth_date: Option<String>,
}

/// Rename contact info keys, defaulting missing or `null` lists to `[]`
pub fn to_contact_info(urn_id: &str, contact: RawRecord) -> Result<ContactInfo, ClientError> {
    let raw = RawContactInfo::deserialize(Value::Object(contact))
        .map_err(|e| ClientError::Malformed(format!("contact info {urn_id}: {e}")))?;

    Ok(ContactInfo {
        email_address: raw.email_address,
        phone_numbers: raw.phone_numbers.unwrap_or_default(),
        twitter_handles: raw
            .twitter_handles
            .unwrap_or_default()
            .into_iter()
            .map(RawTwitterHandle::into_name)
            .collect(),
        websites: raw.websites.unwrap_or_default(),
        address: raw.address,
        birth_date: raw.birth_date,
    })
}
