// API types module
// Request and response schemas exposed by the proxy

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::client::RawRecord;

/// Body of `POST /search-people/`
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub search_string: String,
}

/// One people-search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub urn_id: String,
    pub distance: String,
    pub jobtitle: String,
    pub location: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
}

/// Fully qualified profile picture URLs keyed by size fragment name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfilePictureUrls {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub img_100_100: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub img_200_200: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub img_400_400: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub img_800_800: Option<String>,
    /// Any other `img_*` size the upstream reports
    #[serde(flatten)]
    pub other: BTreeMap<String, String>,
}

impl ProfilePictureUrls {
    pub fn insert(&mut self, key: &str, url: String) {
        match key {
            "img_100_100" => self.img_100_100 = Some(url),
            "img_200_200" => self.img_200_200 = Some(url),
            "img_400_400" => self.img_400_400 = Some(url),
            "img_800_800" => self.img_800_800 = Some(url),
            _ => {
                self.other.insert(key.to_string(), url);
            }
        }
    }
}

/// Work history entry, passed through as the upstream shaped it
pub type Experience = RawRecord;

/// Education entry, passed through as the upstream shaped it
pub type Education = RawRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileDetails {
    pub urn_id: String,
    pub public_id: Option<String>,
    pub profile_id: Option<String>,
    pub member_urn: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub headline: Option<String>,
    pub summary: Option<String>,
    pub industry_name: Option<String>,
    pub location_name: Option<String>,
    pub geo_location_name: Option<String>,
    pub geo_country_name: Option<String>,
    pub experience: Option<Vec<Experience>>,
    pub education: Option<Vec<Education>>,
    pub profile_pictures: Option<ProfilePictureUrls>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber {
    pub number: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Website {
    pub url: String,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContactInfo {
    pub email_address: Option<String>,
    pub phone_numbers: Vec<PhoneNumber>,
    pub twitter_handles: Vec<String>,
    pub websites: Vec<Website>,
    pub address: Option<String>,
    pub birth_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
