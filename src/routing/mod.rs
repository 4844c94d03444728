//! Routing module
//!
//! Maps a request method and path onto one of the proxy endpoints and
//! extracts the path parameter.

mod matcher;

pub use matcher::match_endpoint;

/// A resolved API endpoint with its decoded path parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `POST /search-people/`
    SearchPeople,
    /// `GET /profile/{username}`
    Profile { username: String },
    /// `GET /profile-details/{urn_id}`
    ProfileDetails { urn_id: String },
    /// `GET /profile-contact-info/{urn_id}`
    ProfileContactInfo { urn_id: String },
    /// `GET` on the configured liveness path
    Health,
}

impl Endpoint {
    /// Short name used in log lines
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SearchPeople => "search_people",
            Self::Profile { .. } => "get_profile",
            Self::ProfileDetails { .. } => "get_profile_details",
            Self::ProfileContactInfo { .. } => "get_profile_contact_info",
            Self::Health => "health",
        }
    }
}

/// Why a request could not be routed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    NotFound,
    /// The path exists but not for this method; carries the `Allow` value
    MethodNotAllowed { allow: &'static str },
}
