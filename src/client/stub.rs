//! Scripted `ProfileClient` used as a test double

use std::sync::Mutex;

use async_trait::async_trait;

use super::{ClientError, ProfileClient, ProfileLookup, RawRecord};

#[derive(Default)]
pub struct StubClient {
    pub hits: Vec<RawRecord>,
    pub profile: RawRecord,
    pub contact: RawRecord,
    /// When set, every call fails with a transport error carrying this text
    pub fail_with: Option<String>,
    pub calls: Mutex<Vec<String>>,
}

impl StubClient {
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<(), ClientError> {
        self.calls.lock().unwrap().push(call);
        match &self.fail_with {
            Some(message) => Err(ClientError::Transport(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ProfileClient for StubClient {
    async fn search_people(
        &self,
        keywords: &str,
        limit: usize,
    ) -> Result<Vec<RawRecord>, ClientError> {
        self.record(format!("search_people({keywords}, {limit})"))?;
        Ok(self.hits.clone())
    }

    async fn get_profile(&self, lookup: &ProfileLookup) -> Result<RawRecord, ClientError> {
        self.record(format!("get_profile({}={})", lookup.key(), lookup.value()))?;
        Ok(self.profile.clone())
    }

    async fn get_profile_contact_info(&self, urn_id: &str) -> Result<RawRecord, ClientError> {
        self.record(format!("get_profile_contact_info({urn_id})"))?;
        Ok(self.contact.clone())
    }
}
