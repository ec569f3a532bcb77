//! Authority identifier lookup

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::models::Concept;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthorityService: Send + Sync {
    /// Attach an authority identifier (`$0`) to `concept` when one is found
    async fn authorize_concept(&self, concept: &mut Concept) -> AppResult<()>;
}

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: Option<String>,
}

/// Lookup against a vocabulary id service returning `{"id": ...}`
#[derive(Clone)]
pub struct IdService {
    http: reqwest::Client,
    url: Option<String>,
    vocabulary: String,
    marc_prefix: String,
}

impl IdService {
    /// `url` is `None` when the vocabulary has no id service
    pub fn new(url: Option<String>, vocabulary: impl Into<String>, marc_prefix: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url,
            vocabulary: vocabulary.into(),
            marc_prefix: marc_prefix.into(),
        }
    }
}

#[async_trait]
impl AuthorityService for IdService {
    async fn authorize_concept(&self, concept: &mut Concept) -> AppResult<()> {
        let Some(url) = &self.url else {
            return Ok(());
        };
        let response: IdResponse = self
            .http
            .get(url)
            .query(&[
                ("vocabulary", self.vocabulary.as_str()),
                ("term", concept.term.as_str()),
                ("tag", concept.tag.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Authority(e.to_string()))?
            .error_for_status()
            .map_err(|e| AppError::Authority(e.to_string()))?
            .json()
            .await
            .map_err(|e| AppError::Authority(e.to_string()))?;

        match response.id.filter(|id| !id.is_empty()) {
            Some(id) => {
                let id = format!("{}{}", self.marc_prefix, id);
                tracing::debug!("Authorized {} as {}", concept.term, id);
                concept.set_authority_id(id);
            }
            None => tracing::debug!("No authority record found for {}", concept.term),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Tag;

    #[test]
    fn test_id_response() {
        let hit: IdResponse = serde_json::from_str(r#"{"id": "c012345"}"#).unwrap();
        assert_eq!(hit.id.as_deref(), Some("c012345"));
        let miss: IdResponse = serde_json::from_str(r#"{"id": null}"#).unwrap();
        assert!(miss.id.is_none());
    }

    #[tokio::test]
    async fn test_without_service_is_noop() {
        let service = IdService::new(None, "noubomn", "(NoOU-ONR)");
        let mut concept = Concept::new("Mønstre", Some("noubomn"), Tag::Topical).unwrap();
        service.authorize_concept(&mut concept).await.unwrap();
        assert_eq!(concept.authority_id(), None);
    }
}
