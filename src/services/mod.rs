//! Services: catalog collaborators and job orchestration

pub mod alma;
pub mod authorities;
pub mod email;
pub mod job;
pub mod prompt;
pub mod snapshots;
pub mod sru;

use std::sync::Arc;

use crate::config::{AppConfig, EnvConfig};

/// Container for the collaborators a job talks to
#[derive(Clone)]
pub struct Services {
    pub search: Arc<dyn sru::SearchService>,
    pub catalog: Arc<dyn alma::CatalogService>,
    pub authorities: Arc<dyn authorities::AuthorityService>,
    pub prompter: Arc<dyn prompt::Prompter>,
}

impl Services {
    /// Create the network clients for the selected environment
    pub fn new(config: &AppConfig, env: &EnvConfig, interactive: bool) -> Self {
        let prompter: Arc<dyn prompt::Prompter> = if interactive {
            Arc::new(prompt::TerminalPrompter)
        } else {
            Arc::new(prompt::DefaultsPrompter)
        };
        Self {
            search: Arc::new(sru::SruClient::new(env.sru_url.clone())),
            catalog: Arc::new(alma::AlmaClient::new(&env.api_region, env.api_key.clone())),
            authorities: Arc::new(authorities::IdService::new(
                config.vocabulary.id_service.clone(),
                config.vocabulary.marc_code.clone(),
                config.vocabulary.marc_prefix.clone(),
            )),
            prompter,
        }
    }
}
