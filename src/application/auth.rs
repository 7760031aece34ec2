use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::identity::Actor;
use crate::domain::ports::SessionRepository;

/// Resolves bearer session tokens to the actor behind them.
#[derive(Clone)]
pub struct SessionAuthenticator {
    sessions: Arc<dyn SessionRepository>,
}

impl SessionAuthenticator {
    pub fn new(sessions: Arc<dyn SessionRepository>) -> Self {
        Self { sessions }
    }

    pub fn authenticate(&self, bearer_token: &str) -> Result<Actor, DomainError> {
        let token =
            Uuid::try_parse(bearer_token.trim()).map_err(|_| DomainError::Unauthenticated)?;
        self.sessions
            .find_active(token, Utc::now())?
            .ok_or(DomainError::Unauthenticated)
    }
}
