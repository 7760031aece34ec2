use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::identity::Actor;
use crate::domain::ports::SessionRepository;
use crate::schema::sessions;

use super::models::SessionRow;

pub struct DieselSessionRepository {
    pool: DbPool,
}

impl DieselSessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl SessionRepository for DieselSessionRepository {
    fn find_active(&self, token: Uuid, now: DateTime<Utc>) -> Result<Option<Actor>, DomainError> {
        let mut conn = self.pool.get()?;

        sessions::table
            .filter(sessions::token.eq(token))
            .filter(sessions::expires_at.gt(now))
            .select(SessionRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(SessionRow::into_actor)
            .transpose()
    }
}
