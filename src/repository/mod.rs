use crate::db::{DbConnection, DbPool};
use crate::domain::profile::{NewProfile, Profile};
use crate::repository::errors::{RepositoryError, RepositoryResult};

pub mod errors;
pub mod profile;

pub trait ProfileReader {
    fn list_profiles(&self) -> RepositoryResult<Vec<Profile>>;
    fn get_profile(&self, profile_id: &str) -> RepositoryResult<Profile>;
}

pub trait ProfileWriter {
    /// Replace the whole stored profile set in one transaction.
    fn replace_profiles(&self, profiles: &[NewProfile]) -> RepositoryResult<usize>;
    fn set_profile_embedding(
        &self,
        profile_id: &str,
        embedding: &[f32],
    ) -> RepositoryResult<usize>;
}

/// Diesel-backed repository over the shared connection pool.
pub struct DieselRepository {
    pool: DbPool,
}

impl DieselRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub(crate) fn conn(&self) -> Result<DbConnection, RepositoryError> {
        Ok(self.pool.get()?)
    }
}
