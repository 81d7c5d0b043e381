//! Diesel row types for profiles and their conversions to domain types.

use bytemuck::{cast_slice, pod_collect_to_vec};
use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::profile::{NewProfile, Profile};
use crate::repository::errors::RepositoryError;

#[derive(Debug, Queryable)]
pub struct ProfileRow {
    pub id: String,
    pub name: String,
    pub title: String,
    pub email: Option<String>,
    pub website: Option<String>,
    pub office: Option<String>,
    pub description: String,
    pub embedding: Option<Vec<u8>>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::profiles)]
pub struct NewProfileRow {
    pub id: String,
    pub name: String,
    pub title: String,
    pub email: Option<String>,
    pub website: Option<String>,
    pub office: Option<String>,
    pub description: String,
}

#[derive(Debug, Queryable)]
pub struct ProfileAreaRow {
    pub id: i32,
    pub profile_id: String,
    pub area: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::profile_areas)]
pub struct NewProfileAreaRow {
    pub profile_id: String,
    pub area: String,
}

impl From<NewProfile> for NewProfileRow {
    fn from(profile: NewProfile) -> Self {
        Self {
            id: profile.id,
            name: profile.name,
            title: profile.title,
            email: profile.email,
            website: profile.website,
            office: profile.office,
            description: profile.description,
        }
    }
}

/// Encode an embedding vector into the BLOB column representation.
pub fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    cast_slice(embedding).to_vec()
}

/// Decode a BLOB column back into an embedding vector.
///
/// The blob length must be a whole number of f32 values; anything else
/// means the stored artifact is corrupt and the row must not be served.
pub fn decode_embedding(profile_id: &str, blob: &[u8]) -> Result<Vec<f32>, RepositoryError> {
    if blob.len() % size_of::<f32>() != 0 {
        return Err(RepositoryError::Validation(format!(
            "profile {profile_id} has a corrupt embedding blob of {} bytes",
            blob.len()
        )));
    }
    Ok(pod_collect_to_vec(blob))
}

impl ProfileRow {
    /// Convert a row plus its area names into the domain type.
    pub fn into_domain(self, areas: Vec<String>) -> Result<Profile, RepositoryError> {
        let embedding = match self.embedding {
            Some(blob) => Some(decode_embedding(&self.id, &blob)?),
            None => None,
        };

        Ok(Profile {
            id: self.id,
            name: self.name,
            title: self.title,
            email: self.email,
            website: self.website,
            office: self.office,
            description: self.description,
            areas,
            embedding,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_embedding, encode_embedding};

    #[test]
    fn embedding_round_trips_through_blob() {
        let embedding = vec![0.25f32, -1.5, 3.0];
        let blob = encode_embedding(&embedding);
        assert_eq!(blob.len(), 12);

        let decoded = decode_embedding("p1", &blob).expect("blob should decode");
        assert_eq!(decoded, embedding);
    }

    #[test]
    fn decode_rejects_truncated_blob() {
        let blob = vec![0u8; 7];
        assert!(decode_embedding("p1", &blob).is_err());
    }
}
