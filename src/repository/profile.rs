use std::collections::HashMap;

use chrono::Utc;
use diesel::prelude::*;
use diesel::result::QueryResult;

use crate::db::DbConnection;
use crate::domain::profile::{NewProfile, Profile};
use crate::models::profile::{
    NewProfileAreaRow, NewProfileRow, ProfileAreaRow, ProfileRow, encode_embedding,
};
use crate::repository::errors::{RepositoryError, RepositoryResult};
use crate::repository::{DieselRepository, ProfileReader, ProfileWriter};

fn replace_profile_areas(
    conn: &mut DbConnection,
    profile_id: &str,
    areas: &[String],
) -> QueryResult<()> {
    use crate::schema::profile_areas;

    diesel::delete(profile_areas::table.filter(profile_areas::profile_id.eq(profile_id)))
        .execute(conn)?;

    if areas.is_empty() {
        return Ok(());
    }

    let new_areas = areas
        .iter()
        .map(|area| NewProfileAreaRow {
            profile_id: profile_id.to_string(),
            area: area.clone(),
        })
        .collect::<Vec<_>>();

    diesel::insert_into(profile_areas::table)
        .values(&new_areas)
        .execute(conn)?;

    Ok(())
}

fn load_areas_by_profile(
    conn: &mut DbConnection,
    profile_ids: &[String],
) -> QueryResult<HashMap<String, Vec<String>>> {
    use crate::schema::profile_areas;

    let mut areas_by_profile: HashMap<String, Vec<String>> = HashMap::new();
    if profile_ids.is_empty() {
        return Ok(areas_by_profile);
    }

    let rows = profile_areas::table
        .filter(profile_areas::profile_id.eq_any(profile_ids))
        .order(profile_areas::id.asc())
        .load::<ProfileAreaRow>(conn)?;
    for row in rows {
        areas_by_profile
            .entry(row.profile_id)
            .or_default()
            .push(row.area);
    }

    Ok(areas_by_profile)
}

impl ProfileReader for DieselRepository {
    fn list_profiles(&self) -> RepositoryResult<Vec<Profile>> {
        use crate::schema::profiles;

        let mut conn = self.conn()?;

        let rows: Vec<ProfileRow> = profiles::table
            .order(profiles::id.asc())
            .load::<ProfileRow>(&mut conn)?;

        let profile_ids: Vec<String> = rows.iter().map(|row| row.id.clone()).collect();
        let mut areas_by_profile = load_areas_by_profile(&mut conn, &profile_ids)?;

        rows.into_iter()
            .map(|row| {
                let areas = areas_by_profile.remove(&row.id).unwrap_or_default();
                row.into_domain(areas)
            })
            .collect()
    }

    fn get_profile(&self, profile_id: &str) -> RepositoryResult<Profile> {
        use crate::schema::profiles;

        let mut conn = self.conn()?;

        let row: ProfileRow = profiles::table
            .filter(profiles::id.eq(profile_id))
            .first::<ProfileRow>(&mut conn)
            .optional()?
            .ok_or_else(|| RepositoryError::NotFound(profile_id.to_string()))?;

        let mut areas_by_profile = load_areas_by_profile(&mut conn, &[row.id.clone()])?;
        let areas = areas_by_profile.remove(&row.id).unwrap_or_default();
        row.into_domain(areas)
    }
}

impl ProfileWriter for DieselRepository {
    fn replace_profiles(&self, new_profiles: &[NewProfile]) -> RepositoryResult<usize> {
        use crate::schema::{profile_areas, profiles};

        let mut conn = self.conn()?;

        let inserted = conn.transaction(|conn| {
            diesel::delete(profile_areas::table).execute(conn)?;
            diesel::delete(profiles::table).execute(conn)?;

            let mut inserted_rows = 0;
            for profile in new_profiles.iter() {
                let row: NewProfileRow = profile.clone().into();
                diesel::insert_into(profiles::table)
                    .values(&row)
                    .execute(conn)?;
                replace_profile_areas(conn, &profile.id, &profile.areas)?;
                inserted_rows += 1;
            }
            Ok::<usize, RepositoryError>(inserted_rows)
        })?;

        Ok(inserted)
    }

    fn set_profile_embedding(
        &self,
        profile_id: &str,
        embedding: &[f32],
    ) -> RepositoryResult<usize> {
        use crate::schema::profiles;

        let mut conn = self.conn()?;

        let blob = encode_embedding(embedding);

        let affected = diesel::update(profiles::table.filter(profiles::id.eq(profile_id)))
            .set((
                profiles::embedding.eq(blob),
                profiles::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(&mut conn)?;

        if affected == 0 {
            return Err(RepositoryError::NotFound(profile_id.to_string()));
        }

        Ok(affected)
    }
}
