use diesel::prelude::*;
use famgoals_shared::domain::{MAX_MEMBERS, MIN_MEMBERS};

use super::goals::{assigned_goal, assigned_goals_between, default_goals};
use super::models::{
    Family, FamilySettings, Goal, Member, NewFamily, NewFamilySettings, NewGoal, NewMember,
    SettingsChanges,
};
use super::schema::{families, family_members, family_settings, goals};
use super::{StorageError, Store, new_id, now_utc};

/// Member data supplied at registration or creation, PIN already hashed.
#[derive(Debug, Clone)]
pub struct MemberSeed {
    pub name: String,
    pub pin_hash: String,
    pub avatar_color: String,
}

#[derive(Debug)]
pub struct RegisteredFamily {
    pub family: Family,
    pub members: Vec<(Member, Vec<Goal>)>,
}

const NAME_TAKEN: &str = "Family name already exists";

fn insert_member(
    conn: &mut SqliteConnection,
    family_id: &str,
    seed: &MemberSeed,
) -> Result<Member, StorageError> {
    let id = new_id();
    Ok(diesel::insert_into(family_members::table)
        .values(&NewMember {
            id: &id,
            family_id,
            name: &seed.name,
            pin_hash: &seed.pin_hash,
            avatar_color: &seed.avatar_color,
            created_at: now_utc(),
        })
        .returning(Member::as_returning())
        .get_result(conn)?)
}

fn insert_settings(conn: &mut SqliteConnection, family_id: &str) -> Result<(), StorageError> {
    let id = new_id();
    diesel::insert_into(family_settings::table)
        .values(&NewFamilySettings {
            id: &id,
            family_id,
            updated_at: now_utc(),
        })
        .on_conflict_do_nothing()
        .execute(conn)?;
    Ok(())
}

fn name_taken(
    conn: &mut SqliteConnection,
    name: &str,
    except: Option<&str>,
) -> Result<bool, StorageError> {
    let mut q = families::table
        .filter(families::name.eq(name))
        .into_boxed();
    if let Some(id) = except {
        q = q.filter(families::id.ne(id));
    }
    Ok(q.count().get_result::<i64>(conn)? > 0)
}

fn map_name_conflict(e: StorageError) -> StorageError {
    if e.is_unique_violation() {
        StorageError::Conflict(NAME_TAKEN.into())
    } else {
        e
    }
}

impl Store {
    /// Creates a family with its settings, members, default goals and one
    /// assigned goal per ordered pair of members, all in one transaction.
    pub async fn register_family(
        &self,
        name: &str,
        password_hash: &str,
        seeds: Vec<MemberSeed>,
    ) -> Result<RegisteredFamily, StorageError> {
        if !(MIN_MEMBERS..=MAX_MEMBERS).contains(&seeds.len()) {
            return Err(StorageError::InvalidInput(format!(
                "A family needs between {MIN_MEMBERS} and {MAX_MEMBERS} members"
            )));
        }
        let name = name.to_string();
        let password_hash = password_hash.to_string();
        self.blocking(move |conn| {
            conn.immediate_transaction(|conn| -> Result<RegisteredFamily, StorageError> {
                if name_taken(conn, &name, None)? {
                    return Err(StorageError::Conflict(NAME_TAKEN.into()));
                }
                let now = now_utc();
                let family_id = new_id();
                let family = diesel::insert_into(families::table)
                    .values(&NewFamily {
                        id: &family_id,
                        name: &name,
                        password_hash: &password_hash,
                        created_at: now,
                    })
                    .returning(Family::as_returning())
                    .get_result(conn)?;
                insert_settings(conn, &family.id)?;

                let mut members = Vec::with_capacity(seeds.len());
                for seed in &seeds {
                    members.push(insert_member(conn, &family.id, seed)?);
                }

                let mut rows: Vec<NewGoal> = Vec::new();
                for m in &members {
                    rows.extend(default_goals(&m.id, now));
                }
                for assigner in &members {
                    for assignee in members.iter().filter(|m| m.id != assigner.id) {
                        rows.push(assigned_goal(&assignee.id, &assigner.id, &assigner.name, now));
                    }
                }
                diesel::insert_into(goals::table)
                    .values(&rows)
                    .execute(conn)?;
                let member_ids: Vec<&str> = members.iter().map(|m| m.id.as_str()).collect();
                let created: Vec<Goal> = goals::table
                    .filter(goals::member_id.eq_any(member_ids))
                    .select(Goal::as_select())
                    .load(conn)?;

                let members = members
                    .into_iter()
                    .map(|m| {
                        let own = created
                            .iter()
                            .filter(|g| g.member_id == m.id)
                            .cloned()
                            .collect();
                        (m, own)
                    })
                    .collect();
                Ok(RegisteredFamily { family, members })
            })
            .map_err(map_name_conflict)
        })
        .await
    }

    pub async fn find_family_by_name(&self, name: &str) -> Result<Option<Family>, StorageError> {
        let n = name.to_string();
        self.blocking(move |conn| {
            Ok(families::table
                .filter(families::name.eq(&n))
                .select(Family::as_select())
                .first(conn)
                .optional()?)
        })
        .await
    }

    pub async fn get_family(&self, family_id: &str) -> Result<Option<Family>, StorageError> {
        let fid = family_id.to_string();
        self.blocking(move |conn| {
            Ok(families::table
                .filter(families::id.eq(&fid))
                .select(Family::as_select())
                .first(conn)
                .optional()?)
        })
        .await
    }

    pub async fn rename_family(&self, family_id: &str, name: &str) -> Result<(), StorageError> {
        let fid = family_id.to_string();
        let n = name.to_string();
        self.blocking(move |conn| {
            conn.immediate_transaction(|conn| -> Result<(), StorageError> {
                if name_taken(conn, &n, Some(&fid))? {
                    return Err(StorageError::Conflict(NAME_TAKEN.into()));
                }
                let updated = diesel::update(families::table.filter(families::id.eq(&fid)))
                    .set(families::name.eq(&n))
                    .execute(conn)?;
                if updated == 0 {
                    return Err(StorageError::NotFound("Family not found".into()));
                }
                Ok(())
            })
            .map_err(map_name_conflict)
        })
        .await
    }

    /// Removes the family; members, goals, entries and settings go with it
    /// through foreign key cascades.
    pub async fn delete_family(&self, family_id: &str) -> Result<bool, StorageError> {
        let fid = family_id.to_string();
        self.blocking(move |conn| {
            let deleted =
                diesel::delete(families::table.filter(families::id.eq(&fid))).execute(conn)?;
            Ok(deleted > 0)
        })
        .await
    }

    pub async fn list_members(&self, family_id: &str) -> Result<Vec<Member>, StorageError> {
        let fid = family_id.to_string();
        self.blocking(move |conn| {
            Ok(family_members::table
                .filter(family_members::family_id.eq(&fid))
                .order((family_members::created_at.asc(), family_members::id.asc()))
                .select(Member::as_select())
                .load(conn)?)
        })
        .await
    }

    pub async fn get_member(
        &self,
        family_id: &str,
        member_id: &str,
    ) -> Result<Option<Member>, StorageError> {
        let fid = family_id.to_string();
        let mid = member_id.to_string();
        self.blocking(move |conn| {
            Ok(family_members::table
                .filter(family_members::family_id.eq(&fid))
                .filter(family_members::id.eq(&mid))
                .select(Member::as_select())
                .first(conn)
                .optional()?)
        })
        .await
    }

    /// Adds a member with default goals and assigned goals to and from every
    /// existing member.
    pub async fn add_member(
        &self,
        family_id: &str,
        seed: MemberSeed,
    ) -> Result<Member, StorageError> {
        let fid = family_id.to_string();
        self.blocking(move |conn| {
            conn.immediate_transaction(|conn| -> Result<Member, StorageError> {
                let peers: Vec<(String, String)> = family_members::table
                    .filter(family_members::family_id.eq(&fid))
                    .select((family_members::id, family_members::name))
                    .load(conn)?;
                if peers.len() >= MAX_MEMBERS {
                    return Err(StorageError::InvalidInput(format!(
                        "Maximum {MAX_MEMBERS} family members allowed"
                    )));
                }
                let member = insert_member(conn, &fid, &seed)?;
                let now = now_utc();
                let mut rows = default_goals(&member.id, now);
                rows.extend(assigned_goals_between(
                    (&member.id, &member.name),
                    &peers,
                    now,
                ));
                diesel::insert_into(goals::table)
                    .values(&rows)
                    .execute(conn)?;
                Ok(member)
            })
        })
        .await
    }

    /// Updates the given member fields. Returns `false` when the member is
    /// not part of the family.
    pub async fn update_member(
        &self,
        family_id: &str,
        member_id: &str,
        name: Option<String>,
        avatar_color: Option<String>,
        pin_hash: Option<String>,
    ) -> Result<bool, StorageError> {
        #[derive(AsChangeset)]
        #[diesel(table_name = family_members)]
        struct MemberChanges {
            name: Option<String>,
            avatar_color: Option<String>,
            pin_hash: Option<String>,
        }
        let fid = family_id.to_string();
        let mid = member_id.to_string();
        self.blocking(move |conn| {
            let target = family_members::table
                .filter(family_members::family_id.eq(&fid))
                .filter(family_members::id.eq(&mid));
            if name.is_none() && avatar_color.is_none() && pin_hash.is_none() {
                let found: i64 = target.count().get_result(conn)?;
                return Ok(found > 0);
            }
            let updated = diesel::update(target)
                .set(&MemberChanges {
                    name: name.clone(),
                    avatar_color: avatar_color.clone(),
                    pin_hash: pin_hash.clone(),
                })
                .execute(conn)?;
            Ok(updated > 0)
        })
        .await
    }

    pub async fn set_member_photo(
        &self,
        family_id: &str,
        member_id: &str,
        url: &str,
    ) -> Result<bool, StorageError> {
        let fid = family_id.to_string();
        let mid = member_id.to_string();
        let u = url.to_string();
        self.blocking(move |conn| {
            let updated = diesel::update(
                family_members::table
                    .filter(family_members::family_id.eq(&fid))
                    .filter(family_members::id.eq(&mid)),
            )
            .set(family_members::profile_photo_url.eq(u.as_str()))
            .execute(conn)?;
            Ok(updated > 0)
        })
        .await
    }

    /// Deletes a member together with the goals they assigned to others.
    /// The family must keep at least the minimum number of members.
    pub async fn delete_member(&self, family_id: &str, member_id: &str) -> Result<(), StorageError> {
        let fid = family_id.to_string();
        let mid = member_id.to_string();
        self.blocking(move |conn| {
            conn.immediate_transaction(|conn| -> Result<(), StorageError> {
                let ids: Vec<String> = family_members::table
                    .filter(family_members::family_id.eq(&fid))
                    .select(family_members::id)
                    .load(conn)?;
                if !ids.contains(&mid) {
                    return Err(StorageError::NotFound("Member not found".into()));
                }
                if ids.len() <= MIN_MEMBERS {
                    return Err(StorageError::InvalidInput(format!(
                        "A family must have at least {MIN_MEMBERS} members"
                    )));
                }
                diesel::delete(goals::table.filter(goals::assigned_by.eq(&mid))).execute(conn)?;
                diesel::delete(family_members::table.filter(family_members::id.eq(&mid)))
                    .execute(conn)?;
                Ok(())
            })
        })
        .await
    }

    /// Settings for the family, created with defaults on first access.
    pub async fn get_or_create_settings(
        &self,
        family_id: &str,
    ) -> Result<FamilySettings, StorageError> {
        let fid = family_id.to_string();
        self.blocking(move |conn| {
            insert_settings(conn, &fid)?;
            Ok(family_settings::table
                .filter(family_settings::family_id.eq(&fid))
                .select(FamilySettings::as_select())
                .first(conn)?)
        })
        .await
    }

    pub async fn update_settings(
        &self,
        family_id: &str,
        mut changes: SettingsChanges,
    ) -> Result<FamilySettings, StorageError> {
        let fid = family_id.to_string();
        changes.updated_at = Some(now_utc());
        self.blocking(move |conn| {
            conn.immediate_transaction(|conn| -> Result<FamilySettings, StorageError> {
                insert_settings(conn, &fid)?;
                Ok(
                    diesel::update(family_settings::table.filter(family_settings::family_id.eq(&fid)))
                        .set(&changes)
                        .returning(FamilySettings::as_returning())
                        .get_result(conn)?,
                )
            })
        })
        .await
    }
}
