use diesel::prelude::*;
use famgoals_shared::domain::{NotificationKind, PhotoKind};

use super::models::{NewNotification, NewPhoto, Notification, Photo};
use super::schema::{family_members, goals, notifications, photos};
use super::{StorageError, Store, new_id, now_utc};

/// Most recent notifications returned per listing.
const NOTIFICATION_PAGE: i64 = 50;

#[derive(Debug, Default, Clone)]
pub struct PhotoFilter {
    pub member_id: Option<String>,
    pub goal_id: Option<String>,
    pub kind: Option<PhotoKind>,
}

#[derive(Debug, Clone)]
pub struct PhotoRecord {
    pub family_id: String,
    pub member_id: Option<String>,
    pub goal_id: Option<String>,
    pub kind: PhotoKind,
    pub url: String,
    pub original_name: Option<String>,
    pub caption: Option<String>,
}

impl Store {
    /// Newest notifications of a member, with the related goal title, plus
    /// the member's unread count.
    pub async fn list_notifications(
        &self,
        member_id: &str,
        unread_only: bool,
    ) -> Result<(Vec<(Notification, Option<String>)>, i64), StorageError> {
        let mid = member_id.to_string();
        self.blocking(move |conn| {
            let mut q = notifications::table
                .left_join(goals::table.on(goals::id.nullable().eq(notifications::goal_id)))
                .filter(notifications::member_id.eq(&mid))
                .order(notifications::created_at.desc())
                .limit(NOTIFICATION_PAGE)
                .select((Notification::as_select(), goals::title.nullable()))
                .into_boxed();
            if unread_only {
                q = q.filter(notifications::is_read.eq(false));
            }
            let rows = q.load(conn)?;
            let unread: i64 = notifications::table
                .filter(notifications::member_id.eq(&mid))
                .filter(notifications::is_read.eq(false))
                .count()
                .get_result(conn)?;
            Ok((rows, unread))
        })
        .await
    }

    pub async fn create_notification(
        &self,
        member_id: &str,
        kind: NotificationKind,
        title: &str,
        message: Option<&str>,
        goal_id: Option<&str>,
    ) -> Result<String, StorageError> {
        let mid = member_id.to_string();
        let title = title.to_string();
        let message = message.map(str::to_string);
        let goal_id = goal_id.map(str::to_string);
        self.blocking(move |conn| {
            let id = new_id();
            diesel::insert_into(notifications::table)
                .values(&NewNotification {
                    id: &id,
                    member_id: &mid,
                    kind: kind.as_str(),
                    title: &title,
                    message: message.as_deref(),
                    goal_id: goal_id.as_deref(),
                    created_at: now_utc(),
                })
                .execute(conn)?;
            Ok(id)
        })
        .await
    }

    /// Marks a notification read if it belongs to a member of `family_id`.
    pub async fn mark_notification_read(
        &self,
        family_id: &str,
        notification_id: &str,
    ) -> Result<bool, StorageError> {
        let fid = family_id.to_string();
        let nid = notification_id.to_string();
        self.blocking(move |conn| {
            let members = family_members::table
                .filter(family_members::family_id.eq(&fid))
                .select(family_members::id);
            let updated = diesel::update(
                notifications::table
                    .filter(notifications::id.eq(&nid))
                    .filter(notifications::member_id.eq_any(members)),
            )
            .set(notifications::is_read.eq(true))
            .execute(conn)?;
            Ok(updated > 0)
        })
        .await
    }

    pub async fn list_photos(
        &self,
        family_id: &str,
        filter: PhotoFilter,
    ) -> Result<Vec<Photo>, StorageError> {
        let fid = family_id.to_string();
        self.blocking(move |conn| {
            let mut q = photos::table
                .filter(photos::family_id.eq(&fid))
                .order(photos::created_at.desc())
                .select(Photo::as_select())
                .into_boxed();
            if let Some(m) = &filter.member_id {
                q = q.filter(photos::member_id.eq(m));
            }
            if let Some(g) = &filter.goal_id {
                q = q.filter(photos::goal_id.eq(g));
            }
            if let Some(k) = filter.kind {
                q = q.filter(photos::kind.eq(k.as_str()));
            }
            Ok(q.load(conn)?)
        })
        .await
    }

    pub async fn insert_photo(&self, record: PhotoRecord) -> Result<Photo, StorageError> {
        self.blocking(move |conn| {
            let id = new_id();
            Ok(diesel::insert_into(photos::table)
                .values(&NewPhoto {
                    id: &id,
                    family_id: &record.family_id,
                    member_id: record.member_id.as_deref(),
                    goal_id: record.goal_id.as_deref(),
                    kind: record.kind.as_str(),
                    url: &record.url,
                    original_name: record.original_name.as_deref(),
                    caption: record.caption.as_deref(),
                    created_at: now_utc(),
                })
                .returning(Photo::as_returning())
                .get_result(conn)?)
        })
        .await
    }
}
