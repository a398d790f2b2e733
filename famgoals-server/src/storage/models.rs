use crate::storage::schema::{
    custom_exercises, exercise_entries, families, family_members, family_settings,
    goal_completions, goals, mindfulness_entries, notifications, photos, sessions, steps_entries,
    water_entries,
};
use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = families)]
pub struct Family {
    pub id: String,
    pub name: String,
    pub password_hash: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = families)]
pub struct NewFamily<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub password_hash: &'a str,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable)]
#[diesel(table_name = family_members)]
#[diesel(belongs_to(Family, foreign_key = family_id))]
pub struct Member {
    pub id: String,
    pub family_id: String,
    pub name: String,
    pub pin_hash: String,
    pub avatar_color: String,
    pub profile_photo_url: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = family_members)]
pub struct NewMember<'a> {
    pub id: &'a str,
    pub family_id: &'a str,
    pub name: &'a str,
    pub pin_hash: &'a str,
    pub avatar_color: &'a str,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = goals)]
pub struct Goal {
    pub id: String,
    pub member_id: String,
    pub goal_type: String,
    pub title: String,
    pub description: Option<String>,
    pub target_value: Option<f64>,
    pub target_unit: Option<String>,
    pub assigned_by: Option<String>,
    pub is_custom: bool,
    pub frequency: String,
    pub due_time: Option<String>,
    pub reminder_enabled: bool,
    pub reminder_time: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = goals)]
pub struct NewGoal {
    pub id: String,
    pub member_id: String,
    pub goal_type: String,
    pub title: String,
    pub description: Option<String>,
    pub target_value: Option<f64>,
    pub target_unit: Option<String>,
    pub assigned_by: Option<String>,
    pub is_custom: bool,
    pub frequency: String,
    pub due_time: Option<String>,
    pub reminder_enabled: bool,
    pub reminder_time: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Partial goal update; `None` leaves the column untouched.
#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = goals)]
pub struct GoalChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub target_value: Option<f64>,
    pub target_unit: Option<String>,
    pub due_time: Option<String>,
    pub reminder_enabled: Option<bool>,
    pub reminder_time: Option<String>,
    pub frequency: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = goal_completions)]
pub struct GoalCompletion {
    pub id: String,
    pub goal_id: String,
    pub member_id: String,
    pub period_date: NaiveDate,
    pub value: Option<f64>,
    pub notes: Option<String>,
    pub completed_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = goal_completions)]
pub struct NewGoalCompletion<'a> {
    pub id: &'a str,
    pub goal_id: &'a str,
    pub member_id: &'a str,
    pub period_date: NaiveDate,
    pub value: Option<f64>,
    pub notes: Option<&'a str>,
    pub completed_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = water_entries)]
pub struct WaterEntry {
    pub id: String,
    pub member_id: String,
    pub amount_ml: f64,
    pub entry_date: NaiveDate,
    pub source: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = water_entries)]
pub struct NewWaterEntry<'a> {
    pub id: &'a str,
    pub member_id: &'a str,
    pub amount_ml: f64,
    pub entry_date: NaiveDate,
    pub source: &'a str,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = exercise_entries)]
pub struct ExerciseEntry {
    pub id: String,
    pub member_id: String,
    pub duration_minutes: i32,
    pub activity: Option<String>,
    pub notes: Option<String>,
    pub entry_date: NaiveDate,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = exercise_entries)]
pub struct NewExerciseEntry<'a> {
    pub id: &'a str,
    pub member_id: &'a str,
    pub duration_minutes: i32,
    pub activity: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub entry_date: NaiveDate,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = steps_entries)]
pub struct StepsEntry {
    pub id: String,
    pub member_id: String,
    pub steps: i32,
    pub entry_date: NaiveDate,
    pub source: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = steps_entries)]
pub struct NewStepsEntry<'a> {
    pub id: &'a str,
    pub member_id: &'a str,
    pub steps: i32,
    pub entry_date: NaiveDate,
    pub source: &'a str,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = mindfulness_entries)]
pub struct MindfulnessEntry {
    pub id: String,
    pub member_id: String,
    pub duration_minutes: i32,
    pub entry_date: NaiveDate,
    pub source: String,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = mindfulness_entries)]
pub struct NewMindfulnessEntry<'a> {
    pub id: &'a str,
    pub member_id: &'a str,
    pub duration_minutes: i32,
    pub entry_date: NaiveDate,
    pub source: &'a str,
    pub notes: Option<&'a str>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = custom_exercises)]
pub struct CustomExercise {
    pub id: String,
    pub family_id: String,
    pub name: String,
    pub icon: String,
    pub default_duration: i32,
    pub created_by: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = custom_exercises)]
pub struct NewCustomExercise<'a> {
    pub id: &'a str,
    pub family_id: &'a str,
    pub name: &'a str,
    pub icon: &'a str,
    pub default_duration: i32,
    pub created_by: Option<&'a str>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = family_settings)]
pub struct FamilySettings {
    pub id: String,
    pub family_id: String,
    pub theme: String,
    pub background_type: String,
    pub background_value: String,
    pub background_fit: String,
    pub background_position: String,
    pub background_blur: i32,
    pub background_overlay: f64,
    pub background_overlay_color: String,
    pub background_contain_color: String,
    pub accent_color: String,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = family_settings)]
pub struct NewFamilySettings<'a> {
    pub id: &'a str,
    pub family_id: &'a str,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = family_settings)]
pub struct SettingsChanges {
    pub theme: Option<String>,
    pub background_type: Option<String>,
    pub background_value: Option<String>,
    pub background_fit: Option<String>,
    pub background_position: Option<String>,
    pub background_blur: Option<i32>,
    pub background_overlay: Option<f64>,
    pub background_overlay_color: Option<String>,
    pub background_contain_color: Option<String>,
    pub accent_color: Option<String>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = notifications)]
pub struct Notification {
    pub id: String,
    pub member_id: String,
    pub kind: String,
    pub title: String,
    pub message: Option<String>,
    pub goal_id: Option<String>,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = notifications)]
pub struct NewNotification<'a> {
    pub id: &'a str,
    pub member_id: &'a str,
    pub kind: &'a str,
    pub title: &'a str,
    pub message: Option<&'a str>,
    pub goal_id: Option<&'a str>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = photos)]
pub struct Photo {
    pub id: String,
    pub family_id: String,
    pub member_id: Option<String>,
    pub goal_id: Option<String>,
    pub kind: String,
    pub url: String,
    pub original_name: Option<String>,
    pub caption: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = photos)]
pub struct NewPhoto<'a> {
    pub id: &'a str,
    pub family_id: &'a str,
    pub member_id: Option<&'a str>,
    pub goal_id: Option<&'a str>,
    pub kind: &'a str,
    pub url: &'a str,
    pub original_name: Option<&'a str>,
    pub caption: Option<&'a str>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = sessions)]
#[diesel(primary_key(jti))]
pub struct Session {
    pub jti: String,
    pub family_id: String,
    pub member_id: Option<String>,
    pub issued_at: NaiveDateTime,
    pub last_used_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = sessions)]
pub struct NewSession<'a> {
    pub jti: &'a str,
    pub family_id: &'a str,
    pub member_id: Option<&'a str>,
    pub issued_at: NaiveDateTime,
    pub last_used_at: NaiveDateTime,
}
