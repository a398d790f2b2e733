use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{EntrySource, Frequency, GoalType, NotificationKind, PhotoKind};

pub mod endpoints;
#[cfg(feature = "rest-client")]
pub mod rest;

pub const API_V1_PREFIX: &str = "/api/v1";

// Generic acknowledgements
#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResp {
    pub success: bool,
}

impl SuccessResp {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VersionInfoDto {
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InitResp {
    pub success: bool,
    pub message: String,
}

// Auth
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginReq {
    #[serde(default)]
    pub family_name: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FamilyDto {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResp {
    pub token: String,
    pub family: FamilyDto,
    pub members: Vec<MemberDto>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterMemberReq {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub pin: String,
    #[serde(default)]
    pub avatar_color: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterReq {
    #[serde(default)]
    pub family_name: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub members: Vec<RegisterMemberReq>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisteredMemberDto {
    pub id: String,
    pub name: String,
    pub avatar_color: String,
    pub goals: Vec<GoalDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResp {
    pub token: String,
    pub family: FamilyDto,
    pub members: Vec<RegisteredMemberDto>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPinReq {
    #[serde(default)]
    pub member_id: String,
    #[serde(default)]
    pub pin: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MemberSummaryDto {
    pub id: String,
    pub name: String,
    pub avatar_color: String,
    pub profile_photo_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyPinResp {
    pub token: String,
    pub member: MemberSummaryDto,
}

// Family
#[derive(Debug, Serialize, Deserialize)]
pub struct FamilyInfoDto {
    pub id: String,
    pub name: String,
    pub created_at: String, // RFC3339 UTC
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateFamilyReq {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateFamilyResp {
    pub success: bool,
    pub name: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DeleteFamilyReq {
    #[serde(default)]
    pub password: String,
}

// Members
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberDto {
    pub id: String,
    pub family_id: String,
    pub name: String,
    pub avatar_color: String,
    pub profile_photo_url: Option<String>,
    pub created_at: String, // RFC3339 UTC
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberReq {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub pin: String,
    #[serde(default)]
    pub avatar_color: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddMemberResp {
    pub id: String,
    pub name: String,
    pub avatar_color: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateMemberReq {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_color: Option<String>,
    #[serde(default)]
    pub pin: Option<String>,
}

// Goals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalDto {
    pub id: String,
    pub member_id: String,
    #[serde(rename = "type")]
    pub goal_type: GoalType,
    pub title: String,
    pub description: Option<String>,
    pub target_value: Option<f64>,
    pub target_unit: Option<String>,
    pub assigned_by: Option<String>,
    pub assigned_by_name: Option<String>,
    pub assigned_by_color: Option<String>,
    pub is_custom: bool,
    pub frequency: Frequency,
    pub due_time: Option<String>,
    pub reminder_enabled: bool,
    pub reminder_time: Option<String>,
    pub created_at: String, // RFC3339 UTC
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CreateGoalReq {
    #[serde(default, rename = "memberId")]
    pub member_id: String,
    #[serde(default, rename = "type")]
    pub goal_type: Option<GoalType>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_value: Option<f64>,
    #[serde(default)]
    pub target_unit: Option<String>,
    #[serde(default)]
    pub assigned_by: Option<String>,
    #[serde(default)]
    pub frequency: Option<Frequency>,
    #[serde(default)]
    pub due_time: Option<String>,
    #[serde(default)]
    pub reminder_enabled: Option<bool>,
    #[serde(default)]
    pub reminder_time: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateGoalReq {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_value: Option<f64>,
    #[serde(default)]
    pub target_unit: Option<String>,
    #[serde(default)]
    pub due_time: Option<String>,
    #[serde(default)]
    pub reminder_enabled: Option<bool>,
    #[serde(default)]
    pub reminder_time: Option<String>,
    #[serde(default)]
    pub frequency: Option<Frequency>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GoalsQuery {
    #[serde(default, rename = "memberId")]
    pub member_id: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CompleteGoalReq {
    #[serde(default, rename = "memberId")]
    pub member_id: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompleteGoalResp {
    pub completed: bool,
    pub date: NaiveDate,
}

// Tracking entries
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EntriesQuery {
    #[serde(default, rename = "memberId")]
    pub member_id: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EntriesResp<T> {
    pub entries: Vec<T>,
    pub total: f64,
    pub target: f64,
    pub unit: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WaterEntryDto {
    pub id: String,
    pub member_id: String,
    pub amount_ml: f64,
    pub date: NaiveDate,
    pub source: EntrySource,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExerciseEntryDto {
    pub id: String,
    pub member_id: String,
    pub duration_minutes: i32,
    pub activity: Option<String>,
    pub notes: Option<String>,
    pub date: NaiveDate,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StepsEntryDto {
    pub id: String,
    pub member_id: String,
    pub steps: i32,
    pub date: NaiveDate,
    pub source: EntrySource,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MindfulnessEntryDto {
    pub id: String,
    pub member_id: String,
    pub duration_minutes: i32,
    pub date: NaiveDate,
    pub source: EntrySource,
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LogWaterReq {
    #[serde(default, rename = "memberId")]
    pub member_id: String,
    #[serde(default)]
    pub amount_ml: f64,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub source: Option<EntrySource>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LogExerciseReq {
    #[serde(default, rename = "memberId")]
    pub member_id: String,
    #[serde(default)]
    pub duration_minutes: i32,
    #[serde(default)]
    pub activity: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LogStepsReq {
    #[serde(default, rename = "memberId")]
    pub member_id: String,
    #[serde(default)]
    pub steps: i32,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub source: Option<EntrySource>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LogMindfulnessReq {
    #[serde(default, rename = "memberId")]
    pub member_id: String,
    #[serde(default)]
    pub duration_minutes: i32,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub source: Option<EntrySource>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Result of logging an entry. `updated` is set when a cumulative reading
/// replaced an existing entry instead of adding one.
#[derive(Debug, Serialize, Deserialize)]
pub struct LogEntryResp {
    pub success: bool,
    pub id: String,
    pub updated: bool,
    pub total: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CustomExerciseDto {
    pub id: String,
    pub family_id: String,
    pub name: String,
    pub icon: String,
    pub default_duration: i32,
    pub created_by: Option<String>,
    pub created_by_name: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CreateCustomExerciseReq {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub default_duration: Option<i32>,
    #[serde(default, rename = "memberId")]
    pub member_id: Option<String>,
}

// Dashboard
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ProgressDto {
    pub current: f64,
    pub target: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardGoalDto {
    #[serde(flatten)]
    pub goal: GoalDto,
    pub is_completed: bool,
    pub completion_value: Option<f64>,
    pub completion_notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardMemberDto {
    pub id: String,
    pub name: String,
    pub avatar_color: String,
    pub profile_photo_url: Option<String>,
    pub goals: Vec<DashboardGoalDto>,
    pub water_progress: ProgressDto,
    pub exercise_progress: ProgressDto,
    pub steps_progress: ProgressDto,
    pub mindfulness_progress: ProgressDto,
    pub completed_count: usize,
    pub total_goals: usize,
    pub weekly_completed_count: usize,
    pub weekly_total_goals: usize,
}

// Stats
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct WeekStatsQuery {
    #[serde(default, rename = "weekOffset")]
    pub week_offset: Option<i32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MonthStatsQuery {
    #[serde(default, rename = "monthOffset")]
    pub month_offset: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatsDayDto {
    pub date: NaiveDate,
    pub completed: i64,
    pub total: i64,
    pub water: f64,
    pub exercise: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatsSummaryDto {
    pub avg_completion: i64,
    pub perfect_days: usize,
    pub current_streak: usize,
    pub total_water: f64,
    pub total_exercise: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsDto {
    pub period: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: Vec<StatsDayDto>,
    pub summary: StatsSummaryDto,
}

// Settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsDto {
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
    pub updated_at: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateSettingsReq {
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub background_type: Option<String>,
    #[serde(default)]
    pub background_value: Option<String>,
    #[serde(default)]
    pub background_fit: Option<String>,
    #[serde(default)]
    pub background_position: Option<String>,
    #[serde(default)]
    pub background_blur: Option<i32>,
    #[serde(default)]
    pub background_overlay: Option<f64>,
    #[serde(default)]
    pub background_overlay_color: Option<String>,
    #[serde(default)]
    pub background_contain_color: Option<String>,
    #[serde(default)]
    pub accent_color: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateSettingsResp {
    pub success: bool,
    pub settings: SettingsDto,
}

// Notifications
#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationDto {
    pub id: String,
    pub member_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: Option<String>,
    pub goal_id: Option<String>,
    pub goal_title: Option<String>,
    pub is_read: bool,
    pub created_at: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NotificationsQuery {
    #[serde(default, rename = "memberId")]
    pub member_id: Option<String>,
    #[serde(default, rename = "unreadOnly")]
    pub unread_only: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationsResp {
    pub notifications: Vec<NotificationDto>,
    pub unread_count: i64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CreateNotificationReq {
    #[serde(default, rename = "memberId")]
    pub member_id: String,
    #[serde(default, rename = "type")]
    pub kind: Option<NotificationKind>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "goalId")]
    pub goal_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateNotificationResp {
    pub success: bool,
    pub notification_id: String,
}

// Photos
#[derive(Debug, Serialize, Deserialize)]
pub struct PhotoDto {
    pub id: String,
    pub family_id: String,
    pub member_id: Option<String>,
    pub goal_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: PhotoKind,
    pub url: String,
    pub original_name: Option<String>,
    pub caption: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PhotosQuery {
    #[serde(default, rename = "memberId")]
    pub member_id: Option<String>,
    #[serde(default, rename = "goalId")]
    pub goal_id: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<PhotoKind>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResp {
    pub url: String,
    pub photo_id: String,
}
