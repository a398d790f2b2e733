use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use famgoals_server::progress::{build_stats, dashboard_member, stats_days, summarize};
use famgoals_server::storage::entries::{DailySums, DaySeries};
use famgoals_server::storage::models::{GoalCompletion, Member};
use famgoals_shared::api::{GoalDto, StatsDayDto};
use famgoals_shared::domain::{Frequency, GoalType};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn day(date: NaiveDate, completed: i64, total: i64) -> StatsDayDto {
    StatsDayDto {
        date,
        completed,
        total,
        water: 0.0,
        exercise: 0,
    }
}

fn goal(id: &str, kind: GoalType, frequency: Frequency, target: Option<f64>) -> GoalDto {
    GoalDto {
        id: id.into(),
        member_id: "m1".into(),
        goal_type: kind,
        title: id.into(),
        description: None,
        target_value: target,
        target_unit: None,
        assigned_by: None,
        assigned_by_name: None,
        assigned_by_color: None,
        is_custom: kind == GoalType::Custom,
        frequency,
        due_time: None,
        reminder_enabled: false,
        reminder_time: None,
        created_at: "2025-01-01T00:00:00Z".into(),
    }
}

fn completion(goal_id: &str, period: NaiveDate) -> GoalCompletion {
    GoalCompletion {
        id: format!("c-{goal_id}-{period}"),
        goal_id: goal_id.into(),
        member_id: "m1".into(),
        period_date: period,
        value: None,
        notes: None,
        completed_at: Utc::now().naive_utc(),
    }
}

fn member() -> Member {
    Member {
        id: "m1".into(),
        family_id: "f1".into(),
        name: "Ann".into(),
        pin_hash: "hash".into(),
        avatar_color: "#6366f1".into(),
        profile_photo_url: None,
        created_at: Utc::now().naive_utc(),
    }
}

#[test]
fn average_is_rounded_share_of_all_days() {
    let start = date(2025, 3, 10);
    let days: Vec<_> = (0..7)
        .map(|i| {
            let d = start + chrono::Duration::days(i);
            match i {
                0 => day(d, 3, 3),
                1 => day(d, 1, 3),
                _ => day(d, 0, 3),
            }
        })
        .collect();
    let summary = summarize(&days, date(2025, 3, 16));
    // 4 of 21
    assert_eq!(summary.avg_completion, 19);
    assert_eq!(summary.perfect_days, 1);
    assert_eq!(summary.current_streak, 0);
}

#[test]
fn no_goals_means_zero_average() {
    let days = vec![day(date(2025, 3, 10), 0, 0), day(date(2025, 3, 11), 0, 0)];
    let summary = summarize(&days, date(2025, 3, 11));
    assert_eq!(summary.avg_completion, 0);
    assert_eq!(summary.perfect_days, 0);
    assert_eq!(summary.current_streak, 0);
}

#[test]
fn streak_counts_back_from_anchor() {
    let days = vec![
        day(date(2025, 3, 10), 1, 2),
        day(date(2025, 3, 11), 2, 2),
        day(date(2025, 3, 12), 0, 0),
        day(date(2025, 3, 13), 2, 2),
        day(date(2025, 3, 14), 2, 2),
        day(date(2025, 3, 15), 0, 2),
        day(date(2025, 3, 16), 0, 2),
    ];
    // Anchored on Friday: Thu and Fri are perfect, Wed had no goals, Tue perfect, Mon breaks
    let summary = summarize(&days, date(2025, 3, 14));
    assert_eq!(summary.current_streak, 3);
    assert_eq!(summary.perfect_days, 3);

    // Anchored on Sunday the imperfect weekend breaks it immediately
    let summary = summarize(&days, date(2025, 3, 16));
    assert_eq!(summary.current_streak, 0);
}

#[test]
fn stats_days_only_count_daily_goal_completions() {
    let start = date(2025, 3, 10);
    let end = date(2025, 3, 12);
    let daily: HashSet<String> = ["water".to_string(), "custom".to_string()].into();
    let completions = vec![
        completion("water", start),
        completion("custom", start),
        completion("weekly", start),
        completion("custom", end),
    ];
    let mut series = DaySeries::default();
    series.water.insert(start, 1200.0);
    series.exercise.insert(end, 40);

    let days = stats_days(start, end, &daily, &completions, &series);
    assert_eq!(days.len(), 3);
    assert_eq!((days[0].completed, days[0].total), (2, 2));
    assert_eq!((days[1].completed, days[1].total), (0, 2));
    assert_eq!((days[2].completed, days[2].total), (1, 2));
    assert_eq!(days[0].water, 1200.0);
    assert_eq!(days[2].exercise, 40);
}

#[test]
fn build_stats_anchors_streak_within_range() {
    let start = date(2025, 3, 10);
    let end = date(2025, 3, 16);
    let daily: HashSet<String> = ["g".to_string()].into();
    let completions: Vec<_> = (13..=16).map(|d| completion("g", date(2025, 3, d))).collect();

    // A past week is anchored at its Sunday
    let stats = build_stats(
        "week",
        start,
        end,
        date(2025, 4, 1),
        &daily,
        &completions,
        &DaySeries::default(),
    );
    assert_eq!(stats.period, "week");
    assert_eq!(stats.start_date, start);
    assert_eq!(stats.end_date, end);
    assert_eq!(stats.summary.current_streak, 4);
    assert_eq!(stats.summary.avg_completion, 57);

    // Mid-week, days after today do not count toward the streak
    let stats = build_stats(
        "week",
        start,
        end,
        date(2025, 3, 14),
        &daily,
        &completions,
        &DaySeries::default(),
    );
    assert_eq!(stats.summary.current_streak, 2);
}

#[test]
fn dashboard_card_splits_daily_and_weekly() {
    let today = date(2025, 3, 14);
    let goals = vec![
        goal("water", GoalType::Water, Frequency::Daily, Some(2500.0)),
        goal("steps", GoalType::Steps, Frequency::Daily, None),
        goal("custom", GoalType::Custom, Frequency::Daily, None),
        goal("weekly", GoalType::Custom, Frequency::Weekly, None),
    ];
    let completions = vec![
        completion("custom", today),
        // Yesterday's completion does not count today
        completion("water", date(2025, 3, 13)),
        completion("weekly", date(2025, 3, 10)),
    ];
    let sums = DailySums {
        water: 750.0,
        exercise: 12,
        steps: 4000,
        mindfulness: 5,
    };

    let card = dashboard_member(member(), goals, &completions, sums, today);
    assert_eq!(card.completed_count, 1);
    assert_eq!(card.total_goals, 3);
    assert_eq!(card.weekly_completed_count, 1);
    assert_eq!(card.weekly_total_goals, 1);
    assert_eq!(card.water_progress.current, 750.0);
    assert_eq!(card.water_progress.target, 2500.0);
    // Missing targets fall back to defaults
    assert_eq!(card.steps_progress.target, 10000.0);
    assert_eq!(card.exercise_progress.target, 30.0);
    assert_eq!(card.mindfulness_progress.target, 15.0);
    assert_eq!(card.mindfulness_progress.current, 5.0);
    let water = card.goals.iter().find(|g| g.goal.id == "water").unwrap();
    assert!(!water.is_completed);
}
