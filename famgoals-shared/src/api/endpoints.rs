use chrono::NaiveDate;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

use super::API_V1_PREFIX;

fn base_join(base: &str, path: &str) -> String {
    let b = base.trim_end_matches('/');
    let p = path.trim_start_matches('/');
    format!("{}/{}", b, p)
}

fn enc(s: &str) -> String {
    utf8_percent_encode(s, NON_ALPHANUMERIC).to_string()
}

fn api(base: &str, path: &str) -> String {
    base_join(base, &format!("{}/{}", API_V1_PREFIX, path))
}

/// `?memberId=..&date=..` with absent parts left out.
fn member_date_query(member_id: &str, date: Option<NaiveDate>) -> String {
    let mut q = format!("?memberId={}", enc(member_id));
    if let Some(d) = date {
        q.push_str(&format!("&date={}", d.format("%Y-%m-%d")));
    }
    q
}

pub fn version(base: &str) -> String {
    api(base, "version")
}
pub fn auth_login(base: &str) -> String {
    api(base, "auth/login")
}
pub fn auth_register(base: &str) -> String {
    api(base, "auth/register")
}
pub fn auth_verify_pin(base: &str) -> String {
    api(base, "auth/verify-pin")
}
pub fn auth_logout(base: &str) -> String {
    api(base, "auth/logout")
}
pub fn members(base: &str) -> String {
    api(base, "members")
}
pub fn member(base: &str, member_id: &str) -> String {
    api(base, &format!("members/{}", enc(member_id)))
}
pub fn dashboard(base: &str) -> String {
    api(base, "dashboard")
}
pub fn goal_complete(base: &str, goal_id: &str) -> String {
    api(base, &format!("goals/{}/complete", enc(goal_id)))
}
pub fn water(base: &str) -> String {
    api(base, "water")
}
pub fn water_for(base: &str, member_id: &str, date: Option<NaiveDate>) -> String {
    format!("{}{}", water(base), member_date_query(member_id, date))
}
pub fn steps(base: &str) -> String {
    api(base, "steps")
}
pub fn steps_for(base: &str, member_id: &str, date: Option<NaiveDate>) -> String {
    format!("{}{}", steps(base), member_date_query(member_id, date))
}
pub fn mindfulness(base: &str) -> String {
    api(base, "mindfulness")
}
pub fn exercise(base: &str) -> String {
    api(base, "exercise")
}
