use axum::http::StatusCode;
use famgoals_server::{server, storage};
use famgoals_shared::domain::{today_utc, week_start};
use famgoals_shared::jwt;
use reqwest::Client;
use serde_json::{Value, json};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::Path;

const JWT_SECRET: &str = "testsecret";
const LOGIN_PATH: &str = "/api/v1/auth/login";
const REGISTER_PATH: &str = "/api/v1/auth/register";

struct TestServer {
    base: String,
    client: Client,
    handle: tokio::task::JoinHandle<()>,
    dir: tempfile::TempDir,
}

impl TestServer {
    async fn spawn() -> Option<Self> {
        let dir = tempfile::tempdir().unwrap();
        let (addr, handle) = match start_server(dir.path()).await {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                eprintln!("Skipping test due to sandbox restrictions: {e}");
                return None;
            }
            Err(e) => panic!("failed to start server: {e}"),
        };
        Some(Self {
            base: format!("http://{}", addr),
            client: Client::new(),
            handle,
            dir,
        })
    }

    /// Registers a family whose members are named `<family>-<n>` with PINs
    /// 1111, 2222, ... and returns the token and response body.
    async fn register(&self, family: &str, members: usize) -> (String, Value) {
        let members: Vec<Value> = (1..=members)
            .map(|n| json!({"name": format!("{family}-{n}"), "pin": pin(n)}))
            .collect();
        let body = self
            .request_expect(
                "POST",
                REGISTER_PATH,
                None,
                Some(json!({"familyName": family, "password": "pass123", "members": members})),
                StatusCode::OK,
            )
            .await;
        (token_of(&body), body)
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let url = format!("{}{}", self.base, path);
        let mut req = match method {
            "GET" => self.client.get(&url),
            "POST" => self.client.post(&url),
            "PUT" => self.client.put(&url),
            "DELETE" => self.client.delete(&url),
            other => panic!("unsupported method {other}"),
        };
        if let Some(t) = token {
            req = req.bearer_auth(t);
        }
        if let Some(b) = body {
            req = req.json(&b);
        }
        let resp = req.send().await.unwrap();
        let status = resp.status();
        let text = resp.text().await.unwrap();
        let val = if text.is_empty() {
            json!(null)
        } else {
            serde_json::from_str(&text).unwrap_or(json!({"raw": text}))
        };
        (status, val)
    }

    async fn request_expect(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
        expected: StatusCode,
    ) -> Value {
        let (status, value) = self.request(method, path, token, body).await;
        assert_eq!(
            status, expected,
            "{method} {path} returned {status:?} with body {value:?}",
        );
        value
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn start_server(
    dir: &Path,
) -> Result<(SocketAddr, tokio::task::JoinHandle<()>), std::io::Error> {
    let mut config = server::AppConfig::with_secret(JWT_SECRET);
    config.bcrypt_cost = Some(4);
    config.uploads_dir = Some(dir.join("uploads"));

    let db_path = dir.join("test.db");
    let store = storage::Store::connect_sqlite(db_path.to_str().unwrap())
        .await
        .expect("db");

    let state = server::AppState::new(config, store);
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Ok((addr, handle))
}

fn pin(n: usize) -> String {
    let d = char::from(b'0' + (n % 10) as u8);
    std::iter::repeat_n(d, 4).collect()
}

fn token_of(body: &Value) -> String {
    body["token"]
        .as_str()
        .map(str::to_string)
        .expect("token missing from auth response")
}

fn str_of<'a>(v: &'a Value, key: &str) -> &'a str {
    v[key].as_str().unwrap_or_else(|| panic!("{key} missing in {v}"))
}

fn goals_of_type<'a>(goals: &'a Value, kind: &str) -> Vec<&'a Value> {
    goals
        .as_array()
        .unwrap()
        .iter()
        .filter(|g| g["type"] == kind)
        .collect()
}

async fn verify_pin(server: &TestServer, token: &str, member_id: &str, pin: &str) -> String {
    let body = server
        .request_expect(
            "POST",
            "/api/v1/auth/verify-pin",
            Some(token),
            Some(json!({"memberId": member_id, "pin": pin})),
            StatusCode::OK,
        )
        .await;
    token_of(&body)
}

#[tokio::test]
async fn public_endpoints_work() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    server
        .request_expect("GET", "/healthz", None, None, StatusCode::OK)
        .await;
    let version = server
        .request_expect("GET", "/api/v1/version", None, None, StatusCode::OK)
        .await;
    assert_eq!(version["version"], env!("CARGO_PKG_VERSION"));
    let init = server
        .request_expect("POST", "/api/v1/init", None, None, StatusCode::OK)
        .await;
    assert_eq!(init["success"], true);
}

#[tokio::test]
async fn unauthenticated_requests_are_rejected() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let cases = [
        ("GET", "/api/v1/family"),
        ("GET", "/api/v1/members"),
        ("GET", "/api/v1/dashboard"),
        ("GET", "/api/v1/goals"),
        ("POST", "/api/v1/goals/some-goal/complete"),
        ("GET", "/api/v1/water?memberId=x"),
        ("POST", "/api/v1/steps"),
        ("GET", "/api/v1/stats/week/x"),
        ("GET", "/api/v1/settings"),
        ("GET", "/api/v1/photos"),
        ("POST", "/api/v1/auth/verify-pin"),
    ];
    for (method, path) in cases {
        let (status, body) = server.request(method, path, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {path}");
        assert_eq!(body["error"], "Unauthorized");
        let (status, _) = server
            .request(method, path, Some("not-a-token"), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {path} with bad token");
    }
}

#[tokio::test]
async fn register_creates_members_with_default_and_assigned_goals() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let body = server
        .request_expect(
            "POST",
            REGISTER_PATH,
            None,
            Some(json!({
                "familyName": "Smiths",
                "password": "pass123",
                "members": [
                    {"name": "Alice", "pin": "1111"},
                    {"name": "Bob", "pin": "2222", "avatarColor": "#ff0000"}
                ]
            })),
            StatusCode::OK,
        )
        .await;

    assert_eq!(body["family"]["name"], "Smiths");
    let members = body["members"].as_array().unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0]["avatar_color"], "#6366f1");
    assert_eq!(members[1]["avatar_color"], "#ff0000");

    for (idx, member) in members.iter().enumerate() {
        let other = &members[1 - idx];
        let goals = &member["goals"];
        let water = goals_of_type(goals, "water");
        assert_eq!(water.len(), 1);
        assert_eq!(water[0]["target_value"], 3000.0);
        assert_eq!(water[0]["target_unit"], "ml");
        let exercise = goals_of_type(goals, "exercise");
        assert_eq!(exercise.len(), 1);
        assert_eq!(exercise[0]["target_value"], 30.0);
        let steps = goals_of_type(goals, "steps");
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0]["target_value"], 10000.0);
        let custom = goals_of_type(goals, "custom");
        assert_eq!(custom.len(), 1);
        assert_eq!(custom[0]["is_custom"], true);
        let assigned = goals_of_type(goals, "assigned");
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0]["assigned_by"], other["id"]);
        assert_eq!(
            assigned[0]["title"],
            format!("Goal from {}", str_of(other, "name"))
        );
        assert_eq!(assigned[0]["assigned_by_name"], other["name"]);
        for g in goals.as_array().unwrap() {
            assert_eq!(g["frequency"], "daily");
        }
    }

    let claims = jwt::decode_and_verify(&token_of(&body), JWT_SECRET.as_bytes()).unwrap();
    assert_eq!(claims.family_id, str_of(&body["family"], "id"));
    assert_eq!(claims.member_id, None);
}

#[tokio::test]
async fn register_validates_members_and_name() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let member = |n: usize| json!({"name": format!("m{n}"), "pin": pin(n)});

    let one: Vec<Value> = (1..=1).map(member).collect();
    let eleven: Vec<Value> = (1..=11).map(member).collect();
    for members in [one, eleven] {
        let (status, body) = server
            .request(
                "POST",
                REGISTER_PATH,
                None,
                Some(json!({"familyName": "Fam", "password": "pw", "members": members})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    for bad_pin in ["123", "12345", "12a4", ""] {
        let (status, _) = server
            .request(
                "POST",
                REGISTER_PATH,
                None,
                Some(json!({
                    "familyName": "Fam",
                    "password": "pw",
                    "members": [{"name": "A", "pin": bad_pin}, {"name": "B", "pin": "2222"}]
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "pin {bad_pin:?}");
    }

    let (status, _) = server
        .request("POST", REGISTER_PATH, None, Some(json!({"password": "pw"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = server
        .request("POST", REGISTER_PATH, None, Some(json!("not an object")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    server.register("Taken", 2).await;
    let (status, body) = server
        .request(
            "POST",
            REGISTER_PATH,
            None,
            Some(json!({
                "familyName": "Taken",
                "password": "pw",
                "members": [{"name": "A", "pin": "1111"}, {"name": "B", "pin": "2222"}]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Family name already exists");
}

#[tokio::test]
async fn login_returns_family_token_and_members() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let (_, registered) = server.register("Joneses", 3).await;
    let family_id = str_of(&registered["family"], "id").to_string();

    let body = server
        .request_expect(
            "POST",
            LOGIN_PATH,
            None,
            Some(json!({"familyName": "Joneses", "password": "pass123"})),
            StatusCode::OK,
        )
        .await;
    let claims = jwt::decode_and_verify(&token_of(&body), JWT_SECRET.as_bytes()).unwrap();
    assert_eq!(claims.family_id, family_id);
    assert_eq!(jwt::family_id_from_token(&token_of(&body)).unwrap(), family_id);
    assert_eq!(body["members"].as_array().unwrap().len(), 3);
    assert!(body["members"][0].get("pin_hash").is_none());

    for creds in [
        json!({"familyName": "Joneses", "password": "wrong"}),
        json!({"familyName": "Nobody", "password": "pass123"}),
    ] {
        server
            .request_expect("POST", LOGIN_PATH, None, Some(creds), StatusCode::UNAUTHORIZED)
            .await;
    }
    server
        .request_expect(
            "POST",
            LOGIN_PATH,
            None,
            Some(json!({"familyName": "Joneses"})),
            StatusCode::BAD_REQUEST,
        )
        .await;
}

#[tokio::test]
async fn verify_pin_binds_member_and_logout_ends_session() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let (token, body) = server.register("Pins", 2).await;
    let alice = str_of(&body["members"][0], "id").to_string();

    let member_token = verify_pin(&server, &token, &alice, "1111").await;
    let claims = jwt::decode_and_verify(&member_token, JWT_SECRET.as_bytes()).unwrap();
    assert_eq!(claims.member_id.as_deref(), Some(alice.as_str()));

    server
        .request_expect(
            "POST",
            "/api/v1/auth/verify-pin",
            Some(&token),
            Some(json!({"memberId": alice, "pin": "9999"})),
            StatusCode::UNAUTHORIZED,
        )
        .await;
    server
        .request_expect(
            "POST",
            "/api/v1/auth/verify-pin",
            Some(&token),
            Some(json!({"memberId": "missing", "pin": "1111"})),
            StatusCode::NOT_FOUND,
        )
        .await;

    server
        .request_expect("POST", "/api/v1/auth/logout", Some(&member_token), None, StatusCode::NO_CONTENT)
        .await;
    server
        .request_expect("GET", "/api/v1/members", Some(&member_token), None, StatusCode::UNAUTHORIZED)
        .await;
    // The family token has its own session
    server
        .request_expect("GET", "/api/v1/members", Some(&token), None, StatusCode::OK)
        .await;
}

#[tokio::test]
async fn completion_toggles_and_dashboard_counts_follow() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let (token, body) = server.register("Toggle", 2).await;
    let alice = &body["members"][0];
    let alice_id = str_of(alice, "id");
    let custom = goals_of_type(&alice["goals"], "custom")[0];
    let goal_id = str_of(custom, "id");
    let path = format!("/api/v1/goals/{goal_id}/complete");

    let first = server
        .request_expect("POST", &path, Some(&token), None, StatusCode::OK)
        .await;
    assert_eq!(first["completed"], true);
    assert_eq!(first["date"], today_utc().to_string());

    let dashboard = server
        .request_expect("GET", "/api/v1/dashboard", Some(&token), None, StatusCode::OK)
        .await;
    let card = dashboard
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == alice_id)
        .unwrap();
    let daily_goals = alice["goals"].as_array().unwrap().len();
    assert_eq!(card["completed_count"], 1);
    assert_eq!(card["total_goals"], daily_goals);
    assert_eq!(card["weekly_total_goals"], 0);
    let goal_card = card["goals"]
        .as_array()
        .unwrap()
        .iter()
        .find(|g| g["id"] == goal_id)
        .unwrap();
    assert_eq!(goal_card["is_completed"], true);

    let second = server
        .request_expect(
            "POST",
            &path,
            Some(&token),
            Some(json!({"memberId": alice_id})),
            StatusCode::OK,
        )
        .await;
    assert_eq!(second["completed"], false);

    let dashboard = server
        .request_expect("GET", "/api/v1/dashboard", Some(&token), None, StatusCode::OK)
        .await;
    let card = dashboard
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == alice_id)
        .unwrap();
    assert_eq!(card["completed_count"], 0);
}

#[tokio::test]
async fn weekly_goal_completes_under_week_start() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let (token, body) = server.register("Weekly", 2).await;
    let alice_id = str_of(&body["members"][0], "id");
    let goal = server
        .request_expect(
            "POST",
            "/api/v1/goals",
            Some(&token),
            Some(json!({
                "memberId": alice_id,
                "type": "custom",
                "title": "Clean the garage",
                "frequency": "weekly"
            })),
            StatusCode::OK,
        )
        .await;
    assert_eq!(goal["frequency"], "weekly");
    let path = format!("/api/v1/goals/{}/complete", str_of(&goal, "id"));
    let done = server
        .request_expect("POST", &path, Some(&token), None, StatusCode::OK)
        .await;
    assert_eq!(done["date"], week_start(today_utc()).to_string());

    let dashboard = server
        .request_expect("GET", "/api/v1/dashboard", Some(&token), None, StatusCode::OK)
        .await;
    let card = dashboard
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == alice_id)
        .unwrap();
    assert_eq!(card["weekly_completed_count"], 1);
    assert_eq!(card["weekly_total_goals"], 1);
    assert_eq!(card["completed_count"], 0);
}

#[tokio::test]
async fn healthkit_steps_replace_and_manual_steps_append() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let (token, body) = server.register("Steps", 2).await;
    let alice_id = str_of(&body["members"][0], "id");
    let date = "2025-03-14";
    let post = |steps: i64, source: &str| {
        json!({"memberId": alice_id, "steps": steps, "date": date, "source": source})
    };

    let r = server
        .request_expect("POST", "/api/v1/steps", Some(&token), Some(post(5000, "healthkit")), StatusCode::OK)
        .await;
    assert_eq!(r["updated"], false);
    assert_eq!(r["total"], 5000.0);
    let r = server
        .request_expect("POST", "/api/v1/steps", Some(&token), Some(post(7000, "healthkit")), StatusCode::OK)
        .await;
    assert_eq!(r["updated"], true);
    assert_eq!(r["total"], 7000.0);
    for expected in [8000.0, 9000.0] {
        let r = server
            .request_expect("POST", "/api/v1/steps", Some(&token), Some(post(1000, "manual")), StatusCode::OK)
            .await;
        assert_eq!(r["updated"], false);
        assert_eq!(r["total"], expected);
    }

    let listing = server
        .request_expect(
            "GET",
            &format!("/api/v1/steps?memberId={alice_id}&date={date}"),
            Some(&token),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(listing["entries"].as_array().unwrap().len(), 3);
    assert_eq!(listing["total"], 9000.0);
    assert_eq!(listing["target"], 10000.0);
    assert_eq!(listing["unit"], "steps");

    // Another day is untouched
    let other = server
        .request_expect(
            "GET",
            &format!("/api/v1/steps?memberId={alice_id}&date=2025-03-15"),
            Some(&token),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(other["total"], 0.0);

    server
        .request_expect("POST", "/api/v1/steps", Some(&token), Some(post(0, "manual")), StatusCode::BAD_REQUEST)
        .await;
}

#[tokio::test]
async fn entry_totals_match_sum_of_entries() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let (token, body) = server.register("Totals", 2).await;
    let alice_id = str_of(&body["members"][0], "id");

    for amount in [250.0, 500.0, 125.5] {
        server
            .request_expect(
                "POST",
                "/api/v1/water",
                Some(&token),
                Some(json!({"memberId": alice_id, "amount_ml": amount})),
                StatusCode::OK,
            )
            .await;
    }
    let water = server
        .request_expect(
            "GET",
            &format!("/api/v1/water?memberId={alice_id}"),
            Some(&token),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(water["total"], 875.5);
    assert_eq!(water["target"], 3000.0);
    assert_eq!(water["unit"], "ml");
    assert_eq!(water["entries"].as_array().unwrap().len(), 3);

    for minutes in [20, 15] {
        server
            .request_expect(
                "POST",
                "/api/v1/exercise",
                Some(&token),
                Some(json!({"memberId": alice_id, "duration_minutes": minutes, "activity": "run"})),
                StatusCode::OK,
            )
            .await;
    }
    server
        .request_expect(
            "POST",
            "/api/v1/mindfulness",
            Some(&token),
            Some(json!({"memberId": alice_id, "duration_minutes": 10, "source": "healthkit"})),
            StatusCode::OK,
        )
        .await;
    let mindful = server
        .request_expect(
            "GET",
            &format!("/api/v1/mindfulness?memberId={alice_id}"),
            Some(&token),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(mindful["total"], 10.0);
    assert_eq!(mindful["target"], 15.0);

    let dashboard = server
        .request_expect("GET", "/api/v1/dashboard", Some(&token), None, StatusCode::OK)
        .await;
    let card = dashboard
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == alice_id)
        .unwrap();
    assert_eq!(card["water_progress"]["current"], 875.5);
    assert_eq!(card["water_progress"]["target"], 3000.0);
    assert_eq!(card["exercise_progress"]["current"], 35.0);
    assert_eq!(card["mindfulness_progress"]["current"], 10.0);
    assert_eq!(card["steps_progress"]["current"], 0.0);

    server
        .request_expect(
            "GET",
            "/api/v1/water",
            Some(&token),
            None,
            StatusCode::BAD_REQUEST,
        )
        .await;
    server
        .request_expect(
            "POST",
            "/api/v1/water",
            Some(&token),
            Some(json!({"memberId": alice_id, "amount_ml": -5})),
            StatusCode::BAD_REQUEST,
        )
        .await;
}

#[tokio::test]
async fn member_count_stays_within_limits() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let (token, body) = server.register("Limits", 2).await;
    let first = str_of(&body["members"][0], "id").to_string();

    server
        .request_expect(
            "DELETE",
            &format!("/api/v1/members/{first}"),
            Some(&token),
            None,
            StatusCode::BAD_REQUEST,
        )
        .await;
    server
        .request_expect(
            "DELETE",
            "/api/v1/members/unknown",
            Some(&token),
            None,
            StatusCode::NOT_FOUND,
        )
        .await;

    let mut added = Vec::new();
    for n in 3..=10 {
        let m = server
            .request_expect(
                "POST",
                "/api/v1/members",
                Some(&token),
                Some(json!({"name": format!("m{n}"), "pin": "1234"})),
                StatusCode::OK,
            )
            .await;
        added.push(str_of(&m, "id").to_string());
    }
    let (status, err) = server
        .request(
            "POST",
            "/api/v1/members",
            Some(&token),
            Some(json!({"name": "eleventh", "pin": "1234"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"], "Maximum 10 family members allowed");

    // New members get defaults plus a goal from every other member
    let goals = server
        .request_expect(
            "GET",
            &format!("/api/v1/goals?memberId={}", added[0]),
            Some(&token),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(goals_of_type(&goals, "assigned").len(), 9);
    assert_eq!(goals_of_type(&goals, "water").len(), 1);

    server
        .request_expect(
            "DELETE",
            &format!("/api/v1/members/{}", added[0]),
            Some(&token),
            None,
            StatusCode::OK,
        )
        .await;
    let first_goals = server
        .request_expect(
            "GET",
            &format!("/api/v1/goals?memberId={first}"),
            Some(&token),
            None,
            StatusCode::OK,
        )
        .await;
    assert!(
        goals_of_type(&first_goals, "assigned")
            .iter()
            .all(|g| g["assigned_by"] != added[0].as_str())
    );
    let members = server
        .request_expect("GET", "/api/v1/members", Some(&token), None, StatusCode::OK)
        .await;
    assert_eq!(members.as_array().unwrap().len(), 9);

    server
        .request_expect(
            "POST",
            "/api/v1/members",
            Some(&token),
            Some(json!({"name": "short pin", "pin": "12"})),
            StatusCode::BAD_REQUEST,
        )
        .await;
}

#[tokio::test]
async fn other_family_ids_are_not_found() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let (token_a, _) = server.register("Alpha", 2).await;
    let (_, body_b) = server.register("Beta", 2).await;
    let b_member = &body_b["members"][0];
    let b_member_id = str_of(b_member, "id");
    let b_goal_id = str_of(goals_of_type(&b_member["goals"], "custom")[0], "id");

    let cases: Vec<(&str, String, Option<Value>)> = vec![
        ("GET", format!("/api/v1/members/{b_member_id}"), None),
        (
            "PUT",
            format!("/api/v1/members/{b_member_id}"),
            Some(json!({"name": "hijack"})),
        ),
        ("DELETE", format!("/api/v1/members/{b_member_id}"), None),
        ("POST", format!("/api/v1/goals/{b_goal_id}/complete"), None),
        (
            "PUT",
            format!("/api/v1/goals/{b_goal_id}"),
            Some(json!({"title": "mine now"})),
        ),
        ("DELETE", format!("/api/v1/goals/{b_goal_id}"), None),
        ("GET", format!("/api/v1/goals?memberId={b_member_id}"), None),
        ("GET", format!("/api/v1/water?memberId={b_member_id}"), None),
        (
            "POST",
            "/api/v1/water".to_string(),
            Some(json!({"memberId": b_member_id, "amount_ml": 100})),
        ),
        ("GET", format!("/api/v1/stats/week/{b_member_id}"), None),
        (
            "POST",
            "/api/v1/goals".to_string(),
            Some(json!({"memberId": b_member_id, "title": "x"})),
        ),
    ];
    for (method, path, body) in cases {
        server
            .request_expect(method, &path, Some(&token_a), body, StatusCode::NOT_FOUND)
            .await;
    }

    let alpha_dashboard = server
        .request_expect("GET", "/api/v1/dashboard", Some(&token_a), None, StatusCode::OK)
        .await;
    assert!(
        alpha_dashboard
            .as_array()
            .unwrap()
            .iter()
            .all(|c| c["id"] != b_member_id)
    );
}

#[tokio::test]
async fn custom_goal_limit_is_per_frequency() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let (token, body) = server.register("Custom", 2).await;
    let alice_id = str_of(&body["members"][0], "id");
    let create = |title: &str, frequency: &str| {
        json!({"memberId": alice_id, "type": "custom", "title": title, "frequency": frequency})
    };

    // One daily custom goal exists from registration
    for n in 2..=4 {
        server
            .request_expect(
                "POST",
                "/api/v1/goals",
                Some(&token),
                Some(create(&format!("daily {n}"), "daily")),
                StatusCode::OK,
            )
            .await;
    }
    let (status, err) = server
        .request("POST", "/api/v1/goals", Some(&token), Some(create("daily 5", "daily")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"], "Maximum 4 daily custom goals allowed");

    let weekly = server
        .request_expect(
            "POST",
            "/api/v1/goals",
            Some(&token),
            Some(create("weekly 1", "weekly")),
            StatusCode::OK,
        )
        .await;
    // Moving it to the full daily bucket is rejected as well
    server
        .request_expect(
            "PUT",
            &format!("/api/v1/goals/{}", str_of(&weekly, "id")),
            Some(&token),
            Some(json!({"frequency": "daily"})),
            StatusCode::BAD_REQUEST,
        )
        .await;
    server
        .request_expect(
            "PUT",
            &format!("/api/v1/goals/{}", str_of(&weekly, "id")),
            Some(&token),
            Some(json!({"title": "weekly renamed", "target_value": 2})),
            StatusCode::OK,
        )
        .await;

    server
        .request_expect(
            "DELETE",
            &format!("/api/v1/goals/{}", str_of(&weekly, "id")),
            Some(&token),
            None,
            StatusCode::OK,
        )
        .await;
    let water_id = str_of(goals_of_type(&body["members"][0]["goals"], "water")[0], "id");
    server
        .request_expect(
            "DELETE",
            &format!("/api/v1/goals/{water_id}"),
            Some(&token),
            None,
            StatusCode::NOT_FOUND,
        )
        .await;
}

#[tokio::test]
async fn pin_change_requires_member_token() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let (token, body) = server.register("Change", 2).await;
    let alice_id = str_of(&body["members"][0], "id").to_string();
    let path = format!("/api/v1/members/{alice_id}");

    server
        .request_expect("PUT", &path, Some(&token), Some(json!({"pin": "4321"})), StatusCode::FORBIDDEN)
        .await;
    let member_token = verify_pin(&server, &token, &alice_id, "1111").await;
    server
        .request_expect("PUT", &path, Some(&member_token), Some(json!({"pin": "43x1"})), StatusCode::BAD_REQUEST)
        .await;
    server
        .request_expect(
            "PUT",
            &path,
            Some(&member_token),
            Some(json!({"pin": "4321", "name": "Alicia"})),
            StatusCode::OK,
        )
        .await;
    verify_pin(&server, &token, &alice_id, "4321").await;
    let member = server
        .request_expect("GET", &path, Some(&token), None, StatusCode::OK)
        .await;
    assert_eq!(member["name"], "Alicia");
}

#[tokio::test]
async fn family_rename_and_delete() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let (token, _) = server.register("Renamed", 2).await;
    server.register("Occupied", 2).await;

    server
        .request_expect("PUT", "/api/v1/family", Some(&token), Some(json!({"name": "Occupied"})), StatusCode::BAD_REQUEST)
        .await;
    let renamed = server
        .request_expect("PUT", "/api/v1/family", Some(&token), Some(json!({"name": "Fresh"})), StatusCode::OK)
        .await;
    assert_eq!(renamed["name"], "Fresh");
    let family = server
        .request_expect("GET", "/api/v1/family", Some(&token), None, StatusCode::OK)
        .await;
    assert_eq!(family["name"], "Fresh");

    server
        .request_expect("DELETE", "/api/v1/family", Some(&token), Some(json!({"password": "nope"})), StatusCode::UNAUTHORIZED)
        .await;
    server
        .request_expect("DELETE", "/api/v1/family", Some(&token), Some(json!({"password": "pass123"})), StatusCode::OK)
        .await;
    server
        .request_expect(
            "POST",
            LOGIN_PATH,
            None,
            Some(json!({"familyName": "Fresh", "password": "pass123"})),
            StatusCode::UNAUTHORIZED,
        )
        .await;
    // Sessions went with the family
    server
        .request_expect("GET", "/api/v1/family", Some(&token), None, StatusCode::UNAUTHORIZED)
        .await;
}

#[tokio::test]
async fn stats_cover_week_and_month() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let (token, body) = server.register("Stats", 2).await;
    let alice = &body["members"][0];
    let alice_id = str_of(alice, "id");
    let custom_id = str_of(goals_of_type(&alice["goals"], "custom")[0], "id");
    server
        .request_expect("POST", &format!("/api/v1/goals/{custom_id}/complete"), Some(&token), None, StatusCode::OK)
        .await;
    server
        .request_expect(
            "POST",
            "/api/v1/water",
            Some(&token),
            Some(json!({"memberId": alice_id, "amount_ml": 400})),
            StatusCode::OK,
        )
        .await;

    let week = server
        .request_expect("GET", &format!("/api/v1/stats/week/{alice_id}"), Some(&token), None, StatusCode::OK)
        .await;
    assert_eq!(week["period"], "week");
    let days = week["days"].as_array().unwrap();
    assert_eq!(days.len(), 7);
    assert_eq!(week["start_date"], week_start(today_utc()).to_string());
    let today = days
        .iter()
        .find(|d| d["date"] == today_utc().to_string())
        .unwrap();
    assert_eq!(today["completed"], 1);
    assert_eq!(today["total"], 5);
    assert_eq!(today["water"], 400.0);
    assert_eq!(week["summary"]["total_water"], 400.0);
    assert_eq!(week["summary"]["perfect_days"], 0);

    let last_week = server
        .request_expect(
            "GET",
            &format!("/api/v1/stats/week/{alice_id}?weekOffset=-1"),
            Some(&token),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(last_week["summary"]["total_water"], 0.0);
    assert_eq!(last_week["summary"]["avg_completion"], 0);

    let month = server
        .request_expect("GET", &format!("/api/v1/stats/month/{alice_id}"), Some(&token), None, StatusCode::OK)
        .await;
    assert_eq!(month["period"], "month");
    assert!(month["days"].as_array().unwrap().len() >= 28);
    assert_eq!(month["summary"]["total_water"], 400.0);

    server
        .request_expect(
            "GET",
            &format!("/api/v1/stats/week/{alice_id}?weekOffset=abc"),
            Some(&token),
            None,
            StatusCode::BAD_REQUEST,
        )
        .await;
}

#[tokio::test]
async fn settings_notifications_and_custom_exercises() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let (token, body) = server.register("Extras", 2).await;
    let alice = &body["members"][0];
    let alice_id = str_of(alice, "id");

    let settings = server
        .request_expect("GET", "/api/v1/settings", Some(&token), None, StatusCode::OK)
        .await;
    assert_eq!(settings["theme"], "dark");
    assert_eq!(settings["background_overlay"], 0.6);
    let updated = server
        .request_expect(
            "PUT",
            "/api/v1/settings",
            Some(&token),
            Some(json!({"accent_color": "#123456", "background_fit": "contain"})),
            StatusCode::OK,
        )
        .await;
    assert_eq!(updated["settings"]["accent_color"], "#123456");
    assert_eq!(updated["settings"]["background_fit"], "contain");
    assert_eq!(updated["settings"]["theme"], "dark");
    server
        .request_expect(
            "PUT",
            "/api/v1/settings",
            Some(&token),
            Some(json!({"background_fit": "stretch"})),
            StatusCode::BAD_REQUEST,
        )
        .await;

    let goal_id = str_of(goals_of_type(&alice["goals"], "assigned")[0], "id");
    let created = server
        .request_expect(
            "POST",
            "/api/v1/notifications",
            Some(&token),
            Some(json!({"memberId": alice_id, "type": "reminder", "title": "Drink!", "goalId": goal_id})),
            StatusCode::OK,
        )
        .await;
    let notification_id = str_of(&created, "notification_id").to_string();
    let listing = server
        .request_expect(
            "GET",
            &format!("/api/v1/notifications?memberId={alice_id}&unreadOnly=true"),
            Some(&token),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(listing["unread_count"], 1);
    assert_eq!(listing["notifications"][0]["type"], "reminder");
    assert!(listing["notifications"][0]["goal_title"].is_string());
    server
        .request_expect(
            "PUT",
            &format!("/api/v1/notifications/{notification_id}/read"),
            Some(&token),
            None,
            StatusCode::OK,
        )
        .await;
    let listing = server
        .request_expect(
            "GET",
            &format!("/api/v1/notifications?memberId={alice_id}&unreadOnly=true"),
            Some(&token),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(listing["unread_count"], 0);
    assert!(listing["notifications"].as_array().unwrap().is_empty());

    let exercise = server
        .request_expect(
            "POST",
            "/api/v1/exercises/custom",
            Some(&token),
            Some(json!({"name": "Yoga", "memberId": alice_id})),
            StatusCode::OK,
        )
        .await;
    assert_eq!(exercise["icon"], "🏃");
    assert_eq!(exercise["default_duration"], 30);
    let list = server
        .request_expect("GET", "/api/v1/exercises/custom", Some(&token), None, StatusCode::OK)
        .await;
    assert_eq!(list[0]["created_by_name"], alice["name"]);
}

#[tokio::test]
async fn upload_stores_profile_photo() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let (token, body) = server.register("Photos", 2).await;
    let alice_id = str_of(&body["members"][0], "id").to_string();
    let png: Vec<u8> = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 1, 2, 3];

    let form = reqwest::multipart::Form::new()
        .text("type", "profile")
        .text("memberId", alice_id.clone())
        .part(
            "file",
            reqwest::multipart::Part::bytes(png.clone())
                .file_name("me.png")
                .mime_str("image/png")
                .unwrap(),
        );
    let resp = server
        .client
        .post(format!("{}/api/v1/upload", server.base))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let uploaded: Value = resp.json().await.unwrap();
    let url = str_of(&uploaded, "url").to_string();
    assert!(url.starts_with("/uploads/"), "{url}");
    assert!(url.ends_with(".png"));

    let stored = server
        .client
        .get(format!("{}{url}", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(stored.status(), StatusCode::OK);
    assert_eq!(stored.bytes().await.unwrap().to_vec(), png);

    let member = server
        .request_expect("GET", &format!("/api/v1/members/{alice_id}"), Some(&token), None, StatusCode::OK)
        .await;
    assert_eq!(member["profile_photo_url"], url.as_str());
    let photos = server
        .request_expect("GET", "/api/v1/photos?type=profile", Some(&token), None, StatusCode::OK)
        .await;
    assert_eq!(photos.as_array().unwrap().len(), 1);
    assert_eq!(photos[0]["original_name"], "me.png");

    let text = reqwest::multipart::Form::new().text("type", "goal").part(
        "file",
        reqwest::multipart::Part::bytes(b"hello".to_vec())
            .file_name("notes.txt")
            .mime_str("text/plain")
            .unwrap(),
    );
    let resp = server
        .client
        .post(format!("{}/api/v1/upload", server.base))
        .bearer_auth(&token)
        .multipart(text)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let missing_type = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(png).file_name("x.png"),
    );
    let resp = server
        .client
        .post(format!("{}/api/v1/upload", server.base))
        .bearer_auth(&token)
        .multipart(missing_type)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

fn files_under(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut found = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return found;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            found.extend(files_under(&path));
        } else {
            found.push(path);
        }
    }
    found
}

#[tokio::test]
async fn failed_photo_insert_leaves_no_file_behind() {
    use diesel::{Connection, RunQueryDsl, SqliteConnection};

    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let (token, _) = server.register("Orphans", 2).await;

    let db = server.dir.path().join("test.db");
    let mut conn = SqliteConnection::establish(db.to_str().unwrap()).unwrap();
    diesel::sql_query(
        "CREATE TRIGGER reject_photos BEFORE INSERT ON photos \
         BEGIN SELECT RAISE(ABORT, 'photos disabled'); END",
    )
    .execute(&mut conn)
    .unwrap();

    let form = reqwest::multipart::Form::new().text("type", "goal").part(
        "file",
        reqwest::multipart::Part::bytes(vec![0x89, b'P', b'N', b'G', 1, 2, 3])
            .file_name("run.png")
            .mime_str("image/png")
            .unwrap(),
    );
    let resp = server
        .client
        .post(format!("{}/api/v1/upload", server.base))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let leftovers = files_under(&server.dir.path().join("uploads"));
    assert!(leftovers.is_empty(), "orphaned uploads: {leftovers:?}");
}
