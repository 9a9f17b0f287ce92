//! Session handling: an explicit per-request session object plus the
//! server-side store behind it.
//!
//! The logged-in user record returned by the remote API is kept verbatim in
//! an in-memory session keyed by a uuid cookie. Views receive an
//! [`AuthSession`] constructed from that cookie; nothing else in the crate
//! holds user state, and login/logout are the only transitions.

use axum_extra::extract::cookie::CookieJar;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

/// The logged-in user object as returned by `/login_user/`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserRecord {
    /// Account kind; `admin_user` unlocks the admin views.
    #[serde(rename = "type")]
    pub user_type: String,

    pub username: String,

    pub email: String,

    pub id: i64,

    pub uuid: String,

    /// Present on admin accounts only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_status: Option<String>,
}

/// The session view every handler works against.
///
/// Constructed per request from the session cookie and passed by value;
/// never mutated by views.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub current_user: Option<UserRecord>,
}

impl AuthSession {
    pub fn anonymous() -> AuthSession {
        AuthSession { current_user: None }
    }

    /// Derive the admin flag from the user record, the same field the
    /// original client read from its auth context.
    pub fn is_admin(&self) -> bool {
        self.current_user
            .as_ref()
            .map(|user| user.user_type == "admin_user")
            .unwrap_or(false)
    }

    pub fn is_logged_in(&self) -> bool {
        self.current_user.is_some()
    }
}

/// One authenticated session in the server-side store.
#[derive(Debug, Clone)]
struct Session {
    user: UserRecord,
    expires_at: SystemTime,
}

lazy_static! {
    /// All active sessions, keyed by the cookie value.
    static ref SESSIONS: RwLock<HashMap<String, Session>> = RwLock::new(HashMap::new());
}

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "session_id";

const SESSION_DURATION: u64 = 24 * 60 * 60; // 24 hours in seconds

/// Create a new session for a freshly logged-in user.
///
/// Each login also sweeps expired sessions out of the store, so abandoned
/// sessions (ones whose id is never looked up again) cannot accumulate.
///
/// # Returns
/// * `String` - the session id to set as the cookie value
pub fn create_session(user: UserRecord) -> String {
    let now = SystemTime::now();
    let session_id = Uuid::new_v4().to_string();
    let session = Session {
        user,
        expires_at: now + Duration::from_secs(SESSION_DURATION),
    };

    let mut sessions = SESSIONS.write().unwrap();
    purge_expired(&mut sessions, now);
    sessions.insert(session_id.clone(), session);

    session_id
}

/// Drop every session that has expired as of `now`.
fn purge_expired(sessions: &mut HashMap<String, Session>, now: SystemTime) {
    sessions.retain(|_, session| session.expires_at > now);
}

/// Look up a session id, evicting it when expired.
pub fn validate_session(session_id: &str) -> Option<UserRecord> {
    let expired = {
        let sessions = SESSIONS.read().unwrap();
        match sessions.get(session_id) {
            Some(session) if session.expires_at > SystemTime::now() => {
                return Some(session.user.clone());
            }
            Some(_) => true,
            None => false,
        }
    };

    if expired {
        SESSIONS.write().unwrap().remove(session_id);
    }
    None
}

/// Drop a session on logout. Unknown ids are ignored.
pub fn destroy_session(session_id: &str) {
    SESSIONS.write().unwrap().remove(session_id);
}

/// Build the request's session view from the cookie jar.
pub fn session_from_cookies(jar: &CookieJar) -> AuthSession {
    let current_user = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| validate_session(cookie.value()));
    AuthSession { current_user }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(user_type: &str) -> UserRecord {
        UserRecord {
            user_type: user_type.to_string(),
            username: "sam".to_string(),
            email: "sam@example.com".to_string(),
            id: 1,
            uuid: "0c9e40e0-0000-0000-0000-000000000000".to_string(),
            admin_status: None,
        }
    }

    #[test]
    fn admin_flag_comes_from_the_user_type() {
        let admin = AuthSession {
            current_user: Some(user("admin_user")),
        };
        let regular = AuthSession {
            current_user: Some(user("regular_user")),
        };
        assert!(admin.is_admin());
        assert!(!regular.is_admin());
        assert!(!AuthSession::anonymous().is_admin());
    }

    #[test]
    fn session_round_trip() {
        let session_id = create_session(user("regular_user"));
        let restored = validate_session(&session_id).expect("session should be live");
        assert_eq!(restored.username, "sam");

        destroy_session(&session_id);
        assert!(validate_session(&session_id).is_none());
    }

    #[test]
    fn expired_sessions_are_swept_without_a_lookup() {
        let now = SystemTime::now();
        let mut sessions = HashMap::new();
        sessions.insert(
            "stale".to_string(),
            Session {
                user: user("regular_user"),
                expires_at: now - Duration::from_secs(1),
            },
        );
        sessions.insert(
            "live".to_string(),
            Session {
                user: user("regular_user"),
                expires_at: now + Duration::from_secs(60),
            },
        );

        purge_expired(&mut sessions, now);
        assert!(!sessions.contains_key("stale"));
        assert!(sessions.contains_key("live"));
    }

    #[test]
    fn login_evicts_abandoned_sessions() {
        // Plant an already-expired session under an id nothing ever looks
        // up, then log in; the login-time sweep must have removed it.
        let abandoned = "abandoned-b6a1-4c57-9d1e-000000000000".to_string();
        SESSIONS.write().unwrap().insert(
            abandoned.clone(),
            Session {
                user: user("regular_user"),
                expires_at: SystemTime::now() - Duration::from_secs(1),
            },
        );

        let session_id = create_session(user("regular_user"));
        assert!(!SESSIONS.read().unwrap().contains_key(&abandoned));
        destroy_session(&session_id);
    }

    #[test]
    fn unknown_session_is_anonymous() {
        assert!(validate_session("not-a-session").is_none());
    }

    #[test]
    fn user_record_parses_the_login_response() {
        let body = r#"{
            "type": "admin_user",
            "username": "root",
            "email": "root@example.com",
            "id": 3,
            "uuid": "2c9e40e0-0000-0000-0000-000000000000",
            "admin_status": "active"
        }"#;
        let user: UserRecord = serde_json::from_str(body).unwrap();
        assert_eq!(user.user_type, "admin_user");
        assert_eq!(user.admin_status.as_deref(), Some("active"));

        let session = AuthSession {
            current_user: Some(user),
        };
        assert!(session.is_admin());
    }
}
