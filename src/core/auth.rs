//! Authorization for list endpoints
//!
//! Identity is established by an external [`SessionProvider`]; the pipeline
//! only consumes the resulting [`Session`]. The [`RoleGate`] decides whether a
//! session may read a resource, before any data is touched.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use axum::http::HeaderMap;
use uuid::Uuid;

/// Header carrying the authenticated user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the authenticated user's role
pub const ROLE_HEADER: &str = "x-user-role";

/// Header carrying the branch the user belongs to
pub const BRANCH_HEADER: &str = "x-branch-id";

/// The caller's identity, passed explicitly through the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub role: Option<String>,
    pub branch_id: Option<Uuid>,
}

impl Session {
    pub fn new(user_id: Uuid, role: impl Into<String>) -> Self {
        Self {
            user_id,
            role: Some(role.into()),
            branch_id: None,
        }
    }

    pub fn with_branch(mut self, branch_id: Uuid) -> Self {
        self.branch_id = Some(branch_id);
        self
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn has_role(&self, roles: &[String]) -> bool {
        self.role().is_some_and(|role| roles.iter().any(|r| r == role))
    }
}

/// Role allow-list check
///
/// Pure: a missing session or a session without a role is simply not allowed.
pub struct RoleGate;

impl RoleGate {
    pub fn allows(session: Option<&Session>, allow: &[String]) -> bool {
        session.is_some_and(|s| s.has_role(allow))
    }
}

/// Trait for identity providers
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Resolve the session for a request, `None` when the caller is anonymous
    async fn session(&self, headers: &HeaderMap) -> Result<Option<Session>>;
}

/// Trusts identity headers set by an authenticating gateway
pub struct HeaderSessionProvider;

#[async_trait]
impl SessionProvider for HeaderSessionProvider {
    async fn session(&self, headers: &HeaderMap) -> Result<Option<Session>> {
        let Some(user_id) = header_str(headers, USER_ID_HEADER)? else {
            return Ok(None);
        };
        let user_id = Uuid::parse_str(user_id)
            .map_err(|e| anyhow!("invalid {} header: {}", USER_ID_HEADER, e))?;

        let role = header_str(headers, ROLE_HEADER)?.map(str::to_string);
        let branch_id = header_str(headers, BRANCH_HEADER)?
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|e| anyhow!("invalid {} header: {}", BRANCH_HEADER, e))?;

        Ok(Some(Session {
            user_id,
            role,
            branch_id,
        }))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>> {
    match headers.get(name) {
        Some(value) => {
            let value = value
                .to_str()
                .map_err(|e| anyhow!("invalid {} header: {}", name, e))?
                .trim();
            Ok(Some(value).filter(|v| !v.is_empty()))
        }
        None => Ok(None),
    }
}

/// Always anonymous (for development)
pub struct NoSessionProvider;

#[async_trait]
impl SessionProvider for NoSessionProvider {
    async fn session(&self, _headers: &HeaderMap) -> Result<Option<Session>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn roles(r: &[&str]) -> Vec<String> {
        r.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_gate_allows_listed_role() {
        let session = Session::new(Uuid::new_v4(), "admin");
        assert!(RoleGate::allows(Some(&session), &roles(&["admin", "branch"])));
    }

    #[test]
    fn test_gate_denies_unlisted_role() {
        let session = Session::new(Uuid::new_v4(), "cashier");
        assert!(!RoleGate::allows(Some(&session), &roles(&["admin"])));
    }

    #[test]
    fn test_gate_denies_missing_session_and_missing_role() {
        assert!(!RoleGate::allows(None, &roles(&["admin"])));

        let session = Session {
            user_id: Uuid::new_v4(),
            role: None,
            branch_id: None,
        };
        assert!(!RoleGate::allows(Some(&session), &roles(&["admin"])));
    }

    #[test]
    fn test_gate_denies_empty_allow_list() {
        let session = Session::new(Uuid::new_v4(), "admin");
        assert!(!RoleGate::allows(Some(&session), &[]));
    }

    #[tokio::test]
    async fn test_header_provider_reads_session() {
        let user = Uuid::new_v4();
        let branch = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_str(&user.to_string()).unwrap());
        headers.insert(ROLE_HEADER, HeaderValue::from_static("branch"));
        headers.insert(BRANCH_HEADER, HeaderValue::from_str(&branch.to_string()).unwrap());

        let session = HeaderSessionProvider.session(&headers).await.unwrap().unwrap();
        assert_eq!(session.user_id, user);
        assert_eq!(session.role(), Some("branch"));
        assert_eq!(session.branch_id, Some(branch));
    }

    #[tokio::test]
    async fn test_header_provider_anonymous_without_user() {
        let mut headers = HeaderMap::new();
        headers.insert(ROLE_HEADER, HeaderValue::from_static("admin"));
        assert!(HeaderSessionProvider.session(&headers).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_header_provider_rejects_malformed_user_id() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("nope"));
        assert!(HeaderSessionProvider.session(&headers).await.is_err());
    }

    #[tokio::test]
    async fn test_no_session_provider() {
        assert!(NoSessionProvider.session(&HeaderMap::new()).await.unwrap().is_none());
    }
}
