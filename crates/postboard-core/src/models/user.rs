use serde::{Deserialize, Serialize};

/// The authenticated user as returned by the credential-issuing endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Display-only role label; nothing on the client enforces it.
    pub role: String,
}

impl Identity {
    /// Single uppercase letter used for the avatar badge.
    pub fn initial(&self) -> char {
        self.username
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or('U')
    }
}

/// Body returned by `POST /auth/login` and `POST /auth/register`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub user: Identity,
    #[serde(rename = "accessToken")]
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    #[serde(rename = "emailOrUsername")]
    pub email_or_username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub password: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_response_parses_server_shape() {
        let json = r#"{
            "user": {"id": 1, "username": "ana", "email": "ana@example.com", "role": "USER"},
            "accessToken": "tok-123"
        }"#;
        let parsed: AuthResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.user.username, "ana");
        assert_eq!(parsed.access_token, "tok-123");
    }

    #[test]
    fn test_login_request_field_names() {
        let body = serde_json::to_value(LoginRequest {
            email_or_username: "ana",
            password: "secret",
        })
        .unwrap();
        assert_eq!(body["emailOrUsername"], "ana");
        assert_eq!(body["password"], "secret");
    }

    #[test]
    fn test_initial() {
        let mut user = Identity {
            id: 1,
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
            role: "USER".to_string(),
        };
        assert_eq!(user.initial(), 'A');
        user.username.clear();
        assert_eq!(user.initial(), 'U');
    }
}
