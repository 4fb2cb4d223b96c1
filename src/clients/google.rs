//! Google OAuth 2.0 sign-in
//!
//! Authorization-code flow with PKCE. The consent URL carries a caller-provided
//! CSRF state; the callback exchanges the code and reads the OpenID userinfo.

use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RequestTokenError, Scope, TokenResponse,
    TokenUrl, basic::BasicClient,
};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{UpstreamError, status_error};
use crate::config::GoogleConfig;
use crate::repositories::GoogleIdentity;

const PROVIDER: &str = "google";

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

const SCOPES: [&str; 3] = ["openid", "email", "profile"];

type GoogleClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    email: Option<String>,
    email_verified: Option<bool>,
    name: Option<String>,
    picture: Option<String>,
}

/// Consent-page redirect plus the PKCE verifier to keep until the callback.
#[derive(Debug)]
pub struct AuthorizationRequest {
    pub url: Url,
    pub code_verifier: String,
}

#[derive(Clone)]
pub struct GoogleOAuthClient {
    oauth: GoogleClient,
    http: reqwest::Client,
    userinfo_url: String,
}

impl GoogleOAuthClient {
    /// Builds the client; returns `Ok(None)` when the credentials are not configured.
    pub fn from_config(
        http: reqwest::Client,
        config: &GoogleConfig,
    ) -> Result<Option<Self>, url::ParseError> {
        let (Some(client_id), Some(client_secret), Some(redirect_url)) = (
            config.client_id.clone(),
            config.client_secret.clone(),
            config.redirect_url.clone(),
        ) else {
            return Ok(None);
        };

        let auth_url = config.auth_url.as_deref().unwrap_or(GOOGLE_AUTH_URL);
        let token_url = config.token_url.as_deref().unwrap_or(GOOGLE_TOKEN_URL);

        let oauth = BasicClient::new(ClientId::new(client_id))
            .set_client_secret(ClientSecret::new(client_secret))
            .set_auth_uri(AuthUrl::new(auth_url.to_string())?)
            .set_token_uri(TokenUrl::new(token_url.to_string())?)
            .set_redirect_uri(RedirectUrl::new(redirect_url)?);

        Ok(Some(Self {
            oauth,
            http,
            userinfo_url: config
                .userinfo_url
                .clone()
                .unwrap_or_else(|| GOOGLE_USERINFO_URL.to_string()),
        }))
    }

    /// Consent URL for `state` with a fresh PKCE challenge.
    pub fn authorize(&self, state: &str) -> AuthorizationRequest {
        let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
        let state = state.to_string();

        let (url, _) = self
            .oauth
            .authorize_url(|| CsrfToken::new(state))
            .add_scopes(SCOPES.iter().map(|s| Scope::new(s.to_string())))
            .add_extra_param("prompt", "select_account")
            .set_pkce_challenge(challenge)
            .url();

        AuthorizationRequest {
            url,
            code_verifier: verifier.secret().clone(),
        }
    }

    /// Exchanges the authorization code and fetches the signed-in identity.
    pub async fn exchange(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<GoogleIdentity, UpstreamError> {
        let token = self
            .oauth
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(code_verifier.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| match e {
                RequestTokenError::ServerResponse(response) => UpstreamError::Status {
                    provider: PROVIDER,
                    status: 400,
                    body: response.error().to_string(),
                },
                RequestTokenError::Request(inner) => UpstreamError::Decode {
                    provider: PROVIDER,
                    message: inner.to_string(),
                },
                other => UpstreamError::Decode {
                    provider: PROVIDER,
                    message: other.to_string(),
                },
            })?;

        debug!("Google token exchange succeeded");

        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(token.access_token().secret())
            .send()
            .await
            .map_err(UpstreamError::network(PROVIDER))?;

        if !response.status().is_success() {
            return Err(status_error(PROVIDER, response).await);
        }

        let info = response
            .json::<UserInfo>()
            .await
            .map_err(UpstreamError::decode(PROVIDER))?;

        identity_from(info)
    }
}

fn identity_from(info: UserInfo) -> Result<GoogleIdentity, UpstreamError> {
    if info.email_verified == Some(false) {
        return Err(UpstreamError::Decode {
            provider: PROVIDER,
            message: "email address is not verified".to_string(),
        });
    }
    let email = info.email.ok_or(UpstreamError::Decode {
        provider: PROVIDER,
        message: "userinfo missing email".to_string(),
    })?;

    let name = info
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

    Ok(GoogleIdentity {
        subject: info.sub,
        email: email.to_lowercase(),
        name,
        picture: info.picture,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_string_contains, header, method, path},
    };

    fn config(server: &MockServer) -> GoogleConfig {
        GoogleConfig {
            client_id: Some("client-id".to_string()),
            client_secret: Some("client-secret".to_string()),
            redirect_url: Some("http://localhost:3000/api/auth/google/callback".to_string()),
            auth_url: Some(format!("{}/auth", server.uri())),
            token_url: Some(format!("{}/token", server.uri())),
            userinfo_url: Some(format!("{}/userinfo", server.uri())),
        }
    }

    #[test]
    fn test_unconfigured_returns_none() {
        let client =
            GoogleOAuthClient::from_config(reqwest::Client::new(), &GoogleConfig::default())
                .unwrap();
        assert!(client.is_none());
    }

    #[test]
    fn test_authorize_url_carries_state_and_pkce() {
        let google = GoogleConfig {
            client_id: Some("client-id".to_string()),
            client_secret: Some("client-secret".to_string()),
            redirect_url: Some("http://localhost:3000/cb".to_string()),
            ..GoogleConfig::default()
        };
        let client = GoogleOAuthClient::from_config(reqwest::Client::new(), &google)
            .unwrap()
            .unwrap();

        let request = client.authorize("state-123");
        let pairs: std::collections::HashMap<_, _> =
            request.url.query_pairs().into_owned().collect();

        assert!(request.url.as_str().starts_with(GOOGLE_AUTH_URL));
        assert_eq!(pairs.get("state").map(String::as_str), Some("state-123"));
        assert_eq!(pairs.get("scope").map(String::as_str), Some("openid email profile"));
        assert_eq!(
            pairs.get("code_challenge_method").map(String::as_str),
            Some("S256")
        );
        assert!(!request.code_verifier.is_empty());
    }

    #[tokio::test]
    async fn test_exchange_fetches_userinfo() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("code=auth-code"))
            .and(body_string_contains("code_verifier=verifier"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.token",
                "token_type": "Bearer",
                "expires_in": 3599
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .and(header("authorization", "Bearer ya29.token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sub": "1234567890",
                "email": "Ada@Example.com",
                "email_verified": true,
                "name": "Ada Lovelace",
                "picture": "https://lh3.example/ada.png"
            })))
            .mount(&server)
            .await;

        let client = GoogleOAuthClient::from_config(reqwest::Client::new(), &config(&server))
            .unwrap()
            .unwrap();
        let identity = client.exchange("auth-code", "verifier").await.unwrap();

        assert_eq!(identity.subject, "1234567890");
        assert_eq!(identity.email, "ada@example.com");
        assert_eq!(identity.name, "Ada Lovelace");
    }

    #[tokio::test]
    async fn test_invalid_grant_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Bad Request"
            })))
            .mount(&server)
            .await;

        let client = GoogleOAuthClient::from_config(reqwest::Client::new(), &config(&server))
            .unwrap()
            .unwrap();
        let err = client.exchange("stale", "verifier").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Status { status: 400, .. }));
    }

    #[test]
    fn test_unverified_email_rejected() {
        let err = identity_from(UserInfo {
            sub: "1".to_string(),
            email: Some("x@example.com".to_string()),
            email_verified: Some(false),
            name: None,
            picture: None,
        })
        .unwrap_err();
        assert!(matches!(err, UpstreamError::Decode { .. }));
    }

    #[test]
    fn test_name_falls_back_to_email_local_part() {
        let identity = identity_from(UserInfo {
            sub: "1".to_string(),
            email: Some("grace@example.com".to_string()),
            email_verified: None,
            name: Some("  ".to_string()),
            picture: None,
        })
        .unwrap();
        assert_eq!(identity.name, "grace");
    }
}
