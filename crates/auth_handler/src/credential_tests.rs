use super::*;
use crate::{AppAuthenticator, InMemoryTokenCache};
use encryption::Cipher;
use reqwest::header::AUTHORIZATION;
use serde_json::json;
use test_utils::rsa_key_pair;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn installation(base_url: &str) -> Arc<InstallationAuthenticator> {
    let app = Arc::new(AppAuthenticator::new(7, rsa_key_pair().private_pem.as_bytes()).unwrap());
    Arc::new(
        InstallationAuthenticator::new(
            99,
            base_url,
            app,
            Arc::new(InMemoryTokenCache::default()),
            Cipher::plaintext(),
        )
        .unwrap(),
    )
}

fn request() -> reqwest::Request {
    reqwest::Request::new(
        reqwest::Method::GET,
        "https://api.github.com/repos/owner/repo".parse().unwrap(),
    )
}

#[tokio::test]
async fn test_token_credential_never_refreshes() {
    let credential = Credential::Token(OAuthBearerToken::new("ghp_abc"));
    let mut req = request();

    assert!(!credential.needs_refresh());
    credential
        .authorize(&reqwest::Client::new(), &mut req)
        .await
        .unwrap();

    assert_eq!(req.headers()[AUTHORIZATION], "Bearer ghp_abc");
}

#[tokio::test]
async fn test_installation_credential_refreshes_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/app/installations/99/access_tokens"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "token": "ghs_install",
            "expires_at": (chrono::Utc::now() + chrono::Duration::hours(1)).to_rfc3339()
        })))
        .expect(1)
        .mount(&server)
        .await;
    let credential = Credential::Installation(installation(&server.uri()));
    let client = reqwest::Client::new();

    assert!(credential.needs_refresh());

    let mut first = request();
    credential.authorize(&client, &mut first).await.unwrap();
    let mut second = request();
    credential.authorize(&client, &mut second).await.unwrap();

    assert_eq!(first.headers()[AUTHORIZATION], "Bearer ghs_install");
    assert_eq!(second.headers()[AUTHORIZATION], "Bearer ghs_install");
    assert!(!credential.needs_refresh());
}

#[test]
fn test_hash_dispatches_to_inner_credential() {
    let inner = installation("https://github.com");
    let credential = Credential::Installation(inner.clone());

    assert_eq!(credential.hash(), inner.hash());
}

#[test]
fn test_set_url_user_dispatches_to_inner_credential() {
    let credential = Credential::Token(OAuthBearerToken::new("ghp_abc"));
    let mut url = Url::parse("https://github.com/owner/repo.git").unwrap();

    credential.set_url_user(&mut url).unwrap();

    assert_eq!(url.username(), "ghp_abc");
}
