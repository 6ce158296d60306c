use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::mpsc;

use bank_ledger::error::ErrorKind;
use bank_ledger::notify::{LogNotifier, Notifier};
use bank_ledger::session::{MemorySessionStore, Session, SessionAuthority};
use bank_ledger::token::TokenMaker;
use bank_ledger::user_auth::{
    Argon2Hasher, AuthService, ClientMeta, MemoryUserStore, RegisterUser, TokenTtls,
};

const SECRET: &str = "0123456789abcdef0123456789abcdef";

struct Harness {
    auth: AuthService,
    tokens: Arc<TokenMaker>,
    sessions: SessionAuthority,
}

fn harness_with(notifier: Arc<dyn Notifier>) -> Harness {
    let tokens = Arc::new(TokenMaker::new(SECRET).unwrap());
    let sessions = SessionAuthority::new(Arc::new(MemorySessionStore::new()));
    let hasher = Argon2Hasher::with_params(argon2::Params::new(8, 1, 1, None).unwrap());
    let auth = AuthService::new(
        Arc::new(MemoryUserStore::new()),
        sessions.clone(),
        tokens.clone(),
        Arc::new(hasher),
        notifier,
        TokenTtls::default(),
    );
    Harness {
        auth,
        tokens,
        sessions,
    }
}

fn harness() -> Harness {
    harness_with(Arc::new(LogNotifier))
}

fn registration(username: &str) -> RegisterUser {
    RegisterUser {
        username: username.to_string(),
        password: "hunter2hunter2".to_string(),
        full_name: "Test User".to_string(),
        email: format!("{username}@example.com"),
    }
}

/// Store a session for `token` with the given tweaks applied
async fn store_session(h: &Harness, token: &str, tweak: impl FnOnce(&mut Session)) {
    let payload = h.tokens.verify(token).unwrap();
    let mut session = Session {
        id: payload.token_id(),
        owner: payload.subject().to_string(),
        refresh_token: token.to_string(),
        user_agent: "test".to_string(),
        client_ip: "127.0.0.1".to_string(),
        is_blocked: false,
        expires_at: payload.expires_at(),
        created_at: Utc::now(),
    };
    tweak(&mut session);
    h.sessions.create(&session).await.unwrap();
}

fn refresh_token(h: &Harness, subject: &str) -> String {
    h.tokens
        .issue_refresh_token(subject, Duration::hours(1))
        .unwrap()
        .0
}

#[tokio::test]
async fn test_login_then_renew() {
    let h = harness();
    h.auth.register(&registration("alice")).await.unwrap();
    let login = h
        .auth
        .login("alice", "hunter2hunter2", &ClientMeta::default())
        .await
        .unwrap();

    let renewed = h.auth.renew_access_token(&login.refresh_token).await.unwrap();
    assert!(renewed.access_token_expires_at > Utc::now());
    assert_ne!(renewed.access_token, login.access_token);
    assert_eq!(
        h.auth.verify_access_token(&renewed.access_token).unwrap().subject(),
        "alice"
    );

    // no rotation: the session still holds the first refresh token
    let session = h.sessions.get(login.session_id).await.unwrap();
    assert_eq!(session.refresh_token, login.refresh_token);
}

#[tokio::test]
async fn test_blocked_session_rejected() {
    let h = harness();
    h.auth.register(&registration("alice")).await.unwrap();
    let login = h
        .auth
        .login("alice", "hunter2hunter2", &ClientMeta::default())
        .await
        .unwrap();
    h.sessions.block(login.session_id).await.unwrap();

    let err = h.auth.renew_access_token(&login.refresh_token).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(err.message(), "blocked");
}

#[tokio::test]
async fn test_mismatched_subject_rejected() {
    let h = harness();
    let token = refresh_token(&h, "alice");
    store_session(&h, &token, |s| s.owner = "bob".to_string()).await;

    let err = h.auth.renew_access_token(&token).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(err.message(), "mismatched subject");
}

#[tokio::test]
async fn test_superseded_token_rejected() {
    let h = harness();
    let token = refresh_token(&h, "alice");
    let newer = refresh_token(&h, "alice");
    store_session(&h, &token, |s| s.refresh_token = newer.clone()).await;

    let err = h.auth.renew_access_token(&token).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(err.message(), "superseded token");
}

#[tokio::test]
async fn test_missing_session_is_not_found() {
    let h = harness();
    let token = refresh_token(&h, "alice");

    let err = h.auth.renew_access_token(&token).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_expired_session_rejected() {
    let h = harness();
    let token = refresh_token(&h, "alice");
    store_session(&h, &token, |s| s.expires_at = Utc::now() - Duration::minutes(1)).await;

    let err = h.auth.renew_access_token(&token).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(err.message(), "session expired");
}

#[tokio::test]
async fn test_expired_refresh_token_rejected() {
    let h = harness();
    let (token, _) = h
        .tokens
        .issue_refresh_token("alice", Duration::seconds(-1))
        .unwrap();

    let err = h.auth.renew_access_token(&token).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(err.message(), "expired");
}

#[tokio::test]
async fn test_access_token_from_other_key_rejected() {
    let h = harness();
    let foreign = TokenMaker::new("fedcba9876543210fedcba9876543210").unwrap();
    let (token, _) = foreign
        .issue_refresh_token("alice", Duration::hours(1))
        .unwrap();

    let err = h.auth.renew_access_token(&token).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(err.message(), "invalid");
}

struct Recording(mpsc::UnboundedSender<(String, String)>);

#[async_trait]
impl Notifier for Recording {
    async fn send_verify_email(&self, username: &str, email: &str) -> anyhow::Result<()> {
        self.0.send((username.to_string(), email.to_string()))?;
        Ok(())
    }
}

struct Stuck;

#[async_trait]
impl Notifier for Stuck {
    async fn send_verify_email(&self, _: &str, _: &str) -> anyhow::Result<()> {
        tokio::time::sleep(StdDuration::from_secs(3600)).await;
        Ok(())
    }
}

struct Broken;

#[async_trait]
impl Notifier for Broken {
    async fn send_verify_email(&self, _: &str, _: &str) -> anyhow::Result<()> {
        anyhow::bail!("mail relay refused connection")
    }
}

#[tokio::test]
async fn test_verification_email_sent_after_register() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let h = harness_with(Arc::new(Recording(tx)));
    h.auth.register(&registration("alice")).await.unwrap();

    let sent = tokio::time::timeout(StdDuration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sent, ("alice".to_string(), "alice@example.com".to_string()));
}

#[tokio::test]
async fn test_notifier_never_blocks_or_fails_register() {
    let h = harness_with(Arc::new(Stuck));
    tokio::time::timeout(
        StdDuration::from_secs(1),
        h.auth.register(&registration("alice")),
    )
    .await
    .expect("register waited on the notifier")
    .unwrap();

    let h = harness_with(Arc::new(Broken));
    h.auth.register(&registration("bob")).await.unwrap();
}

#[tokio::test]
async fn test_no_notification_when_register_fails() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let h = harness_with(Arc::new(Recording(tx)));
    h.auth.register(&registration("alice")).await.unwrap();
    rx.recv().await.unwrap();

    let err = h.auth.register(&registration("alice")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    tokio::time::sleep(StdDuration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());
}
