// Redirect handling through AuthManager with non-default policies.

mod helpers;

use helpers::{manager, url, Reply, ScriptedTransport, ScriptedUi};
use vo_auth::{AuthError, DefaultConnector, HttpRequest, ProtocolCheck, RedirectError, Redirector};

#[test]
fn test_no_redirect_returns_3xx() {
    let transport = ScriptedTransport::new();
    transport.on("https://a.org/x", Reply::redirect(303, "https://b.org/y"));
    let m = manager(&transport, None);

    let response = m
        .connect_with(&url("https://a.org/x"), &DefaultConnector, &Redirector::no_redirect())
        .unwrap();
    assert_eq!(response.status(), 303);
    assert_eq!(response.header_str("location"), Some("https://b.org/y"));
    assert_eq!(transport.seen().len(), 1);
}

#[test]
fn test_follow_redirects_after_manual_request() {
    let transport = ScriptedTransport::new();
    transport
        .on("https://a.org/x", Reply::redirect(307, "/y"))
        .on("https://a.org/y", Reply::status(200));
    let m = manager(&transport, None);

    let first = m
        .connect_with(&url("https://a.org/x"), &DefaultConnector, &Redirector::no_redirect())
        .unwrap();
    let followed = m
        .follow_redirects(first, &DefaultConnector, m.redirector())
        .unwrap();
    assert_eq!(followed.status(), 200);
    assert_eq!(followed.url().as_str(), "https://a.org/y");

    // A non-redirect response comes back untouched
    let same = m
        .follow_redirects(followed, &DefaultConnector, m.redirector())
        .unwrap();
    assert_eq!(same.status(), 200);
    assert_eq!(transport.seen().len(), 2);
}

#[test]
fn test_allow_all_permits_downgrade() {
    let transport = ScriptedTransport::new();
    transport
        .on("https://a.org/x", Reply::redirect(302, "http://mirror.org/x"))
        .on("http://mirror.org/x", Reply::status(200));
    let m = manager(&transport, None);
    let redirector = Redirector::default().with_protocol_check(ProtocolCheck::AllowAll);

    let response = m
        .connect_with(&url("https://a.org/x"), &DefaultConnector, &redirector)
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.url().as_str(), "http://mirror.org/x");
}

#[test]
fn test_same_protocol_refuses_upgrade() {
    let transport = ScriptedTransport::new();
    transport.on("http://a.org/x", Reply::redirect(301, "https://a.org/x"));
    let m = manager(&transport, None);
    let redirector = Redirector::default().with_protocol_check(ProtocolCheck::SameProtocol);

    let err = m
        .connect_with(&url("http://a.org/x"), &DefaultConnector, &redirector)
        .unwrap_err();
    assert!(matches!(
        err,
        AuthError::Redirect(RedirectError::ProtocolDowngrade { .. })
    ));
}

#[test]
fn test_redirect_without_location_is_error() {
    let transport = ScriptedTransport::new();
    transport.on("https://a.org/x", Reply::status(302));
    let m = manager(&transport, None);

    let err = m.connect(&url("https://a.org/x")).unwrap_err();
    assert!(matches!(
        err,
        AuthError::Redirect(RedirectError::MissingLocation { status: 302, .. })
    ));
}

#[test]
fn test_custom_codes_limit_what_is_followed() {
    let transport = ScriptedTransport::new();
    transport
        .on("https://a.org/x", Reply::redirect(308, "/y"))
        .on("https://a.org/y", Reply::status(200));
    let m = manager(&transport, None);
    let redirector = Redirector::default().with_codes(&[301, 302]);

    let response = m
        .connect_with(&url("https://a.org/x"), &DefaultConnector, &redirector)
        .unwrap();
    assert_eq!(response.status(), 308);
}

#[test]
fn test_each_hop_negotiates_its_own_credentials() {
    let transport = ScriptedTransport::new();
    transport
        .on("https://a.org/x", Reply::status(401).challenge("Basic realm=\"a\""))
        .on("https://a.org/x", Reply::redirect(302, "https://b.org/y"))
        .on("https://b.org/y", Reply::status(401).challenge("Basic realm=\"b\""))
        .on("https://b.org/y", Reply::status(200));
    let ui = ScriptedUi::new(vec![Some(("alice", "secret")), Some(("bob", "pw"))], false);
    let m = manager(&transport, Some(ui.clone()));

    let connector = |request: &mut HttpRequest| {
        request.headers_mut().insert(
            "x-trace",
            reqwest::header::HeaderValue::from_static("1"),
        );
    };
    let response = m
        .connect_with(&url("https://a.org/x"), &connector, m.redirector())
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        ui.asked(),
        vec![
            "Basic login for realm \"a\" at https://a.org/x",
            "Basic login for realm \"b\" at https://b.org/y",
        ]
    );

    let b = transport.seen_for("https://b.org/y");
    assert_eq!(b[1].header("authorization"), Some("Basic Ym9iOnB3"));
    assert!(transport.seen().iter().all(|s| s.header("x-trace") == Some("1")));

    // The redirect leaves a.org's credentials unconfirmed
    assert_eq!(m.cache().reserve().len(), 1);
    assert_eq!(m.cache().validated().len(), 1);
}
