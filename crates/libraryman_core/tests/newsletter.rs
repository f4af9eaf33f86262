use libraryman_core::db::open_db_in_memory;
use libraryman_core::{
    NewsletterError, NewsletterService, SqliteSubscriberRepository, SubscribeOutcome,
    UnsubscribeOutcome,
};

#[test]
fn subscribe_unsubscribe_and_resubscribe_cycle() {
    let conn = open_db_in_memory().unwrap();
    let service = NewsletterService::new(SqliteSubscriberRepository::new(&conn));

    let outcome = service.subscribe("  Reader@Library.org ").unwrap();
    assert_eq!(outcome, SubscribeOutcome::Subscribed);
    assert_eq!(outcome.message(), "You have successfully subscribed!");

    let token = service.token_for("reader@library.org").unwrap().unwrap();
    let outcome = service.unsubscribe(&token.to_string()).unwrap();
    assert_eq!(outcome, UnsubscribeOutcome::Unsubscribed);

    let err = service.unsubscribe(&token.to_string()).unwrap_err();
    assert!(matches!(err, NewsletterError::AlreadyUnsubscribed));

    let outcome = service.subscribe("reader@library.org").unwrap();
    assert_eq!(outcome, SubscribeOutcome::Resubscribed);
    assert_eq!(
        service.token_for("READER@library.org").unwrap(),
        Some(token)
    );
}

#[test]
fn subscribe_twice_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let service = NewsletterService::new(SqliteSubscriberRepository::new(&conn));
    service.subscribe("reader@library.org").unwrap();

    let err = service.subscribe("READER@library.org").unwrap_err();
    assert!(matches!(err, NewsletterError::AlreadySubscribed));
    assert_eq!(err.message(), "Email is already subscribed.");
}

#[test]
fn subscribe_rejects_malformed_email() {
    let conn = open_db_in_memory().unwrap();
    let service = NewsletterService::new(SqliteSubscriberRepository::new(&conn));

    let err = service.subscribe("not an email").unwrap_err();
    assert!(matches!(err, NewsletterError::InvalidEmail));
    assert!(service.token_for("not an email").unwrap().is_none());
}

#[test]
fn unsubscribe_rejects_unknown_and_malformed_tokens() {
    let conn = open_db_in_memory().unwrap();
    let service = NewsletterService::new(SqliteSubscriberRepository::new(&conn));

    let err = service.unsubscribe("garbage").unwrap_err();
    assert!(matches!(err, NewsletterError::InvalidToken));

    let err = service
        .unsubscribe("1b4e28ba-2fa1-11d2-883f-0016d3cca427")
        .unwrap_err();
    assert!(matches!(err, NewsletterError::InvalidToken));
}
