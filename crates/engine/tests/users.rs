mod common;

use engine::{CancelSignal, Caller, EngineError, UserNew, UserUpdate};
use rust_decimal_macros::dec;

use common::{engine_with_db, open_account};

fn signup(email: &str, password: &str) -> UserNew {
    UserNew {
        email: email.to_string(),
        password: password.to_string(),
        first_name: "Carol".to_string(),
        last_name: "Jones".to_string(),
    }
}

#[tokio::test]
async fn register_then_login() {
    let fx = engine_with_db().await;
    let never = CancelSignal::never();
    let user = fx
        .engine
        .register(&never, signup(" Carol@Example.com ", "s3cret-pass"))
        .await
        .unwrap();
    assert_eq!(user.email, "carol@example.com");
    assert_eq!(user.full_name(), "Carol Jones");

    let logged_in = fx
        .engine
        .login(&never, "CAROL@example.com", "s3cret-pass")
        .await
        .unwrap();
    assert_eq!(logged_in.id, user.id);
}

#[tokio::test]
async fn register_rejects_duplicates_and_weak_passwords() {
    let fx = engine_with_db().await;
    let never = CancelSignal::never();

    let duplicate = fx
        .engine
        .register(&never, signup("alice@example.com", "password123"))
        .await;
    assert!(matches!(duplicate, Err(EngineError::ExistingKey(_))));

    let weak = fx
        .engine
        .register(&never, signup("dave@example.com", "short"))
        .await;
    assert!(matches!(weak, Err(EngineError::Validation(_))));

    let malformed = fx
        .engine
        .register(&never, signup("not-an-email", "password123"))
        .await;
    assert!(matches!(malformed, Err(EngineError::Validation(_))));
}

#[tokio::test]
async fn bad_credentials_look_the_same() {
    let fx = engine_with_db().await;
    let never = CancelSignal::never();

    let wrong_password = fx
        .engine
        .login(&never, "alice@example.com", "nope-nope")
        .await
        .unwrap_err();
    let unknown_user = fx
        .engine
        .login(&never, "nobody@example.com", "password123")
        .await
        .unwrap_err();
    assert!(matches!(wrong_password, EngineError::Unauthorized(_)));
    assert_eq!(wrong_password, unknown_user);
}

#[tokio::test]
async fn update_profile_keeps_email_unique() {
    let fx = engine_with_db().await;

    let updated = fx
        .engine
        .update_user(
            &fx.alice,
            UserUpdate {
                first_name: Some("Alicia".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.first_name, "Alicia");
    assert_eq!(updated.email, "alice@example.com");

    let taken = fx
        .engine
        .update_user(
            &fx.alice,
            UserUpdate {
                email: Some("BOB@example.com".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(taken, Err(EngineError::ExistingKey(_))));

    let same = fx
        .engine
        .update_user(
            &fx.alice,
            UserUpdate {
                email: Some("alice@example.com".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert!(same.is_ok());
}

#[tokio::test]
async fn change_password_requires_current_one() {
    let fx = engine_with_db().await;
    let never = CancelSignal::never();

    let refused = fx
        .engine
        .change_password(&fx.alice, "wrong-password", "brand-new-pass")
        .await;
    assert!(matches!(refused, Err(EngineError::Unauthorized(_))));

    fx.engine
        .change_password(&fx.alice, "password123", "brand-new-pass")
        .await
        .unwrap();
    assert!(
        fx.engine
            .validate_password(&fx.alice, "brand-new-pass")
            .await
            .unwrap()
    );
    assert!(
        !fx.engine
            .validate_password(&fx.alice, "password123")
            .await
            .unwrap()
    );
    assert!(
        fx.engine
            .login(&never, "alice@example.com", "brand-new-pass")
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn delete_user_removes_owned_data() {
    let fx = engine_with_db().await;
    let account = open_account(&fx.engine, &fx.alice, "Main", dec!(10)).await;
    let bobs = open_account(&fx.engine, &fx.bob, "Bob", dec!(10)).await;

    let refused = fx.engine.delete_user(&fx.alice, "wrong-password").await;
    assert!(matches!(refused, Err(EngineError::Unauthorized(_))));
    assert!(fx.engine.account(&fx.alice, account).await.is_ok());

    fx.engine
        .delete_user(&fx.alice, "password123")
        .await
        .unwrap();
    assert!(matches!(
        fx.engine.user(&fx.alice).await,
        Err(EngineError::KeyNotFound(_))
    ));
    assert!(matches!(
        fx.engine.account(&fx.alice, account).await,
        Err(EngineError::KeyNotFound(_))
    ));
    assert!(fx.engine.account(&fx.bob, bobs).await.is_ok());
}

#[tokio::test]
async fn unknown_caller_has_no_profile() {
    let fx = engine_with_db().await;
    let ghost = Caller::new(uuid::Uuid::new_v4().to_string());
    let err = fx.engine.user(&ghost).await;
    assert!(matches!(err, Err(EngineError::KeyNotFound(_))));
}
