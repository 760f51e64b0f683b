use std::collections::HashSet;

use fuel_price_engine::StoreError;
use fuel_price_engine::auth::CredentialValidator;
use fuel_price_engine::models::{UpdateUserDto, UserDto};
use fuel_price_engine::pipeline::PipelineSettings;
use fuel_price_engine::store::StationRepository;
use uuid::Uuid;

fn repository() -> StationRepository {
    StationRepository::new(
        PipelineSettings::default(),
        CredentialValidator::with_cost(1024, 1).unwrap(),
    )
}

fn user_dto(name: &str) -> UserDto {
    UserDto {
        username: name.into(),
        email: format!("{name}@example.com"),
        password: format!("{name}-password"),
    }
}

#[test]
fn test_create_user_hashes_password() {
    let repo = repository();
    let user = repo.create_user(user_dto("alice")).unwrap();

    assert_eq!(user.username, "alice");
    assert_eq!(user.email, "alice@example.com");
    assert_ne!(user.password_hash, "alice-password");
    assert!(user.password_hash.starts_with("$argon2id$"));

    assert_eq!(repo.user(user.id).unwrap(), user);
    assert_eq!(repo.user_by_email("alice@example.com").unwrap(), user);
}

#[test]
fn test_duplicate_email_is_rejected() {
    let repo = repository();
    repo.create_user(user_dto("alice")).unwrap();

    let err = repo.create_user(user_dto("alice")).unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    assert_eq!(repo.users().len(), 1);
}

#[test]
fn test_empty_password_is_rejected() {
    let repo = repository();
    let err = repo
        .create_user(UserDto { password: String::new(), ..user_dto("bob") })
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    assert!(repo.users().is_empty());
}

#[test]
fn test_user_ids_are_unique() {
    let repo = repository();
    let ids: HashSet<Uuid> =
        (0..20).map(|i| repo.create_user(user_dto(&format!("user{i}"))).unwrap().id).collect();
    assert_eq!(ids.len(), 20);
}

#[test]
fn test_authenticate() {
    let repo = repository();
    let user = repo.create_user(user_dto("carol")).unwrap();

    assert_eq!(repo.authenticate("carol@example.com", "carol-password"), Some(user));
    assert_eq!(repo.authenticate("carol@example.com", "wrong"), None);
    assert_eq!(repo.authenticate("nobody@example.com", "carol-password"), None);
}

#[test]
fn test_update_user_rehashes_password() {
    let repo = repository();
    let user = repo.create_user(user_dto("dave")).unwrap();

    let updated = repo
        .update_user(UpdateUserDto {
            id: user.id,
            username: "david".into(),
            email: "david@example.com".into(),
            password: "new-secret".into(),
        })
        .unwrap();

    assert_eq!(updated.id, user.id);
    assert_eq!(updated.username, "david");
    assert_ne!(updated.password_hash, "new-secret");
    assert!(repo.authenticate("david@example.com", "new-secret").is_some());
    assert!(repo.authenticate("david@example.com", "dave-password").is_none());
    assert!(repo.user_by_email("dave@example.com").unwrap_err().is_not_found());
}

#[test]
fn test_update_user_errors() {
    let repo = repository();
    let erin = repo.create_user(user_dto("erin")).unwrap();
    repo.create_user(user_dto("frank")).unwrap();

    // 他のユーザーのメールアドレスには変更できない
    let err = repo
        .update_user(UpdateUserDto {
            id: erin.id,
            username: "erin".into(),
            email: "frank@example.com".into(),
            password: "pw".into(),
        })
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));

    let missing = Uuid::new_v4();
    let err = repo
        .update_user(UpdateUserDto {
            id: missing,
            username: "ghost".into(),
            email: "ghost@example.com".into(),
            password: "pw".into(),
        })
        .unwrap_err();
    assert_eq!(err, StoreError::NotFound(format!("user with id {missing}")));
}

#[test]
fn test_delete_user() {
    let repo = repository();
    let user = repo.create_user(user_dto("gina")).unwrap();

    repo.delete_user(user.id).unwrap();
    assert!(repo.user(user.id).unwrap_err().is_not_found());
    assert!(repo.users().is_empty());
    assert!(repo.delete_user(user.id).unwrap_err().is_not_found());
}
