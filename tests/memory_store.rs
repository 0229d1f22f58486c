use taskmanager::{
    AppError, MemoryStore, RecordStore, Task, TaskDraft, TaskPatch, User, UserDraft, UserPatch,
};

fn user_draft(username: &str, firstname: &str) -> UserDraft {
    UserDraft {
        username: username.to_string(),
        firstname: firstname.to_string(),
        lastname: "Doe".to_string(),
        age: 30,
    }
}

fn task_draft(title: &str, owner_id: i64) -> TaskDraft {
    TaskDraft {
        title: title.to_string(),
        content: "Need to implement all CRUD operations".to_string(),
        priority: 1,
        completed: false,
        owner_id,
    }
}

async fn add_user(store: &MemoryStore, username: &str, firstname: &str) -> User {
    RecordStore::<User>::create(store, user_draft(username, firstname))
        .await
        .unwrap()
}

async fn add_task(store: &MemoryStore, title: &str, owner_id: i64) -> Task {
    RecordStore::<Task>::create(store, task_draft(title, owner_id))
        .await
        .unwrap()
}

async fn users_len(store: &MemoryStore) -> usize {
    RecordStore::<User>::list(store, 0, u32::MAX).await.unwrap().len()
}

#[tokio::test]
async fn create_then_get_returns_input_plus_id_and_slug() {
    let store = MemoryStore::new();
    let created = add_user(&store, "john_doe", "John").await;
    assert_eq!(created.id, 1);
    assert_eq!(created.slug, "john-doe");

    let loaded = RecordStore::<User>::get(&store, 1).await.unwrap();
    assert_eq!(loaded, created);
    assert_eq!(loaded.username, "john_doe");
    assert_eq!(loaded.firstname, "John");
    assert_eq!(loaded.lastname, "Doe");
    assert_eq!(loaded.age, 30);
}

#[tokio::test]
async fn duplicate_slug_conflicts_and_leaves_store_unchanged() {
    let store = MemoryStore::new();
    add_user(&store, "john_doe", "John").await;

    let err = RecordStore::<User>::create(&store, user_draft("john_doe", "Johnny"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // Same slug from a differently spelled username.
    let err = RecordStore::<User>::create(&store, user_draft("John-Doe", "Jim"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(users_len(&store).await, 1);
    assert_eq!(store.count::<User>(), 1);
}

#[tokio::test]
async fn validation_failure_names_the_field() {
    let store = MemoryStore::new();
    let err = RecordStore::<User>::create(&store, user_draft("ab", "John"))
        .await
        .unwrap_err();
    match err {
        AppError::Validation { field, .. } => assert_eq!(field, "username"),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(users_len(&store).await, 0);
}

#[tokio::test]
async fn get_missing_is_not_found() {
    let store = MemoryStore::new();
    let err = RecordStore::<User>::get(&store, 999).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn partial_update_keeps_other_fields() {
    let store = MemoryStore::new();
    let created = add_user(&store, "john_doe", "John").await;

    let updated = RecordStore::<User>::update(
        &store,
        created.id,
        UserPatch {
            age: Some(31),
            ..UserPatch::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.age, 31);
    assert_eq!(updated.username, created.username);
    assert_eq!(updated.slug, created.slug);
    assert_eq!(RecordStore::<User>::get(&store, created.id).await.unwrap(), updated);
}

#[tokio::test]
async fn empty_update_is_a_no_op() {
    let store = MemoryStore::new();
    let created = add_user(&store, "john_doe", "John").await;
    let updated = RecordStore::<User>::update(&store, created.id, UserPatch::default())
        .await
        .unwrap();
    assert_eq!(updated, created);
}

#[tokio::test]
async fn update_into_taken_slug_conflicts_and_keeps_record() {
    let store = MemoryStore::new();
    add_user(&store, "john_doe", "John").await;
    let jane = add_user(&store, "jane_smith", "Jane").await;

    let err = RecordStore::<User>::update(
        &store,
        jane.id,
        UserPatch {
            username: Some("JOHN DOE".into()),
            ..UserPatch::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(RecordStore::<User>::get(&store, jane.id).await.unwrap(), jane);
}

#[tokio::test]
async fn invalid_update_is_rejected_and_not_stored() {
    let store = MemoryStore::new();
    let created = add_user(&store, "john_doe", "John").await;
    let err = RecordStore::<User>::update(
        &store,
        created.id,
        UserPatch {
            age: Some(12),
            ..UserPatch::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
    assert_eq!(RecordStore::<User>::get(&store, created.id).await.unwrap().age, 30);
}

#[tokio::test]
async fn update_missing_is_not_found() {
    let store = MemoryStore::new();
    let err = RecordStore::<Task>::update(&store, 5, TaskPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn delete_then_get_is_not_found() {
    let store = MemoryStore::new();
    let created = add_user(&store, "john_doe", "John").await;
    RecordStore::<User>::delete(&store, created.id).await.unwrap();
    assert!(matches!(
        RecordStore::<User>::get(&store, created.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        RecordStore::<User>::delete(&store, created.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn deleting_a_user_deletes_owned_tasks() {
    let store = MemoryStore::new();
    let john = add_user(&store, "john_doe", "John").await;
    let jane = add_user(&store, "jane_smith", "Jane").await;
    let a = add_task(&store, "Complete project", john.id).await;
    let b = add_task(&store, "Write documentation", john.id).await;
    let c = add_task(&store, "Test API", jane.id).await;

    RecordStore::<User>::delete(&store, john.id).await.unwrap();

    for id in [a.id, b.id] {
        assert!(matches!(
            RecordStore::<Task>::get(&store, id).await,
            Err(AppError::NotFound(_))
        ));
    }
    assert_eq!(RecordStore::<Task>::get(&store, c.id).await.unwrap(), c);
    assert!(RecordStore::<Task>::list_owned(&store, john.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn ids_are_never_reused() {
    let store = MemoryStore::new();
    let first = add_user(&store, "john_doe", "John").await;
    RecordStore::<User>::delete(&store, first.id).await.unwrap();
    let second = add_user(&store, "john_doe", "John").await;
    assert_eq!(second.id, first.id + 1);

    RecordStore::<User>::delete_all(&store).await.unwrap();
    let third = add_user(&store, "jane_smith", "Jane").await;
    assert_eq!(third.id, second.id + 1);
}

#[tokio::test]
async fn list_pages_in_insertion_order() {
    let store = MemoryStore::new();
    assert!(RecordStore::<User>::list(&store, 0, 10).await.unwrap().is_empty());

    for name in ["alpha", "bravo", "charlie", "delta"] {
        add_user(&store, name, "Test").await;
    }
    let page = RecordStore::<User>::list(&store, 1, 2).await.unwrap();
    let names: Vec<_> = page.iter().map(|u| u.username.as_str()).collect();
    assert_eq!(names, ["bravo", "charlie"]);

    assert!(RecordStore::<User>::list(&store, 10, 10).await.unwrap().is_empty());
    assert!(RecordStore::<User>::list(&store, 0, 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_all_users_takes_their_tasks() {
    let store = MemoryStore::new();
    let john = add_user(&store, "john_doe", "John").await;
    add_task(&store, "Complete project", john.id).await;
    // Owner 42 was never a user: the weak reference is not checked.
    let orphan = add_task(&store, "Test API", 42).await;

    RecordStore::<User>::delete_all(&store).await.unwrap();

    assert_eq!(users_len(&store).await, 0);
    let tasks = RecordStore::<Task>::list(&store, 0, 10).await.unwrap();
    assert_eq!(tasks, vec![orphan]);
}

#[tokio::test]
async fn task_slugs_are_unique_too() {
    let store = MemoryStore::new();
    add_task(&store, "Test API", 1).await;
    let err = RecordStore::<Task>::create(&store, task_draft("test  api!", 2))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(store.count::<Task>(), 1);
}

#[tokio::test]
async fn users_have_no_owner_listing() {
    let store = MemoryStore::new();
    assert!(matches!(
        RecordStore::<User>::list_owned(&store, 1).await,
        Err(AppError::BadRequest(_))
    ));
}

#[tokio::test]
async fn non_ascii_names_are_transliterated() {
    let store = MemoryStore::new();
    let ivan = RecordStore::<User>::create(
        &store,
        UserDraft {
            username: "Иван".into(),
            firstname: "Иван".into(),
            lastname: "Петров".into(),
            age: 30,
        },
    )
    .await
    .unwrap();
    assert_eq!(ivan.slug, "ivan");

    let cafe = add_user(&store, "café", "Jean").await;
    assert_eq!(cafe.slug, "cafe");
    let caf = add_user(&store, "caf_", "Jean").await;
    assert_eq!(caf.slug, "caf");

    // Transliterates to an existing slug.
    let err = RecordStore::<User>::create(&store, user_draft("IVAN", "Ivan"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn punctuation_only_username_is_rejected() {
    let store = MemoryStore::new();
    let err = RecordStore::<User>::create(&store, user_draft("!!!!", "John"))
        .await
        .unwrap_err();
    match err {
        AppError::Validation { field, .. } => assert_eq!(field, "username"),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn same_username_and_firstname_reports_the_slug() {
    let store = MemoryStore::new();
    add_user(&store, "john_doe", "John").await;
    match RecordStore::<User>::create(&store, user_draft("john_doe", "John")).await {
        Err(AppError::Conflict(message)) => assert!(message.contains("slug")),
        other => panic!("expected conflict, got {other:?}"),
    }
}
