//! RBAC resolution: User -> Role -> Privilege.

mod common;

use std::collections::HashSet;

use identity_core::models::NewRole;
use identity_core::services::RbacService;

fn names(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn resolves_exactly_the_linked_privilege_names() {
    let db = common::setup_db().await;
    let rbac = RbacService::new(db.clone());

    let role = common::create_role(&db, "Viewer").await;
    common::grant(&db, role.id, "view_dashboard").await;
    common::grant(&db, role.id, "view_reports").await;
    let user = common::create_user(&db, "Ada", role.id).await;

    let resolved = rbac.resolve_privileges(&user).await.unwrap();
    assert_eq!(resolved, names(&["view_dashboard", "view_reports"]));
}

#[tokio::test]
async fn resolution_is_insertion_order_independent() {
    let db = common::setup_db().await;
    let rbac = RbacService::new(db.clone());

    // Same privileges granted to two roles in opposite orders.
    let a = common::create_privilege(&db, "edit_users").await;
    let b = common::create_privilege(&db, "view_dashboard").await;

    let first = common::create_role(&db, "First").await;
    db.link_privilege(first.id, a.id, None).await.unwrap();
    db.link_privilege(first.id, b.id, None).await.unwrap();

    let second = common::create_role(&db, "Second").await;
    db.link_privilege(second.id, b.id, None).await.unwrap();
    db.link_privilege(second.id, a.id, None).await.unwrap();

    let from_first = rbac.privilege_names_for_role(first.id).await.unwrap();
    let from_second = rbac.privilege_names_for_role(second.id).await.unwrap();
    assert_eq!(from_first, from_second);
    assert_eq!(from_first, names(&["edit_users", "view_dashboard"]));
}

#[tokio::test]
async fn role_with_no_privileges_yields_empty_set() {
    let db = common::setup_db().await;
    let rbac = RbacService::new(db.clone());

    let role = common::create_role(&db, "Bare").await;
    let user = common::create_user(&db, "Ada", role.id).await;

    assert!(rbac.resolve_privileges(&user).await.unwrap().is_empty());
    // The role itself is still resolvable - empty is not "not found".
    assert!(rbac.role_with_privileges(role.id).await.unwrap().is_some());
}

#[tokio::test]
async fn soft_deleted_role_fails_open_to_no_access() {
    let db = common::setup_db().await;
    let rbac = RbacService::new(db.clone());

    let role = common::create_role(&db, "Viewer").await;
    common::grant(&db, role.id, "view_dashboard").await;
    let user = common::create_user(&db, "Ada", role.id).await;

    db.soft_delete_role(role.id, None).await.unwrap();

    assert!(rbac.resolve_privileges(&user).await.unwrap().is_empty());
    assert!(rbac.role_with_privileges(role.id).await.unwrap().is_none());
}

#[tokio::test]
async fn soft_deleted_privilege_is_excluded_from_resolution() {
    let db = common::setup_db().await;
    let rbac = RbacService::new(db.clone());

    let role = common::create_role(&db, "Viewer").await;
    let keep = common::grant(&db, role.id, "view_dashboard").await;
    let drop = common::grant(&db, role.id, "edit_users").await;

    db.soft_delete_privilege(drop.id, None).await.unwrap();

    let resolved = rbac.privilege_names_for_role(role.id).await.unwrap();
    assert_eq!(resolved, names(&["view_dashboard"]));
    assert!(resolved.contains(&keep.name));
}

#[tokio::test]
async fn unlinking_revokes_without_touching_the_privilege() {
    let db = common::setup_db().await;
    let rbac = RbacService::new(db.clone());

    let role = common::create_role(&db, "Viewer").await;
    let privilege = common::grant(&db, role.id, "view_dashboard").await;

    db.unlink_privilege(role.id, privilege.id, None)
        .await
        .unwrap();

    assert!(rbac
        .privilege_names_for_role(role.id)
        .await
        .unwrap()
        .is_empty());
    // The privilege row survives for other roles.
    assert!(db
        .find_privilege_by_id(privilege.id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn reassigning_the_role_changes_resolution() {
    let db = common::setup_db().await;
    let rbac = RbacService::new(db.clone());

    let viewer = common::create_role(&db, "Viewer").await;
    let dashboard = common::grant(&db, viewer.id, "view_dashboard").await;

    let admin = common::create_role(&db, "Admin").await;
    db.link_privilege(admin.id, dashboard.id, None)
        .await
        .unwrap();
    common::grant(&db, admin.id, "edit_users").await;

    let user = common::create_user(&db, "Ada", viewer.id).await;
    assert_eq!(
        rbac.resolve_privileges(&user).await.unwrap(),
        names(&["view_dashboard"])
    );

    let user = db.update_user_role(user.id, admin.id, None).await.unwrap();
    assert_eq!(
        rbac.resolve_privileges(&user).await.unwrap(),
        names(&["view_dashboard", "edit_users"])
    );
}

#[tokio::test]
async fn revoking_an_absent_grant_names_both_sides() {
    let db = common::setup_db().await;

    let role = common::create_role(&db, "Viewer").await;
    let privilege = common::create_privilege(&db, "view_dashboard").await;

    // Never granted: the error carries both ids, not a bare privilege id.
    let err = db
        .unlink_privilege(role.id, privilege.id, None)
        .await
        .unwrap_err();
    match err {
        identity_core::ServiceError::Validation(msg) => {
            assert!(msg.contains(&role.id.to_string()));
            assert!(msg.contains(&privilege.id.to_string()));
        }
        other => panic!("expected Validation, got {other:?}"),
    }

    // An unresolvable side is reported as the missing entity itself.
    let err = db
        .unlink_privilege(4242, privilege.id, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        identity_core::ServiceError::NotFound { entity: "role", .. }
    ));
}

#[tokio::test]
async fn duplicate_grant_fails_validation() {
    let db = common::setup_db().await;

    let role = common::create_role(&db, "Viewer").await;
    let privilege = common::grant(&db, role.id, "view_dashboard").await;

    let err = db
        .link_privilege(role.id, privilege.id, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        identity_core::ServiceError::Validation(_)
    ));
}

#[tokio::test]
async fn duplicate_role_name_fails_even_after_soft_delete() {
    let db = common::setup_db().await;

    let role = common::create_role(&db, "Viewer").await;
    db.soft_delete_role(role.id, None).await.unwrap();

    // The global unique index keeps the name claimed by the deleted row.
    let err = db.insert_role(&NewRole::new("Viewer"), None).await;
    assert!(matches!(
        err,
        Err(identity_core::ServiceError::Validation(_))
    ));
}
