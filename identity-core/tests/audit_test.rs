//! Audit stamping, soft-delete visibility, and hard-delete semantics.

mod common;

use identity_core::models::NewPrivilege;
use identity_core::ServiceError;

#[tokio::test]
async fn writes_record_the_acting_user() {
    let db = common::setup_db().await;

    let role = common::create_role(&db, "Admin").await;
    let admin = common::create_user(&db, "Ada", role.id).await;

    let privilege = db
        .insert_privilege(&NewPrivilege::new("user:read"), Some(admin.id))
        .await
        .unwrap();
    assert_eq!(privilege.audit.created_by, Some(admin.id));
    assert_eq!(privilege.audit.updated_by, Some(admin.id));
    assert!(privilege.audit.deleted_at.is_none());

    let other = common::create_user(&db, "Ben", role.id).await;
    let updated = db
        .update_privilege_description(privilege.id, Some("read any user"), Some(other.id))
        .await
        .unwrap();
    // Creation attribution survives later edits.
    assert_eq!(updated.audit.created_by, Some(admin.id));
    assert_eq!(updated.audit.updated_by, Some(other.id));
    assert!(updated.audit.updated_at >= privilege.audit.updated_at);
}

#[tokio::test]
async fn anonymous_writes_leave_attribution_null() {
    let db = common::setup_db().await;

    let privilege = common::create_privilege(&db, "seeded").await;
    assert_eq!(privilege.audit.created_by, None);
    assert_eq!(privilege.audit.updated_by, None);
}

#[tokio::test]
async fn soft_deleted_rows_stay_visible_to_audit_reads() {
    let db = common::setup_db().await;

    let role = common::create_role(&db, "Admin").await;
    let admin = common::create_user(&db, "Ada", role.id).await;
    let privilege = common::create_privilege(&db, "user:read").await;

    db.soft_delete_privilege(privilege.id, Some(admin.id))
        .await
        .unwrap();

    assert!(db
        .find_privilege_by_id(privilege.id)
        .await
        .unwrap()
        .is_none());

    let retained = db
        .find_privilege_by_id_including_deleted(privilege.id)
        .await
        .unwrap()
        .unwrap();
    assert!(retained.audit.is_deleted());
    assert_eq!(retained.audit.updated_by, Some(admin.id));
    assert_eq!(retained.name, "user:read");
}

#[tokio::test]
async fn soft_deleting_twice_reports_not_found() {
    let db = common::setup_db().await;

    let privilege = common::create_privilege(&db, "user:read").await;
    db.soft_delete_privilege(privilege.id, None).await.unwrap();

    let err = db
        .soft_delete_privilege(privilege.id, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::NotFound {
            entity: "privilege",
            ..
        }
    ));
}

#[tokio::test]
async fn soft_deleted_user_remains_readable_for_attribution() {
    let db = common::setup_db().await;

    let role = common::create_role(&db, "Viewer").await;
    let user = common::create_user(&db, "Ada", role.id).await;

    db.soft_delete_user(user.id, None).await.unwrap();

    assert!(db.find_user_by_id(user.id).await.unwrap().is_none());
    let retained = db
        .find_user_by_id_including_deleted(user.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(retained.first_name, "Ada");
    assert!(retained.audit.is_deleted());
}

#[tokio::test]
async fn hard_deleting_a_privilege_drops_its_grants() {
    let db = common::setup_db().await;

    let role = common::create_role(&db, "Editor").await;
    let privilege = common::grant(&db, role.id, "doc:write").await;

    db.hard_delete_privilege(privilege.id).await.unwrap();

    let grants = db.find_role_privileges(role.id).await.unwrap();
    assert!(grants.is_empty());
    assert!(db
        .find_privilege_by_id_including_deleted(privilege.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn updates_touch_only_live_rows() {
    let db = common::setup_db().await;

    let role = common::create_role(&db, "Viewer").await;
    let user = common::create_user(&db, "Ada", role.id).await;
    db.soft_delete_user(user.id, None).await.unwrap();

    let err = db.set_user_active(user.id, false, None).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { entity: "user", .. }));
}

#[tokio::test]
async fn deactivation_flips_the_flag_without_deleting() {
    let db = common::setup_db().await;

    let role = common::create_role(&db, "Viewer").await;
    let user = common::create_user(&db, "Ada", role.id).await;
    assert!(user.is_active);

    let updated = db.set_user_active(user.id, false, None).await.unwrap();
    assert!(!updated.is_active);
    assert!(updated.audit.deleted_at.is_none());

    // Deactivated is not deleted: default reads still see the row.
    assert!(db.find_user_by_id(user.id).await.unwrap().is_some());
}
