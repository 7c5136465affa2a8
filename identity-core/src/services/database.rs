//! Data-access layer over the identity/RBAC schema.
//!
//! All reads filter out soft-deleted rows unless the method name says
//! otherwise; all writes refresh the audit columns. Mutations take the
//! acting user's id (`actor`) for attribution, `None` for system writes.

use chrono::Utc;
use sqlx::sqlite::SqlitePool;
use validator::Validate;

use crate::models::{
    NewPrivilege, NewRole, NewUser, NewUserAuth, NewUserIdentity, Privilege, Role, RolePrivilege,
    User, UserAuth, UserIdentity,
};
use crate::services::error::{Result, ServiceError};

/// Database wrapper owning the connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database wrapper from a connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ==================== Privilege Operations ====================

    /// Insert a new privilege. A duplicate name fails validation.
    pub async fn insert_privilege(
        &self,
        new: &NewPrivilege,
        actor: Option<i64>,
    ) -> Result<Privilege> {
        new.validate()?;
        let now = Utc::now();
        sqlx::query_as::<_, Privilege>(
            r#"
            INSERT INTO privilege (name, description, created_at, updated_at, created_by, updated_by)
            VALUES (?1, ?2, ?3, ?3, ?4, ?4)
            RETURNING *
            "#,
        )
        .bind(&new.name)
        .bind(&new.description)
        .bind(now)
        .bind(actor)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ServiceError::from_write(e, "privilege name"))
    }

    /// Find a non-deleted privilege by ID.
    pub async fn find_privilege_by_id(&self, id: i64) -> Result<Option<Privilege>> {
        sqlx::query_as::<_, Privilege>(
            "SELECT * FROM privilege WHERE id = ?1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(ServiceError::Database)
    }

    /// Find a privilege by ID regardless of deletion state (audit views).
    pub async fn find_privilege_by_id_including_deleted(
        &self,
        id: i64,
    ) -> Result<Option<Privilege>> {
        sqlx::query_as::<_, Privilege>("SELECT * FROM privilege WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(ServiceError::Database)
    }

    /// Find a non-deleted privilege by name.
    pub async fn find_privilege_by_name(&self, name: &str) -> Result<Option<Privilege>> {
        sqlx::query_as::<_, Privilege>(
            "SELECT * FROM privilege WHERE name = ?1 AND deleted_at IS NULL",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(ServiceError::Database)
    }

    /// List all non-deleted privileges.
    pub async fn list_privileges(&self) -> Result<Vec<Privilege>> {
        sqlx::query_as::<_, Privilege>("SELECT * FROM privilege WHERE deleted_at IS NULL")
            .fetch_all(&self.pool)
            .await
            .map_err(ServiceError::Database)
    }

    /// Update a privilege's description.
    pub async fn update_privilege_description(
        &self,
        id: i64,
        description: Option<&str>,
        actor: Option<i64>,
    ) -> Result<Privilege> {
        sqlx::query_as::<_, Privilege>(
            r#"
            UPDATE privilege
            SET description = ?1, updated_at = ?2, updated_by = ?3
            WHERE id = ?4 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(description)
        .bind(Utc::now())
        .bind(actor)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("privilege", id))
    }

    /// Soft-delete a privilege. The name stays claimed by the deleted row.
    pub async fn soft_delete_privilege(&self, id: i64, actor: Option<i64>) -> Result<()> {
        self.soft_delete("privilege", id, actor).await
    }

    /// Hard-delete a privilege. Join rows in role_privilege go with it.
    pub async fn hard_delete_privilege(&self, id: i64) -> Result<()> {
        self.hard_delete("privilege", id).await
    }

    // ==================== Role Operations ====================

    /// Insert a new role. A duplicate name fails validation.
    pub async fn insert_role(&self, new: &NewRole, actor: Option<i64>) -> Result<Role> {
        new.validate()?;
        let now = Utc::now();
        sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO role (name, description, created_at, updated_at, created_by, updated_by)
            VALUES (?1, ?2, ?3, ?3, ?4, ?4)
            RETURNING *
            "#,
        )
        .bind(&new.name)
        .bind(&new.description)
        .bind(now)
        .bind(actor)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ServiceError::from_write(e, "role name"))
    }

    /// Find a non-deleted role by ID.
    pub async fn find_role_by_id(&self, id: i64) -> Result<Option<Role>> {
        sqlx::query_as::<_, Role>("SELECT * FROM role WHERE id = ?1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(ServiceError::Database)
    }

    /// Find a role by ID regardless of deletion state (audit views).
    pub async fn find_role_by_id_including_deleted(&self, id: i64) -> Result<Option<Role>> {
        sqlx::query_as::<_, Role>("SELECT * FROM role WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(ServiceError::Database)
    }

    /// Find a non-deleted role by name.
    pub async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        sqlx::query_as::<_, Role>("SELECT * FROM role WHERE name = ?1 AND deleted_at IS NULL")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(ServiceError::Database)
    }

    /// Update a role's description.
    pub async fn update_role_description(
        &self,
        id: i64,
        description: Option<&str>,
        actor: Option<i64>,
    ) -> Result<Role> {
        sqlx::query_as::<_, Role>(
            r#"
            UPDATE role
            SET description = ?1, updated_at = ?2, updated_by = ?3
            WHERE id = ?4 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(description)
        .bind(Utc::now())
        .bind(actor)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("role", id))
    }

    /// Soft-delete a role.
    pub async fn soft_delete_role(&self, id: i64, actor: Option<i64>) -> Result<()> {
        self.soft_delete("role", id, actor).await
    }

    /// Hard-delete a role. Fails with a referential integrity error while
    /// any user still references it (RESTRICT).
    pub async fn hard_delete_role(&self, id: i64) -> Result<()> {
        self.hard_delete("role", id).await
    }

    // ==================== Role-Privilege Operations ====================

    /// Grant a privilege to a role. Both sides must resolve to non-deleted
    /// rows; granting the same privilege twice fails validation.
    pub async fn link_privilege(
        &self,
        role_id: i64,
        privilege_id: i64,
        actor: Option<i64>,
    ) -> Result<RolePrivilege> {
        self.find_role_by_id(role_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("role", role_id))?;
        self.find_privilege_by_id(privilege_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("privilege", privilege_id))?;

        let now = Utc::now();
        sqlx::query_as::<_, RolePrivilege>(
            r#"
            INSERT INTO role_privilege (role_id, privilege_id, created_at, updated_at, created_by, updated_by)
            VALUES (?1, ?2, ?3, ?3, ?4, ?4)
            RETURNING *
            "#,
        )
        .bind(role_id)
        .bind(privilege_id)
        .bind(now)
        .bind(actor)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ServiceError::from_write(e, "role-privilege pair"))
    }

    /// Revoke a privilege from a role by soft-deleting the join row. Both
    /// sides must resolve to non-deleted rows; revoking a grant that does
    /// not exist fails validation naming both ids.
    pub async fn unlink_privilege(
        &self,
        role_id: i64,
        privilege_id: i64,
        actor: Option<i64>,
    ) -> Result<()> {
        self.find_role_by_id(role_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("role", role_id))?;
        self.find_privilege_by_id(privilege_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("privilege", privilege_id))?;

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE role_privilege
            SET deleted_at = ?1, updated_at = ?1, updated_by = ?2
            WHERE role_id = ?3 AND privilege_id = ?4 AND deleted_at IS NULL
            "#,
        )
        .bind(now)
        .bind(actor)
        .bind(role_id)
        .bind(privilege_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::Validation(format!(
                "privilege {privilege_id} is not granted to role {role_id}"
            )));
        }
        Ok(())
    }

    /// List the active join rows of a role.
    pub async fn find_role_privileges(&self, role_id: i64) -> Result<Vec<RolePrivilege>> {
        sqlx::query_as::<_, RolePrivilege>(
            "SELECT * FROM role_privilege WHERE role_id = ?1 AND deleted_at IS NULL",
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await
        .map_err(ServiceError::Database)
    }

    // ==================== User Operations ====================

    /// Insert a new user. The assigned role must resolve to a non-deleted
    /// row.
    pub async fn insert_user(&self, new: &NewUser, actor: Option<i64>) -> Result<User> {
        new.validate()?;
        self.find_role_by_id(new.role_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("role", new.role_id))?;

        let now = Utc::now();
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO "user" (first_name, last_name, job_title, gender, dob, profile_image_url,
                                is_active, role_id, created_at, updated_at, created_by, updated_by)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?8, ?8, ?9, ?9)
            RETURNING *
            "#,
        )
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.job_title)
        .bind(new.gender.map(|g| g.as_str()))
        .bind(new.dob)
        .bind(&new.profile_image_url)
        .bind(new.role_id)
        .bind(now)
        .bind(actor)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ServiceError::from_write(e, "user"))
    }

    /// Find a non-deleted user by ID.
    pub async fn find_user_by_id(&self, id: i64) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(r#"SELECT * FROM "user" WHERE id = ?1 AND deleted_at IS NULL"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(ServiceError::Database)
    }

    /// Find a user by ID regardless of deletion state (audit views).
    pub async fn find_user_by_id_including_deleted(&self, id: i64) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(r#"SELECT * FROM "user" WHERE id = ?1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(ServiceError::Database)
    }

    /// Reassign a user to another role.
    pub async fn update_user_role(
        &self,
        user_id: i64,
        role_id: i64,
        actor: Option<i64>,
    ) -> Result<User> {
        self.find_role_by_id(role_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("role", role_id))?;
        sqlx::query_as::<_, User>(
            r#"
            UPDATE "user"
            SET role_id = ?1, updated_at = ?2, updated_by = ?3
            WHERE id = ?4 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(role_id)
        .bind(Utc::now())
        .bind(actor)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("user", user_id))
    }

    /// Activate or deactivate a user.
    pub async fn set_user_active(
        &self,
        user_id: i64,
        is_active: bool,
        actor: Option<i64>,
    ) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE "user"
            SET is_active = ?1, updated_at = ?2, updated_by = ?3
            WHERE id = ?4 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(is_active)
        .bind(Utc::now())
        .bind(actor)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("user", user_id))
    }

    /// Soft-delete a user. The credential and identity rows stay in place;
    /// only a hard delete cascades into them.
    pub async fn soft_delete_user(&self, id: i64, actor: Option<i64>) -> Result<()> {
        self.soft_delete("user", id, actor).await
    }

    /// Hard-delete a user. Cascades into user_auth and user_identity;
    /// audit-attribution references elsewhere are set to NULL.
    pub async fn hard_delete_user(&self, id: i64) -> Result<()> {
        self.hard_delete("user", id).await
    }

    // ==================== User Auth Operations ====================

    /// Insert the credential record for a user. Exactly one is allowed per
    /// user and usernames are globally unique; violating either fails
    /// validation.
    pub async fn insert_user_auth(&self, new: &NewUserAuth, actor: Option<i64>) -> Result<UserAuth> {
        new.validate()?;
        self.find_user_by_id(new.user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("user", new.user_id))?;

        let now = Utc::now();
        sqlx::query_as::<_, UserAuth>(
            r#"
            INSERT INTO user_auth (user_id, username, password_hash, wrong_password_count,
                                   created_at, updated_at, created_by, updated_by)
            VALUES (?1, ?2, ?3, 0, ?4, ?4, ?5, ?5)
            RETURNING *
            "#,
        )
        .bind(new.user_id)
        .bind(&new.username)
        .bind(&new.password_hash)
        .bind(now)
        .bind(actor)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ServiceError::from_write(e, "user_auth"))
    }

    /// Find a non-deleted credential record by ID.
    pub async fn find_user_auth_by_id(&self, id: i64) -> Result<Option<UserAuth>> {
        sqlx::query_as::<_, UserAuth>(
            "SELECT * FROM user_auth WHERE id = ?1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(ServiceError::Database)
    }

    /// Find the credential record of a user.
    pub async fn find_user_auth_by_user_id(&self, user_id: i64) -> Result<Option<UserAuth>> {
        sqlx::query_as::<_, UserAuth>(
            "SELECT * FROM user_auth WHERE user_id = ?1 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(ServiceError::Database)
    }

    /// Find a credential record by username.
    pub async fn find_user_auth_by_username(&self, username: &str) -> Result<Option<UserAuth>> {
        sqlx::query_as::<_, UserAuth>(
            "SELECT * FROM user_auth WHERE username = ?1 AND deleted_at IS NULL",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(ServiceError::Database)
    }

    /// Replace the stored password hash (produced by the external hashing
    /// collaborator).
    pub async fn update_password_hash(
        &self,
        auth_id: i64,
        password_hash: &str,
        actor: Option<i64>,
    ) -> Result<UserAuth> {
        sqlx::query_as::<_, UserAuth>(
            r#"
            UPDATE user_auth
            SET password_hash = ?1, updated_at = ?2, updated_by = ?3
            WHERE id = ?4 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(password_hash)
        .bind(Utc::now())
        .bind(actor)
        .bind(auth_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("user_auth", auth_id))
    }

    /// Soft-delete a credential record.
    pub async fn soft_delete_user_auth(&self, id: i64, actor: Option<i64>) -> Result<()> {
        self.soft_delete("user_auth", id, actor).await
    }

    // ==================== User Identity Operations ====================

    /// Insert a new identity. The (type, value, oauth_provider) triple must
    /// not collide with any existing row; `oauth_provider` is required for
    /// OAuth identities and rejected for the other types.
    pub async fn insert_user_identity(
        &self,
        new: &NewUserIdentity,
        actor: Option<i64>,
    ) -> Result<UserIdentity> {
        new.validate()?;
        match (new.identity_type, &new.oauth_provider) {
            (crate::models::IdentityType::Oauth, None) => {
                return Err(ServiceError::Validation(
                    "oauth identity requires oauth_provider".into(),
                ));
            }
            (crate::models::IdentityType::Email | crate::models::IdentityType::Mobile, Some(_)) => {
                return Err(ServiceError::Validation(
                    "oauth_provider is only valid for oauth identities".into(),
                ));
            }
            _ => {}
        }
        self.find_user_by_id(new.user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("user", new.user_id))?;

        let now = Utc::now();
        sqlx::query_as::<_, UserIdentity>(
            r#"
            INSERT INTO user_identity (user_id, type, value, is_verified, is_primary, oauth_provider,
                                       wrong_otp_count, created_at, updated_at, created_by, updated_by)
            VALUES (?1, ?2, ?3, 0, 0, ?4, 0, ?5, ?5, ?6, ?6)
            RETURNING *
            "#,
        )
        .bind(new.user_id)
        .bind(new.identity_type.as_str())
        .bind(&new.value)
        .bind(&new.oauth_provider)
        .bind(now)
        .bind(actor)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ServiceError::from_write(e, "identity"))
    }

    /// Find a non-deleted identity by ID.
    pub async fn find_user_identity_by_id(&self, id: i64) -> Result<Option<UserIdentity>> {
        sqlx::query_as::<_, UserIdentity>(
            "SELECT * FROM user_identity WHERE id = ?1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(ServiceError::Database)
    }

    /// List the non-deleted identities of a user.
    pub async fn find_identities_for_user(&self, user_id: i64) -> Result<Vec<UserIdentity>> {
        sqlx::query_as::<_, UserIdentity>(
            "SELECT * FROM user_identity WHERE user_id = ?1 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(ServiceError::Database)
    }

    /// Look up the identity claiming a given channel value.
    pub async fn find_user_identity_by_value(
        &self,
        identity_type: crate::models::IdentityType,
        value: &str,
        oauth_provider: Option<&str>,
    ) -> Result<Option<UserIdentity>> {
        sqlx::query_as::<_, UserIdentity>(
            r#"
            SELECT * FROM user_identity
            WHERE type = ?1 AND value = ?2
              AND COALESCE(oauth_provider, '') = COALESCE(?3, '')
              AND deleted_at IS NULL
            "#,
        )
        .bind(identity_type.as_str())
        .bind(value)
        .bind(oauth_provider)
        .fetch_optional(&self.pool)
        .await
        .map_err(ServiceError::Database)
    }

    /// Soft-delete an identity.
    pub async fn soft_delete_user_identity(&self, id: i64, actor: Option<i64>) -> Result<()> {
        self.soft_delete("user_identity", id, actor).await
    }

    // ==================== Shared Helpers ====================

    async fn soft_delete(&self, table: &'static str, id: i64, actor: Option<i64>) -> Result<()> {
        let now = Utc::now();
        let sql = format!(
            r#"UPDATE "{table}" SET deleted_at = ?1, updated_at = ?1, updated_by = ?2
               WHERE id = ?3 AND deleted_at IS NULL"#
        );
        let result = sqlx::query(&sql)
            .bind(now)
            .bind(actor)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound { entity: table, id });
        }
        tracing::debug!(table, id, "soft-deleted row");
        Ok(())
    }

    async fn hard_delete(&self, table: &'static str, id: i64) -> Result<()> {
        let sql = format!(r#"DELETE FROM "{table}" WHERE id = ?1"#);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| ServiceError::from_write(e, table))?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound { entity: table, id });
        }
        tracing::debug!(table, id, "hard-deleted row");
        Ok(())
    }
}
