//! User registration and profile management.

use crate::{
    db::DbPool,
    error::AppError,
    models::user::{CreateUserRequest, UpdateUserRequest, User},
    services::{auth_service, validation},
};

/// Contact fields shared by registration and profile update.
struct ProfileFields<'a> {
    fname: &'a str,
    lname: &'a str,
    email: &'a str,
    address: &'a str,
    postal_code: &'a str,
    country: &'a str,
    city: &'a str,
    phone_number: &'a str,
}

fn validate_profile(fields: &ProfileFields<'_>) -> Result<(), AppError> {
    validation::require_length("fname", fields.fname, 2, 50)?;
    validation::require_length("lname", fields.lname, 2, 50)?;
    validation::require_email(fields.email)?;
    validation::require_non_blank("address", fields.address)?;
    validation::require_non_blank("postal_code", fields.postal_code)?;
    validation::require_non_blank("country", fields.country)?;
    validation::require_non_blank("city", fields.city)?;
    validation::require_length("phone_number", fields.phone_number, 6, 15)?;
    Ok(())
}

/// Validate a registration request without touching the database.
pub fn validate_new_user(request: &CreateUserRequest) -> Result<(), AppError> {
    validate_profile(&ProfileFields {
        fname: &request.fname,
        lname: &request.lname,
        email: &request.email,
        address: &request.address,
        postal_code: &request.postal_code,
        country: &request.country,
        city: &request.city,
        phone_number: &request.phone_number,
    })?;
    validation::require_non_blank("password", &request.password)
}

pub fn validate_update(request: &UpdateUserRequest) -> Result<(), AppError> {
    validate_profile(&ProfileFields {
        fname: &request.fname,
        lname: &request.lname,
        email: &request.email,
        address: &request.address,
        postal_code: &request.postal_code,
        country: &request.country,
        city: &request.city,
        phone_number: &request.phone_number,
    })
}

/// Register a customer account.
///
/// New accounts are never admins; admin rights are granted in the database.
///
/// # Errors
///
/// - `InvalidRequest`: a field failed validation
/// - `EmailAlreadyExists`: the email is taken
pub async fn create_user(pool: &DbPool, request: CreateUserRequest) -> Result<User, AppError> {
    validate_new_user(&request)?;

    let email = request.email.trim().to_string();
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM app_users WHERE email = $1)")
        .bind(&email)
        .fetch_one(pool)
        .await?;
    if exists {
        return Err(AppError::EmailAlreadyExists);
    }

    let password_hash = auth_service::hash_password_async(&request.password).await?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO app_users (
            fname, lname, email, password_hash, address,
            postal_code, country, city, region, phone_number, is_admin
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, FALSE)
        RETURNING *
        "#,
    )
    .bind(request.fname.trim())
    .bind(request.lname.trim())
    .bind(&email)
    .bind(password_hash)
    .bind(request.address.trim())
    .bind(request.postal_code.trim())
    .bind(request.country.trim())
    .bind(request.city.trim())
    .bind(request.region)
    .bind(request.phone_number.trim())
    .fetch_one(pool)
    .await
    .map_err(|e| validation::unique_violation_as(e, AppError::EmailAlreadyExists))?;

    tracing::info!(user_id = user.id, "User registered");

    Ok(user)
}

pub async fn list_users(pool: &DbPool) -> Result<Vec<User>, AppError> {
    let users = sqlx::query_as::<_, User>("SELECT * FROM app_users ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(users)
}

pub async fn get_user(pool: &DbPool, user_id: i64) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM app_users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::UserNotFound)
}

pub async fn user_exists(pool: &DbPool, user_id: i64) -> Result<bool, AppError> {
    let exists = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM app_users WHERE id = $1)")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

/// Update profile fields. Password and admin flag are left untouched.
///
/// # Errors
///
/// - `UserNotFound`: no such user
/// - `EmailAlreadyExists`: the new email belongs to another account
pub async fn update_user(
    pool: &DbPool,
    user_id: i64,
    request: UpdateUserRequest,
) -> Result<User, AppError> {
    validate_update(&request)?;

    let email = request.email.trim().to_string();
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM app_users WHERE email = $1 AND id <> $2)",
    )
    .bind(&email)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    if taken {
        return Err(AppError::EmailAlreadyExists);
    }

    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE app_users
        SET fname = $1, lname = $2, email = $3, address = $4, postal_code = $5,
            country = $6, city = $7, region = $8, phone_number = $9
        WHERE id = $10
        RETURNING *
        "#,
    )
    .bind(request.fname.trim())
    .bind(request.lname.trim())
    .bind(&email)
    .bind(request.address.trim())
    .bind(request.postal_code.trim())
    .bind(request.country.trim())
    .bind(request.city.trim())
    .bind(request.region)
    .bind(request.phone_number.trim())
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| validation::unique_violation_as(e, AppError::EmailAlreadyExists))?
    .ok_or(AppError::UserNotFound)?;

    tracing::info!(user_id, "User profile updated");

    Ok(user)
}

pub async fn delete_user(pool: &DbPool, user_id: i64) -> Result<(), AppError> {
    let deleted = sqlx::query("DELETE FROM app_users WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(AppError::UserNotFound);
    }

    tracing::info!(user_id, "User deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateUserRequest {
        CreateUserRequest {
            fname: "Ada".to_string(),
            lname: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password: "secret-password".to_string(),
            address: "12 Vinyl Lane".to_string(),
            postal_code: "5611 AB".to_string(),
            country: "Netherlands".to_string(),
            city: "Eindhoven".to_string(),
            region: None,
            phone_number: "+31612345678".to_string(),
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(validate_new_user(&request()).is_ok());
    }

    #[test]
    fn short_name_and_bad_phone_are_rejected() {
        let mut short_name = request();
        short_name.fname = "A".to_string();
        assert!(validate_new_user(&short_name).is_err());

        let mut long_phone = request();
        long_phone.phone_number = "+3161234567890123".to_string();
        assert!(validate_new_user(&long_phone).is_err());
    }

    #[test]
    fn blank_password_is_rejected() {
        let mut req = request();
        req.password = " ".to_string();
        assert!(matches!(
            validate_new_user(&req),
            Err(AppError::InvalidRequest(msg)) if msg == "password is required"
        ));
    }
}
