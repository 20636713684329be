use crate::auth::password::{generate_password, hash_password, verify_password};
use crate::auth::role::RoleGuard;
use crate::config::Config;
use crate::model::student::parse_row_id;
use crate::model::teacher::{next_teacher_code, Teacher};
use crate::model::validate::{self, FieldErrors};
use crate::notify::{channels, normalize_phone};
use crate::utils::db_utils::{build_update_sql, execute_update, is_duplicate_key};
use crate::utils::uploads;
use actix_multipart::form::{tempfile::TempFile, text::Text, MultipartForm};
use actix_web::error::ErrorInternalServerError;
use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

const UPDATABLE_COLUMNS: &[&str] = &[
    "name",
    "teacher_code",
    "subject",
    "phone",
    "email",
    "profile_pic",
];

#[derive(MultipartForm)]
pub struct CreateTeacherForm {
    pub name: Text<String>,
    pub subject: Text<String>,
    pub phone: Text<String>,
    pub email: Text<String>,
    #[multipart(limit = "5MB")]
    pub profile_pic: Option<TempFile>,
}

#[derive(MultipartForm)]
pub struct UpdateTeacherForm {
    pub name: Option<Text<String>>,
    pub teacher_code: Option<Text<String>>,
    pub subject: Option<Text<String>>,
    pub phone: Option<Text<String>>,
    pub email: Option<Text<String>>,
    #[multipart(limit = "5MB")]
    pub profile_pic: Option<TempFile>,
}

#[derive(Deserialize, ToSchema)]
pub struct TeacherLoginRequest {
    /// Teacher code, e.g. "TCH001"
    pub user_id: String,
    pub password: String,
}

async fn find_teacher(pool: &MySqlPool, param: &str) -> Result<Option<Teacher>, sqlx::Error> {
    match parse_row_id(param) {
        Some(id) => {
            sqlx::query_as::<_, Teacher>("SELECT * FROM teachers WHERE id = ?")
                .bind(id)
                .fetch_optional(pool)
                .await
        }
        None => {
            sqlx::query_as::<_, Teacher>("SELECT * FROM teachers WHERE teacher_code = ?")
                .bind(param.trim())
                .fetch_optional(pool)
                .await
        }
    }
}

/// Email must be unique across both account tables; the two 409 messages let
/// the frontend say which table had the hit. On update the teacher's own row
/// is excluded so resubmitting an unchanged email passes.
async fn email_in_use(
    pool: &MySqlPool,
    email: &str,
    exclude_teacher_id: Option<u64>,
) -> Result<Option<&'static str>, sqlx::Error> {
    let teacher_hits = match exclude_teacher_id {
        Some(id) => {
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM teachers WHERE email = ? AND id <> ?",
            )
            .bind(email)
            .bind(id)
            .fetch_one(pool)
            .await?
        }
        None => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM teachers WHERE email = ?")
                .bind(email)
                .fetch_one(pool)
                .await?
        }
    };

    let student_hits =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM students WHERE email = ?")
            .bind(email)
            .fetch_one(pool)
            .await?;

    Ok(email_conflict_message(teacher_hits, student_hits))
}

fn email_conflict_message(teacher_hits: i64, student_hits: i64) -> Option<&'static str> {
    if teacher_hits > 0 {
        Some("A teacher with this email already exists")
    } else if student_hits > 0 {
        Some("This email is already registered to a student account")
    } else {
        None
    }
}

/// List all teachers
#[utoipa::path(
    get,
    path = "/teachers",
    responses((status = 200, description = "Teachers sorted by name", body = Object)),
    tag = "Teachers"
)]
pub async fn list_teachers(pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let teachers = sqlx::query_as::<_, Teacher>("SELECT * FROM teachers ORDER BY name")
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch teachers");
            ErrorInternalServerError("Server error")
        })?;

    Ok(HttpResponse::Ok().json(json!({ "teachers": teachers })))
}

/// Register a teacher (multipart, optional profile picture)
#[utoipa::path(
    post,
    path = "/teachers",
    responses(
        (status = 201, description = "Teacher created, credentials emailed", body = Object),
        (status = 400, description = "Field validation failed"),
        (status = 403, description = "Teachers cannot add teacher accounts"),
        (status = 409, description = "Duplicate email or teacher code"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Teachers"
)]
pub async fn create_teacher(
    guard: RoleGuard,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    form: MultipartForm<CreateTeacherForm>,
) -> actix_web::Result<impl Responder> {
    guard.forbid_teacher("add teacher accounts")?;

    let form = form.into_inner();
    let name = form.name.trim().to_string();
    let subject = form.subject.trim().to_string();
    let email = form.email.trim().to_string();

    let raw_phone: String = form
        .phone
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let phone = normalize_phone(&raw_phone, &config.default_country_code).unwrap_or_default();

    let mut errors = FieldErrors::default();
    errors.check(
        validate::valid_name(&name),
        format!("{name} is not a valid Name! Must start with a capital letter."),
    );
    errors.check(!subject.is_empty(), "Subject is required".to_string());
    errors.check(
        validate::valid_phone(&phone),
        format!("{raw_phone} is not a valid Phone Number!"),
    );
    errors.check(
        validate::valid_email(&email),
        format!("{email} is not a valid Email Address!"),
    );
    if let Some(message) = errors.into_message() {
        return Ok(HttpResponse::BadRequest().json(json!({ "message": message })));
    }

    if let Some(message) = email_in_use(pool.get_ref(), &email, None).await.map_err(|e| {
        error!(error = %e, "Duplicate email check failed");
        ErrorInternalServerError("Server error")
    })? {
        return Ok(HttpResponse::Conflict().json(json!({ "message": message })));
    }

    let last =
        sqlx::query_scalar::<_, Option<String>>("SELECT MAX(teacher_code) FROM teachers")
            .fetch_one(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to read last teacher code");
                ErrorInternalServerError("Server error")
            })?;
    let teacher_code = next_teacher_code(last.as_deref());

    let password = generate_password(8);
    let password_hash = hash_password(&password);

    let profile_pic = match &form.profile_pic {
        Some(file) => Some(uploads::persist_upload(file, &config.upload_dir).map_err(|e| {
            error!(error = %e, "Failed to store profile picture");
            ErrorInternalServerError("Server error")
        })?),
        None => None,
    };

    let result = sqlx::query(
        r#"
        INSERT INTO teachers (name, teacher_code, subject, phone, email, password_hash, profile_pic)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&name)
    .bind(&teacher_code)
    .bind(&subject)
    .bind(&phone)
    .bind(&email)
    .bind(&password_hash)
    .bind(&profile_pic)
    .execute(pool.get_ref())
    .await;

    let inserted = match result {
        Ok(res) => res,
        Err(e) if is_duplicate_key(&e) => {
            return Ok(HttpResponse::Conflict().json(json!({
                "message": "Teacher with this code or email already exists"
            })));
        }
        Err(e) => {
            error!(error = %e, "Failed to create teacher");
            return Err(ErrorInternalServerError("Server error"));
        }
    };

    let teacher = sqlx::query_as::<_, Teacher>("SELECT * FROM teachers WHERE id = ?")
        .bind(inserted.last_insert_id())
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch created teacher");
            ErrorInternalServerError("Server error")
        })?;

    channels::send_email(
        &config,
        Some(&email),
        "Teacher Portal Access - CMB Smart Alert",
        &format!(
            "Welcome to CMB International College Smart Alert System.\n\n\
             Your teacher account has been created.\n\n\
             Teacher Portal Credentials:\nUser ID: {teacher_code}\nPassword: {password}\n\n\
             Please use these credentials to log in as a Teacher."
        ),
    )
    .await;

    Ok(HttpResponse::Created().json(json!({ "teacher": teacher })))
}

/// Next auto-generated teacher code
#[utoipa::path(
    get,
    path = "/teachers/next-id",
    responses((status = 200, description = "Next free teacher code", body = Object)),
    tag = "Teachers"
)]
pub async fn next_id(pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let last =
        sqlx::query_scalar::<_, Option<String>>("SELECT MAX(teacher_code) FROM teachers")
            .fetch_one(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to read last teacher code");
                ErrorInternalServerError("Server error")
            })?;

    Ok(HttpResponse::Ok().json(json!({ "next_id": next_teacher_code(last.as_deref()) })))
}

/// Fetch a teacher by row id or teacher code
#[utoipa::path(
    get,
    path = "/teachers/{id}",
    params(("id", Path, description = "Row id or TCH### code")),
    responses(
        (status = 200, description = "Teacher found", body = Teacher),
        (status = 404, description = "Teacher not found")
    ),
    tag = "Teachers"
)]
pub async fn get_teacher(
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let param = path.into_inner();

    let teacher = find_teacher(pool.get_ref(), &param).await.map_err(|e| {
        error!(error = %e, param, "Failed to fetch teacher");
        ErrorInternalServerError("Server error")
    })?;

    match teacher {
        Some(teacher) => Ok(HttpResponse::Ok().json(json!({ "teacher": teacher }))),
        None => Ok(HttpResponse::NotFound().json(json!({ "message": "Teacher not found" }))),
    }
}

/// Update a teacher (multipart, partial)
#[utoipa::path(
    put,
    path = "/teachers/{id}",
    params(("id", Path, description = "Teacher row id")),
    responses(
        (status = 200, description = "Updated teacher", body = Object),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Teachers cannot update teacher accounts"),
        (status = 404, description = "Teacher not found"),
        (status = 409, description = "Duplicate email or code")
    ),
    tag = "Teachers"
)]
pub async fn update_teacher(
    guard: RoleGuard,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    form: MultipartForm<UpdateTeacherForm>,
) -> actix_web::Result<impl Responder> {
    guard.forbid_teacher("update teacher accounts")?;

    let teacher_id = path.into_inner();
    let form = form.into_inner();

    let mut errors = FieldErrors::default();
    let mut changes = serde_json::Map::new();

    if let Some(name) = &form.name {
        let name = name.trim();
        errors.check(
            validate::valid_name(name),
            format!("{name} is not a valid Name! Must start with a capital letter."),
        );
        changes.insert("name".into(), json!(name));
    }
    if let Some(code) = &form.teacher_code {
        let code = code.trim();
        errors.check(
            validate::valid_teacher_code(code),
            format!("{code} is not a valid Teacher Code! Must be 'TCH' followed by 3 digits (e.g. TCH001)."),
        );
        changes.insert("teacher_code".into(), json!(code));
    }
    if let Some(subject) = &form.subject {
        let subject = subject.trim();
        errors.check(!subject.is_empty(), "Subject is required".to_string());
        changes.insert("subject".into(), json!(subject));
    }
    if let Some(phone) = &form.phone {
        let raw: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
        let normalized = normalize_phone(&raw, &config.default_country_code).unwrap_or_default();
        errors.check(
            validate::valid_phone(&normalized),
            format!("{raw} is not a valid Phone Number!"),
        );
        changes.insert("phone".into(), json!(normalized));
    }
    if let Some(email) = &form.email {
        let email = email.trim();
        errors.check(
            validate::valid_email(email),
            format!("{email} is not a valid Email Address!"),
        );
        changes.insert("email".into(), json!(email));
    }
    if let Some(message) = errors.into_message() {
        return Ok(HttpResponse::BadRequest().json(json!({ "message": message })));
    }

    // a changed email must still be free in both account tables
    if let Some(serde_json::Value::String(email)) = changes.get("email") {
        if let Some(message) = email_in_use(pool.get_ref(), email, Some(teacher_id))
            .await
            .map_err(|e| {
                error!(error = %e, "Duplicate email check failed");
                ErrorInternalServerError("Server error")
            })?
        {
            return Ok(HttpResponse::Conflict().json(json!({ "message": message })));
        }
    }

    if let Some(file) = &form.profile_pic {
        let stored = uploads::persist_upload(file, &config.upload_dir).map_err(|e| {
            error!(error = %e, "Failed to store profile picture");
            ErrorInternalServerError("Server error")
        })?;
        changes.insert("profile_pic".into(), json!(stored));
    }

    let update = build_update_sql(
        "teachers",
        &serde_json::Value::Object(changes),
        UPDATABLE_COLUMNS,
        "id",
        teacher_id,
    )?;

    let affected = match execute_update(pool.get_ref(), update).await {
        Ok(n) => n,
        Err(e) if is_duplicate_key(&e) => {
            return Ok(HttpResponse::Conflict().json(json!({
                "message": "Teacher with this code or email already exists"
            })));
        }
        Err(e) => {
            error!(error = %e, teacher_id, "Failed to update teacher");
            return Err(ErrorInternalServerError("Server error"));
        }
    };

    if affected == 0 {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Teacher not found" })));
    }

    let teacher = sqlx::query_as::<_, Teacher>("SELECT * FROM teachers WHERE id = ?")
        .bind(teacher_id)
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, teacher_id, "Failed to fetch updated teacher");
            ErrorInternalServerError("Server error")
        })?;

    Ok(HttpResponse::Ok().json(json!({ "teacher": teacher })))
}

/// Delete a teacher by row id or code
#[utoipa::path(
    delete,
    path = "/teachers/{id}",
    params(("id", Path, description = "Row id or TCH### code")),
    responses(
        (status = 200, description = "Deleted teacher", body = Object),
        (status = 403, description = "Teachers cannot delete teacher accounts"),
        (status = 404, description = "Teacher not found")
    ),
    tag = "Teachers"
)]
pub async fn delete_teacher(
    guard: RoleGuard,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    guard.forbid_teacher("delete teacher accounts")?;

    let param = path.into_inner();

    let teacher = find_teacher(pool.get_ref(), &param).await.map_err(|e| {
        error!(error = %e, param, "Failed to fetch teacher");
        ErrorInternalServerError("Server error")
    })?;

    let Some(teacher) = teacher else {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Teacher not found" })));
    };

    sqlx::query("DELETE FROM teachers WHERE id = ?")
        .bind(teacher.id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, teacher_id = teacher.id, "Failed to delete teacher");
            ErrorInternalServerError("Server error")
        })?;

    Ok(HttpResponse::Ok().json(json!({ "teacher": teacher })))
}

/// Teacher login with code + password
#[utoipa::path(
    post,
    path = "/teachers/login",
    request_body = TeacherLoginRequest,
    responses(
        (status = 200, description = "Login successful", body = Object),
        (status = 401, description = "Invalid credentials"),
        (status = 404, description = "Teacher code not found")
    ),
    tag = "Teachers"
)]
pub async fn login_teacher(
    pool: web::Data<MySqlPool>,
    payload: web::Json<TeacherLoginRequest>,
) -> actix_web::Result<impl Responder> {
    let teacher = sqlx::query_as::<_, Teacher>("SELECT * FROM teachers WHERE teacher_code = ?")
        .bind(payload.user_id.trim())
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Teacher login lookup failed");
            ErrorInternalServerError("Login failed")
        })?;

    let Some(teacher) = teacher else {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Teacher ID not found" })));
    };

    if !verify_password(&payload.password, &teacher.password_hash) {
        return Ok(HttpResponse::Unauthorized().json(json!({ "message": "Invalid credentials" })));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Login successful", "teacher": teacher })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_conflicts_name_the_owning_table() {
        assert_eq!(
            email_conflict_message(1, 0),
            Some("A teacher with this email already exists")
        );
        assert_eq!(
            email_conflict_message(0, 2),
            Some("This email is already registered to a student account")
        );
        // a teacher hit wins when both tables match
        assert_eq!(
            email_conflict_message(1, 1),
            Some("A teacher with this email already exists")
        );
        assert_eq!(email_conflict_message(0, 0), None);
    }
}
