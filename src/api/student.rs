use crate::auth::password::{generate_password, hash_password, verify_password};
use crate::auth::role::RoleGuard;
use crate::config::Config;
use crate::model::student::{next_index_code, parse_row_id, Student};
use crate::model::validate::{self, FieldErrors};
use crate::notify::{channels, normalize_phone};
use crate::utils::db_utils::{build_update_sql, execute_update, is_duplicate_key};
use crate::utils::{section_cache, uploads};
use actix_multipart::form::{tempfile::TempFile, text::Text, MultipartForm};
use actix_web::error::ErrorInternalServerError;
use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

const UPDATABLE_COLUMNS: &[&str] = &[
    "name",
    "std_index",
    "section",
    "parent_name",
    "parent_phone",
    "email",
    "profile_pic",
];

#[derive(Debug, Deserialize, IntoParams)]
pub struct StudentQuery {
    /// Filter by class section, e.g. "10A"
    pub section: Option<String>,
}

#[derive(MultipartForm)]
pub struct CreateStudentForm {
    pub name: Text<String>,
    pub section: Text<String>,
    pub parent_name: Text<String>,
    pub parent_phone: Text<String>,
    pub email: Text<String>,
    /// "true" skips the duplicate email/phone check for siblings
    pub is_sibling: Option<Text<String>>,
    #[multipart(limit = "5MB")]
    pub profile_pic: Option<TempFile>,
}

#[derive(MultipartForm)]
pub struct UpdateStudentForm {
    pub name: Option<Text<String>>,
    pub std_index: Option<Text<String>>,
    pub section: Option<Text<String>>,
    pub parent_name: Option<Text<String>>,
    pub parent_phone: Option<Text<String>>,
    pub email: Option<Text<String>>,
    #[multipart(limit = "5MB")]
    pub profile_pic: Option<TempFile>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Student index code for parents, e.g. "S0001"
    pub user_id: String,
    pub password: String,
}

pub(crate) async fn find_student(
    pool: &MySqlPool,
    param: &str,
) -> Result<Option<Student>, sqlx::Error> {
    match parse_row_id(param) {
        Some(id) => {
            sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = ?")
                .bind(id)
                .fetch_optional(pool)
                .await
        }
        None => {
            sqlx::query_as::<_, Student>("SELECT * FROM students WHERE std_index = ?")
                .bind(param.trim())
                .fetch_optional(pool)
                .await
        }
    }
}

async fn last_index_code(pool: &MySqlPool) -> Result<Option<String>, sqlx::Error> {
    // zero padding keeps lexicographic MAX equal to numeric max
    sqlx::query_scalar::<_, Option<String>>("SELECT MAX(std_index) FROM students")
        .fetch_one(pool)
        .await
}

/// List students, optionally by section
#[utoipa::path(
    get,
    path = "/students",
    params(StudentQuery),
    responses(
        (status = 200, description = "Students sorted by name", body = Object),
        (status = 500, description = "Internal server error")
    ),
    tag = "Students"
)]
pub async fn list_students(
    pool: web::Data<MySqlPool>,
    query: web::Query<StudentQuery>,
) -> actix_web::Result<impl Responder> {
    let students = match &query.section {
        Some(section) => {
            sqlx::query_as::<_, Student>(
                "SELECT * FROM students WHERE section = ? ORDER BY name",
            )
            .bind(section)
            .fetch_all(pool.get_ref())
            .await
        }
        None => {
            sqlx::query_as::<_, Student>("SELECT * FROM students ORDER BY name")
                .fetch_all(pool.get_ref())
                .await
        }
    }
    .map_err(|e| {
        error!(error = %e, "Failed to fetch students");
        ErrorInternalServerError("Server error")
    })?;

    Ok(HttpResponse::Ok().json(json!({ "students": students })))
}

/// Register a student (multipart, optional profile picture)
#[utoipa::path(
    post,
    path = "/students",
    responses(
        (status = 201, description = "Student created, credentials emailed to the parent", body = Object),
        (status = 400, description = "Field validation failed"),
        (status = 403, description = "Teachers cannot add students"),
        (status = 409, description = "Duplicate email, phone or index"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Students"
)]
pub async fn create_student(
    guard: RoleGuard,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    form: MultipartForm<CreateStudentForm>,
) -> actix_web::Result<impl Responder> {
    guard.forbid_teacher("add students")?;

    let form = form.into_inner();
    let name = form.name.trim().to_string();
    let section = form.section.trim().to_string();
    let parent_name = form.parent_name.trim().to_string();
    let email = form.email.trim().to_string();

    let raw_phone: String = form
        .parent_phone
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let parent_phone =
        normalize_phone(&raw_phone, &config.default_country_code).unwrap_or_default();

    let mut errors = FieldErrors::default();
    errors.check(
        validate::valid_name(&name),
        format!("{name} is not a valid Name! Must start with a capital letter."),
    );
    errors.check(
        validate::valid_section(&section),
        format!("{section} is not a valid Class Section! Must be a number followed by an uppercase letter (e.g. 1A)."),
    );
    errors.check(
        validate::valid_name(&parent_name),
        format!("{parent_name} is not a valid Parent Name! Must start with a capital letter."),
    );
    errors.check(
        validate::valid_phone(&parent_phone),
        format!("{raw_phone} is not a valid Phone Number!"),
    );
    errors.check(
        validate::valid_email(&email),
        format!("{email} is not a valid Email Address!"),
    );
    if let Some(message) = errors.into_message() {
        return Ok(HttpResponse::BadRequest().json(json!({ "message": message })));
    }

    let is_sibling = form
        .is_sibling
        .as_ref()
        .map(|v| v.0 == "true")
        .unwrap_or(false);

    if !is_sibling {
        let email_taken =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM students WHERE email = ?")
                .bind(&email)
                .fetch_one(pool.get_ref())
                .await
                .map_err(|e| {
                    error!(error = %e, "Duplicate email check failed");
                    ErrorInternalServerError("Server error")
                })?;
        if email_taken > 0 {
            return Ok(HttpResponse::Conflict().json(json!({
                "message": "Student with this email already exists. Is this a sibling?"
            })));
        }

        let phone_taken =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM students WHERE parent_phone = ?")
                .bind(&parent_phone)
                .fetch_one(pool.get_ref())
                .await
                .map_err(|e| {
                    error!(error = %e, "Duplicate phone check failed");
                    ErrorInternalServerError("Server error")
                })?;
        if phone_taken > 0 {
            return Ok(HttpResponse::Conflict().json(json!({
                "message": "Student with this phone number already exists. Is this a sibling?"
            })));
        }
    }

    let last = last_index_code(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to read last index code");
        ErrorInternalServerError("Server error")
    })?;
    let std_index = next_index_code(last.as_deref());

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
        INSERT INTO students
            (name, std_index, section, parent_name, parent_phone, email, password_hash, profile_pic)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&name)
    .bind(&std_index)
    .bind(&section)
    .bind(&parent_name)
    .bind(&parent_phone)
    .bind(&email)
    .bind(&password_hash)
    .bind(&profile_pic)
    .execute(pool.get_ref())
    .await;

    let inserted = match result {
        Ok(res) => res,
        Err(e) if is_duplicate_key(&e) => {
            return Ok(HttpResponse::Conflict().json(json!({
                "message": "Student with this index number already exists"
            })));
        }
        Err(e) => {
            error!(error = %e, "Failed to create student");
            return Err(ErrorInternalServerError("Server error"));
        }
    };

    let student = sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = ?")
        .bind(inserted.last_insert_id())
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch created student");
            ErrorInternalServerError("Server error")
        })?;

    // best effort, never blocks registration
    channels::send_email(
        &config,
        Some(&email),
        "Parent Portal Access - CMB Smart Alert",
        &format!(
            "Welcome to CMB International College Smart Alert System.\n\n\
             Your child {name} has been registered.\n\n\
             Parent Portal Credentials:\nUser ID: {std_index}\nPassword: {password}\n\n\
             Please use these credentials to log in as a Parent."
        ),
    )
    .await;

    section_cache::invalidate_sections().await;

    Ok(HttpResponse::Created().json(json!({ "student": student })))
}

/// Next auto-generated index code
#[utoipa::path(
    get,
    path = "/students/next-index",
    responses((status = 200, description = "Next free index code", body = Object)),
    tag = "Students"
)]
pub async fn next_index(pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let last = last_index_code(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to read last index code");
        ErrorInternalServerError("Server error")
    })?;

    Ok(HttpResponse::Ok().json(json!({ "next_index": next_index_code(last.as_deref()) })))
}

/// Fetch a student by row id or index code
#[utoipa::path(
    get,
    path = "/students/{id}",
    params(("id", Path, description = "Row id or S#### index code")),
    responses(
        (status = 200, description = "Student found", body = Student),
        (status = 404, description = "Student not found")
    ),
    tag = "Students"
)]
pub async fn get_student(
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let param = path.into_inner();

    let student = find_student(pool.get_ref(), &param).await.map_err(|e| {
        error!(error = %e, param, "Failed to fetch student");
        ErrorInternalServerError("Server error")
    })?;

    match student {
        Some(student) => Ok(HttpResponse::Ok().json(json!({ "student": student }))),
        None => Ok(HttpResponse::NotFound().json(json!({ "message": "Student not found" }))),
    }
}

/// Update a student (multipart, partial)
#[utoipa::path(
    put,
    path = "/students/{id}",
    params(("id", Path, description = "Student row id")),
    responses(
        (status = 200, description = "Updated student", body = Object),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Teachers cannot update student details"),
        (status = 404, description = "Student not found"),
        (status = 409, description = "Duplicate email or index")
    ),
    tag = "Students"
)]
pub async fn update_student(
    guard: RoleGuard,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    form: MultipartForm<UpdateStudentForm>,
) -> actix_web::Result<impl Responder> {
    guard.forbid_teacher("update student details")?;

    let student_id = path.into_inner();
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
    if let Some(index) = &form.std_index {
        let index = index.trim();
        errors.check(
            validate::valid_index(index),
            format!("{index} is not a valid Student Index! Must be 'S' followed by 4 digits (e.g. S1234)."),
        );
        changes.insert("std_index".into(), json!(index));
    }
    if let Some(section) = &form.section {
        let section = section.trim();
        errors.check(
            validate::valid_section(section),
            format!("{section} is not a valid Class Section! Must be a number followed by an uppercase letter (e.g. 1A)."),
        );
        changes.insert("section".into(), json!(section));
    }
    if let Some(parent_name) = &form.parent_name {
        let parent_name = parent_name.trim();
        errors.check(
            validate::valid_name(parent_name),
            format!("{parent_name} is not a valid Parent Name! Must start with a capital letter."),
        );
        changes.insert("parent_name".into(), json!(parent_name));
    }
    if let Some(phone) = &form.parent_phone {
        let raw: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
        let normalized = normalize_phone(&raw, &config.default_country_code).unwrap_or_default();
        errors.check(
            validate::valid_phone(&normalized),
            format!("{raw} is not a valid Phone Number!"),
        );
        changes.insert("parent_phone".into(), json!(normalized));
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

    if let Some(file) = &form.profile_pic {
        let stored = uploads::persist_upload(file, &config.upload_dir).map_err(|e| {
            error!(error = %e, "Failed to store profile picture");
            ErrorInternalServerError("Server error")
        })?;
        changes.insert("profile_pic".into(), json!(stored));
    }

    let update = build_update_sql(
        "students",
        &serde_json::Value::Object(changes),
        UPDATABLE_COLUMNS,
        "id",
        student_id,
    )?;

    let affected = match execute_update(pool.get_ref(), update).await {
        Ok(n) => n,
        Err(e) if is_duplicate_key(&e) => {
            // std_index carries the only unique key on students
            return Ok(HttpResponse::Conflict().json(json!({
                "message": "Student with this index number already exists"
            })));
        }
        Err(e) => {
            error!(error = %e, student_id, "Failed to update student");
            return Err(ErrorInternalServerError("Server error"));
        }
    };

    if affected == 0 {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Student not found" })));
    }

    let student = sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = ?")
        .bind(student_id)
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, student_id, "Failed to fetch updated student");
            ErrorInternalServerError("Server error")
        })?;

    section_cache::invalidate_sections().await;

    Ok(HttpResponse::Ok().json(json!({ "student": student })))
}

/// Delete a student by row id or index code
#[utoipa::path(
    delete,
    path = "/students/{id}",
    params(("id", Path, description = "Row id or S#### index code")),
    responses(
        (status = 200, description = "Deleted student", body = Object),
        (status = 403, description = "Teachers cannot delete students"),
        (status = 404, description = "Student not found")
    ),
    tag = "Students"
)]
pub async fn delete_student(
    guard: RoleGuard,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    guard.forbid_teacher("delete students")?;

    let param = path.into_inner();

    let student = find_student(pool.get_ref(), &param).await.map_err(|e| {
        error!(error = %e, param, "Failed to fetch student");
        ErrorInternalServerError("Server error")
    })?;

    let Some(student) = student else {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Student not found" })));
    };

    sqlx::query("DELETE FROM students WHERE id = ?")
        .bind(student.id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, student_id = student.id, "Failed to delete student");
            ErrorInternalServerError("Server error")
        })?;

    section_cache::invalidate_sections().await;

    Ok(HttpResponse::Ok().json(json!({ "student": student })))
}

/// Parent login with index code + password
#[utoipa::path(
    post,
    path = "/students/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = Object),
        (status = 401, description = "Invalid credentials"),
        (status = 404, description = "Student index not found")
    ),
    tag = "Students"
)]
pub async fn login_parent(
    pool: web::Data<MySqlPool>,
    payload: web::Json<LoginRequest>,
) -> actix_web::Result<impl Responder> {
    let student = sqlx::query_as::<_, Student>("SELECT * FROM students WHERE std_index = ?")
        .bind(payload.user_id.trim())
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Parent login lookup failed");
            ErrorInternalServerError("Login failed")
        })?;

    let Some(student) = student else {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Student Index not found" })));
    };

    if !verify_password(&payload.password, &student.password_hash) {
        return Ok(HttpResponse::Unauthorized().json(json!({ "message": "Invalid credentials" })));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Login successful", "student": student })))
}
