use crate::model::attendance::normalize_to_day;
use crate::model::notification::{Notification, NotificationType};
use crate::model::student::Student;
use actix_web::error::ErrorInternalServerError;
use actix_web::{web, HttpResponse, Responder};
use chrono::Local;
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use std::str::FromStr;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateNotificationRequest {
    pub student_id: u64,
    pub title: String,
    pub message: String,
    /// absence | late | general; defaults to general
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Defaults to today
    pub date: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct StudentIndexQuery {
    pub student_index: String,
}

async fn resolve_student(
    pool: &MySqlPool,
    index: &str,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>("SELECT * FROM students WHERE std_index = ?")
        .bind(index.trim())
        .fetch_optional(pool)
        .await
}

/// Post a notification to a student's parent feed
#[utoipa::path(
    post,
    path = "/notifications",
    request_body = CreateNotificationRequest,
    responses(
        (status = 201, description = "Notification created", body = Object),
        (status = 400, description = "Bad type or date")
    ),
    tag = "Notifications"
)]
pub async fn create_notification(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateNotificationRequest>,
) -> actix_web::Result<impl Responder> {
    let payload = payload.into_inner();

    let kind = match &payload.kind {
        Some(raw) => match NotificationType::from_str(raw) {
            Ok(k) => k,
            Err(_) => {
                return Ok(HttpResponse::BadRequest().json(json!({
                    "message": format!("{raw} is not a valid notification type")
                })));
            }
        },
        None => NotificationType::General,
    };

    let date = match &payload.date {
        Some(raw) => match normalize_to_day(raw) {
            Some(day) => day,
            None => {
                return Ok(HttpResponse::BadRequest()
                    .json(json!({ "message": format!("{raw} is not a valid date") })));
            }
        },
        None => Local::now().date_naive(),
    };

    let inserted = sqlx::query(
        r#"
        INSERT INTO notifications (student_id, title, message, `type`, date)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.student_id)
    .bind(&payload.title)
    .bind(&payload.message)
    .bind(kind.to_string())
    .bind(date)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to create notification");
        ErrorInternalServerError("Server error")
    })?;

    let notification =
        sqlx::query_as::<_, Notification>("SELECT * FROM notifications WHERE id = ?")
            .bind(inserted.last_insert_id())
            .fetch_one(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch created notification");
                ErrorInternalServerError("Server error")
            })?;

    Ok(HttpResponse::Created().json(json!({ "notification": notification })))
}

/// Latest notifications for a student's parent feed
#[utoipa::path(
    get,
    path = "/notifications/student",
    params(StudentIndexQuery),
    responses(
        (status = 200, description = "Up to 50 newest notifications", body = Object),
        (status = 404, description = "Student not found")
    ),
    tag = "Notifications"
)]
pub async fn by_student(
    pool: web::Data<MySqlPool>,
    query: web::Query<StudentIndexQuery>,
) -> actix_web::Result<impl Responder> {
    let student = resolve_student(pool.get_ref(), &query.student_index)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch student");
            ErrorInternalServerError("Server error")
        })?;

    let Some(student) = student else {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Student not found" })));
    };

    let notifications = sqlx::query_as::<_, Notification>(
        "SELECT * FROM notifications WHERE student_id = ? ORDER BY created_at DESC LIMIT 50",
    )
    .bind(student.id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch notifications");
        ErrorInternalServerError("Server error")
    })?;

    Ok(HttpResponse::Ok().json(json!({ "notifications": notifications })))
}

/// Unread count for the parent dashboard badge
#[utoipa::path(
    get,
    path = "/notifications/unread-count",
    params(StudentIndexQuery),
    responses(
        (status = 200, description = "Unread notification count", body = Object),
        (status = 404, description = "Student not found")
    ),
    tag = "Notifications"
)]
pub async fn unread_count(
    pool: web::Data<MySqlPool>,
    query: web::Query<StudentIndexQuery>,
) -> actix_web::Result<impl Responder> {
    let student = resolve_student(pool.get_ref(), &query.student_index)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch student");
            ErrorInternalServerError("Server error")
        })?;

    let Some(student) = student else {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Student not found" })));
    };

    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE student_id = ? AND is_read = FALSE",
    )
    .bind(student.id)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to count unread notifications");
        ErrorInternalServerError("Server error")
    })?;

    Ok(HttpResponse::Ok().json(json!({ "count": count })))
}

/// Mark one notification read
#[utoipa::path(
    put,
    path = "/notifications/{id}/read",
    params(("id", Path, description = "Notification row id")),
    responses(
        (status = 200, description = "Marked read", body = Object),
        (status = 404, description = "Notification not found")
    ),
    tag = "Notifications"
)]
pub async fn mark_read(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let notification_id = path.into_inner();

    let affected = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = ?")
        .bind(notification_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, notification_id, "Failed to mark notification read");
            ErrorInternalServerError("Server error")
        })?
        .rows_affected();

    if affected == 0 {
        return Ok(
            HttpResponse::NotFound().json(json!({ "message": "Notification not found" }))
        );
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Notification marked as read" })))
}

/// Mark every notification for a student read
#[utoipa::path(
    put,
    path = "/notifications/mark-all-read",
    params(StudentIndexQuery),
    responses(
        (status = 200, description = "Number of notifications marked", body = Object),
        (status = 404, description = "Student not found")
    ),
    tag = "Notifications"
)]
pub async fn mark_all_read(
    pool: web::Data<MySqlPool>,
    query: web::Query<StudentIndexQuery>,
) -> actix_web::Result<impl Responder> {
    let student = resolve_student(pool.get_ref(), &query.student_index)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch student");
            ErrorInternalServerError("Server error")
        })?;

    let Some(student) = student else {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Student not found" })));
    };

    let updated = sqlx::query(
        "UPDATE notifications SET is_read = TRUE WHERE student_id = ? AND is_read = FALSE",
    )
    .bind(student.id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to mark notifications read");
        ErrorInternalServerError("Server error")
    })?
    .rows_affected();

    Ok(HttpResponse::Ok().json(json!({
        "message": "All notifications marked as read",
        "updated_count": updated,
    })))
}
