use crate::config::Config;
use crate::model::attendance::normalize_to_day;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::model::student::Student;
use crate::utils::uploads;
use actix_multipart::form::{tempfile::TempFile, text::Text, MultipartForm};
use actix_web::error::ErrorInternalServerError;
use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use std::str::FromStr;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

#[derive(MultipartForm)]
pub struct SubmitLeaveForm {
    pub student_index: Text<String>,
    /// "YYYY-MM-DD"
    pub leave_date: Text<String>,
    pub reason: Text<String>,
    /// Optional medical certificate or similar
    #[multipart(limit = "10MB")]
    pub document: Option<TempFile>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct LeaveListQuery {
    /// pending | accepted | rejected
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AcceptedLeaveQuery {
    pub student_index: String,
    pub date: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AcceptedForDateQuery {
    pub date: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ReviewRequest {
    /// Name shown in the review trail; defaults to "Teacher"
    pub reviewed_by: Option<String>,
    /// Only used when rejecting
    pub rejection_reason: Option<String>,
}

async fn fetch_request(pool: &MySqlPool, id: u64) -> Result<Option<LeaveRequest>, sqlx::Error> {
    sqlx::query_as::<_, LeaveRequest>("SELECT * FROM leave_requests WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Submit a leave request (multipart, optional document)
#[utoipa::path(
    post,
    path = "/leave-requests",
    responses(
        (status = 201, description = "Request submitted", body = Object),
        (status = 400, description = "Bad date"),
        (status = 404, description = "Student index not found"),
        (status = 409, description = "Pending request already exists for this date")
    ),
    tag = "Leave Requests"
)]
pub async fn submit_leave(
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    form: MultipartForm<SubmitLeaveForm>,
) -> actix_web::Result<impl Responder> {
    let form = form.into_inner();
    let student_index = form.student_index.trim().to_string();
    let reason = form.reason.trim().to_string();

    let Some(leave_date) = normalize_to_day(&form.leave_date) else {
        return Ok(HttpResponse::BadRequest()
            .json(json!({ "message": format!("{} is not a valid date", form.leave_date.0) })));
    };

    let student = sqlx::query_as::<_, Student>("SELECT * FROM students WHERE std_index = ?")
        .bind(&student_index)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch student");
            ErrorInternalServerError("Server error")
        })?;

    let Some(student) = student else {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Student not found" })));
    };

    let pending = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM leave_requests WHERE student_index = ? AND leave_date = ? AND status = 'pending'",
    )
    .bind(&student_index)
    .bind(leave_date)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Pending request check failed");
        ErrorInternalServerError("Server error")
    })?;

    if pending > 0 {
        return Ok(HttpResponse::Conflict().json(json!({
            "message": "A pending leave request already exists for this date"
        })));
    }

    let document_path = match &form.document {
        Some(file) => Some(uploads::persist_upload(file, &config.upload_dir).map_err(|e| {
            error!(error = %e, "Failed to store leave document");
            ErrorInternalServerError("Server error")
        })?),
        None => None,
    };

    let inserted = sqlx::query(
        r#"
        INSERT INTO leave_requests
            (student_index, student_name, parent_phone, leave_date, reason, document_path, status)
        VALUES (?, ?, ?, ?, ?, ?, 'pending')
        "#,
    )
    .bind(&student.std_index)
    .bind(&student.name)
    .bind(&student.parent_phone)
    .bind(leave_date)
    .bind(&reason)
    .bind(&document_path)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to submit leave request");
        ErrorInternalServerError("Server error")
    })?;

    let request = fetch_request(pool.get_ref(), inserted.last_insert_id())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch created request");
            ErrorInternalServerError("Server error")
        })?;

    Ok(HttpResponse::Created()
        .json(json!({ "message": "Leave request submitted", "request": request })))
}

/// List leave requests, newest first
#[utoipa::path(
    get,
    path = "/leave-requests",
    params(LeaveListQuery),
    responses(
        (status = 200, description = "Requests, optionally filtered by status", body = Object),
        (status = 400, description = "Unknown status filter")
    ),
    tag = "Leave Requests"
)]
pub async fn list_leave(
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveListQuery>,
) -> actix_web::Result<impl Responder> {
    let requests = match &query.status {
        Some(status) => {
            if LeaveStatus::from_str(status).is_err() {
                return Ok(HttpResponse::BadRequest()
                    .json(json!({ "message": format!("{status} is not a valid status") })));
            }
            sqlx::query_as::<_, LeaveRequest>(
                "SELECT * FROM leave_requests WHERE status = ? ORDER BY created_at DESC",
            )
            .bind(status)
            .fetch_all(pool.get_ref())
            .await
        }
        None => {
            sqlx::query_as::<_, LeaveRequest>(
                "SELECT * FROM leave_requests ORDER BY created_at DESC",
            )
            .fetch_all(pool.get_ref())
            .await
        }
    }
    .map_err(|e| {
        error!(error = %e, "Failed to fetch leave requests");
        ErrorInternalServerError("Server error")
    })?;

    Ok(HttpResponse::Ok().json(json!({ "requests": requests })))
}

/// Count of requests awaiting review, for the dashboard badge
#[utoipa::path(
    get,
    path = "/leave-requests/pending-count",
    responses((status = 200, description = "Pending request count", body = Object)),
    tag = "Leave Requests"
)]
pub async fn pending_count(pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM leave_requests WHERE status = 'pending'",
    )
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to count pending requests");
        ErrorInternalServerError("Server error")
    })?;

    Ok(HttpResponse::Ok().json(json!({ "count": count })))
}

/// Accepted request for one student on one date, if any. The attendance
/// register uses this to pre-mark the day as Excused.
#[utoipa::path(
    get,
    path = "/leave-requests/accepted-leave",
    params(AcceptedLeaveQuery),
    responses(
        (status = 200, description = "Accepted request or null", body = Object),
        (status = 400, description = "Bad date")
    ),
    tag = "Leave Requests"
)]
pub async fn accepted_leave(
    pool: web::Data<MySqlPool>,
    query: web::Query<AcceptedLeaveQuery>,
) -> actix_web::Result<impl Responder> {
    let Some(date) = normalize_to_day(&query.date) else {
        return Ok(HttpResponse::BadRequest()
            .json(json!({ "message": format!("{} is not a valid date", query.date) })));
    };

    let request = sqlx::query_as::<_, LeaveRequest>(
        "SELECT * FROM leave_requests WHERE student_index = ? AND leave_date = ? AND status = 'accepted'",
    )
    .bind(query.student_index.trim())
    .bind(date)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch accepted request");
        ErrorInternalServerError("Server error")
    })?;

    Ok(HttpResponse::Ok().json(json!({ "leave_request": request })))
}

/// All accepted requests covering one date
#[utoipa::path(
    get,
    path = "/leave-requests/accepted-for-date",
    params(AcceptedForDateQuery),
    responses(
        (status = 200, description = "Accepted requests for the date", body = Object),
        (status = 400, description = "Bad date")
    ),
    tag = "Leave Requests"
)]
pub async fn accepted_for_date(
    pool: web::Data<MySqlPool>,
    query: web::Query<AcceptedForDateQuery>,
) -> actix_web::Result<impl Responder> {
    let Some(date) = normalize_to_day(&query.date) else {
        return Ok(HttpResponse::BadRequest()
            .json(json!({ "message": format!("{} is not a valid date", query.date) })));
    };

    let requests = sqlx::query_as::<_, LeaveRequest>(
        "SELECT * FROM leave_requests WHERE leave_date = ? AND status = 'accepted'",
    )
    .bind(date)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch accepted requests");
        ErrorInternalServerError("Server error")
    })?;

    Ok(HttpResponse::Ok().json(json!({ "leave_requests": requests })))
}

/// Accept a leave request
#[utoipa::path(
    put,
    path = "/leave-requests/{id}/accept",
    params(("id", Path, description = "Leave request row id")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Accepted request", body = Object),
        (status = 404, description = "Request not found")
    ),
    tag = "Leave Requests"
)]
pub async fn accept_leave(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<ReviewRequest>,
) -> actix_web::Result<impl Responder> {
    let request_id = path.into_inner();
    let reviewed_by = payload
        .reviewed_by
        .clone()
        .unwrap_or_else(|| "Teacher".to_string());

    let affected = sqlx::query(
        "UPDATE leave_requests SET status = 'accepted', reviewed_by = ?, reviewed_at = NOW(), rejection_reason = NULL WHERE id = ?",
    )
    .bind(&reviewed_by)
    .bind(request_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, request_id, "Failed to accept leave request");
        ErrorInternalServerError("Server error")
    })?
    .rows_affected();

    if affected == 0 {
        return Ok(
            HttpResponse::NotFound().json(json!({ "message": "Leave request not found" }))
        );
    }

    let request = fetch_request(pool.get_ref(), request_id).await.map_err(|e| {
        error!(error = %e, request_id, "Failed to fetch accepted request");
        ErrorInternalServerError("Server error")
    })?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Leave request accepted", "request": request })))
}

/// Reject a leave request
#[utoipa::path(
    put,
    path = "/leave-requests/{id}/reject",
    params(("id", Path, description = "Leave request row id")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Rejected request", body = Object),
        (status = 404, description = "Request not found")
    ),
    tag = "Leave Requests"
)]
pub async fn reject_leave(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<ReviewRequest>,
) -> actix_web::Result<impl Responder> {
    let request_id = path.into_inner();
    let reviewed_by = payload
        .reviewed_by
        .clone()
        .unwrap_or_else(|| "Teacher".to_string());
    let rejection_reason = payload
        .rejection_reason
        .clone()
        .unwrap_or_else(|| "No reason provided".to_string());

    let affected = sqlx::query(
        "UPDATE leave_requests SET status = 'rejected', reviewed_by = ?, reviewed_at = NOW(), rejection_reason = ? WHERE id = ?",
    )
    .bind(&reviewed_by)
    .bind(&rejection_reason)
    .bind(request_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, request_id, "Failed to reject leave request");
        ErrorInternalServerError("Server error")
    })?
    .rows_affected();

    if affected == 0 {
        return Ok(
            HttpResponse::NotFound().json(json!({ "message": "Leave request not found" }))
        );
    }

    let request = fetch_request(pool.get_ref(), request_id).await.map_err(|e| {
        error!(error = %e, request_id, "Failed to fetch rejected request");
        ErrorInternalServerError("Server error")
    })?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Leave request rejected", "request": request })))
}

/// Clear the pending queue
#[utoipa::path(
    delete,
    path = "/leave-requests/pending/all",
    responses((status = 200, description = "Number of requests removed", body = Object)),
    tag = "Leave Requests"
)]
pub async fn delete_pending(pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let deleted = sqlx::query("DELETE FROM leave_requests WHERE status = 'pending'")
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to clear pending requests");
            ErrorInternalServerError("Server error")
        })?
        .rows_affected();

    Ok(HttpResponse::Ok().json(json!({
        "message": "Pending leave requests cleared",
        "deleted_count": deleted,
    })))
}
