use crate::api::student::find_student;
use crate::config::Config;
use crate::model::attendance::{normalize_to_day, AttendanceRecord, AttendanceStatus};
use crate::model::student::Student;
use crate::notify;
use crate::utils::db_utils::{build_update_sql, execute_update, is_duplicate_key};
use actix_web::error::ErrorInternalServerError;
use actix_web::{web, HttpResponse, Responder};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use std::str::FromStr;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

const UPDATABLE_COLUMNS: &[&str] = &["status", "justification", "notified_parent", "date"];

pub(crate) const RECORD_COLUMNS: &str = r#"
    SELECT a.id, a.student_id, a.date, a.status, a.justification, a.notified_parent,
           s.name AS student_name, s.std_index, s.section
    FROM attendance a
    JOIN students s ON s.id = a.student_id
"#;

#[derive(Debug, Deserialize, IntoParams)]
pub struct AttendanceQuery {
    pub section: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct MarkAttendanceRequest {
    pub student_id: Option<u64>,
    /// Alternative to student_id
    pub std_index: Option<String>,
    /// "YYYY-MM-DD" or an RFC 3339 timestamp; defaults to today
    pub date: Option<String>,
    /// Defaults to "Present"
    pub status: Option<String>,
    pub notified_parent: Option<bool>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateAttendanceRequest {
    pub status: Option<String>,
    pub justification: Option<String>,
    pub notified_parent: Option<bool>,
    pub date: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ParentViewRequest {
    pub student_index: String,
}

#[derive(Deserialize, ToSchema)]
pub struct NotifyItem {
    pub student_id: u64,
    pub status: String,
    /// Defaults to today
    pub date: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct NotifyParentsRequest {
    pub items: Vec<NotifyItem>,
}

async fn fetch_record(pool: &MySqlPool, id: u64) -> Result<Option<AttendanceRecord>, sqlx::Error> {
    sqlx::query_as::<_, AttendanceRecord>(&format!("{RECORD_COLUMNS} WHERE a.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// List attendance records, newest first
#[utoipa::path(
    get,
    path = "/attendance",
    params(AttendanceQuery),
    responses((status = 200, description = "Records joined with student details", body = Object)),
    tag = "Attendance"
)]
pub async fn list_attendance(
    pool: web::Data<MySqlPool>,
    query: web::Query<AttendanceQuery>,
) -> actix_web::Result<impl Responder> {
    let records = match &query.section {
        Some(section) => {
            sqlx::query_as::<_, AttendanceRecord>(&format!(
                "{RECORD_COLUMNS} WHERE s.section = ? ORDER BY a.date DESC, a.id DESC"
            ))
            .bind(section)
            .fetch_all(pool.get_ref())
            .await
        }
        None => {
            sqlx::query_as::<_, AttendanceRecord>(&format!(
                "{RECORD_COLUMNS} ORDER BY a.date DESC, a.id DESC"
            ))
            .fetch_all(pool.get_ref())
            .await
        }
    }
    .map_err(|e| {
        error!(error = %e, "Failed to fetch attendance");
        ErrorInternalServerError("Server error")
    })?;

    Ok(HttpResponse::Ok().json(json!({ "records": records })))
}

/// Mark attendance for one student on one day
#[utoipa::path(
    post,
    path = "/attendance",
    request_body = MarkAttendanceRequest,
    responses(
        (status = 200, description = "Attendance recorded", body = Object),
        (status = 400, description = "Bad date or status"),
        (status = 404, description = "Student not found"),
        (status = 409, description = "Already marked for this student on this date")
    ),
    tag = "Attendance"
)]
pub async fn mark_attendance(
    pool: web::Data<MySqlPool>,
    payload: web::Json<MarkAttendanceRequest>,
) -> actix_web::Result<impl Responder> {
    let payload = payload.into_inner();

    let student = match (payload.student_id, &payload.std_index) {
        (Some(id), _) => find_student(pool.get_ref(), &id.to_string()).await,
        (None, Some(index)) => find_student(pool.get_ref(), index).await,
        (None, None) => {
            return Ok(HttpResponse::BadRequest()
                .json(json!({ "message": "student_id or std_index is required" })));
        }
    }
    .map_err(|e| {
        error!(error = %e, "Failed to resolve student");
        ErrorInternalServerError("Server error")
    })?;

    let Some(student) = student else {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Student not found" })));
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

    let status_text = payload.status.as_deref().unwrap_or("Present");
    let status = match AttendanceStatus::from_str(status_text) {
        Ok(s) => s,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": format!("{status_text} is not a valid attendance status")
            })));
        }
    };

    let result = sqlx::query(
        r#"
        INSERT INTO attendance (student_id, date, status, notified_parent)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(student.id)
    .bind(date)
    .bind(status.to_string())
    .bind(payload.notified_parent.unwrap_or(false))
    .execute(pool.get_ref())
    .await;

    let inserted = match result {
        Ok(res) => res,
        Err(e) if is_duplicate_key(&e) => {
            return Ok(HttpResponse::Conflict().json(json!({
                "message": "Attendance already marked for this student on this date"
            })));
        }
        Err(e) => {
            error!(error = %e, student_id = student.id, "Failed to mark attendance");
            return Err(ErrorInternalServerError("Server error"));
        }
    };

    let record = fetch_record(pool.get_ref(), inserted.last_insert_id())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch created record");
            ErrorInternalServerError("Server error")
        })?;

    Ok(HttpResponse::Ok().json(json!({ "record": record })))
}

/// Everything a parent dashboard needs in one call
#[utoipa::path(
    post,
    path = "/attendance/parent-view",
    request_body = ParentViewRequest,
    responses(
        (status = 200, description = "Student profile plus full and today's records", body = Object),
        (status = 404, description = "Student not found")
    ),
    tag = "Attendance"
)]
pub async fn parent_view(
    pool: web::Data<MySqlPool>,
    payload: web::Json<ParentViewRequest>,
) -> actix_web::Result<impl Responder> {
    let student = sqlx::query_as::<_, Student>("SELECT * FROM students WHERE std_index = ?")
        .bind(payload.student_index.trim())
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch student");
            ErrorInternalServerError("Server error")
        })?;

    let Some(student) = student else {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Student not found" })));
    };

    let all_records = sqlx::query_as::<_, AttendanceRecord>(&format!(
        "{RECORD_COLUMNS} WHERE a.student_id = ? ORDER BY a.date DESC, a.id DESC"
    ))
    .bind(student.id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch attendance history");
        ErrorInternalServerError("Server error")
    })?;

    let today = Local::now().date_naive();
    let today_records: Vec<&AttendanceRecord> =
        all_records.iter().filter(|r| r.date == today).collect();

    Ok(HttpResponse::Ok().json(json!({
        "students": [student],
        "all_records": all_records,
        "today_records": today_records,
    })))
}

/// Attendance history for one student
#[utoipa::path(
    get,
    path = "/attendance/student/{id}",
    params(("id", Path, description = "Row id or S#### index code")),
    responses(
        (status = 200, description = "Records newest first", body = Object),
        (status = 404, description = "Student not found")
    ),
    tag = "Attendance"
)]
pub async fn by_student(
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let param = path.into_inner();

    let student = find_student(pool.get_ref(), &param).await.map_err(|e| {
        error!(error = %e, param, "Failed to fetch student");
        ErrorInternalServerError("Server error")
    })?;

    let Some(student) = student else {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Student not found" })));
    };

    let records = sqlx::query_as::<_, AttendanceRecord>(&format!(
        "{RECORD_COLUMNS} WHERE a.student_id = ? ORDER BY a.date DESC, a.id DESC"
    ))
    .bind(student.id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch attendance history");
        ErrorInternalServerError("Server error")
    })?;

    Ok(HttpResponse::Ok().json(json!({ "student": student, "records": records })))
}

/// Partially update an attendance record
#[utoipa::path(
    put,
    path = "/attendance/{id}",
    params(("id", Path, description = "Attendance row id")),
    request_body = UpdateAttendanceRequest,
    responses(
        (status = 200, description = "Updated record", body = Object),
        (status = 400, description = "Bad date or status"),
        (status = 404, description = "Record not found"),
        (status = 409, description = "Another record already covers that date")
    ),
    tag = "Attendance"
)]
pub async fn update_attendance(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateAttendanceRequest>,
) -> actix_web::Result<impl Responder> {
    let record_id = path.into_inner();
    let payload = payload.into_inner();

    let mut changes = serde_json::Map::new();

    if let Some(status) = &payload.status {
        if AttendanceStatus::from_str(status).is_err() {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": format!("{status} is not a valid attendance status")
            })));
        }
        changes.insert("status".into(), json!(status));
    }
    if let Some(justification) = &payload.justification {
        changes.insert("justification".into(), json!(justification.trim()));
    }
    if let Some(notified) = payload.notified_parent {
        changes.insert("notified_parent".into(), json!(notified));
    }
    if let Some(raw) = &payload.date {
        let Some(day) = normalize_to_day(raw) else {
            return Ok(HttpResponse::BadRequest()
                .json(json!({ "message": format!("{raw} is not a valid date") })));
        };
        changes.insert("date".into(), json!(day.to_string()));
    }

    let update = build_update_sql(
        "attendance",
        &serde_json::Value::Object(changes),
        UPDATABLE_COLUMNS,
        "id",
        record_id,
    )?;

    let affected = match execute_update(pool.get_ref(), update).await {
        Ok(n) => n,
        Err(e) if is_duplicate_key(&e) => {
            return Ok(HttpResponse::Conflict().json(json!({
                "message": "Attendance already marked for this student on this date"
            })));
        }
        Err(e) => {
            error!(error = %e, record_id, "Failed to update attendance");
            return Err(ErrorInternalServerError("Server error"));
        }
    };

    if affected == 0 {
        return Ok(
            HttpResponse::NotFound().json(json!({ "message": "Attendance record not found" }))
        );
    }

    let record = fetch_record(pool.get_ref(), record_id).await.map_err(|e| {
        error!(error = %e, record_id, "Failed to fetch updated record");
        ErrorInternalServerError("Server error")
    })?;

    Ok(HttpResponse::Ok().json(json!({ "record": record })))
}

/// Delete an attendance record
#[utoipa::path(
    delete,
    path = "/attendance/{id}",
    params(("id", Path, description = "Attendance row id")),
    responses(
        (status = 200, description = "Deleted record", body = Object),
        (status = 404, description = "Record not found")
    ),
    tag = "Attendance"
)]
pub async fn delete_attendance(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let record_id = path.into_inner();

    let record = fetch_record(pool.get_ref(), record_id).await.map_err(|e| {
        error!(error = %e, record_id, "Failed to fetch record");
        ErrorInternalServerError("Server error")
    })?;

    let Some(record) = record else {
        return Ok(
            HttpResponse::NotFound().json(json!({ "message": "Attendance record not found" }))
        );
    };

    sqlx::query("DELETE FROM attendance WHERE id = ?")
        .bind(record_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, record_id, "Failed to delete record");
            ErrorInternalServerError("Server error")
        })?;

    Ok(HttpResponse::Ok().json(json!({ "record": record })))
}

/// Fan alerts out to parents for a batch of attendance entries
#[utoipa::path(
    post,
    path = "/attendance/notify-parents",
    request_body = NotifyParentsRequest,
    responses(
        (status = 200, description = "Per-student dispatch outcome", body = Object),
        (status = 400, description = "Empty batch")
    ),
    tag = "Attendance"
)]
pub async fn notify_parents(
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<NotifyParentsRequest>,
) -> actix_web::Result<impl Responder> {
    let items = payload.into_inner().items;
    if items.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({ "message": "No students provided" })));
    }

    let mut succeeded: Vec<u64> = Vec::new();
    let mut failed: Vec<serde_json::Value> = Vec::new();
    let mut resolved: Vec<(Student, NaiveDate, String)> = Vec::new();

    for item in &items {
        let date = match &item.date {
            Some(raw) => match normalize_to_day(raw) {
                Some(day) => day,
                None => {
                    failed.push(json!({
                        "student_id": item.student_id,
                        "error": format!("{raw} is not a valid date"),
                    }));
                    continue;
                }
            },
            None => Local::now().date_naive(),
        };

        let student = sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = ?")
            .bind(item.student_id)
            .fetch_optional(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, student_id = item.student_id, "Failed to fetch student");
                ErrorInternalServerError("Server error")
            })?;

        match student {
            Some(student) => resolved.push((student, date, item.status.clone())),
            None => failed.push(json!({
                "student_id": item.student_id,
                "error": "Student not found",
            })),
        }
    }

    let dispatches = resolved.iter().map(|(student, date, status)| {
        notify::dispatch_alert(pool.get_ref(), &config, student, *date, status)
    });
    let outcomes = futures::future::join_all(dispatches).await;

    for ((student, date, _), sent) in resolved.iter().zip(outcomes) {
        if sent {
            // flag the matching record so the register shows delivery
            let _ = sqlx::query(
                "UPDATE attendance SET notified_parent = TRUE WHERE student_id = ? AND date = ?",
            )
            .bind(student.id)
            .bind(date)
            .execute(pool.get_ref())
            .await;

            succeeded.push(student.id);
        } else {
            failed.push(json!({
                "student_id": student.id,
                "error": "All notification channels failed",
            }));
        }
    }

    Ok(HttpResponse::Ok().json(json!({ "succeeded": succeeded, "failed": failed })))
}
