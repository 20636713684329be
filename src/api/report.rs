use crate::api::attendance::RECORD_COLUMNS;
use crate::model::attendance::{normalize_to_day, AttendanceRecord, AttendanceStatus};
use crate::model::student::Student;
use crate::report::pdf;
use crate::report::stats::AttendanceStats;
use crate::utils::section_cache;
use actix_web::error::ErrorInternalServerError;
use actix_web::{web, HttpResponse, Responder};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use std::str::FromStr;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ReportQuery {
    pub section: Option<String>,
    /// "YYYY-MM-DD"
    pub date: Option<String>,
    /// Present | Absent | Late | Excused
    pub status: Option<String>,
    /// "pdf" (default) or "json"
    pub format: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct MonthlyQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub section: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct StudentReportQuery {
    pub student_index: String,
    pub format: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReportFilters {
    pub section: Option<String>,
    pub date: Option<String>,
    pub status: Option<String>,
    pub search_term: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct GenerateReportRequest {
    /// The record set the caller is currently displaying
    pub records: Vec<AttendanceRecord>,
    #[serde(default)]
    pub filters: ReportFilters,
}

enum Filter {
    Text(String),
    Day(NaiveDate),
}

/// A search that narrowed the view down to one student gets the detail
/// layout instead of the school-wide summary.
fn is_single_student(records: &[AttendanceRecord]) -> bool {
    match records.first() {
        Some(first) => records.iter().all(|r| r.std_index == first.std_index),
        None => false,
    }
}

fn wants_json(format: &Option<String>) -> bool {
    format.as_deref() == Some("json")
}

/// First and last day of a calendar month.
fn month_range(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next.pred_opt()?))
}

async fn fetch_filtered(
    pool: &MySqlPool,
    conditions: &[&str],
    filters: Vec<Filter>,
) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
    let sql = if conditions.is_empty() {
        format!("{RECORD_COLUMNS} ORDER BY a.date DESC, a.id DESC")
    } else {
        format!(
            "{RECORD_COLUMNS} WHERE {} ORDER BY a.date DESC, a.id DESC",
            conditions.join(" AND ")
        )
    };

    let mut query = sqlx::query_as::<_, AttendanceRecord>(&sql);
    for filter in filters {
        query = match filter {
            Filter::Text(v) => query.bind(v),
            Filter::Day(v) => query.bind(v),
        };
    }
    query.fetch_all(pool).await
}

fn pdf_response(bytes: Vec<u8>, file_name: &str) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{file_name}\""),
        ))
        .body(bytes)
}

/// Attendance report filtered by section, date and status
#[utoipa::path(
    get,
    path = "/reports/attendance",
    params(ReportQuery),
    responses(
        (status = 200, description = "PDF attachment, or JSON with format=json"),
        (status = 400, description = "Bad date or status filter"),
        (status = 404, description = "No records matched")
    ),
    tag = "Reports"
)]
pub async fn attendance_report(
    pool: web::Data<MySqlPool>,
    query: web::Query<ReportQuery>,
) -> actix_web::Result<impl Responder> {
    let mut conditions: Vec<&str> = Vec::new();
    let mut filters: Vec<Filter> = Vec::new();
    let mut filter_lines: Vec<String> = Vec::new();

    if let Some(section) = &query.section {
        conditions.push("s.section = ?");
        filters.push(Filter::Text(section.clone()));
        filter_lines.push(format!("Section: {section}"));
    }
    if let Some(raw) = &query.date {
        let Some(day) = normalize_to_day(raw) else {
            return Ok(HttpResponse::BadRequest()
                .json(json!({ "message": format!("{raw} is not a valid date") })));
        };
        conditions.push("a.date = ?");
        filters.push(Filter::Day(day));
        filter_lines.push(format!("Date: {day}"));
    }
    if let Some(status) = &query.status {
        if AttendanceStatus::from_str(status).is_err() {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": format!("{status} is not a valid attendance status")
            })));
        }
        conditions.push("a.status = ?");
        filters.push(Filter::Text(status.clone()));
        filter_lines.push(format!("Status: {status}"));
    }

    let records = fetch_filtered(pool.get_ref(), &conditions, filters)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch report records");
            ErrorInternalServerError("Server error")
        })?;

    if records.is_empty() {
        return Ok(HttpResponse::NotFound()
            .json(json!({ "message": "No records found for the given filters" })));
    }

    let stats = AttendanceStats::compute(&records);

    if wants_json(&query.format) {
        return Ok(HttpResponse::Ok().json(json!({
            "records": records,
            "statistics": stats,
            "filters": filter_lines,
            "generated_at": Utc::now(),
        })));
    }

    let bytes = pdf::render_summary_report(&stats, "Attendance Report", &filter_lines)
        .map_err(|e| {
            error!(error = %e, "Failed to render report PDF");
            ErrorInternalServerError("Server error")
        })?;

    Ok(pdf_response(bytes, "attendance_report.pdf"))
}

/// Month-long report for the whole school or one section
#[utoipa::path(
    get,
    path = "/reports/monthly",
    params(MonthlyQuery),
    responses(
        (status = 200, description = "PDF attachment, or JSON with format=json"),
        (status = 400, description = "Missing or invalid year/month"),
        (status = 404, description = "No records in that month")
    ),
    tag = "Reports"
)]
pub async fn monthly_report(
    pool: web::Data<MySqlPool>,
    query: web::Query<MonthlyQuery>,
) -> actix_web::Result<impl Responder> {
    let (Some(year), Some(month)) = (query.year, query.month) else {
        return Ok(HttpResponse::BadRequest()
            .json(json!({ "message": "year and month are required" })));
    };
    let Some((first, last)) = month_range(year, month) else {
        return Ok(HttpResponse::BadRequest()
            .json(json!({ "message": format!("{year}-{month} is not a valid month") })));
    };

    let mut conditions = vec!["a.date BETWEEN ? AND ?"];
    let mut filters = vec![Filter::Day(first), Filter::Day(last)];
    let mut filter_lines = vec![format!("Month: {year}-{month:02}")];

    if let Some(section) = &query.section {
        conditions.push("s.section = ?");
        filters.push(Filter::Text(section.clone()));
        filter_lines.push(format!("Section: {section}"));
    }

    let records = fetch_filtered(pool.get_ref(), &conditions, filters)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch monthly records");
            ErrorInternalServerError("Server error")
        })?;

    if records.is_empty() {
        return Ok(HttpResponse::NotFound()
            .json(json!({ "message": "No records found for the given month" })));
    }

    let stats = AttendanceStats::compute(&records);

    if wants_json(&query.format) {
        return Ok(HttpResponse::Ok().json(json!({
            "records": records,
            "statistics": stats,
            "filters": filter_lines,
            "generated_at": Utc::now(),
        })));
    }

    let subtitle = format!("Monthly Report - {year}-{month:02}");
    let bytes = pdf::render_summary_report(&stats, &subtitle, &filter_lines).map_err(|e| {
        error!(error = %e, "Failed to render monthly PDF");
        ErrorInternalServerError("Server error")
    })?;

    Ok(pdf_response(
        bytes,
        &format!("monthly_report_{year}_{month:02}.pdf"),
    ))
}

/// Full history report for one student
#[utoipa::path(
    get,
    path = "/reports/student",
    params(StudentReportQuery),
    responses(
        (status = 200, description = "PDF attachment, or JSON with format=json"),
        (status = 404, description = "Student not found")
    ),
    tag = "Reports"
)]
pub async fn student_report(
    pool: web::Data<MySqlPool>,
    query: web::Query<StudentReportQuery>,
) -> actix_web::Result<impl Responder> {
    let student = sqlx::query_as::<_, Student>("SELECT * FROM students WHERE std_index = ?")
        .bind(query.student_index.trim())
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch student");
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
        error!(error = %e, "Failed to fetch student history");
        ErrorInternalServerError("Server error")
    })?;

    let stats = AttendanceStats::compute(&records);

    if wants_json(&query.format) {
        return Ok(HttpResponse::Ok().json(json!({
            "student": student,
            "records": records,
            "statistics": stats,
            "generated_at": Utc::now(),
        })));
    }

    let bytes = pdf::render_student_report(&student, &records, &stats).map_err(|e| {
        error!(error = %e, "Failed to render student PDF");
        ErrorInternalServerError("Server error")
    })?;

    Ok(pdf_response(
        bytes,
        &format!("student_report_{}.pdf", student.std_index),
    ))
}

/// Render a PDF from a caller-supplied record set
#[utoipa::path(
    post,
    path = "/reports/generate",
    request_body = GenerateReportRequest,
    responses(
        (status = 200, description = "PDF attachment"),
        (status = 400, description = "No records provided")
    ),
    tag = "Reports"
)]
pub async fn generate_report(
    payload: web::Json<GenerateReportRequest>,
) -> actix_web::Result<impl Responder> {
    let GenerateReportRequest { records, filters } = payload.into_inner();

    if records.is_empty() {
        return Ok(HttpResponse::BadRequest()
            .json(json!({ "message": "No records to generate report from" })));
    }

    let mut filter_lines = Vec::new();
    if let Some(section) = &filters.section {
        filter_lines.push(format!("Section: {section}"));
    }
    if let Some(date) = &filters.date {
        filter_lines.push(format!("Date: {date}"));
    }
    if let Some(status) = &filters.status {
        filter_lines.push(format!("Status: {status}"));
    }

    let stats = AttendanceStats::compute(&records);

    let searched = filters
        .search_term
        .as_deref()
        .is_some_and(|t| !t.trim().is_empty());
    let bytes = if searched && is_single_student(&records) {
        pdf::render_detailed_report(&records, &stats, &filter_lines)
    } else {
        pdf::render_summary_report(&stats, "Attendance Report", &filter_lines)
    }
    .map_err(|e| {
        error!(error = %e, "Failed to render generated report");
        ErrorInternalServerError("Server error")
    })?;

    Ok(pdf_response(bytes, "attendance_report.pdf"))
}

/// Distinct class sections, cached briefly
#[utoipa::path(
    get,
    path = "/reports/sections",
    responses((status = 200, description = "Known sections, sorted", body = Object)),
    tag = "Reports"
)]
pub async fn sections(pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let sections = section_cache::cached_sections(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch sections");
            ErrorInternalServerError("Server error")
        })?;

    Ok(HttpResponse::Ok().json(json!({ "sections": &*sections })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_range_covers_whole_month() {
        let (first, last) = month_range(2024, 2).unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn december_rolls_into_next_year() {
        let (first, last) = month_range(2024, 12).unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
    }

    #[test]
    fn invalid_month_is_rejected() {
        assert!(month_range(2024, 13).is_none());
        assert!(month_range(2024, 0).is_none());
    }

    fn record(index: &str) -> AttendanceRecord {
        AttendanceRecord {
            id: 0,
            student_id: 0,
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            status: "Present".to_string(),
            justification: String::new(),
            notified_parent: false,
            student_name: format!("Student {index}"),
            std_index: index.to_string(),
            section: "10A".to_string(),
        }
    }

    #[test]
    fn single_student_detection_compares_index_codes() {
        assert!(is_single_student(&[record("S0001"), record("S0001")]));
        assert!(!is_single_student(&[record("S0001"), record("S0002")]));
        assert!(!is_single_student(&[]));
    }
}
