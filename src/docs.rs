use crate::api::attendance::{
    MarkAttendanceRequest, NotifyItem, NotifyParentsRequest, ParentViewRequest,
    UpdateAttendanceRequest,
};
use crate::api::leave_request::ReviewRequest;
use crate::api::notification::CreateNotificationRequest;
use crate::api::report::{GenerateReportRequest, ReportFilters};
use crate::api::student::LoginRequest;
use crate::api::teacher::TeacherLoginRequest;
use crate::model::attendance::{Attendance, AttendanceRecord, AttendanceStatus};
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::model::notification::{Notification, NotificationType};
use crate::model::student::Student;
use crate::model::teacher::Teacher;
use crate::report::stats::{AttendanceStats, StatusTally, StudentTally};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Smart Alert API",
        version = "1.0.0",
        description = r#"
## School Attendance & Notification System

Backend for CMB International College's attendance register and parent
notification pipeline.

### Key Features
- **Student & Teacher Management**
  - Register accounts with auto-generated codes and emailed credentials
- **Attendance**
  - One record per student per day, enforced by the database
- **Leave Requests**
  - Parents submit requests with supporting documents; teachers review them
- **Notifications**
  - Attendance alerts fan out over WhatsApp, SMS and email
- **Reports**
  - Filtered, monthly and per-student reports as PDF or JSON

### Roles
Requests carry an `x-user-role` header (`Admin`, `Teacher` or `Parent`).
Teachers cannot manage student or teacher accounts.
"#,
    ),
    paths(
        crate::api::student::list_students,
        crate::api::student::create_student,
        crate::api::student::next_index,
        crate::api::student::get_student,
        crate::api::student::update_student,
        crate::api::student::delete_student,
        crate::api::student::login_parent,

        crate::api::teacher::list_teachers,
        crate::api::teacher::create_teacher,
        crate::api::teacher::next_id,
        crate::api::teacher::get_teacher,
        crate::api::teacher::update_teacher,
        crate::api::teacher::delete_teacher,
        crate::api::teacher::login_teacher,

        crate::api::attendance::list_attendance,
        crate::api::attendance::mark_attendance,
        crate::api::attendance::parent_view,
        crate::api::attendance::by_student,
        crate::api::attendance::update_attendance,
        crate::api::attendance::delete_attendance,
        crate::api::attendance::notify_parents,

        crate::api::leave_request::submit_leave,
        crate::api::leave_request::list_leave,
        crate::api::leave_request::pending_count,
        crate::api::leave_request::accepted_leave,
        crate::api::leave_request::accepted_for_date,
        crate::api::leave_request::accept_leave,
        crate::api::leave_request::reject_leave,
        crate::api::leave_request::delete_pending,

        crate::api::notification::create_notification,
        crate::api::notification::by_student,
        crate::api::notification::unread_count,
        crate::api::notification::mark_read,
        crate::api::notification::mark_all_read,

        crate::api::report::attendance_report,
        crate::api::report::monthly_report,
        crate::api::report::generate_report,
        crate::api::report::student_report,
        crate::api::report::sections
    ),
    components(
        schemas(
            Student,
            Teacher,
            LoginRequest,
            TeacherLoginRequest,
            Attendance,
            AttendanceRecord,
            AttendanceStatus,
            MarkAttendanceRequest,
            UpdateAttendanceRequest,
            ParentViewRequest,
            NotifyItem,
            NotifyParentsRequest,
            LeaveRequest,
            LeaveStatus,
            ReviewRequest,
            Notification,
            NotificationType,
            CreateNotificationRequest,
            GenerateReportRequest,
            ReportFilters,
            StatusTally,
            StudentTally,
            AttendanceStats
        )
    ),
    tags(
        (name = "Students", description = "Student accounts and parent login"),
        (name = "Teachers", description = "Teacher accounts and login"),
        (name = "Attendance", description = "Daily attendance register"),
        (name = "Leave Requests", description = "Parent-submitted leave workflow"),
        (name = "Notifications", description = "Parent notification feed"),
        (name = "Reports", description = "Aggregated attendance reports")
    )
)]
pub struct ApiDoc;
