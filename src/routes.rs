use crate::{
    api::{attendance, leave_request, notification, report, student, teacher},
    config::Config,
};
use actix_governor::{
    governor::middleware::NoOpMiddleware, Governor, GovernorConfigBuilder, PeerIpKeyExtractor,
};
use actix_web::web;
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let api_limiter = Arc::new(build_limiter(config.rate_api_per_min));

    cfg.service(
        web::scope("/students")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(student::login_parent)),
            )
            .service(
                web::scope("")
                    .wrap(api_limiter.clone())
                    .service(
                        web::resource("")
                            .route(web::get().to(student::list_students))
                            .route(web::post().to(student::create_student)),
                    )
                    .service(
                        web::resource("/next-index").route(web::get().to(student::next_index)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(student::get_student))
                            .route(web::put().to(student::update_student))
                            .route(web::delete().to(student::delete_student)),
                    ),
            ),
    );

    cfg.service(
        web::scope("/teachers")
            .service(
                web::resource("/login")
                    .wrap(login_limiter)
                    .route(web::post().to(teacher::login_teacher)),
            )
            .service(
                web::scope("")
                    .wrap(api_limiter.clone())
                    .service(
                        web::resource("")
                            .route(web::get().to(teacher::list_teachers))
                            .route(web::post().to(teacher::create_teacher)),
                    )
                    .service(web::resource("/next-id").route(web::get().to(teacher::next_id)))
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(teacher::get_teacher))
                            .route(web::put().to(teacher::update_teacher))
                            .route(web::delete().to(teacher::delete_teacher)),
                    ),
            ),
    );

    cfg.service(
        web::scope("/attendance")
            .wrap(api_limiter.clone())
            .service(
                web::resource("")
                    .route(web::get().to(attendance::list_attendance))
                    .route(web::post().to(attendance::mark_attendance)),
            )
            .service(
                web::resource("/parent-view").route(web::post().to(attendance::parent_view)),
            )
            .service(
                web::resource("/notify-parents")
                    .route(web::post().to(attendance::notify_parents)),
            )
            .service(
                web::resource("/student/{id}").route(web::get().to(attendance::by_student)),
            )
            .service(
                web::resource("/{id}")
                    .route(web::put().to(attendance::update_attendance))
                    .route(web::delete().to(attendance::delete_attendance)),
            ),
    );

    cfg.service(
        web::scope("/leave-requests")
            .wrap(api_limiter.clone())
            .service(
                web::resource("")
                    .route(web::get().to(leave_request::list_leave))
                    .route(web::post().to(leave_request::submit_leave)),
            )
            .service(
                web::resource("/pending-count")
                    .route(web::get().to(leave_request::pending_count)),
            )
            .service(
                web::resource("/accepted-leave")
                    .route(web::get().to(leave_request::accepted_leave)),
            )
            .service(
                web::resource("/accepted-for-date")
                    .route(web::get().to(leave_request::accepted_for_date)),
            )
            .service(
                web::resource("/pending/all")
                    .route(web::delete().to(leave_request::delete_pending)),
            )
            .service(
                web::resource("/{id}/accept").route(web::put().to(leave_request::accept_leave)),
            )
            .service(
                web::resource("/{id}/reject").route(web::put().to(leave_request::reject_leave)),
            ),
    );

    cfg.service(
        web::scope("/notifications")
            .wrap(api_limiter.clone())
            .service(
                web::resource("").route(web::post().to(notification::create_notification)),
            )
            .service(web::resource("/student").route(web::get().to(notification::by_student)))
            .service(
                web::resource("/unread-count").route(web::get().to(notification::unread_count)),
            )
            .service(
                web::resource("/mark-all-read")
                    .route(web::put().to(notification::mark_all_read)),
            )
            .service(web::resource("/{id}/read").route(web::put().to(notification::mark_read))),
    );

    cfg.service(
        web::scope("/reports")
            .wrap(api_limiter)
            .service(
                web::resource("/attendance").route(web::get().to(report::attendance_report)),
            )
            .service(web::resource("/monthly").route(web::get().to(report::monthly_report)))
            .service(web::resource("/generate").route(web::post().to(report::generate_report)))
            .service(web::resource("/student").route(web::get().to(report::student_report)))
            .service(web::resource("/sections").route(web::get().to(report::sections))),
    );
}
