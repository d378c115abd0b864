use crate::models::{
    BookingListQuery, BookingResponse, CreateBookingRequest, PostponeBookingRequest,
};
use crate::services::BookingService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/bookings",
    tag = "booking",
    request_body = CreateBookingRequest,
    responses(
        (status = 200, description = "Booking created", body = BookingResponse),
        (status = 400, description = "Invalid date/time or contact details"),
        (status = 409, description = "Slot already booked")
    )
)]
pub async fn create_booking(
    booking_service: web::Data<BookingService>,
    request: web::Json<CreateBookingRequest>,
) -> Result<HttpResponse> {
    match booking_service.create_booking(request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/bookings/{id}",
    tag = "booking",
    params(("id" = i64, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Booking detail", body = BookingResponse),
        (status = 404, description = "Unknown booking")
    )
)]
pub async fn get_booking(
    booking_service: web::Data<BookingService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match booking_service.get_booking(path.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/bookings",
    tag = "booking",
    params(("date" = Option<String>, Query, description = "Filter by calendar day")),
    responses(
        (status = 200, description = "Bookings, ordered by date and time")
    )
)]
pub async fn list_bookings(
    booking_service: web::Data<BookingService>,
    query: web::Query<BookingListQuery>,
) -> Result<HttpResponse> {
    match booking_service.list_bookings(&query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/bookings/{id}/cancel",
    tag = "booking",
    params(("id" = i64, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Booking cancelled, slot freed", body = BookingResponse),
        (status = 400, description = "Booking is not cancellable")
    )
)]
pub async fn cancel_booking(
    booking_service: web::Data<BookingService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match booking_service.cancel_booking(path.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/bookings/{id}/postpone",
    tag = "booking",
    params(("id" = i64, Path, description = "Booking id")),
    request_body = PostponeBookingRequest,
    responses(
        (status = 200, description = "Booking moved, back to pending", body = BookingResponse),
        (status = 409, description = "Target slot already booked")
    )
)]
pub async fn postpone_booking(
    booking_service: web::Data<BookingService>,
    path: web::Path<i64>,
    request: web::Json<PostponeBookingRequest>,
) -> Result<HttpResponse> {
    match booking_service
        .postpone_booking(path.into_inner(), request.into_inner())
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/bookings/{id}/confirm",
    tag = "booking",
    params(("id" = i64, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Booking confirmed by admin override", body = BookingResponse),
        (status = 400, description = "Booking is not confirmable")
    )
)]
pub async fn confirm_booking(
    booking_service: web::Data<BookingService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match booking_service.confirm_booking(path.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn booking_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/bookings")
            .route("", web::post().to(create_booking))
            .route("", web::get().to(list_bookings))
            .route("/{id}", web::get().to(get_booking))
            .route("/{id}/cancel", web::post().to(cancel_booking))
            .route("/{id}/postpone", web::post().to(postpone_booking))
            .route("/{id}/confirm", web::post().to(confirm_booking)),
    );
}
