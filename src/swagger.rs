use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{
    BookingStatus, DiscountType, LoyaltyTier, MilestoneKind, PaymentStatus, RewardType,
};
use crate::handlers;
use crate::models::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::catalog::list_services,
        handlers::availability::get_available_slots,
        handlers::booking::create_booking,
        handlers::booking::list_bookings,
        handlers::booking::get_booking,
        handlers::booking::cancel_booking,
        handlers::booking::postpone_booking,
        handlers::booking::confirm_booking,
        handlers::discount::validate_discount,
        handlers::discount::create_discount,
        handlers::discount::list_discounts,
        handlers::payment::create_intent,
        handlers::loyalty::get_loyalty,
    ),
    components(
        schemas(
            ServiceResponse,
            AvailableSlotsResponse,
            CreateBookingRequest,
            PostponeBookingRequest,
            BookingResponse,
            BookingStatus,
            PaymentStatus,
            ValidateDiscountRequest,
            DiscountQuoteResponse,
            CreateDiscountRequest,
            DiscountResponse,
            DiscountType,
            CreateIntentRequest,
            CreateIntentResponse,
            LoyaltyResponse,
            LoyaltyTier,
            BadgeResponse,
            RewardResponse,
            MilestoneKind,
            RewardType,
        )
    ),
    tags(
        (name = "catalog", description = "Treatment catalog API"),
        (name = "availability", description = "Slot availability API"),
        (name = "booking", description = "Booking lifecycle API"),
        (name = "discount", description = "Discount code API"),
        (name = "payment", description = "Payment intent API"),
        (name = "loyalty", description = "Loyalty rewards API"),
    ),
    info(
        title = "Salon Backend API",
        version = "1.0.0",
        description = "Salon appointment booking REST API documentation"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
