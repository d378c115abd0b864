use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local;
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter

use salon_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::{GatewayClient, NotificationService},
    handlers,
    services::{
        AvailabilityService, BookingService, DiscountService, LoyaltyService, PaymentService,
    },
    swagger::swagger_config,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().expect("Failed to load configuration file");

    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let gateway = GatewayClient::new(config.gateway.clone())
        .expect("Failed to build payment gateway client");
    let notifier = NotificationService::new(config.notifications.clone());

    let availability_service =
        AvailabilityService::new(pool.clone(), config.business_hours.clone());
    let booking_service = BookingService::new(
        pool.clone(),
        availability_service.clone(),
        notifier.clone(),
    );
    let discount_service = DiscountService::new(pool.clone());
    let loyalty_service = LoyaltyService::new(pool.clone(), config.loyalty.points_per_dollar);
    let payment_service = PaymentService::new(
        pool.clone(),
        gateway.clone(),
        discount_service.clone(),
        loyalty_service.clone(),
        notifier.clone(),
    );

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::Data::new(availability_service.clone()))
            .app_data(web::Data::new(booking_service.clone()))
            .app_data(web::Data::new(discount_service.clone()))
            .app_data(web::Data::new(loyalty_service.clone()))
            .app_data(web::Data::new(payment_service.clone()))
            .app_data(web::Data::new(gateway.clone()))
            .configure(swagger_config)
            .configure(handlers::webhook_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::catalog_config)
                    .configure(handlers::availability_config)
                    .configure(handlers::booking_config)
                    .configure(handlers::discount_config)
                    .configure(handlers::payment_config)
                    .configure(handlers::loyalty_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
