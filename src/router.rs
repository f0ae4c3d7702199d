use crate::handlers::{
    bill_lines::{create_bill_line, delete_bill_line, get_bill_lines, update_bill_line},
    bills::{create_bill, delete_bill, get_bill, get_bills, update_bill},
    health::health_check,
    services::{create_service, delete_service, get_service, get_services, update_service},
    users::{
        create_user, delete_user, get_user, get_user_profile, get_users, update_user,
        update_user_profile,
    },
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let request_timeout = state.request_timeout;

    let router = Router::new()
        // Health check
        .route("/health", get(health_check))
        // Coworkers and their billing profiles
        .route("/api/v1/users", post(create_user).get(get_users))
        .route(
            "/api/v1/users/:user_id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route(
            "/api/v1/users/:user_id/profile",
            get(get_user_profile).put(update_user_profile),
        )
        // Service catalog
        .route("/api/v1/services", post(create_service).get(get_services))
        .route(
            "/api/v1/services/:service_id",
            get(get_service).put(update_service).delete(delete_service),
        )
        // Bills
        .route("/api/v1/bills", post(create_bill).get(get_bills))
        .route(
            "/api/v1/bills/:bill_id",
            get(get_bill).put(update_bill).delete(delete_bill),
        )
        // Bill lines
        .route(
            "/api/v1/bills/:bill_id/lines",
            post(create_bill_line).get(get_bill_lines),
        )
        .route(
            "/api/v1/bill-lines/:line_id",
            put(update_bill_line).delete(delete_bill_line),
        )
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // The recorder is process-global, so tests run without it
    #[cfg(not(test))]
    let router = {
        let (prometheus_layer, metric_handle) = axum_prometheus::PrometheusMetricLayer::pair();
        router
            .route("/metrics", get(move || std::future::ready(metric_handle.render())))
            .layer(prometheus_layer)
    };

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
