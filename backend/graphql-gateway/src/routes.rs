//! HTTP routes
//!
//! - `GET  /health`: public liveness probe
//! - `GET  /api/v1/me`: authenticated principal and its context
//! - `GET  /api/v1/reviews/queue`: supervisors and universities
//! - `POST /graphql`: GraphQL endpoint, guarded per field
//! - `GET  /graphql/schema`: SDL

use actix_middleware::{AccessGuard, CurrentPrincipal, HttpRejection};
use actix_web::{web, HttpRequest, HttpResponse};
use async_graphql_actix_web::{GraphQLRequest, GraphQLResponse};
use auth_guard::{GuardPipeline, MarkerTable};
use request_context::{AuthenticatedPrincipal, ContextService, ExecutionContextAdapter};
use serde::Serialize;

use crate::config::GraphQLConfig;
use crate::markers::marker_table;
use crate::middleware::GraphQlAdapter;
use crate::schema::{build_schema, AppSchema};

/// Everything the routes need, built once and cloned into each worker
#[derive(Clone)]
pub struct GatewayState {
    pub schema: AppSchema,
    pub context: ContextService,
    pub pipeline: GuardPipeline,
    pub markers: MarkerTable,
}

impl GatewayState {
    pub fn new(pipeline: GuardPipeline, context: ContextService, graphql: &GraphQLConfig) -> Self {
        let markers = marker_table();
        let schema = build_schema(pipeline.clone(), context.clone(), markers.clone(), graphql);

        Self {
            schema,
            context,
            pipeline,
            markers,
        }
    }

    fn guard(&self, class: &str, handler: &str) -> AccessGuard {
        AccessGuard::for_handler(self.pipeline.clone(), &self.markers, class, handler)
    }

    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.schema.clone()))
            .app_data(web::Data::new(self.context.clone()))
            .service(
                web::resource("/health")
                    .wrap(self.guard("HealthController", "check"))
                    .route(web::get().to(health_handler)),
            )
            .service(
                web::resource("/api/v1/me")
                    .wrap(self.guard("MeController", "show"))
                    .route(web::get().to(me_handler)),
            )
            .service(
                web::resource("/api/v1/reviews/queue")
                    .wrap(self.guard("ReviewController", "queue"))
                    .route(web::get().to(review_queue_handler)),
            )
            .route("/graphql", web::post().to(graphql_handler))
            .route("/graphql/schema", web::get().to(schema_handler));
    }
}

async fn health_handler() -> &'static str {
    "ok"
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MeResponse {
    #[serde(flatten)]
    principal: AuthenticatedPrincipal,
    tenant_id: Option<String>,
    correlation_id: String,
}

async fn me_handler(
    principal: CurrentPrincipal,
    context: web::Data<ContextService>,
) -> HttpResponse {
    HttpResponse::Ok().json(MeResponse {
        principal: principal.into_inner(),
        tenant_id: context.get_tenant_id(),
        correlation_id: context.get_correlation_id(),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReviewQueueResponse {
    reviewer_id: Option<String>,
    tenant_id: String,
    correlation_id: String,
}

async fn review_queue_handler(
    context: web::Data<ContextService>,
) -> Result<HttpResponse, HttpRejection> {
    let tenant_id = context.require_tenant_id()?;

    Ok(HttpResponse::Ok().json(ReviewQueueResponse {
        reviewer_id: context.get_user_id(),
        tenant_id,
        correlation_id: context.get_correlation_id(),
    }))
}

async fn graphql_handler(
    schema: web::Data<AppSchema>,
    http: HttpRequest,
    req: GraphQLRequest,
) -> GraphQLResponse {
    let request = GraphQlAdapter.extract_raw_request(&http);
    schema.execute(req.into_inner().data(request)).await.into()
}

/// SDL (Schema Definition Language) endpoint for schema introspection
async fn schema_handler(schema: web::Data<AppSchema>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain")
        .body(schema.sdl())
}
