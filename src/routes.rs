// API路由配置
// 定义所有HTTP接口的路由规则

use actix_web::{web, Scope};
use crate::handlers::*;

/// API v1路由配置
pub fn api_v1_routes() -> Scope {
    web::scope("/api/v1")
        // 服务编排路由
        .service(service_routes())
}

/// 服务编排路由
fn service_routes() -> Scope {
    web::scope("/services")
        .route("", web::get().to(list_services))
        .route("/{service_id}", web::get().to(get_service))
        .route("/{service_id}/requests", web::post().to(dispatch_request))
}

/// 公共路由
pub fn public_routes() -> Scope {
    web::scope("")
        .route("/health", web::get().to(health_check))
}
