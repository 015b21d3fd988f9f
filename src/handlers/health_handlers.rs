// 健康检查API处理器
// 提供服务进程、数据库连接和编排配置的健康状态

use actix_web::{http::StatusCode, web, HttpResponse, Result as ActixResult};
use serde::Serialize;

use orchestra::models::ApiResponse;

use crate::state::AppState;

/// 系统健康检查响应
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// 服务状态
    pub status: String,
    /// 版本信息
    pub version: String,
    /// 数据库连接状态
    pub database: String,
    /// 全局默认驱动管理的服务数量
    pub services: Option<usize>,
    /// 启动时的测试模式覆盖 (SERVICE_TEST_MODE)
    pub test_mode: Option<bool>,
    /// 当前时间戳
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// 基础健康检查
///
/// GET /health
///
/// 响应: HealthResponse
pub async fn health_check(data: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let mut health = HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: "disabled".to_string(),
        services: None,
        test_mode: data.config.orchestration.test_mode,
        timestamp: chrono::Utc::now(),
    };

    // 检查数据库连接
    if let Some(pool) = &data.db_pool {
        match sqlx::query("SELECT 1").execute(pool).await {
            Ok(_) => {
                health.database = "connected".to_string();
            }
            Err(e) => {
                log::error!("Database health check failed: {}", e);
                health.database = "disconnected".to_string();
                health.status = "unhealthy".to_string();
            }
        }
    }

    // 检查编排配置能否列出服务
    match data.orchestrator.all().await {
        Ok(services) => health.services = Some(services.len()),
        Err(e) => {
            log::error!("Service listing failed during health check: {}", e);
            if health.status == "healthy" {
                health.status = "degraded".to_string();
            }
        }
    }

    let status_code = match health.status.as_str() {
        "unhealthy" => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    Ok(HttpResponse::build(status_code).json(ApiResponse::success(health)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn test_health_check_without_database() {
        let app_state = AppState::new_for_test(json!({
            "orchestration": { "services": { "payments": {} } }
        }));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state))
                .route("/health", web::get().to(health_check)),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["data"]["status"], "healthy");
        assert_eq!(body["data"]["database"], "disabled");
        assert_eq!(body["data"]["services"], 1);
        assert!(body["data"]["test_mode"].is_null());
    }

    #[actix_web::test]
    async fn test_health_check_reports_test_mode_override() {
        let mut app_state = AppState::new_for_test(json!({}));
        app_state.config.orchestration.test_mode = Some(true);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state))
                .route("/health", web::get().to(health_check)),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["data"]["status"], "healthy");
        assert_eq!(body["data"]["test_mode"], true);
        assert_eq!(body["data"]["services"], 0);
    }

    #[actix_web::test]
    async fn test_health_check_reports_bad_driver() {
        let app_state = AppState::new_for_test(json!({
            "orchestration": { "defaults": { "driver": "database" } }
        }));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state))
                .route("/health", web::get().to(health_check)),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["status"], "degraded");
        assert!(body["data"]["services"].is_null());
    }
}
