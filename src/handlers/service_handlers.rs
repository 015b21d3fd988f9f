// 服务编排API处理器
// 列出服务、查询服务默认值，并把请求转发给服务网关

use actix_web::{http::StatusCode, web, HttpResponse, Result as ActixResult};

use orchestra::drivers::test_mode;
use orchestra::error::OrchestrationError;
use orchestra::models::{ApiResponse, DispatchRequest, ServiceDetail, ServiceSummary};
use orchestra::utils::InputValidator;

use crate::state::AppState;

/// 获取服务列表
///
/// GET /api/v1/services
///
/// 响应: ServiceSummary 列表
pub async fn list_services(data: web::Data<AppState>) -> ActixResult<HttpResponse> {
    match data.orchestrator.all().await {
        Ok(services) => {
            let services: Vec<ServiceSummary> = services.iter().map(ServiceSummary::from).collect();
            Ok(HttpResponse::Ok().json(ApiResponse::success(services)))
        }
        Err(e) => Ok(error_response(&e)),
    }
}

/// 获取服务详情
///
/// GET /api/v1/services/{service_id}
///
/// 响应: ServiceDetail
pub async fn get_service(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let service_id = path.into_inner();

    let facade = match data.orchestrator.service(&service_id).await {
        Ok(facade) => facade,
        Err(e) => return Ok(error_response(&e)),
    };

    let defaults = async {
        let default_merchant = facade.default_merchant().await?;
        let default_provider = facade.default_provider().await?;
        Ok::<_, OrchestrationError>((default_provider, default_merchant))
    };

    match defaults.await {
        Ok((default_provider, default_merchant)) => {
            let detail = ServiceDetail {
                summary: ServiceSummary::from(facade.service()),
                default_provider,
                default_merchant,
                test_mode: test_mode(facade.driver().config(), facade.service()),
            };
            Ok(HttpResponse::Ok().json(ApiResponse::success(detail)))
        }
        Err(e) => Ok(error_response(&e)),
    }
}

/// 转发服务请求
///
/// POST /api/v1/services/{service_id}/requests
///
/// 请求体: DispatchRequest
/// 响应: ServiceResponse
pub async fn dispatch_request(
    data: web::Data<AppState>,
    path: web::Path<String>,
    request: web::Json<DispatchRequest>,
) -> ActixResult<HttpResponse> {
    let service_id = path.into_inner();
    let DispatchRequest {
        method,
        params,
        provider,
        merchant,
    } = request.into_inner();

    let mut validator = InputValidator::new();
    validator.validate_identifier_field("method", &method);
    validator.validate_optional_identifier_field("provider", provider.as_deref());
    validator.validate_optional_identifier_field("merchant", merchant.as_deref());
    if let Err(e) = validator.into_result() {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::<()>::error(400, e.to_string())));
    }

    let mut facade = match data.orchestrator.service(&service_id).await {
        Ok(facade) => facade,
        Err(e) => return Ok(error_response(&e)),
    };

    let result = async {
        // 先选商户，使商户自己的默认提供商生效
        if let Some(merchant) = &merchant {
            facade.set_merchant(merchant).await?;
        }
        if let Some(provider) = &provider {
            facade.set_provider(provider).await?;
        }
        facade.call(&method, params).await
    };

    match result.await {
        Ok(response) => {
            log::info!(
                "Request {} for {}::{}() completed",
                response.request_id,
                service_id,
                method
            );
            Ok(HttpResponse::Ok().json(ApiResponse::success(response)))
        }
        Err(e) => Ok(error_response(&e)),
    }
}

/// 编排错误对应的HTTP状态码
pub fn error_status(error: &OrchestrationError) -> StatusCode {
    match error {
        OrchestrationError::Resolution(_) => StatusCode::NOT_FOUND,
        OrchestrationError::Incompatible { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        OrchestrationError::NoSuchMethod { .. } => StatusCode::BAD_REQUEST,
        OrchestrationError::Configuration(_) | OrchestrationError::Database(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        OrchestrationError::Gateway(_) => StatusCode::BAD_GATEWAY,
    }
}

fn error_response(error: &OrchestrationError) -> HttpResponse {
    let status = error_status(error);
    let message = error_message(error);

    HttpResponse::build(status).json(ApiResponse::<()>::error(status.as_u16(), message))
}

/// 返回给调用方的错误消息，网关错误带上完整原因链
fn error_message(error: &OrchestrationError) -> String {
    match error {
        OrchestrationError::Database(e) => {
            log::error!("Database error: {}", e);
            "Internal server error".to_string()
        }
        OrchestrationError::Gateway(e) => {
            log::error!("Gateway error: {:#}", e);
            format!("{:#}", e)
        }
        _ => {
            log::warn!("{}", error);
            error.to_string()
        }
    }
}
