//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:3000/docs`
//! - OpenAPI JSON: `http://localhost:3000/api-docs/openapi.json`

use utoipa::OpenApi;

use crate::gateway::types::{
    AccountData, CreateAccountRequest, CreateTransactionRequest, HealthData, TransactionData,
};

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ledger Engine API",
        version = "1.0.0",
        description = "Double-entry ledger: account creation, balance lookup and idempotent transfers. Every mutating request carries a referenceId header (UUID); retries with the same key take effect at most once.",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:3000", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health_check,
        crate::gateway::handlers::create_account,
        crate::gateway::handlers::get_account,
        crate::gateway::handlers::create_transaction,
    ),
    components(
        schemas(
            HealthData,
            AccountData,
            TransactionData,
            CreateAccountRequest,
            CreateTransactionRequest,
        )
    ),
    tags(
        (name = "Account", description = "Account creation and lookup"),
        (name = "Transfer", description = "Transfers between accounts"),
        (name = "System", description = "Health checks and system info")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_generates() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "Ledger Engine API");
        assert_eq!(spec.info.version, "1.0.0");
    }

    #[test]
    fn test_openapi_json_serializable() {
        let json = ApiDoc::openapi().to_json().unwrap();
        assert!(json.contains("Ledger Engine API"));
        assert!(json.contains("referenceId"));
    }

    #[test]
    fn test_endpoints_registered() {
        let paths = ApiDoc::openapi().paths;
        assert!(paths.paths.contains_key("/api/health"));
        assert!(paths.paths.contains_key("/api/accounts"));
        assert!(paths.paths.contains_key("/api/accounts/{account_id}"));
        assert!(paths.paths.contains_key("/api/transactions"));
    }
}
