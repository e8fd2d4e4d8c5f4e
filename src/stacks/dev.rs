//! Simple-dev stack — the low-cost development variant. One combined
//! handler over core's table and bucket, behind a minimal gateway; no
//! distribution, no TLS, no DNS.

use crate::core::context::EnvContext;
use crate::core::types::{SiteConfig, ValueRef};
use crate::resources::compute::{AccessMode, CodeSource, DataBinding, FunctionSpec, Runtime};
use crate::resources::network::{HttpApiSpec, Route};
use crate::stacks::{cors_origins, Stack};
use indexmap::IndexMap;

const DEV_STUB: &str = r#"exports.handler = async (event) => {
  // Single handler for every dev route; swapped for the packaged
  // handlers outside simple-dev.
  return { statusCode: 200, body: JSON.stringify({ route: event.routeKey }) };
};
"#;

pub fn stack(config: &SiteConfig, ctx: &EnvContext) -> Result<Stack, String> {
    let mut stack = Stack::new("dev", format!("{} simple development environment", ctx.site));

    stack.add_function(
        "SiteFn",
        FunctionSpec {
            function_name: ctx.resource_name("dev", "site"),
            description: "Combined dev handler for all content routes".to_string(),
            runtime: Runtime::Node20,
            handler: "index.handler".to_string(),
            memory_mb: 128,
            timeout_secs: 10,
            code: CodeSource::Inline(DEV_STUB.to_string()),
            bindings: vec![
                DataBinding::table(
                    "TABLE_NAME",
                    ValueRef::import("core", "TableName"),
                    ValueRef::import("core", "TableArn"),
                    AccessMode::ReadWrite,
                ),
                DataBinding::bucket(
                    "MEDIA_BUCKET",
                    ValueRef::import("core", "MediaBucketName"),
                    ValueRef::import("core", "MediaBucketArn"),
                    AccessMode::ReadWrite,
                ),
            ],
            service_grants: vec![],
            env: IndexMap::new(),
            role: ValueRef::literal("unset"),
        },
    )?;

    stack.add_http_api(
        "DevApi",
        HttpApiSpec {
            api_name: ctx.resource_name("dev", "api"),
            description: "Simple-dev content API".to_string(),
            routes: vec![
                Route::get("/projects", "SiteFn"),
                Route::get("/projects/{id}", "SiteFn"),
                Route::get("/carousel", "SiteFn"),
                Route::post("/images", "SiteFn"),
            ],
            cors_origins: cors_origins(config),
        },
        ctx.api_throttle(),
    )?;

    stack.output(
        "ApiEndpoint",
        ValueRef::attr("DevApi", "ApiEndpoint"),
        "Simple-dev API base URL",
    );

    Ok(stack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ResourceSpec;
    use crate::stacks::test_support::simple_dev_config;

    fn build() -> Stack {
        let config = simple_dev_config();
        let ctx = EnvContext::from_config(&config);
        stack(&config, &ctx).unwrap()
    }

    #[test]
    fn test_single_handler_serves_all_routes() {
        let s = build();
        let api = match &s.resources["DevApi"] {
            ResourceSpec::HttpApi(a) => a,
            _ => panic!("expected http api"),
        };
        assert_eq!(api.routes.len(), 4);
        assert!(api.routes.iter().all(|r| r.function == "SiteFn"));
        // One integration shared by every route
        let integrations = s
            .resources
            .values()
            .filter(|r| matches!(r, ResourceSpec::ApiIntegration(_)))
            .count();
        assert_eq!(integrations, 1);
    }

    #[test]
    fn test_dev_fn_uses_core_storage() {
        let s = build();
        let f = match &s.resources["SiteFn"] {
            ResourceSpec::Function(f) => f,
            _ => panic!("expected function"),
        };
        assert!(matches!(f.code, CodeSource::Inline(_)));
        assert_eq!(f.memory_mb, 128);
        assert_eq!(
            f.bindings[0].name_ref,
            ValueRef::import("core", "TableName")
        );
        assert_eq!(
            f.bindings[1].arn_ref,
            ValueRef::import("core", "MediaBucketArn")
        );
    }

    #[test]
    fn test_no_delivery_resources() {
        let s = build();
        assert!(!s
            .resources
            .values()
            .any(|r| matches!(r, ResourceSpec::Distribution(_))));
        assert!(!s
            .resources
            .values()
            .any(|r| matches!(r, ResourceSpec::Certificate(_))));
    }
}
