//! Backend/API stack — content handlers, the HTTP gateway fronting them,
//! and per-function invocation-error alarms.

use crate::core::context::EnvContext;
use crate::core::types::{SiteConfig, ValueRef};
use crate::resources::compute::{AccessMode, CodeSource, DataBinding, FunctionSpec, Runtime};
use crate::resources::network::{HttpApiSpec, Route};
use crate::resources::protection::AlarmSpec;
use crate::resources::ResourceSpec;
use crate::stacks::{cors_origins, site_url, Stack};
use indexmap::IndexMap;

fn handler(
    config: &SiteConfig,
    ctx: &EnvContext,
    base: &str,
    description: &str,
    bindings: Vec<DataBinding>,
) -> FunctionSpec {
    let mut env = IndexMap::new();
    if let Some(url) = site_url(config) {
        env.insert("SITE_URL".to_string(), ValueRef::literal(url));
    }
    FunctionSpec {
        function_name: ctx.resource_name("backend", base),
        description: description.to_string(),
        runtime: Runtime::Node20,
        handler: "index.handler".to_string(),
        memory_mb: 256,
        timeout_secs: 10,
        code: CodeSource::Artifact {
            key: format!("handlers/{}.zip", base),
        },
        bindings,
        service_grants: vec![],
        env,
        role: ValueRef::literal("unset"),
    }
}

fn table_binding(access: AccessMode) -> DataBinding {
    DataBinding::table(
        "TABLE_NAME",
        ValueRef::import("core", "TableName"),
        ValueRef::import("core", "TableArn"),
        access,
    )
}

pub fn stack(config: &SiteConfig, ctx: &EnvContext) -> Result<Stack, String> {
    let mut stack = Stack::new("backend", format!("{} content API", ctx.site));

    stack.add_function(
        "ProjectsFn",
        handler(
            config,
            ctx,
            "projects",
            "Serves the project list and single-project detail",
            vec![table_binding(AccessMode::Read)],
        ),
    )?;
    stack.add_function(
        "CarouselFn",
        handler(
            config,
            ctx,
            "carousel",
            "Serves the homepage carousel entries",
            vec![table_binding(AccessMode::Read)],
        ),
    )?;
    stack.add_function(
        "UploadFn",
        handler(
            config,
            ctx,
            "upload",
            "Accepts image uploads and records their metadata",
            vec![
                table_binding(AccessMode::ReadWrite),
                DataBinding::bucket(
                    "MEDIA_BUCKET",
                    ValueRef::import("core", "MediaBucketName"),
                    ValueRef::import("core", "MediaBucketArn"),
                    AccessMode::Write,
                ),
            ],
        ),
    )?;

    stack.add_http_api(
        "Api",
        HttpApiSpec {
            api_name: ctx.resource_name("backend", "api"),
            description: "Portfolio content API".to_string(),
            routes: vec![
                Route::get("/projects", "ProjectsFn"),
                Route::get("/projects/{id}", "ProjectsFn"),
                Route::get("/carousel", "CarouselFn"),
                Route::post("/images", "UploadFn"),
            ],
            cors_origins: cors_origins(config),
        },
        ctx.api_throttle(),
    )?;

    for (logical, base) in [
        ("ProjectsFn", "projects"),
        ("CarouselFn", "carousel"),
        ("UploadFn", "upload"),
    ] {
        stack.add(
            format!("{}ErrorAlarm", logical),
            ResourceSpec::Alarm(AlarmSpec::function_errors(
                ctx.resource_name("backend", &format!("{}-errors", base)),
                ValueRef::logical(logical),
            )),
        )?;
    }

    stack.output(
        "ApiEndpoint",
        ValueRef::attr("Api", "ApiEndpoint"),
        "Content API base URL",
    );
    stack.output(
        "ApiDomain",
        ValueRef::sub("${Api}.execute-api.${AWS::Region}.amazonaws.com"),
        "Content API domain, for CDN origin wiring",
    );

    Ok(stack)
}
