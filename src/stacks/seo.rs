//! SEO-automation stack — meta-tag, sitemap, and robots handlers with
//! their gateway and daily regeneration schedules.

use crate::core::context::EnvContext;
use crate::core::types::{SiteConfig, ValueRef};
use crate::resources::compute::{
    AccessMode, CodeSource, DataBinding, FunctionSpec, Runtime, ScheduleSpec,
};
use crate::resources::network::{HttpApiSpec, Route};
use crate::resources::ResourceSpec;
use crate::stacks::{cors_origins, site_url, Stack};
use indexmap::IndexMap;

fn seo_handler(
    config: &SiteConfig,
    ctx: &EnvContext,
    base: &str,
    description: &str,
    writes_site: bool,
) -> FunctionSpec {
    let mut bindings = vec![DataBinding::table(
        "TABLE_NAME",
        ValueRef::import("core", "TableName"),
        ValueRef::import("core", "TableArn"),
        AccessMode::Read,
    )];
    if writes_site {
        bindings.push(DataBinding::bucket(
            "SITE_BUCKET",
            ValueRef::import("frontend", "SiteBucketName"),
            ValueRef::import("frontend", "SiteBucketArn"),
            AccessMode::Write,
        ));
    }
    let mut env = IndexMap::new();
    if let Some(url) = site_url(config) {
        env.insert("SITE_URL".to_string(), ValueRef::literal(url));
    }
    FunctionSpec {
        function_name: ctx.resource_name("seo", base),
        description: description.to_string(),
        runtime: Runtime::Node20,
        handler: "index.handler".to_string(),
        memory_mb: 256,
        timeout_secs: 30,
        code: CodeSource::Artifact {
            key: format!("handlers/seo-{}.zip", base),
        },
        bindings,
        service_grants: vec![],
        env,
        role: ValueRef::literal("unset"),
    }
}

pub fn stack(config: &SiteConfig, ctx: &EnvContext) -> Result<Stack, String> {
    let mut stack = Stack::new("seo", format!("{} SEO automation", ctx.site));

    stack.add_function(
        "MetaFn",
        seo_handler(
            config,
            ctx,
            "meta",
            "Serves per-page meta tags from project metadata",
            false,
        ),
    )?;
    stack.add_function(
        "SitemapFn",
        seo_handler(
            config,
            ctx,
            "sitemap",
            "Regenerates sitemap.xml into the site bucket",
            true,
        ),
    )?;
    stack.add_function(
        "RobotsFn",
        seo_handler(
            config,
            ctx,
            "robots",
            "Regenerates robots.txt into the site bucket",
            true,
        ),
    )?;

    stack.add_http_api(
        "SeoApi",
        HttpApiSpec {
            api_name: ctx.resource_name("seo", "api"),
            description: "SEO automation API".to_string(),
            routes: vec![
                Route::get("/meta", "MetaFn"),
                Route::post("/sitemap", "SitemapFn"),
                Route::post("/robots", "RobotsFn"),
            ],
            cors_origins: cors_origins(config),
        },
        ctx.api_throttle(),
    )?;

    stack.add(
        "SitemapDaily",
        ResourceSpec::Schedule(ScheduleSpec {
            rule_name: ctx.resource_name("seo", "sitemap-daily"),
            expression: "cron(0 3 * * ? *)".to_string(),
            target_function: "SitemapFn".to_string(),
            enabled: true,
        }),
    )?;
    stack.add(
        "RobotsDaily",
        ResourceSpec::Schedule(ScheduleSpec {
            rule_name: ctx.resource_name("seo", "robots-daily"),
            expression: "cron(30 3 * * ? *)".to_string(),
            target_function: "RobotsFn".to_string(),
            enabled: true,
        }),
    )?;

    stack.output(
        "SeoApiEndpoint",
        ValueRef::attr("SeoApi", "ApiEndpoint"),
        "SEO automation API base URL",
    );

    Ok(stack)
}
