//! Image-optimization stack — the transform handler behind its own
//! gateway, fronted by a dedicated distribution whose cache key carries
//! the transform query strings.

use crate::core::context::EnvContext;
use crate::core::types::{SiteConfig, ValueRef};
use crate::resources::compute::{AccessMode, CodeSource, DataBinding, FunctionSpec, Runtime};
use crate::resources::network::{
    CachePolicySpec, DistributionSpec, HttpApiSpec, Origin, OriginKind, QueryStringBehavior,
    Route,
};
use crate::resources::ResourceSpec;
use crate::stacks::Stack;
use indexmap::IndexMap;

pub fn stack(_config: &SiteConfig, ctx: &EnvContext) -> Result<Stack, String> {
    let mut stack = Stack::new("image", format!("{} image optimization", ctx.site));

    stack.add_function(
        "TransformFn",
        FunctionSpec {
            function_name: ctx.resource_name("image", "transform"),
            description: "Resizes and re-encodes media on request".to_string(),
            runtime: Runtime::Node20,
            handler: "index.handler".to_string(),
            memory_mb: 1024,
            timeout_secs: 30,
            code: CodeSource::Artifact {
                key: "handlers/transform.zip".to_string(),
            },
            bindings: vec![DataBinding::bucket(
                "MEDIA_BUCKET",
                ValueRef::import("core", "MediaBucketName"),
                ValueRef::import("core", "MediaBucketArn"),
                AccessMode::Read,
            )],
            service_grants: vec![],
            env: IndexMap::from([
                (
                    "OUTPUT_FORMATS".to_string(),
                    ValueRef::literal("webp,avif,jpeg"),
                ),
                ("DEFAULT_QUALITY".to_string(), ValueRef::literal("82")),
            ]),
            role: ValueRef::literal("unset"),
        },
    )?;

    stack.add_http_api(
        "ImageApi",
        HttpApiSpec {
            api_name: ctx.resource_name("image", "api"),
            description: "Image transform origin".to_string(),
            routes: vec![Route::get("/{proxy+}", "TransformFn")],
            cors_origins: vec![],
        },
        ctx.api_throttle(),
    )?;

    stack.add(
        "ImageCachePolicy",
        ResourceSpec::CachePolicy(CachePolicySpec {
            name: ctx.resource_name("image", "cache"),
            default_ttl_secs: ctx.cache_ttl_secs(),
            max_ttl_secs: 31_536_000,
            min_ttl_secs: 0,
            query_strings: QueryStringBehavior::Whitelist(vec![
                "w".to_string(),
                "h".to_string(),
                "q".to_string(),
                "f".to_string(),
            ]),
        }),
    )?;

    stack.add(
        "ImageDistribution",
        ResourceSpec::Distribution(DistributionSpec {
            comment: format!("{} image CDN ({})", ctx.site, ctx.environment),
            origins: vec![Origin {
                id: "transform".to_string(),
                domain: ValueRef::sub(
                    "${ImageApi}.execute-api.${AWS::Region}.amazonaws.com",
                ),
                kind: OriginKind::Http,
                origin_path: None,
            }],
            default_origin_id: "transform".to_string(),
            default_cache_policy: "ImageCachePolicy".to_string(),
            headers_policy: None,
            behaviors: vec![],
            aliases: vec![],
            certificate: None,
            web_acl: None,
            default_root_object: None,
        }),
    )?;

    stack.output(
        "ImageCdnDomain",
        ValueRef::attr("ImageDistribution", "DomainName"),
        "Image CDN domain",
    );

    Ok(stack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stacks::test_support::production_config;

    fn build() -> Stack {
        let config = production_config();
        let ctx = EnvContext::from_config(&config);
        stack(&config, &ctx).unwrap()
    }

    #[test]
    fn test_transform_fn_bounds() {
        let s = build();
        let f = match &s.resources["TransformFn"] {
            ResourceSpec::Function(f) => f,
            _ => panic!("expected function"),
        };
        assert_eq!(f.memory_mb, 1024);
        assert_eq!(f.timeout_secs, 30);
        assert_eq!(f.bindings.len(), 1);
        assert_eq!(f.bindings[0].access, AccessMode::Read);
        assert_eq!(f.env["OUTPUT_FORMATS"], ValueRef::literal("webp,avif,jpeg"));
    }

    #[test]
    fn test_cache_key_query_strings() {
        let s = build();
        let cache = match &s.resources["ImageCachePolicy"] {
            ResourceSpec::CachePolicy(c) => c,
            _ => panic!("expected cache policy"),
        };
        assert_eq!(
            cache.query_strings,
            QueryStringBehavior::Whitelist(vec![
                "w".to_string(),
                "h".to_string(),
                "q".to_string(),
                "f".to_string()
            ])
        );
    }

    #[test]
    fn test_distribution_fronts_gateway() {
        let s = build();
        let dist = match &s.resources["ImageDistribution"] {
            ResourceSpec::Distribution(d) => d,
            _ => panic!("expected distribution"),
        };
        assert_eq!(dist.origins.len(), 1);
        assert_eq!(dist.origins[0].kind, OriginKind::Http);
        assert_eq!(
            dist.origins[0].domain,
            ValueRef::sub("${ImageApi}.execute-api.${AWS::Region}.amazonaws.com")
        );
        assert!(s.resources.contains_key("GetProxyRoute"));
        assert!(s.outputs.contains_key("ImageCdnDomain"));
    }
}
