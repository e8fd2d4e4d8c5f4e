//! Frontend/delivery stack — static-site bucket, the CDN distribution
//! with its security headers, TLS certificate, and DNS records.

use crate::core::context::EnvContext;
use crate::core::types::{SiteConfig, ValueRef};
use crate::resources::network::{
    Behavior, CachePolicySpec, CertificateSpec, DistributionSpec, DnsRecordSpec,
    HeadersPolicySpec, Origin, OriginKind, QueryStringBehavior,
};
use crate::resources::storage::BucketSpec;
use crate::resources::ResourceSpec;
use crate::stacks::Stack;

pub fn stack(config: &SiteConfig, ctx: &EnvContext) -> Result<Stack, String> {
    let mut stack = Stack::new("frontend", format!("{} site delivery", ctx.site));

    stack.add(
        "SiteBucket",
        ResourceSpec::Bucket(BucketSpec::private(
            ctx.resource_name("frontend", "site"),
            ctx.removal_policy(),
        )),
    )?;

    stack.add(
        "SiteCachePolicy",
        ResourceSpec::CachePolicy(CachePolicySpec {
            name: ctx.resource_name("frontend", "site-cache"),
            default_ttl_secs: ctx.cache_ttl_secs(),
            max_ttl_secs: 31_536_000,
            min_ttl_secs: 0,
            query_strings: QueryStringBehavior::None,
        }),
    )?;
    stack.add(
        "ApiCachePolicy",
        ResourceSpec::CachePolicy(CachePolicySpec {
            name: ctx.resource_name("frontend", "api-cache"),
            default_ttl_secs: 0,
            max_ttl_secs: 60,
            min_ttl_secs: 0,
            query_strings: QueryStringBehavior::None,
        }),
    )?;
    stack.add(
        "SecurityHeaders",
        ResourceSpec::HeadersPolicy(HeadersPolicySpec {
            name: ctx.resource_name("frontend", "headers"),
            hsts_max_age_secs: 63_072_000,
            content_security_policy: "default-src 'self'; img-src 'self' data: https:; \
                                      style-src 'self' 'unsafe-inline'"
                .to_string(),
        }),
    )?;

    let mut aliases = Vec::new();
    let mut certificate = None;
    if let Some(ref domain) = config.domain {
        aliases.push(domain.root.clone());
        let mut alternative_names = Vec::new();
        if domain.www_alias {
            let www = format!("www.{}", domain.root);
            aliases.push(www.clone());
            alternative_names.push(www);
        }
        stack.add(
            "SiteCertificate",
            ResourceSpec::Certificate(CertificateSpec {
                domain_name: domain.root.clone(),
                alternative_names,
                hosted_zone: domain.hosted_zone.clone(),
            }),
        )?;
        certificate = Some(ValueRef::logical("SiteCertificate"));
    }

    let web_acl = if config.features.enhanced_waf {
        ValueRef::import("waf", "EnhancedWebAclArn")
    } else {
        ValueRef::import("core", "WebAclArn")
    };

    stack.add(
        "SiteDistribution",
        ResourceSpec::Distribution(DistributionSpec {
            comment: format!("{} site ({})", ctx.site, ctx.environment),
            origins: vec![
                Origin {
                    id: "site".to_string(),
                    domain: ValueRef::attr("SiteBucket", "RegionalDomainName"),
                    kind: OriginKind::Bucket,
                    origin_path: None,
                },
                Origin {
                    id: "api".to_string(),
                    domain: ValueRef::import("backend", "ApiDomain"),
                    kind: OriginKind::Http,
                    origin_path: None,
                },
            ],
            default_origin_id: "site".to_string(),
            default_cache_policy: "SiteCachePolicy".to_string(),
            headers_policy: Some("SecurityHeaders".to_string()),
            behaviors: vec![Behavior {
                path_pattern: "/api/*".to_string(),
                origin_id: "api".to_string(),
                cache_policy: "ApiCachePolicy".to_string(),
                allowed_methods: vec![
                    "GET".to_string(),
                    "HEAD".to_string(),
                    "OPTIONS".to_string(),
                    "PUT".to_string(),
                    "POST".to_string(),
                    "PATCH".to_string(),
                    "DELETE".to_string(),
                ],
            }],
            aliases,
            certificate,
            web_acl: Some(web_acl),
            default_root_object: Some("index.html".to_string()),
        }),
    )?;

    if let Some(ref domain) = config.domain {
        stack.add(
            "ApexRecord",
            ResourceSpec::DnsRecord(DnsRecordSpec {
                record_name: domain.root.clone(),
                hosted_zone: domain.hosted_zone.clone(),
                target: ValueRef::attr("SiteDistribution", "DomainName"),
            }),
        )?;
        if domain.www_alias {
            stack.add(
                "WwwRecord",
                ResourceSpec::DnsRecord(DnsRecordSpec {
                    record_name: format!("www.{}", domain.root),
                    hosted_zone: domain.hosted_zone.clone(),
                    target: ValueRef::attr("SiteDistribution", "DomainName"),
                }),
            )?;
        }
    }

    stack.output(
        "DistributionDomain",
        ValueRef::attr("SiteDistribution", "DomainName"),
        "Site distribution domain",
    );
    stack.output(
        "DistributionId",
        ValueRef::logical("SiteDistribution"),
        "Site distribution id, for cache invalidation",
    );
    stack.output(
        "SiteBucketName",
        ValueRef::logical("SiteBucket"),
        "Static-site bucket name",
    );
    stack.output(
        "SiteBucketArn",
        ValueRef::attr("SiteBucket", "Arn"),
        "Static-site bucket ARN",
    );

    Ok(stack)
}
