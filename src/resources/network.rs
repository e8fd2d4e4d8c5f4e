//! Network resources — the HTTP gateway, CDN distributions, cache and
//! header policies, TLS certificates, and DNS records.

use crate::core::context::{EnvContext, Throttle};
use crate::core::types::ValueRef;
use crate::resources::ref_json;
use serde_json::{json, Value};
use std::fmt;

/// Hosted-zone id CloudFront distributions alias into. Fixed by the
/// provider, identical in every account.
pub const CLOUDFRONT_ZONE_ID: &str = "Z2FDTNDATAQYW2";

// ============================================================================
// HTTP gateway
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// One route in the gateway's route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub method: HttpMethod,
    pub path: String,
    /// Logical id of the handler function in the same stack
    pub function: String,
}

impl Route {
    pub fn get(path: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            function: function.into(),
        }
    }

    pub fn post(path: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            function: function.into(),
        }
    }

    /// The gateway route key, e.g. `GET /projects`.
    pub fn route_key(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// An HTTP gateway fronting handler functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpApiSpec {
    pub api_name: String,
    pub description: String,
    pub routes: Vec<Route>,
    pub cors_origins: Vec<String>,
}

pub fn http_api_properties(spec: &HttpApiSpec, _ctx: &EnvContext) -> Value {
    let mut props = serde_json::Map::new();
    props.insert("Name".to_string(), json!(spec.api_name));
    props.insert("Description".to_string(), json!(spec.description));
    props.insert("ProtocolType".to_string(), json!("HTTP"));
    if !spec.cors_origins.is_empty() {
        props.insert(
            "CorsConfiguration".to_string(),
            json!({
                "AllowOrigins": spec.cors_origins,
                "AllowMethods": ["GET", "POST", "PUT", "DELETE"],
                "AllowHeaders": ["content-type"],
                "MaxAge": 600
            }),
        );
    }
    Value::Object(props)
}

/// The gateway's default stage, carrying the throttling limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiStageSpec {
    /// Logical id of the gateway in the same stack
    pub api: String,
    pub throttle: Throttle,
}

pub fn api_stage_properties(spec: &ApiStageSpec, _ctx: &EnvContext) -> Value {
    json!({
        "ApiId": { "Ref": spec.api },
        "StageName": "$default",
        "AutoDeploy": true,
        "DefaultRouteSettings": {
            "ThrottlingRateLimit": spec.throttle.rate_limit,
            "ThrottlingBurstLimit": spec.throttle.burst_limit
        }
    })
}

/// A proxy integration between the gateway and one function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiIntegrationSpec {
    pub api: String,
    /// Logical id of the handler function in the same stack
    pub function: String,
}

pub fn api_integration_properties(spec: &ApiIntegrationSpec, ctx: &EnvContext) -> Value {
    json!({
        "ApiId": { "Ref": spec.api },
        "IntegrationType": "AWS_PROXY",
        "IntegrationUri": {
            "Fn::Join": ["", [
                format!("arn:aws:apigateway:{}:lambda:path/2015-03-31/functions/", ctx.region),
                { "Fn::GetAtt": [spec.function, "Arn"] },
                "/invocations"
            ]]
        },
        "PayloadFormatVersion": "2.0"
    })
}

/// A route entry pointing at an integration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRouteSpec {
    pub api: String,
    pub route_key: String,
    /// Logical id of the integration in the same stack
    pub integration: String,
}

pub fn api_route_properties(spec: &ApiRouteSpec, _ctx: &EnvContext) -> Value {
    json!({
        "ApiId": { "Ref": spec.api },
        "RouteKey": spec.route_key,
        "Target": {
            "Fn::Join": ["/", ["integrations", { "Ref": spec.integration }]]
        }
    })
}

// ============================================================================
// CDN
// ============================================================================

/// What an origin points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginKind {
    /// A private bucket, reached through the distribution only
    Bucket,
    /// An HTTPS endpoint (gateway, function URL)
    Http,
}

/// One origin of a distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub id: String,
    pub domain: ValueRef,
    pub kind: OriginKind,
    pub origin_path: Option<String>,
}

/// One behavior in the path-routing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Behavior {
    pub path_pattern: String,
    /// Origin id this path routes to; must be declared in the same
    /// distribution
    pub origin_id: String,
    /// Logical id of the cache policy in the same stack
    pub cache_policy: String,
    pub allowed_methods: Vec<String>,
}

/// A content-delivery distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionSpec {
    pub comment: String,
    pub origins: Vec<Origin>,
    /// Origin id the default behavior routes to
    pub default_origin_id: String,
    /// Logical id of the default cache policy in the same stack
    pub default_cache_policy: String,
    /// Logical id of the response-headers policy, if any
    pub headers_policy: Option<String>,
    pub behaviors: Vec<Behavior>,
    pub aliases: Vec<String>,
    pub certificate: Option<ValueRef>,
    pub web_acl: Option<ValueRef>,
    pub default_root_object: Option<String>,
}

pub fn distribution_properties(spec: &DistributionSpec, ctx: &EnvContext) -> Value {
    let origins: Vec<Value> = spec.origins.iter().map(|o| origin_json(o, ctx)).collect();

    let mut default_behavior = serde_json::Map::new();
    default_behavior.insert(
        "TargetOriginId".to_string(),
        json!(spec.default_origin_id),
    );
    default_behavior.insert(
        "ViewerProtocolPolicy".to_string(),
        json!("redirect-to-https"),
    );
    default_behavior.insert(
        "CachePolicyId".to_string(),
        json!({ "Ref": spec.default_cache_policy }),
    );
    default_behavior.insert("Compress".to_string(), json!(true));
    if let Some(ref headers) = spec.headers_policy {
        default_behavior.insert(
            "ResponseHeadersPolicyId".to_string(),
            json!({ "Ref": headers }),
        );
    }

    let behaviors: Vec<Value> = spec
        .behaviors
        .iter()
        .map(|b| {
            json!({
                "PathPattern": b.path_pattern,
                "TargetOriginId": b.origin_id,
                "ViewerProtocolPolicy": "redirect-to-https",
                "CachePolicyId": { "Ref": b.cache_policy },
                "AllowedMethods": b.allowed_methods,
                "Compress": true
            })
        })
        .collect();

    let viewer_certificate = match &spec.certificate {
        Some(cert) => json!({
            "AcmCertificateArn": ref_json(cert, ctx),
            "SslSupportMethod": "sni-only",
            "MinimumProtocolVersion": "TLSv1.2_2021"
        }),
        None => json!({ "CloudFrontDefaultCertificate": true }),
    };

    let mut config = serde_json::Map::new();
    config.insert("Enabled".to_string(), json!(true));
    config.insert("Comment".to_string(), json!(spec.comment));
    config.insert("HttpVersion".to_string(), json!("http2"));
    config.insert("PriceClass".to_string(), json!("PriceClass_100"));
    config.insert("Origins".to_string(), json!(origins));
    config.insert(
        "DefaultCacheBehavior".to_string(),
        Value::Object(default_behavior),
    );
    if !behaviors.is_empty() {
        config.insert("CacheBehaviors".to_string(), json!(behaviors));
    }
    if !spec.aliases.is_empty() {
        config.insert("Aliases".to_string(), json!(spec.aliases));
    }
    config.insert("ViewerCertificate".to_string(), viewer_certificate);
    if let Some(ref root) = spec.default_root_object {
        config.insert("DefaultRootObject".to_string(), json!(root));
    }
    if let Some(ref acl) = spec.web_acl {
        config.insert("WebACLId".to_string(), ref_json(acl, ctx));
    }

    json!({ "DistributionConfig": Value::Object(config) })
}

fn origin_json(origin: &Origin, ctx: &EnvContext) -> Value {
    let mut o = serde_json::Map::new();
    o.insert("Id".to_string(), json!(origin.id));
    o.insert("DomainName".to_string(), ref_json(&origin.domain, ctx));
    if let Some(ref path) = origin.origin_path {
        o.insert("OriginPath".to_string(), json!(path));
    }
    match origin.kind {
        OriginKind::Bucket => {
            o.insert(
                "S3OriginConfig".to_string(),
                json!({ "OriginAccessIdentity": "" }),
            );
        }
        OriginKind::Http => {
            o.insert(
                "CustomOriginConfig".to_string(),
                json!({
                    "OriginProtocolPolicy": "https-only",
                    "OriginSSLProtocols": ["TLSv1.2"]
                }),
            );
        }
    }
    Value::Object(o)
}

/// How the cache key treats query strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryStringBehavior {
    None,
    Whitelist(Vec<String>),
}

/// A cache policy shared by one or more behaviors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicySpec {
    pub name: String,
    pub default_ttl_secs: u64,
    pub max_ttl_secs: u64,
    pub min_ttl_secs: u64,
    pub query_strings: QueryStringBehavior,
}

pub fn cache_policy_properties(spec: &CachePolicySpec, _ctx: &EnvContext) -> Value {
    let query_config = match &spec.query_strings {
        QueryStringBehavior::None => json!({ "QueryStringBehavior": "none" }),
        QueryStringBehavior::Whitelist(keys) => json!({
            "QueryStringBehavior": "whitelist",
            "QueryStrings": keys
        }),
    };
    json!({
        "CachePolicyConfig": {
            "Name": spec.name,
            "DefaultTTL": spec.default_ttl_secs,
            "MaxTTL": spec.max_ttl_secs,
            "MinTTL": spec.min_ttl_secs,
            "ParametersInCacheKeyAndForwardedToOrigin": {
                "EnableAcceptEncodingGzip": true,
                "EnableAcceptEncodingBrotli": true,
                "QueryStringsConfig": query_config,
                "HeadersConfig": { "HeaderBehavior": "none" },
                "CookiesConfig": { "CookieBehavior": "none" }
            }
        }
    })
}

/// Security headers attached to every response from a distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadersPolicySpec {
    pub name: String,
    pub hsts_max_age_secs: u64,
    pub content_security_policy: String,
}

pub fn headers_policy_properties(spec: &HeadersPolicySpec, _ctx: &EnvContext) -> Value {
    json!({
        "ResponseHeadersPolicyConfig": {
            "Name": spec.name,
            "SecurityHeadersConfig": {
                "StrictTransportSecurity": {
                    "AccessControlMaxAgeSec": spec.hsts_max_age_secs,
                    "IncludeSubdomains": true,
                    "Override": true
                },
                "ContentTypeOptions": { "Override": true },
                "FrameOptions": { "FrameOption": "DENY", "Override": true },
                "ReferrerPolicy": {
                    "ReferrerPolicy": "strict-origin-when-cross-origin",
                    "Override": true
                },
                "ContentSecurityPolicy": {
                    "ContentSecurityPolicy": spec.content_security_policy,
                    "Override": true
                }
            }
        }
    })
}

// ============================================================================
// TLS and DNS
// ============================================================================

/// A DNS-validated TLS certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateSpec {
    pub domain_name: String,
    pub alternative_names: Vec<String>,
    pub hosted_zone: String,
}

pub fn certificate_properties(spec: &CertificateSpec, _ctx: &EnvContext) -> Value {
    let mut props = serde_json::Map::new();
    props.insert("DomainName".to_string(), json!(spec.domain_name));
    if !spec.alternative_names.is_empty() {
        props.insert(
            "SubjectAlternativeNames".to_string(),
            json!(spec.alternative_names),
        );
    }
    props.insert("ValidationMethod".to_string(), json!("DNS"));
    let mut options = vec![json!({
        "DomainName": spec.domain_name,
        "HostedZoneId": spec.hosted_zone
    })];
    for name in &spec.alternative_names {
        options.push(json!({
            "DomainName": name,
            "HostedZoneId": spec.hosted_zone
        }));
    }
    props.insert("DomainValidationOptions".to_string(), json!(options));
    Value::Object(props)
}

/// An alias record pointing a name at a distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecordSpec {
    pub record_name: String,
    pub hosted_zone: String,
    pub target: ValueRef,
}

pub fn dns_record_properties(spec: &DnsRecordSpec, ctx: &EnvContext) -> Value {
    json!({
        "Name": spec.record_name,
        "Type": "A",
        "HostedZoneId": spec.hosted_zone,
        "AliasTarget": {
            "DNSName": ref_json(&spec.target, ctx),
            "HostedZoneId": CLOUDFRONT_ZONE_ID
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{DeploymentPhase, Environment};
    use indexmap::IndexMap;

    fn ctx() -> EnvContext {
        EnvContext {
            site: "jane-doe".to_string(),
            environment: Environment::Production,
            phase: DeploymentPhase::Minimal,
            region: "us-east-1".to_string(),
            tags: IndexMap::new(),
        }
    }

    #[test]
    fn test_route_key() {
        assert_eq!(Route::get("/projects", "ProjectsFn").route_key(), "GET /projects");
        assert_eq!(Route::post("/images", "UploadFn").route_key(), "POST /images");
    }

    #[test]
    fn test_http_api_properties() {
        let api = HttpApiSpec {
            api_name: "jane-doe-backend-api-production".to_string(),
            description: "Portfolio content API".to_string(),
            routes: vec![Route::get("/projects", "ProjectsFn")],
            cors_origins: vec!["https://jane-doe.photos".to_string()],
        };
        let v = http_api_properties(&api, &ctx());
        assert_eq!(v["ProtocolType"], "HTTP");
        assert_eq!(
            v["CorsConfiguration"]["AllowOrigins"][0],
            "https://jane-doe.photos"
        );
    }

    #[test]
    fn test_http_api_no_cors_block_when_empty() {
        let api = HttpApiSpec {
            api_name: "a".to_string(),
            description: String::new(),
            routes: vec![],
            cors_origins: vec![],
        };
        let v = http_api_properties(&api, &ctx());
        assert!(v.get("CorsConfiguration").is_none());
    }

    #[test]
    fn test_api_stage_throttle() {
        let stage = ApiStageSpec {
            api: "Api".to_string(),
            throttle: Throttle {
                rate_limit: 50,
                burst_limit: 100,
            },
        };
        let v = api_stage_properties(&stage, &ctx());
        assert_eq!(v["StageName"], "$default");
        assert_eq!(v["DefaultRouteSettings"]["ThrottlingRateLimit"], 50);
        assert_eq!(v["DefaultRouteSettings"]["ThrottlingBurstLimit"], 100);
    }

    #[test]
    fn test_api_integration_uri() {
        let i = ApiIntegrationSpec {
            api: "Api".to_string(),
            function: "ProjectsFn".to_string(),
        };
        let v = api_integration_properties(&i, &ctx());
        assert_eq!(v["IntegrationType"], "AWS_PROXY");
        assert_eq!(v["PayloadFormatVersion"], "2.0");
        let joined = &v["IntegrationUri"]["Fn::Join"][1];
        assert!(joined[0].as_str().unwrap().contains("us-east-1"));
        assert_eq!(joined[1], json!({ "Fn::GetAtt": ["ProjectsFn", "Arn"] }));
    }

    #[test]
    fn test_api_route_target() {
        let r = ApiRouteSpec {
            api: "Api".to_string(),
            route_key: "GET /projects".to_string(),
            integration: "ProjectsIntegration".to_string(),
        };
        let v = api_route_properties(&r, &ctx());
        assert_eq!(v["RouteKey"], "GET /projects");
        assert_eq!(
            v["Target"]["Fn::Join"][1],
            json!(["integrations", { "Ref": "ProjectsIntegration" }])
        );
    }

    fn make_distribution() -> DistributionSpec {
        DistributionSpec {
            comment: "jane-doe site (production)".to_string(),
            origins: vec![
                Origin {
                    id: "site".to_string(),
                    domain: ValueRef::attr("SiteBucket", "RegionalDomainName"),
                    kind: OriginKind::Bucket,
                    origin_path: None,
                },
                Origin {
                    id: "api".to_string(),
                    domain: ValueRef::literal("abc123.execute-api.us-east-1.amazonaws.com"),
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
            aliases: vec!["jane-doe.photos".to_string()],
            certificate: Some(ValueRef::logical("SiteCertificate")),
            web_acl: Some(ValueRef::import("core", "WebAclArn")),
            default_root_object: Some("index.html".to_string()),
        }
    }

    #[test]
    fn test_distribution_properties() {
        let v = distribution_properties(&make_distribution(), &ctx());
        let config = &v["DistributionConfig"];
        assert_eq!(config["Enabled"], true);
        assert_eq!(config["Origins"].as_array().unwrap().len(), 2);
        assert_eq!(
            config["Origins"][0]["S3OriginConfig"]["OriginAccessIdentity"],
            ""
        );
        assert_eq!(
            config["Origins"][1]["CustomOriginConfig"]["OriginProtocolPolicy"],
            "https-only"
        );
        assert_eq!(config["DefaultCacheBehavior"]["TargetOriginId"], "site");
        assert_eq!(
            config["DefaultCacheBehavior"]["ResponseHeadersPolicyId"],
            json!({ "Ref": "SecurityHeaders" })
        );
        assert_eq!(config["CacheBehaviors"][0]["PathPattern"], "/api/*");
        assert_eq!(config["Aliases"][0], "jane-doe.photos");
        assert_eq!(
            config["ViewerCertificate"]["AcmCertificateArn"],
            json!({ "Ref": "SiteCertificate" })
        );
        assert_eq!(
            config["WebACLId"],
            json!({ "Fn::ImportValue": "jane-doe-core-WebAclArn-production" })
        );
        assert_eq!(config["DefaultRootObject"], "index.html");
    }

    #[test]
    fn test_distribution_default_certificate() {
        let mut d = make_distribution();
        d.certificate = None;
        d.aliases.clear();
        let v = distribution_properties(&d, &ctx());
        let config = &v["DistributionConfig"];
        assert_eq!(
            config["ViewerCertificate"]["CloudFrontDefaultCertificate"],
            true
        );
        assert!(config.get("Aliases").is_none());
    }

    #[test]
    fn test_cache_policy_whitelist() {
        let p = CachePolicySpec {
            name: "jane-doe-image-cache-production".to_string(),
            default_ttl_secs: 86_400,
            max_ttl_secs: 31_536_000,
            min_ttl_secs: 0,
            query_strings: QueryStringBehavior::Whitelist(vec![
                "w".to_string(),
                "h".to_string(),
                "q".to_string(),
                "f".to_string(),
            ]),
        };
        let v = cache_policy_properties(&p, &ctx());
        let config = &v["CachePolicyConfig"];
        assert_eq!(config["DefaultTTL"], 86_400);
        let qs = &config["ParametersInCacheKeyAndForwardedToOrigin"]["QueryStringsConfig"];
        assert_eq!(qs["QueryStringBehavior"], "whitelist");
        assert_eq!(qs["QueryStrings"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_cache_policy_no_query_strings() {
        let p = CachePolicySpec {
            name: "n".to_string(),
            default_ttl_secs: 300,
            max_ttl_secs: 600,
            min_ttl_secs: 0,
            query_strings: QueryStringBehavior::None,
        };
        let v = cache_policy_properties(&p, &ctx());
        assert_eq!(
            v["CachePolicyConfig"]["ParametersInCacheKeyAndForwardedToOrigin"]
                ["QueryStringsConfig"]["QueryStringBehavior"],
            "none"
        );
    }

    #[test]
    fn test_headers_policy_properties() {
        let p = HeadersPolicySpec {
            name: "jane-doe-frontend-headers-production".to_string(),
            hsts_max_age_secs: 63_072_000,
            content_security_policy: "default-src 'self'".to_string(),
        };
        let v = headers_policy_properties(&p, &ctx());
        let sec = &v["ResponseHeadersPolicyConfig"]["SecurityHeadersConfig"];
        assert_eq!(sec["StrictTransportSecurity"]["AccessControlMaxAgeSec"], 63_072_000);
        assert_eq!(sec["FrameOptions"]["FrameOption"], "DENY");
        assert_eq!(
            sec["ContentSecurityPolicy"]["ContentSecurityPolicy"],
            "default-src 'self'"
        );
    }

    #[test]
    fn test_certificate_validation_options() {
        let c = CertificateSpec {
            domain_name: "jane-doe.photos".to_string(),
            alternative_names: vec!["www.jane-doe.photos".to_string()],
            hosted_zone: "Z0123456789ABC".to_string(),
        };
        let v = certificate_properties(&c, &ctx());
        assert_eq!(v["ValidationMethod"], "DNS");
        assert_eq!(v["SubjectAlternativeNames"][0], "www.jane-doe.photos");
        assert_eq!(v["DomainValidationOptions"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_dns_record_alias() {
        let r = DnsRecordSpec {
            record_name: "jane-doe.photos".to_string(),
            hosted_zone: "Z0123456789ABC".to_string(),
            target: ValueRef::attr("SiteDistribution", "DomainName"),
        };
        let v = dns_record_properties(&r, &ctx());
        assert_eq!(v["Type"], "A");
        assert_eq!(v["AliasTarget"]["HostedZoneId"], CLOUDFRONT_ZONE_ID);
        assert_eq!(
            v["AliasTarget"]["DNSName"],
            json!({ "Fn::GetAtt": ["SiteDistribution", "DomainName"] })
        );
    }
}
