//! Enhanced-WAF stack — the deeper rule set for enhanced/enterprise
//! phases: more managed groups, a stricter rate rule, optional geo block.

use crate::core::context::EnvContext;
use crate::core::types::{DeploymentPhase, SiteConfig, ValueRef};
use crate::resources::protection::{RateRule, WafScope, WebAclSpec};
use crate::resources::ResourceSpec;
use crate::stacks::Stack;

/// Stricter than the baseline: enterprise halves the enhanced limit.
fn rate_limit(phase: DeploymentPhase) -> u64 {
    match phase {
        DeploymentPhase::Enterprise => 500,
        _ => 1000,
    }
}

pub fn stack(config: &SiteConfig, ctx: &EnvContext) -> Result<Stack, String> {
    let mut stack = Stack::new("waf", format!("{} enhanced WAF", ctx.site));

    stack.add(
        "EnhancedWaf",
        ResourceSpec::WebAcl(WebAclSpec {
            acl_name: ctx.resource_name("waf", "enhanced"),
            scope: WafScope::Cloudfront,
            managed_rule_groups: vec![
                "AWSManagedRulesCommonRuleSet".to_string(),
                "AWSManagedRulesKnownBadInputsRuleSet".to_string(),
                "AWSManagedRulesAmazonIpReputationList".to_string(),
            ],
            rate_rule: Some(RateRule {
                limit: rate_limit(ctx.phase),
            }),
            geo_block: config.geo_block.clone(),
        }),
    )?;

    stack.output(
        "EnhancedWebAclArn",
        ValueRef::attr("EnhancedWaf", "Arn"),
        "Enhanced web ACL ARN",
    );

    Ok(stack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stacks::test_support::production_config;

    fn build(config: &SiteConfig) -> Stack {
        let ctx = EnvContext::from_config(config);
        stack(config, &ctx).unwrap()
    }

    #[test]
    fn test_managed_groups() {
        let s = build(&production_config());
        let acl = match &s.resources["EnhancedWaf"] {
            ResourceSpec::WebAcl(w) => w,
            _ => panic!("expected web acl"),
        };
        assert_eq!(acl.managed_rule_groups.len(), 3);
        assert_eq!(acl.scope, WafScope::Cloudfront);
    }

    #[test]
    fn test_rate_limit_tightens_with_phase() {
        let config = production_config(); // enhanced
        let s = build(&config);
        let acl = match &s.resources["EnhancedWaf"] {
            ResourceSpec::WebAcl(w) => w,
            _ => panic!("expected web acl"),
        };
        assert_eq!(acl.rate_rule.as_ref().unwrap().limit, 1000);

        let mut config = production_config();
        config.phase = DeploymentPhase::Enterprise;
        let s = build(&config);
        let acl = match &s.resources["EnhancedWaf"] {
            ResourceSpec::WebAcl(w) => w,
            _ => panic!("expected web acl"),
        };
        assert_eq!(acl.rate_rule.as_ref().unwrap().limit, 500);
    }

    #[test]
    fn test_geo_block_from_config() {
        let mut config = production_config();
        config.geo_block = vec!["XX".to_string(), "YY".to_string()];
        let s = build(&config);
        let acl = match &s.resources["EnhancedWaf"] {
            ResourceSpec::WebAcl(w) => w,
            _ => panic!("expected web acl"),
        };
        assert_eq!(acl.geo_block, vec!["XX", "YY"]);
    }
}
