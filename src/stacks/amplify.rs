//! Amplify stack — managed hosting for the site frontend, wired to the
//! upstream endpoints at build time.

use crate::core::context::EnvContext;
use crate::core::types::{SiteConfig, ValueRef};
use crate::resources::hosting::{AmplifyAppSpec, AmplifyBranchSpec, AmplifyDomainSpec};
use crate::resources::ResourceSpec;
use crate::stacks::Stack;
use indexmap::IndexMap;

pub fn stack(config: &SiteConfig, ctx: &EnvContext) -> Result<Stack, String> {
    let amplify = config
        .amplify
        .as_ref()
        .ok_or("amplify_hosting is enabled but the amplify block is missing")?;

    let mut stack = Stack::new("amplify", format!("{} managed hosting", ctx.site));

    let mut environment_variables = IndexMap::new();
    environment_variables.insert(
        "API_ENDPOINT".to_string(),
        ValueRef::import("backend", "ApiEndpoint"),
    );
    if config.features.image_cdn {
        environment_variables.insert(
            "IMAGE_CDN_DOMAIN".to_string(),
            ValueRef::import("image", "ImageCdnDomain"),
        );
    }
    environment_variables.insert(
        "IDENTITY_POOL_ID".to_string(),
        ValueRef::import("core", "IdentityPoolId"),
    );

    stack.add(
        "SiteApp",
        ResourceSpec::AmplifyApp(AmplifyAppSpec {
            app_name: ctx.resource_name("amplify", "site"),
            repository: amplify.repository.clone(),
            environment_variables,
        }),
    )?;
    stack.add(
        "MainBranch",
        ResourceSpec::AmplifyBranch(AmplifyBranchSpec {
            app: "SiteApp".to_string(),
            branch_name: amplify.branch.clone(),
        }),
    )?;
    if let Some(ref domain) = config.domain {
        stack.add(
            "SiteDomain",
            ResourceSpec::AmplifyDomain(AmplifyDomainSpec {
                app: "SiteApp".to_string(),
                domain_name: domain.root.clone(),
                branch: "MainBranch".to_string(),
            }),
        )?;
    }

    stack.output(
        "AmplifyAppId",
        ValueRef::attr("SiteApp", "AppId"),
        "Managed-hosting app id",
    );
    stack.output(
        "AmplifyDefaultDomain",
        ValueRef::attr("SiteApp", "DefaultDomain"),
        "Managed-hosting default domain",
    );

    Ok(stack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stacks::test_support::production_config;

    #[test]
    fn test_app_branch_domain() {
        let config = production_config();
        let ctx = EnvContext::from_config(&config);
        let s = stack(&config, &ctx).unwrap();
        assert!(s.resources.contains_key("SiteApp"));
        assert!(s.resources.contains_key("MainBranch"));
        assert!(s.resources.contains_key("SiteDomain"));
        let app = match &s.resources["SiteApp"] {
            ResourceSpec::AmplifyApp(a) => a,
            _ => panic!("expected app"),
        };
        assert_eq!(app.repository, "https://github.com/jane-doe/portfolio");
        assert_eq!(
            app.environment_variables["API_ENDPOINT"],
            ValueRef::import("backend", "ApiEndpoint")
        );
    }

    #[test]
    fn test_missing_amplify_block_errors() {
        let mut config = production_config();
        config.amplify = None;
        let ctx = EnvContext::from_config(&config);
        let err = stack(&config, &ctx).unwrap_err();
        assert!(err.contains("amplify block"));
    }

    #[test]
    fn test_no_domain_skips_domain_resource() {
        let mut config = production_config();
        config.domain = None;
        let ctx = EnvContext::from_config(&config);
        let s = stack(&config, &ctx).unwrap();
        assert!(!s.resources.contains_key("SiteDomain"));
    }

    #[test]
    fn test_image_cdn_variable_follows_feature() {
        let mut config = production_config();
        config.features.image_cdn = false;
        let ctx = EnvContext::from_config(&config);
        let s = stack(&config, &ctx).unwrap();
        let app = match &s.resources["SiteApp"] {
            ResourceSpec::AmplifyApp(a) => a,
            _ => panic!("expected app"),
        };
        assert!(!app.environment_variables.contains_key("IMAGE_CDN_DOMAIN"));
    }
}
