//! Stack builders — one module per deployable unit.
//!
//! A `Stack` is a named bundle of resource descriptors plus the outputs it
//! exports. Builders insert composite resources through the `add_*`
//! helpers so derived pieces (execution roles, gateway stages, route
//! integrations) are wired consistently, and `assemble` produces the
//! enabled stack set for one configuration.

pub mod amplify;
pub mod backend;
pub mod backup;
pub mod core;
pub mod cost;
pub mod dev;
pub mod frontend;
pub mod image;
pub mod seo;
pub mod security;
pub mod waf;

use crate::core::context::{EnvContext, Throttle};
use crate::core::types::{Output, SiteConfig, ValueRef};
use crate::resources::compute::FunctionSpec;
use crate::resources::network::{ApiIntegrationSpec, ApiRouteSpec, ApiStageSpec, HttpApiSpec};
use crate::resources::ResourceSpec;
use indexmap::IndexMap;

/// A named, deployable unit of declared resources.
#[derive(Debug, Clone)]
pub struct Stack {
    pub name: String,
    pub description: String,
    /// Logical id → descriptor, in declaration order
    pub resources: IndexMap<String, ResourceSpec>,
    /// Output key → exported value, in declaration order
    pub outputs: IndexMap<String, Output>,
}

impl Stack {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            resources: IndexMap::new(),
            outputs: IndexMap::new(),
        }
    }

    /// Insert one resource. Logical ids are unique within a stack.
    pub fn add(&mut self, logical_id: impl Into<String>, spec: ResourceSpec) -> Result<(), String> {
        let logical_id = logical_id.into();
        if self.resources.contains_key(&logical_id) {
            return Err(format!(
                "stack '{}' declares logical id '{}' twice",
                self.name, logical_id
            ));
        }
        self.resources.insert(logical_id, spec);
        Ok(())
    }

    /// Insert a function together with its derived execution role. The
    /// role is always `<id>Role` and carries exactly the binding grants.
    pub fn add_function(
        &mut self,
        logical_id: impl Into<String>,
        mut spec: FunctionSpec,
    ) -> Result<(), String> {
        let logical_id = logical_id.into();
        let role_id = format!("{}Role", logical_id);
        let role_name = format!("{}-role", spec.function_name);
        let role = spec.execution_role(role_name);
        spec.role = ValueRef::attr(role_id.clone(), "Arn");
        self.add(role_id, ResourceSpec::Role(role))?;
        self.add(logical_id, ResourceSpec::Function(spec))
    }

    /// Insert an HTTP gateway with its stage, one integration per target
    /// function, and one route per route-table entry.
    pub fn add_http_api(
        &mut self,
        logical_id: impl Into<String>,
        spec: HttpApiSpec,
        throttle: Throttle,
    ) -> Result<(), String> {
        let logical_id = logical_id.into();
        let routes = spec.routes.clone();
        self.add(logical_id.clone(), ResourceSpec::HttpApi(spec))?;
        self.add(
            format!("{}Stage", logical_id),
            ResourceSpec::ApiStage(ApiStageSpec {
                api: logical_id.clone(),
                throttle,
            }),
        )?;

        for route in &routes {
            let integration_id = format!("{}Integration", route.function);
            if !self.resources.contains_key(&integration_id) {
                self.add(
                    integration_id.clone(),
                    ResourceSpec::ApiIntegration(ApiIntegrationSpec {
                        api: logical_id.clone(),
                        function: route.function.clone(),
                    }),
                )?;
            }
            self.add(
                route_logical_id(&route.route_key()),
                ResourceSpec::ApiRoute(ApiRouteSpec {
                    api: logical_id.clone(),
                    route_key: route.route_key(),
                    integration: integration_id,
                }),
            )?;
        }
        Ok(())
    }

    /// Declare an exported output.
    pub fn output(
        &mut self,
        key: impl Into<String>,
        value: ValueRef,
        description: impl Into<String>,
    ) {
        self.outputs
            .insert(key.into(), Output::new(value, description));
    }

    /// Every (stack, output) pair this stack imports.
    pub fn consumed_imports(&self) -> Vec<(String, String)> {
        let mut imports = Vec::new();
        for spec in self.resources.values() {
            for import in spec.imports() {
                if !imports.contains(&import) {
                    imports.push(import);
                }
            }
        }
        imports
    }
}

/// Turn a route key like `GET /projects/{id}` into a logical id like
/// `GetProjectsIdRoute`.
pub fn route_logical_id(route_key: &str) -> String {
    let mut id = String::new();
    let mut upper_next = true;
    for ch in route_key.chars() {
        if ch.is_ascii_alphanumeric() {
            if upper_next {
                id.extend(ch.to_uppercase());
                upper_next = false;
            } else {
                id.extend(ch.to_lowercase());
            }
        } else {
            upper_next = true;
        }
    }
    id.push_str("Route");
    id
}

/// The assembled, ordered stack set for one configuration.
#[derive(Debug, Clone)]
pub struct StackSet {
    pub stacks: Vec<Stack>,
}

impl StackSet {
    pub fn get(&self, name: &str) -> Option<&Stack> {
        self.stacks.iter().find(|s| s.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.stacks.iter().map(|s| s.name.clone()).collect()
    }

    pub fn total_resources(&self) -> usize {
        self.stacks.iter().map(|s| s.resources.len()).sum()
    }
}

/// Build the enabled stacks for a configuration, in declaration order.
///
/// With `simple_dev` on (dev only), the delivery stacks collapse into the
/// single dev stack; the auxiliary stacks still follow their toggles.
pub fn assemble(config: &SiteConfig) -> Result<StackSet, String> {
    let ctx = EnvContext::from_config(config);
    let simple = config.features.simple_dev;
    let mut stacks = vec![core::stack(config, &ctx)?];

    if config.features.enhanced_waf {
        stacks.push(waf::stack(config, &ctx)?);
    }
    if config.features.security_logging {
        stacks.push(security::stack(config, &ctx)?);
    }
    if simple {
        stacks.push(dev::stack(config, &ctx)?);
    } else {
        stacks.push(backend::stack(config, &ctx)?);
        stacks.push(frontend::stack(config, &ctx)?);
        if config.features.image_cdn {
            stacks.push(image::stack(config, &ctx)?);
        }
        if config.features.seo {
            stacks.push(seo::stack(config, &ctx)?);
        }
    }
    if config.features.backup {
        stacks.push(backup::stack(config, &ctx)?);
    }
    if config.features.cost_controls {
        stacks.push(cost::stack(config, &ctx)?);
    }
    if config.features.amplify_hosting {
        stacks.push(amplify::stack(config, &ctx)?);
    }

    Ok(StackSet { stacks })
}

/// Origins the browser may call the content API from.
pub fn cors_origins(config: &SiteConfig) -> Vec<String> {
    match &config.domain {
        Some(domain) => {
            let mut origins = vec![format!("https://{}", domain.root)];
            if domain.www_alias {
                origins.push(format!("https://www.{}", domain.root));
            }
            origins
        }
        None => vec!["*".to_string()],
    }
}

/// Canonical site URL, when a custom domain is configured.
pub fn site_url(config: &SiteConfig) -> Option<String> {
    config
        .domain
        .as_ref()
        .map(|d| format!("https://{}", d.root))
}
