//! Template synthesis — render each stack into a provisioning template.
//!
//! Dispatches every descriptor to its resources module for property JSON,
//! attaches deletion policies and export names, and writes the template
//! files plus a manifest. Resource order inside a template follows
//! declaration order.

use super::context::EnvContext;
use super::graph;
use super::hash;
use super::journal::now_iso8601;
use super::types::{Manifest, ResourceEntry, StackLock, SynthLock, TemplateEntry};
use crate::resources::{
    self, compute, hosting, identity, network, protection, storage, ResourceSpec,
};
use crate::stacks::{Stack, StackSet};
use indexmap::IndexMap;
use serde_json::{json, Value};
use std::path::Path;

/// One rendered stack.
#[derive(Debug, Clone)]
pub struct SynthesizedStack {
    pub name: String,
    pub template: Value,
    pub template_json: String,
    pub template_hash: String,
    /// Per-resource type and content hash, in declaration order
    pub resources: IndexMap<String, ResourceEntry>,
}

/// Render a descriptor's properties.
pub fn properties(spec: &ResourceSpec, ctx: &EnvContext) -> Value {
    match spec {
        ResourceSpec::Table(t) => storage::table_properties(t, ctx),
        ResourceSpec::Bucket(b) => storage::bucket_properties(b, ctx),
        ResourceSpec::Function(f) => compute::function_properties(f, ctx),
        ResourceSpec::Schedule(s) => compute::schedule_properties(s, ctx),
        ResourceSpec::Role(r) => identity::role_properties(r, ctx),
        ResourceSpec::IdentityPool(p) => identity::identity_pool_properties(p, ctx),
        ResourceSpec::PoolRoleAttachment(a) => {
            identity::pool_role_attachment_properties(a, ctx)
        }
        ResourceSpec::HttpApi(a) => network::http_api_properties(a, ctx),
        ResourceSpec::ApiStage(s) => network::api_stage_properties(s, ctx),
        ResourceSpec::ApiIntegration(i) => network::api_integration_properties(i, ctx),
        ResourceSpec::ApiRoute(r) => network::api_route_properties(r, ctx),
        ResourceSpec::Distribution(d) => network::distribution_properties(d, ctx),
        ResourceSpec::CachePolicy(c) => network::cache_policy_properties(c, ctx),
        ResourceSpec::HeadersPolicy(h) => network::headers_policy_properties(h, ctx),
        ResourceSpec::Certificate(c) => network::certificate_properties(c, ctx),
        ResourceSpec::DnsRecord(r) => network::dns_record_properties(r, ctx),
        ResourceSpec::WebAcl(w) => protection::web_acl_properties(w, ctx),
        ResourceSpec::Budget(b) => protection::budget_properties(b, ctx),
        ResourceSpec::Alarm(a) => protection::alarm_properties(a, ctx),
        ResourceSpec::Trail(t) => protection::trail_properties(t, ctx),
        ResourceSpec::AmplifyApp(a) => hosting::amplify_app_properties(a, ctx),
        ResourceSpec::AmplifyBranch(b) => hosting::amplify_branch_properties(b, ctx),
        ResourceSpec::AmplifyDomain(d) => hosting::amplify_domain_properties(d, ctx),
    }
}

/// Render one resource node: type, properties, deletion policy.
fn resource_node(spec: &ResourceSpec, ctx: &EnvContext) -> Value {
    let mut node = serde_json::Map::new();
    node.insert("Type".to_string(), json!(spec.type_name()));
    node.insert("Properties".to_string(), properties(spec, ctx));
    if let Some(policy) = spec.removal_policy() {
        node.insert("DeletionPolicy".to_string(), json!(policy.deletion_policy()));
        node.insert(
            "UpdateReplacePolicy".to_string(),
            json!(policy.deletion_policy()),
        );
    }
    Value::Object(node)
}

/// Render one stack into a template document.
pub fn render_stack(stack: &Stack, ctx: &EnvContext) -> SynthesizedStack {
    let mut resource_nodes = serde_json::Map::new();
    let mut entries = IndexMap::new();
    for (logical_id, spec) in &stack.resources {
        let node = resource_node(spec, ctx);
        let node_hash = hash::hash_string(&node.to_string());
        entries.insert(
            logical_id.clone(),
            ResourceEntry {
                resource_type: spec.type_name().to_string(),
                hash: node_hash,
            },
        );
        resource_nodes.insert(logical_id.clone(), node);
    }

    let mut output_nodes = serde_json::Map::new();
    for (key, output) in &stack.outputs {
        output_nodes.insert(
            key.clone(),
            json!({
                "Description": output.description,
                "Value": resources::ref_json(&output.value, ctx),
                "Export": { "Name": ctx.export_name(&stack.name, key) }
            }),
        );
    }

    let template = json!({
        "AWSTemplateFormatVersion": "2010-09-09",
        "Description": stack.description,
        "Metadata": {
            "Site": ctx.site,
            "Environment": ctx.environment.to_string(),
            "Phase": ctx.phase.to_string(),
            "Tags": ctx.tags
        },
        "Resources": Value::Object(resource_nodes),
        "Outputs": Value::Object(output_nodes)
    });

    let template_json =
        serde_json::to_string_pretty(&template).unwrap_or_else(|_| template.to_string());
    let template_hash = hash::hash_string(&template_json);

    SynthesizedStack {
        name: stack.name.clone(),
        template,
        template_json,
        template_hash,
        resources: entries,
    }
}

/// Synthesize every stack in dependency order.
pub fn synthesize(set: &StackSet, ctx: &EnvContext) -> Result<Vec<SynthesizedStack>, String> {
    let order = graph::stack_order(set)?;
    let mut rendered = Vec::with_capacity(order.len());
    for name in &order {
        let stack = set
            .get(name)
            .ok_or_else(|| format!("unknown stack '{}'", name))?;
        rendered.push(render_stack(stack, ctx));
    }
    Ok(rendered)
}

/// File name for a stack's template.
pub fn template_file_name(stack: &str) -> String {
    format!("{}.template.json", stack)
}

/// Write templates and the manifest into the output directory.
pub fn write_out(
    out_dir: &Path,
    ctx: &EnvContext,
    stacks: &[SynthesizedStack],
) -> Result<Manifest, String> {
    std::fs::create_dir_all(out_dir)
        .map_err(|e| format!("cannot create out dir {}: {}", out_dir.display(), e))?;

    let mut templates = IndexMap::new();
    for stack in stacks {
        let file = template_file_name(&stack.name);
        let path = out_dir.join(&file);
        std::fs::write(&path, &stack.template_json)
            .map_err(|e| format!("cannot write {}: {}", path.display(), e))?;
        templates.insert(
            stack.name.clone(),
            TemplateEntry {
                file,
                hash: stack.template_hash.clone(),
                resources: stack.resources.len(),
            },
        );
    }

    let manifest = Manifest {
        site: ctx.site.clone(),
        environment: ctx.environment,
        generated_at: now_iso8601(),
        stack_order: stacks.iter().map(|s| s.name.clone()).collect(),
        templates,
    };
    let manifest_path = out_dir.join("manifest.yaml");
    let yaml = serde_yaml_ng::to_string(&manifest)
        .map_err(|e| format!("manifest serialize error: {}", e))?;
    std::fs::write(&manifest_path, yaml)
        .map_err(|e| format!("cannot write {}: {}", manifest_path.display(), e))?;

    Ok(manifest)
}

/// Build the synthesis lock from rendered stacks.
pub fn build_lock(ctx: &EnvContext, stacks: &[SynthesizedStack]) -> SynthLock {
    let mut stack_locks = IndexMap::new();
    for stack in stacks {
        stack_locks.insert(
            stack.name.clone(),
            StackLock {
                template_hash: stack.template_hash.clone(),
                resources: stack.resources.clone(),
            },
        );
    }
    SynthLock {
        schema: "1.0".to_string(),
        site: ctx.site.clone(),
        environment: ctx.environment,
        generated_at: now_iso8601(),
        generator: format!("portico {}", env!("CARGO_PKG_VERSION")),
        stacks: stack_locks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stacks::{assemble, test_support};

    fn synthesized() -> (Vec<SynthesizedStack>, EnvContext) {
        let config = test_support::production_config();
        let ctx = EnvContext::from_config(&config);
        let set = assemble(&config).unwrap();
        (synthesize(&set, &ctx).unwrap(), ctx)
    }

    #[test]
    fn test_synthesize_all_stacks() {
        let (stacks, _) = synthesized();
        assert_eq!(stacks.len(), 10);
        // Dependency order: core first
        assert_eq!(stacks[0].name, "core");
    }

    #[test]
    fn test_template_structure() {
        let (stacks, ctx) = synthesized();
        let core = &stacks[0];
        assert_eq!(core.template["AWSTemplateFormatVersion"], "2010-09-09");
        assert_eq!(core.template["Metadata"]["Environment"], "production");
        assert_eq!(core.template["Metadata"]["Tags"]["project"], "portfolio");
        let resources = core.template["Resources"].as_object().unwrap();
        assert_eq!(resources.len(), core.resources.len());
        assert_eq!(
            core.template["Resources"]["ContentTable"]["Type"],
            "AWS::DynamoDB::Table"
        );
        assert_eq!(
            core.template["Outputs"]["TableName"]["Export"]["Name"],
            ctx.export_name("core", "TableName")
        );
    }

    #[test]
    fn test_retained_storage_carries_deletion_policy() {
        let (stacks, _) = synthesized();
        let core = &stacks[0];
        assert_eq!(
            core.template["Resources"]["ContentTable"]["DeletionPolicy"],
            "Retain"
        );
        assert_eq!(
            core.template["Resources"]["MediaBucket"]["UpdateReplacePolicy"],
            "Retain"
        );
        // Non-storage resources carry no policy
        assert!(core.template["Resources"]["BaselineWaf"]
            .get("DeletionPolicy")
            .is_none());
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let (a, _) = synthesized();
        let (b, _) = synthesized();
        for (left, right) in a.iter().zip(&b) {
            assert_eq!(left.template_hash, right.template_hash, "{}", left.name);
        }
    }

    #[test]
    fn test_resource_order_follows_declaration() {
        let (stacks, _) = synthesized();
        let core = &stacks[0];
        let keys: Vec<&String> = core.template["Resources"]
            .as_object()
            .unwrap()
            .keys()
            .collect();
        assert_eq!(keys[0], "ContentTable");
        assert_eq!(keys[1], "MediaBucket");
    }

    #[test]
    fn test_write_out_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let (stacks, ctx) = synthesized();
        let manifest = write_out(dir.path(), &ctx, &stacks).unwrap();

        assert!(dir.path().join("core.template.json").exists());
        assert!(dir.path().join("manifest.yaml").exists());
        assert_eq!(manifest.stack_order.len(), 10);
        assert_eq!(manifest.templates["core"].file, "core.template.json");

        // Written file parses back as JSON and matches the hash
        let content =
            std::fs::read_to_string(dir.path().join("core.template.json")).unwrap();
        let _: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(
            crate::core::hash::hash_string(&content),
            manifest.templates["core"].hash
        );
    }

    #[test]
    fn test_build_lock() {
        let (stacks, ctx) = synthesized();
        let lock = build_lock(&ctx, &stacks);
        assert_eq!(lock.site, "jane-doe");
        assert_eq!(lock.schema, "1.0");
        assert_eq!(lock.stacks.len(), 10);
        assert_eq!(
            lock.stacks["core"].resources["ContentTable"].resource_type,
            "AWS::DynamoDB::Table"
        );
        assert!(lock.stacks["core"].template_hash.starts_with("blake3:"));
    }
}
