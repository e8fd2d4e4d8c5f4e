//! Cost-optimization stack — the phase-mapped budget, a billing alarm,
//! and the weekly cost-report handler with its schedule.

use crate::core::context::EnvContext;
use crate::core::types::{SiteConfig, ValueRef};
use crate::resources::compute::{CodeSource, FunctionSpec, Runtime, ScheduleSpec};
use crate::resources::identity::{ArnPattern, PolicyStatement};
use crate::resources::protection::{AlarmSpec, BudgetSpec};
use crate::resources::ResourceSpec;
use crate::stacks::Stack;
use indexmap::IndexMap;

const COST_REPORT_STUB: &str = r#"import json, os

def handler(event, context):
    # Summarize the last week of spend against the configured limit.
    limit = float(os.environ["BUDGET_LIMIT"])
    return {"statusCode": 200, "body": json.dumps({"limit": limit})}
"#;

pub fn stack(config: &SiteConfig, ctx: &EnvContext) -> Result<Stack, String> {
    let mut stack = Stack::new("cost", format!("{} cost controls", ctx.site));

    stack.add(
        "SiteBudget",
        ResourceSpec::Budget(BudgetSpec {
            budget_name: ctx.resource_name("cost", "budget"),
            limit_usd: ctx.budget_limit_usd(),
            notify_at_percent: vec![80, 100],
            email: config.alert_email.clone(),
        }),
    )?;

    stack.add(
        "BillingAlarm",
        ResourceSpec::Alarm(AlarmSpec {
            alarm_name: ctx.resource_name("cost", "billing"),
            namespace: "AWS/Billing".to_string(),
            metric_name: "EstimatedCharges".to_string(),
            dimension: Some(("Currency".to_string(), ValueRef::literal("USD"))),
            statistic: "Maximum".to_string(),
            period_secs: 21_600,
            evaluation_periods: 1,
            threshold: f64::from(ctx.budget_limit_usd()),
        }),
    )?;

    stack.add_function(
        "CostReportFn",
        FunctionSpec {
            function_name: ctx.resource_name("cost", "report"),
            description: "Weekly spend summary".to_string(),
            runtime: Runtime::Python312,
            handler: "index.handler".to_string(),
            memory_mb: 128,
            timeout_secs: 60,
            code: CodeSource::Inline(COST_REPORT_STUB.to_string()),
            bindings: vec![],
            // Cost Explorer queries cannot be resource-scoped; the grant
            // stays limited to the two read actions.
            service_grants: vec![PolicyStatement::new(
                &["ce:GetCostAndUsage", "ce:GetCostForecast"],
                vec![ArnPattern::of(ValueRef::literal("*"))],
            )
            .with_sid("CostExplorerRead")],
            env: IndexMap::from([
                (
                    "ALERT_EMAIL".to_string(),
                    ValueRef::literal(config.alert_email.clone()),
                ),
                (
                    "BUDGET_LIMIT".to_string(),
                    ValueRef::literal(ctx.budget_limit_usd().to_string()),
                ),
            ]),
            role: ValueRef::literal("unset"),
        },
    )?;

    stack.add(
        "WeeklyReport",
        ResourceSpec::Schedule(ScheduleSpec {
            rule_name: ctx.resource_name("cost", "weekly-report"),
            expression: "cron(0 6 ? * MON *)".to_string(),
            target_function: "CostReportFn".to_string(),
            enabled: true,
        }),
    )?;

    stack.output(
        "BudgetName",
        ValueRef::logical("SiteBudget"),
        "Monthly cost budget name",
    );

    Ok(stack)
}
