//! CLI subcommands — init, validate, synth, plan, outputs, schema,
//! completions.

use crate::core::context::EnvContext;
use crate::core::journal::{self, JournalEvent};
use crate::core::{checks, graph, parser, planner, state, synth, types};
use crate::stacks::{self, StackSet};
use clap::Subcommand;
use clap_complete::Shell;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new portico project
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate portico.yaml and the assembled stacks
    Validate {
        /// Path to portico.yaml
        #[arg(short, long, default_value = "portico.yaml")]
        file: PathBuf,
    },

    /// Synthesize templates, write the manifest, update the lock
    Synth {
        /// Path to portico.yaml
        #[arg(short, long, default_value = "portico.yaml")]
        file: PathBuf,

        /// Output directory for templates
        #[arg(short, long, default_value = "out")]
        out_dir: PathBuf,

        /// State directory
        #[arg(long, default_value = "state")]
        state_dir: PathBuf,
    },

    /// Show what would change relative to the last synth
    Plan {
        /// Path to portico.yaml
        #[arg(short, long, default_value = "portico.yaml")]
        file: PathBuf,

        /// Target specific stack
        #[arg(short, long)]
        stack: Option<String>,

        /// State directory
        #[arg(long, default_value = "state")]
        state_dir: PathBuf,
    },

    /// List every stack's outputs and export names
    Outputs {
        /// Path to portico.yaml
        #[arg(short, long, default_value = "portico.yaml")]
        file: PathBuf,
    },

    /// Print the JSON Schema for portico.yaml
    Schema,

    /// Generate shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Synth {
            file,
            out_dir,
            state_dir,
        } => cmd_synth(&file, &out_dir, &state_dir),
        Commands::Plan {
            file,
            stack,
            state_dir,
        } => cmd_plan(&file, &state_dir, stack.as_deref()),
        Commands::Outputs { file } => cmd_outputs(&file),
        Commands::Schema => cmd_schema(),
        Commands::Completions { shell } => cmd_completions(shell),
    }
}

fn cmd_init(path: &Path) -> Result<(), String> {
    let config_path = path.join("portico.yaml");
    if config_path.exists() {
        return Err(format!("{} already exists", config_path.display()));
    }

    let state_dir = path.join("state");
    std::fs::create_dir_all(&state_dir).map_err(|e| format!("cannot create state dir: {}", e))?;

    let template = r#"version: "1.0"
site: my-portfolio
description: "Managed by portico"
environment: dev
phase: minimal
alert_email: you@example.com

features:
  simple_dev: true
"#;
    std::fs::write(&config_path, template)
        .map_err(|e| format!("cannot write {}: {}", config_path.display(), e))?;

    println!("Initialized portico project at {}", path.display());
    println!("  Created: {}", config_path.display());
    println!("  Created: {}/", state_dir.display());
    Ok(())
}

/// Parse, validate structure, assemble, and run the consistency checks.
fn load_and_check(file: &Path) -> Result<(types::SiteConfig, EnvContext, StackSet), String> {
    let config = parser::parse_config_file(file)?;
    let errors = parser::validate_config(&config);
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("  ERROR: {}", e);
        }
        return Err(format!("{} validation error(s)", errors.len()));
    }

    let ctx = EnvContext::from_config(&config);
    let set = stacks::assemble(&config)?;
    let findings = checks::check_stack_set(&set, &ctx);
    if !findings.is_empty() {
        for e in &findings {
            eprintln!("  ERROR: {}", e);
        }
        return Err(format!("{} consistency finding(s)", findings.len()));
    }
    graph::check_imports(&set)?;

    Ok((config, ctx, set))
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let (config, _, set) = load_and_check(file)?;
    let order = graph::stack_order(&set)?;
    println!(
        "OK: {} ({}, {} stacks, {} resources)",
        config.site,
        config.environment,
        order.len(),
        set.total_resources()
    );
    println!("  Order: {}", order.join(" -> "));
    Ok(())
}

fn cmd_synth(file: &Path, out_dir: &Path, state_dir: &Path) -> Result<(), String> {
    let (config, ctx, set) = load_and_check(file)?;
    let run_id = journal::generate_run_id();
    journal::append_event(
        state_dir,
        &config.site,
        JournalEvent::SynthStarted {
            site: config.site.clone(),
            run_id: run_id.clone(),
            portico_version: env!("CARGO_PKG_VERSION").to_string(),
        },
    )?;

    let rendered = match synth::synthesize(&set, &ctx) {
        Ok(rendered) => rendered,
        Err(e) => {
            journal::append_event(
                state_dir,
                &config.site,
                JournalEvent::CheckFailed {
                    site: config.site.clone(),
                    message: e.clone(),
                },
            )?;
            return Err(e);
        }
    };

    let manifest = synth::write_out(out_dir, &ctx, &rendered)?;
    for stack in &rendered {
        journal::append_event(
            state_dir,
            &config.site,
            JournalEvent::StackSynthesized {
                site: config.site.clone(),
                stack: stack.name.clone(),
                resources: stack.resources.len() as u32,
                template_hash: stack.template_hash.clone(),
            },
        )?;
        println!(
            "  {} ({} resources) -> {}",
            stack.name,
            stack.resources.len(),
            synth::template_file_name(&stack.name)
        );
    }

    let lock = synth::build_lock(&ctx, &rendered);
    state::save_lock(state_dir, &lock)?;

    journal::append_event(
        state_dir,
        &config.site,
        JournalEvent::SynthCompleted {
            site: config.site.clone(),
            run_id,
            stacks: rendered.len() as u32,
            total_resources: rendered.iter().map(|s| s.resources.len() as u32).sum(),
        },
    )?;

    println!();
    println!(
        "Synthesized {} stacks into {} (manifest: {} templates).",
        rendered.len(),
        out_dir.display(),
        manifest.templates.len()
    );
    Ok(())
}

fn cmd_plan(file: &Path, state_dir: &Path, stack_filter: Option<&str>) -> Result<(), String> {
    let (config, ctx, set) = load_and_check(file)?;
    let rendered = synth::synthesize(&set, &ctx)?;

    let lock = state::load_lock(state_dir, &config.site)?;
    let lock = match lock {
        Some(lock) if lock.environment != config.environment => {
            println!(
                "Note: last synth was for {}, planning against an empty state.",
                lock.environment
            );
            None
        }
        other => other,
    };

    let plan = planner::plan(&config.site, &rendered, lock.as_ref());
    print_plan(&plan, stack_filter);
    Ok(())
}

/// Display a plan to stdout.
fn print_plan(plan: &types::SynthPlan, stack_filter: Option<&str>) {
    println!("Planning: {} ({} stacks)", plan.site, plan.stack_order.len());
    println!();

    let mut current_stack = String::new();
    for change in &plan.changes {
        if let Some(filter) = stack_filter {
            if change.stack != filter {
                continue;
            }
        }
        if change.stack != current_stack {
            current_stack.clone_from(&change.stack);
            println!("{}:", current_stack);
        }
        let symbol = match change.action {
            types::PlanAction::Create => "+",
            types::PlanAction::Update => "~",
            types::PlanAction::Destroy => "-",
            types::PlanAction::NoOp => " ",
        };
        println!("  {} {}", symbol, change.description);
    }

    println!();
    println!(
        "Plan: {} to add, {} to change, {} to destroy, {} unchanged.",
        plan.to_create, plan.to_update, plan.to_destroy, plan.unchanged
    );
}

fn cmd_outputs(file: &Path) -> Result<(), String> {
    let (_, ctx, set) = load_and_check(file)?;
    let order = graph::stack_order(&set)?;
    for name in &order {
        let stack = set
            .get(name)
            .ok_or_else(|| format!("unknown stack '{}'", name))?;
        if stack.outputs.is_empty() {
            continue;
        }
        println!("{}:", stack.name);
        for (key, output) in &stack.outputs {
            println!(
                "  {} = {} ({})",
                key,
                ctx.export_name(&stack.name, key),
                output.description
            );
        }
        println!();
    }
    Ok(())
}

fn cmd_schema() -> Result<(), String> {
    let schema = schemars::schema_for!(types::SiteConfig);
    let json = serde_json::to_string_pretty(&schema)
        .map_err(|e| format!("schema serialize error: {}", e))?;
    println!("{}", json);
    Ok(())
}

fn cmd_completions(shell: Shell) -> Result<(), String> {
    let mut cmd = <Commands as clap::Subcommand>::augment_subcommands(
        clap::Command::new("portico")
            .about("Deployment definitions and template synthesis")
            .subcommand_required(true),
    );
    clap_complete::generate(shell, &mut cmd, "portico", &mut std::io::stdout());
    Ok(())
}
