//! CLI handlers for `itinera plan` subcommands.
//!
//! Implements:
//! - `itinera plan generate <city>`   -- ask the provider for a draft
//! - `itinera plan draft [--op ..]`   -- show or edit the current draft
//! - `itinera plan discard`           -- drop the current draft
//! - `itinera plan save`              -- persist the draft as a plan
//! - `itinera plan list`              -- list your plans
//! - `itinera plan show <plan-id>`    -- show one plan
//! - `itinera plan edit <plan-id>`    -- reorder or remove activities
//! - `itinera plan archive <plan-id>` -- archive a plan
//! - `itinera plan feedback <plan-id>` -- rate a plan

use std::fmt::Write as _;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::warn;
use uuid::Uuid;

use itinera_core::activity::{self, DayGroup};
use itinera_core::generate::{ClaudeCliProvider, DraftGenerator, ItineraryRequest};
use itinera_core::persist::{Draft, DraftStore, NewFeedback, PgPlanStore, PlanOrchestrator};
use itinera_core::session::EditSession;
use itinera_core::{Identity, ItineraryError};
use itinera_db::models::Plan;
use itinera_db::pool;

use crate::PlanCommands;
use crate::config::ItineraConfig;
use crate::resolve::{resolve_id, short_id};

// -----------------------------------------------------------------------
// Edit operations
// -----------------------------------------------------------------------

/// One `--op` argument: `up:<id>`, `down:<id>`, or `delete:<id>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOp {
    Up(String),
    Down(String),
    Delete(String),
}

impl EditOp {
    fn target(&self) -> &str {
        match self {
            Self::Up(id) | Self::Down(id) | Self::Delete(id) => id,
        }
    }
}

impl FromStr for EditOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (verb, id) = s
            .split_once(':')
            .ok_or_else(|| format!("expected <verb>:<activity-id>, got {s:?}"))?;
        let id = id.trim();
        if id.is_empty() {
            return Err(format!("missing activity id in {s:?}"));
        }
        match verb.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Self::Up(id.to_string())),
            "down" => Ok(Self::Down(id.to_string())),
            "delete" | "rm" => Ok(Self::Delete(id.to_string())),
            other => Err(format!("unknown edit {other:?} (expected up, down, or delete)")),
        }
    }
}

/// Apply `ops` in order. Returns how many changed something.
fn apply_ops(session: &mut EditSession, ops: &[EditOp]) -> Result<usize> {
    let mut changed = 0;
    for op in ops {
        let ids: Vec<Uuid> = session.activities().iter().filter_map(|a| a.id).collect();
        let id = resolve_id(op.target(), &ids, "activity")?;
        let moved = match op {
            EditOp::Up(_) => session.move_up(id)?,
            EditOp::Down(_) => session.move_down(id)?,
            EditOp::Delete(_) => session.delete(id)?,
        };
        if moved {
            changed += 1;
        } else {
            println!("  (no change for {}: already at the edge of its day)", short_id(id));
        }
    }
    Ok(changed)
}

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

/// Dispatch a `PlanCommands` variant to the appropriate handler.
///
/// Draft commands work on local files only; everything else opens a pool.
pub async fn run_plan_command(command: PlanCommands, config: &ItineraConfig) -> Result<()> {
    let identity = Identity::new(config.user_id);
    let drafts = DraftStore::new(&config.draft_dir);

    match command {
        PlanCommands::Generate {
            city,
            city_id,
            days,
            intensity,
            notes,
            timeout,
            force,
        } => {
            let request = ItineraryRequest {
                city_id: city_id.unwrap_or_else(Uuid::new_v4),
                city_name: city,
                duration_days: days,
                trip_intensity: intensity,
                user_notes: notes,
            };
            let timeout = timeout.map_or(config.generation_timeout, Duration::from_secs);
            cmd_generate(config, &identity, &drafts, request, timeout, force).await
        }
        PlanCommands::Draft { ops } => cmd_draft(&identity, &drafts, &ops),
        PlanCommands::Discard => cmd_discard(&identity, &drafts),
        PlanCommands::Save => with_db(config, DbCommand::Save, &identity, &drafts).await,
        PlanCommands::List => with_db(config, DbCommand::List, &identity, &drafts).await,
        PlanCommands::Show { plan_id } => {
            with_db(config, DbCommand::Show { plan_id }, &identity, &drafts).await
        }
        PlanCommands::Edit { plan_id, ops } => {
            with_db(config, DbCommand::Edit { plan_id, ops }, &identity, &drafts).await
        }
        PlanCommands::Archive { plan_id } => {
            with_db(config, DbCommand::Archive { plan_id }, &identity, &drafts).await
        }
        PlanCommands::Feedback {
            plan_id,
            helpful,
            comment,
        } => {
            let command = DbCommand::Feedback {
                plan_id,
                helpful,
                comment,
            };
            with_db(config, command, &identity, &drafts).await
        }
    }
}

/// The plan subcommands that talk to PostgreSQL.
enum DbCommand {
    Save,
    List,
    Show {
        plan_id: String,
    },
    Edit {
        plan_id: String,
        ops: Vec<EditOp>,
    },
    Archive {
        plan_id: String,
    },
    Feedback {
        plan_id: String,
        helpful: bool,
        comment: Option<String>,
    },
}

/// Open a pool, run `command`, and close the pool whatever the outcome.
async fn with_db(
    config: &ItineraConfig,
    command: DbCommand,
    identity: &Identity,
    drafts: &DraftStore,
) -> Result<()> {
    let db_pool = pool::create_pool(&config.db_config).await?;
    let orch = PlanOrchestrator::new(Arc::new(PgPlanStore::new(db_pool.clone())));

    let result = match command {
        DbCommand::Save => cmd_save(&orch, identity, drafts).await,
        DbCommand::List => cmd_list(&orch, identity).await,
        DbCommand::Show { plan_id } => cmd_show(&orch, identity, &plan_id).await,
        DbCommand::Edit { plan_id, ops } => cmd_edit(&orch, identity, &plan_id, &ops).await,
        DbCommand::Archive { plan_id } => cmd_archive(&orch, identity, &plan_id).await,
        DbCommand::Feedback {
            plan_id,
            helpful,
            comment,
        } => cmd_feedback(&orch, identity, &plan_id, helpful, comment).await,
    };

    db_pool.close().await;
    result
}

/// Attach the user-facing message to an engine error.
fn explain(err: ItineraryError) -> anyhow::Error {
    let message = err.user_message();
    anyhow::Error::new(err).context(message)
}

/// What the user should do after a write that stopped part way.
fn reconciliation_hint(err: &ItineraryError) -> Option<String> {
    match err {
        ItineraryError::PersistencePartialFailure { plan_id, .. } => Some(format!(
            "Plan {plan_id} was created without its activities. Your draft was kept.\n\
             Run `itinera plan archive {}` before `itinera plan save` again.",
            short_id(*plan_id)
        )),
        ItineraryError::PartialUpdate {
            plan_id,
            applied,
            total,
            ..
        } => Some(format!(
            "Only {applied} of {total} changes to plan {plan_id} were saved.\n\
             Run `itinera plan show {}` to see its current order.",
            short_id(*plan_id)
        )),
        _ => None,
    }
}

// -----------------------------------------------------------------------
// Drafts
// -----------------------------------------------------------------------

async fn cmd_generate(
    config: &ItineraConfig,
    identity: &Identity,
    drafts: &DraftStore,
    request: ItineraryRequest,
    timeout: Duration,
    force: bool,
) -> Result<()> {
    let user_id = identity.user_id();
    if !force && drafts.load(user_id)?.is_some() {
        bail!(
            "a draft already exists\n\
             Use `itinera plan save`, `itinera plan discard`, or pass --force."
        );
    }

    let mut provider = ClaudeCliProvider::with_binary(&config.claude_binary);
    if let Some(model) = &config.model {
        provider = provider.with_model(model);
    }
    let generator = DraftGenerator::new(Arc::new(provider)).with_timeout(timeout);

    println!(
        "Generating a {}-day {} itinerary for {}...",
        request.duration_days,
        request.trip_intensity.label(),
        request.city_name
    );
    let mut activities = generator.generate(&request).await.map_err(explain)?;
    activity::ensure_ids(&mut activities);

    let draft = Draft::new(request, activities);
    let path = drafts.save(user_id, &draft)?;

    println!();
    print!("{}", render_days(&draft.session().days()));
    println!();
    println!("Draft saved to {}", path.display());
    println!("Next: `itinera plan draft --op up:<id>` to reorder, `itinera plan save` to keep it.");
    Ok(())
}

fn cmd_draft(identity: &Identity, drafts: &DraftStore, ops: &[EditOp]) -> Result<()> {
    let user_id = identity.user_id();
    let Some(mut draft) = drafts.load(user_id)? else {
        println!("No draft. Use `itinera plan generate <city>` to create one.");
        return Ok(());
    };

    if !ops.is_empty() {
        let mut session = draft.session();
        let changed = apply_ops(&mut session, ops)?;
        if changed > 0 {
            draft.apply(&session);
            drafts.save(user_id, &draft)?;
        }
        println!("{changed} edit(s) applied.");
        println!();
    }

    println!("{}", draft_header(&draft));
    println!();
    print!("{}", render_days(&draft.session().days()));
    Ok(())
}

fn cmd_discard(identity: &Identity, drafts: &DraftStore) -> Result<()> {
    if drafts.discard(identity.user_id())? {
        println!("Draft discarded.");
    } else {
        println!("No draft to discard.");
    }
    Ok(())
}

async fn cmd_save(orch: &PlanOrchestrator, identity: &Identity, drafts: &DraftStore) -> Result<()> {
    let user_id = identity.user_id();
    let draft = drafts
        .load(user_id)?
        .context("no draft to save; run `itinera plan generate <city>` first")?;

    let saved = match orch.create(identity, &draft).await {
        Ok(saved) => saved,
        Err(err) => {
            if let Some(hint) = reconciliation_hint(&err) {
                warn!(user_id = %user_id, error = %err, "plan left without activities");
                eprintln!("{hint}");
            }
            return Err(explain(err));
        }
    };
    drafts.discard(user_id)?;

    println!("Plan saved.");
    println!();
    println!("  Plan ID:    {}", saved.plan.id);
    println!("  Days:       {}", saved.plan.duration_days);
    println!("  Activities: {}", saved.activities.len());
    Ok(())
}

// -----------------------------------------------------------------------
// Saved plans
// -----------------------------------------------------------------------

async fn resolve_plan(orch: &PlanOrchestrator, identity: &Identity, input: &str) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(input.trim()) {
        return Ok(id);
    }
    let plans = orch.list(identity).await.map_err(explain)?;
    let ids: Vec<Uuid> = plans.iter().map(|p| p.id).collect();
    resolve_id(input, &ids, "plan")
}

async fn cmd_list(orch: &PlanOrchestrator, identity: &Identity) -> Result<()> {
    let plans = orch.list(identity).await.map_err(explain)?;
    if plans.is_empty() {
        println!("No plans found. Use `itinera plan generate <city>` to start one.");
        return Ok(());
    }
    print!("{}", render_plan_table(&plans));
    Ok(())
}

async fn cmd_show(orch: &PlanOrchestrator, identity: &Identity, input: &str) -> Result<()> {
    let plan_id = resolve_plan(orch, identity, input).await?;
    let loaded = orch.load(identity, plan_id).await.map_err(explain)?;

    println!("{}", plan_header(&loaded.plan));
    println!();
    print!("{}", render_days(&loaded.session().days()));

    if let Some(fb) = orch.feedback(identity, plan_id).await.map_err(explain)? {
        println!();
        let verdict = if fb.helpful { "helpful" } else { "not helpful" };
        match fb.comment {
            Some(c) => println!("Your feedback: {verdict} ({c})"),
            None => println!("Your feedback: {verdict}"),
        }
    }
    Ok(())
}

async fn cmd_edit(
    orch: &PlanOrchestrator,
    identity: &Identity,
    input: &str,
    ops: &[EditOp],
) -> Result<()> {
    let plan_id = resolve_plan(orch, identity, input).await?;
    let loaded = orch.load(identity, plan_id).await.map_err(explain)?;

    let mut session = loaded.session();
    session.set_editing(true);
    apply_ops(&mut session, ops)?;
    if !session.is_dirty() {
        println!("No changes to save.");
        return Ok(());
    }

    let saved = match orch.save_session(identity, plan_id, &mut session).await {
        Ok(saved) => saved,
        Err(err) => {
            if let Some(hint) = reconciliation_hint(&err) {
                warn!(plan_id = %plan_id, error = %err, "plan edit stopped part way");
                eprintln!("{hint}");
            }
            return Err(explain(err));
        }
    };

    println!("Plan {} updated.", short_id(plan_id));
    println!();
    print!("{}", render_days(&saved.session().days()));
    Ok(())
}

async fn cmd_archive(orch: &PlanOrchestrator, identity: &Identity, input: &str) -> Result<()> {
    let plan_id = resolve_plan(orch, identity, input).await?;
    orch.archive(identity, plan_id).await.map_err(explain)?;
    println!("Plan {plan_id} archived.");
    Ok(())
}

async fn cmd_feedback(
    orch: &PlanOrchestrator,
    identity: &Identity,
    input: &str,
    helpful: bool,
    comment: Option<String>,
) -> Result<()> {
    let plan_id = resolve_plan(orch, identity, input).await?;
    let feedback = NewFeedback {
        helpful,
        comment: comment.filter(|c| !c.trim().is_empty()),
    };
    orch.submit_feedback(identity, plan_id, &feedback)
        .await
        .map_err(explain)?;
    println!("Thanks for the feedback.");
    Ok(())
}

// -----------------------------------------------------------------------
// Rendering
// -----------------------------------------------------------------------

fn draft_header(draft: &Draft) -> String {
    let r = &draft.request;
    let mut out = format!(
        "Draft: {} ({} days, {})",
        r.city_name,
        r.duration_days,
        r.trip_intensity.label()
    );
    if let Some(notes) = r.notes() {
        let _ = write!(out, "\nNotes: {notes}");
    }
    out
}

fn plan_header(plan: &Plan) -> String {
    let mut out = format!(
        "Plan {} ({} days, {}, {})\nCreated {}",
        plan.id,
        plan.duration_days,
        plan.trip_intensity.label(),
        plan.status,
        plan.created_at.format("%Y-%m-%d %H:%M")
    );
    if let Some(notes) = &plan.notes {
        let _ = write!(out, "\nNotes: {notes}");
    }
    out
}

/// One block per day; each line carries the short id used by `--op`.
fn render_days(groups: &[DayGroup]) -> String {
    let mut out = String::new();
    for group in groups {
        let _ = writeln!(out, "Day {}", group.day_number);
        for a in &group.activities {
            let id = a.id.map(short_id).unwrap_or_else(|| "--------".to_string());
            let _ = writeln!(out, "  {}. {}  [{}]", a.position, a.name, id);
            if let Some(desc) = &a.description {
                let _ = writeln!(out, "     {desc}");
            }
            let _ = writeln!(out, "     {}", a.maps_url());
        }
    }
    out
}

fn render_plan_table(plans: &[Plan]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<8}  {:>4}  {:<9}  {:<8}  {}",
        "ID", "DAYS", "INTENSITY", "STATUS", "CREATED"
    );
    for p in plans {
        let _ = writeln!(
            out,
            "{:<8}  {:>4}  {:<9}  {:<8}  {}",
            short_id(p.id),
            p.duration_days,
            p.trip_intensity.label(),
            p.status.to_string(),
            p.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    out
}
