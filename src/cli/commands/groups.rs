//! `groups` command handlers.
//!
//! Implements `groups list|info|set|remove|delete|check` on top of the
//! [`GroupStore`] data operations.

use std::fmt::Write as _;

use serde_json::json;
use tracing::info;

use super::print_json;
use crate::cli::args::{
    GroupsCheckArgs, GroupsDeleteArgs, GroupsInfoArgs, GroupsListArgs, GroupsRemoveArgs,
    GroupsSetArgs, OutputFormat,
};
use crate::effect::{EffectGroup, EffectSpec};
use crate::error::{HonorFxError, StoreError};
use crate::store::{GroupDocument, GroupStore};

/// Maximum edit distance for "did you mean" suggestions.
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Closest id in `ids` to `input`, if any is within a small edit distance.
#[must_use]
pub fn suggest_group(input: &str, ids: &[String]) -> Option<String> {
    ids.iter()
        .map(|id| (id, strsim::damerau_levenshtein(input, id)))
        .filter(|(_, dist)| *dist <= MAX_SUGGESTION_DISTANCE)
        .min_by_key(|(_, dist)| *dist)
        .map(|(id, _)| id.clone())
}

/// List stored group ids.
///
/// # Errors
///
/// Returns a store error if the directory cannot be read.
pub async fn list(store: &dyn GroupStore, args: &GroupsListArgs) -> Result<(), HonorFxError> {
    let ids = store.list_ids().await?;
    match args.format {
        OutputFormat::Json => print_json(&json!(ids))?,
        OutputFormat::Human => {
            if ids.is_empty() {
                println!("No effect groups stored.");
            }
            for id in ids {
                println!("{id}");
            }
        }
    }
    Ok(())
}

/// Show one group.
///
/// # Errors
///
/// Returns a usage error (with a suggestion) if the group does not exist, or
/// a store error if it cannot be read.
pub async fn info(store: &dyn GroupStore, args: &GroupsInfoArgs) -> Result<(), HonorFxError> {
    let group = match store.load(&args.id).await {
        Ok(group) => group,
        Err(StoreError::NotFound(_)) => {
            let ids = store.list_ids().await?;
            return Err(unknown_group(&args.id, &ids));
        }
        Err(e) => return Err(e.into()),
    };

    match args.format {
        OutputFormat::Json => {
            let mut value = serde_json::to_value(GroupDocument::from(&group))?;
            value["id"] = json!(group.id);
            print_json(&value)?;
        }
        OutputFormat::Human => print!("{}", describe(&group)),
    }
    Ok(())
}

/// Add an effect to a group.
///
/// # Errors
///
/// Returns a usage error for an invalid kind, or a store error if the group
/// cannot be read or written.
pub async fn set(store: &dyn GroupStore, args: &GroupsSetArgs) -> Result<(), HonorFxError> {
    let spec = EffectSpec::new(args.kind.as_str(), args.intensity)?;
    let group = store.set_effect(&args.id, spec.clone()).await?;
    info!(group = %group.id, effect = %spec, "effect set");
    println!(
        "Set {spec} on '{}' ({} effect(s))",
        group.id,
        group.effects.len()
    );
    Ok(())
}

/// Remove an effect kind from a group.
///
/// # Errors
///
/// Returns a store error if the group does not exist or cannot be written.
pub async fn remove(store: &dyn GroupStore, args: &GroupsRemoveArgs) -> Result<(), HonorFxError> {
    if store.remove_effect(&args.id, &args.kind).await? {
        info!(group = %args.id, kind = %args.kind, "effect removed");
        println!("Removed '{}' from '{}'", args.kind, args.id);
    } else {
        println!("'{}' has no '{}' effect", args.id, args.kind);
    }
    Ok(())
}

/// Delete a group.
///
/// # Errors
///
/// Returns a store error if the document cannot be removed.
pub async fn delete(store: &dyn GroupStore, args: &GroupsDeleteArgs) -> Result<(), HonorFxError> {
    store.delete(&args.id).await?;
    info!(group = %args.id, "group deleted");
    println!("Deleted '{}'", args.id);
    Ok(())
}

/// Parse every stored group.
///
/// # Errors
///
/// Returns the first failure as a store error after reporting all of them.
pub async fn check(store: &dyn GroupStore, args: &GroupsCheckArgs) -> Result<(), HonorFxError> {
    let ids = store.list_ids().await?;
    let mut failures = Vec::new();
    let mut valid = Vec::new();
    for id in ids {
        match store.load(&id).await {
            Ok(_) => valid.push(id),
            Err(e) => failures.push((id, e)),
        }
    }

    match args.format {
        OutputFormat::Json => {
            let invalid: Vec<_> = failures
                .iter()
                .map(|(id, e)| json!({ "id": id, "error": e.to_string() }))
                .collect();
            print_json(&json!({ "valid": valid, "invalid": invalid }))?;
        }
        OutputFormat::Human => {
            for id in &valid {
                println!("ok      {id}");
            }
            for (id, e) in &failures {
                println!("invalid {id}: {e}");
            }
            println!("\n{} valid, {} invalid", valid.len(), failures.len());
        }
    }

    match failures.into_iter().next() {
        Some((_, e)) => Err(e.into()),
        None => Ok(()),
    }
}

fn unknown_group(id: &str, ids: &[String]) -> HonorFxError {
    let mut message = format!("Unknown effect group '{id}'");
    if let Some(suggestion) = suggest_group(id, ids) {
        let _ = write!(message, "\n\nDid you mean '{suggestion}'?");
    }
    message.push_str("\n\nUse 'honorfx groups list' to see stored groups.");
    HonorFxError::Usage(message)
}

fn describe(group: &EffectGroup) -> String {
    let mut out = format!("Effect group '{}'\n", group.id);
    let _ = writeln!(out, "  duration:  {} ticks", group.duration_ticks);
    if group.delays.is_empty() {
        let _ = writeln!(out, "  delay:     fallback");
    } else {
        let _ = writeln!(out, "  delay:     {} ticks", group.delays);
    }
    let _ = writeln!(out, "  effects:");
    for effect in &group.effects {
        let _ = writeln!(out, "    {effect}");
    }
    if !group.halo_effects.is_empty() {
        let _ = writeln!(out, "  halo effects:");
        for effect in &group.halo_effects {
            let _ = writeln!(out, "    {effect}");
        }
    }
    out
}
