use crate::output::print_json;
use anyhow::Context;
use custfix_core::config::{Config, Strategy};
use custfix_core::reconcile::{CandidateOutcome, ReconcileOptions, Reconciler, Report, Resolution};
use std::path::Path;

pub fn run(
    root: &Path,
    dry_run: bool,
    strategy: Option<Strategy>,
    json: bool,
) -> anyhow::Result<()> {
    let config = Config::load_or_default(root).context("failed to load config")?;
    let rc = &config.reconcile;

    let mut options = ReconcileOptions::from(rc);
    options.dry_run = dry_run;
    if let Some(s) = strategy {
        options.strategy = s;
    }

    let store = super::open_store(root, &config)?;
    let source = store.collection(&rc.source_collection)?;
    let lookup = store.collection(&rc.lookup_collection)?;

    if !json {
        println!("Fetching customers from {}...", rc.source_collection);
    }

    let reconciler = Reconciler::new(options);
    let report = if json {
        reconciler.run(&source, &lookup)
    } else {
        reconciler.run_with(&source, &lookup, |outcome| {
            print_outcome(outcome, dry_run, &rc.lookup_collection)
        })
    }
    .with_context(|| format!("failed to query {}", rc.source_collection))?;

    if json {
        print_json(&report)?;
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn print_outcome(outcome: &CandidateOutcome, dry_run: bool, lookup_collection: &str) {
    println!(
        "\nProcessing: {} (customer_id: {})",
        outcome.id, outcome.customer_id
    );
    match &outcome.resolution {
        Resolution::Fixed { name } => {
            println!("  - Found name: '{name}'");
            if dry_run {
                println!("  - Dry run, not written");
            } else {
                println!("  - Updated successfully!");
            }
        }
        Resolution::NotFound => println!("  - Customer not found in {lookup_collection}"),
        Resolution::NoValidName => println!("  - No valid name found in lookup collection"),
        Resolution::Error { message } => println!("  - Error: {message}"),
    }
}

fn print_summary(report: &Report) {
    if report.outcomes.is_empty() {
        println!("No unknown customers found!");
        return;
    }

    let s = &report.summary;
    println!("\n--- Summary ---");
    println!("Total unknown customers processed: {}", s.total);
    if s.dry_run {
        println!("Would fix: {}", s.fixed);
    } else {
        println!("Successfully fixed: {}", s.fixed);
    }
    println!("Not found or no valid name: {}", s.not_found);
    println!("Errors: {}", s.errors);
}
