//! Console output for action reports.

use deepfreeze_actions::{
    RefreezeReport, RepoBatch, RotationReport, SetupReport, StatusReport, ThawReport,
};
use deepfreeze_core::timestamp::display;

fn dry_run_banner(dry_run: bool) {
    if dry_run {
        println!("DRY-RUN: no changes were made.\n");
    }
}

pub fn setup(report: &SetupReport) {
    dry_run_banner(report.dry_run);
    println!("Repository: {}", report.target.repo_name);
    println!("Bucket:     {}", report.target.bucket);
    println!("Base path:  {}", report.target.base_path);
    println!("Rotate by:  {}", report.settings.rotate_by);
    println!("Style:      {}", report.settings.suffix_style);
    if let Some(policy) = &report.sample_policy {
        println!("Sample lifecycle policy: {policy}");
    }
    println!(
        "\nLifecycle policies using {} must set delete_searchable_snapshot to false.",
        report.target.repo_name
    );
}

pub fn rotation(report: &RotationReport) {
    dry_run_banner(report.dry_run);
    println!(
        "Rotated {} -> {} (bucket {}, base path {})",
        report.latest_repo,
        report.target.repo_name,
        report.target.bucket,
        report.target.base_path
    );

    if report.policies.is_empty() {
        println!("\nNo lifecycle policies referenced {}.", report.latest_repo);
    } else {
        println!("\n{:<32} Phases", "Policy");
        println!("{}", "-".repeat(60));
        for policy in &report.policies {
            let warn = if report.delete_warnings.contains(&policy.name) {
                "  (deletes searchable snapshots)"
            } else {
                ""
            };
            println!("{:<32} {}{warn}", policy.name, policy.phases.join(","));
        }
    }

    println!("\nMounted: {}", report.retained.join(", "));
    if !report.decommissioned.is_empty() {
        println!(
            "\n{:<28} {:<26} {:<26} Indices",
            "Decommissioned", "Start", "End"
        );
        println!("{}", "-".repeat(90));
        for repo in &report.decommissioned {
            println!(
                "{:<28} {:<26} {:<26} {}",
                repo.name,
                display(repo.start),
                display(repo.end),
                repo.index_count
            );
        }
    }
}

fn batches(title: &str, repos: &[RepoBatch]) {
    println!(
        "{:<28} {:<24} {:>8} {:>10} {:>8} {:>7}",
        title, "Bucket", "Objects", "Requested", "Skipped", "Failed"
    );
    println!("{}", "-".repeat(92));
    for repo in repos {
        let a = &repo.archive;
        println!(
            "{:<28} {:<24} {:>8} {:>10} {:>8} {:>7}",
            repo.name,
            a.bucket,
            a.listed,
            a.requested,
            a.skipped,
            repo.failed()
        );
    }
    for repo in repos {
        if let Some(error) = &repo.error {
            println!("{}: could not list objects: {error}", repo.name);
        }
    }
}

pub fn thaw(report: &ThawReport) {
    dry_run_banner(report.dry_run);
    println!(
        "Window: {} to {} (restored copies kept {} days)",
        display(Some(report.thawset.start)),
        display(Some(report.thawset.end)),
        report.thawset.retain_days
    );
    if report.repos.is_empty() {
        println!("No decommissioned repositories overlap this window.");
        return;
    }
    println!();
    batches("Repository", &report.repos);
    if let Some(id) = &report.thawset_id {
        println!("\nThaw set: {id}");
    }
    println!("Restores complete asynchronously; objects become readable once the provider finishes.");
}

pub fn refreeze(report: &RefreezeReport) {
    dry_run_banner(report.dry_run);
    if report.repos.is_empty() {
        println!("No thawed repositories.");
        return;
    }
    batches("Repository", &report.repos);
    if !report.refrozen.is_empty() {
        println!("\nRefrozen: {}", report.refrozen.join(", "));
    }
}

pub fn status(report: &StatusReport) {
    let s = &report.settings;
    println!("Cluster: {}", report.cluster_name);
    println!("\nSettings");
    println!("  repo_name_prefix:   {}", s.repo_name_prefix);
    println!("  bucket_name_prefix: {}", s.bucket_name_prefix);
    println!("  base_path_prefix:   {}", s.base_path_prefix);
    println!("  canned_acl:         {}", s.canned_acl);
    println!("  storage_class:      {}", s.storage_class);
    println!("  provider:           {}", s.provider);
    println!("  rotate_by:          {}", s.rotate_by);
    println!("  style:              {}", s.suffix_style);
    println!(
        "  last_suffix:        {}",
        s.last_suffix.as_deref().unwrap_or("-")
    );

    println!(
        "\nActive repository: {} (bucket {}, base path {})",
        report.active_repo.as_deref().unwrap_or("-"),
        report.active_bucket.as_deref().unwrap_or("-"),
        report.active_base_path.as_deref().unwrap_or("-")
    );

    println!("\n{:<28} {:<6} {:<26} End", "Repository", "State", "Start");
    println!("{}", "-".repeat(86));
    for row in &report.repositories {
        println!(
            "{:<28} {:<6} {:<26} {}",
            row.name,
            row.state,
            display(row.start),
            display(row.end)
        );
    }

    if !report.policies.is_empty() {
        println!("\n{:<32} {:>8} {:>13}", "Policy", "Indices", "Data streams");
        println!("{}", "-".repeat(55));
        for policy in &report.policies {
            println!(
                "{:<32} {:>8} {:>13}",
                policy.name, policy.indices, policy.data_streams
            );
        }
    }

    if !report.thawsets.is_empty() {
        println!("\n{:<38} {:<26} {:<26} Repositories", "Thaw set", "Start", "End");
        println!("{}", "-".repeat(110));
        for (id, set) in &report.thawsets {
            println!(
                "{:<38} {:<26} {:<26} {}",
                id,
                display(Some(set.start)),
                display(Some(set.end)),
                set.repo_names().collect::<Vec<_>>().join(",")
            );
        }
    }
}
