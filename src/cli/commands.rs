use chrono::Utc;

use crate::app::{AppContext, EstuaryError, Result};
use crate::config::Config;
use crate::domain::SyncReport;

/// Run the sync, for everyone or for a single user. Returns whether any job
/// reached the failed state (drives the process exit code).
pub async fn sync(ctx: &AppContext, user: Option<&str>) -> Result<bool> {
    evict_expired(ctx)?;

    let reports = match user {
        Some(id) => {
            let Some((platform, platform_config, user_config)) = ctx.config.find_user(id) else {
                eprintln!("Known users:");
                for (platform, _, u) in ctx.config.jobs() {
                    eprintln!("  {} ({})", u.id, platform);
                }
                return Err(EstuaryError::UnknownUser(id.to_string()));
            };
            vec![
                ctx.orchestrator
                    .sync_user(&platform, platform_config, user_config)
                    .await,
            ]
        }
        None => {
            let jobs = ctx
                .config
                .jobs()
                .into_iter()
                .map(|(platform, platform_config, user_config)| {
                    (platform, platform_config.clone(), user_config.clone())
                })
                .collect();
            ctx.orchestrator.clone().sync_all(jobs).await
        }
    };

    let mut any_failed = false;
    for report in &reports {
        print_report(report);
        any_failed |= report.failed;
    }

    let succeeded = reports.iter().filter(|r| !r.failed).count();
    println!("\nSync complete: {}/{} jobs succeeded", succeeded, reports.len());

    Ok(any_failed)
}

pub fn list_users(config: &Config) {
    let jobs = config.jobs();
    println!("Configured users ({}):", jobs.len());
    for (platform, _, user) in jobs {
        println!("  {} ({}) - {}", user.id, platform, user.display_name());
    }
}

/// Age-based eviction sweep, once per invocation before the jobs run.
fn evict_expired(ctx: &AppContext) -> Result<()> {
    let mut cache = ctx
        .cache
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let evicted = cache.evict_older_than(ctx.config.retention(), Utc::now());
    if evicted > 0 {
        cache.save()?;
        println!(
            "Evicted {} cache entries older than {} days",
            evicted, ctx.config.retention_days
        );
    }
    println!("Cache: {} fingerprints", cache.len());

    Ok(())
}

fn print_report(report: &SyncReport) {
    if report.failed {
        println!(
            "{} - {}: FAILED (every mirror exhausted)",
            report.platform, report.user_label
        );
        return;
    }

    println!(
        "{} - {}: fetched {}, new {}, cached {}, pushed {}",
        report.platform,
        report.user_label,
        report.total_fetched,
        report.new_count,
        report.cached_count,
        report.pushed
    );
    for failure in &report.push_failures {
        println!("    ! push failed: {} ({})", failure.title, failure.reason);
    }
}
