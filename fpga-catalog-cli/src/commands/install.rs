use fpga_catalog_remote::{InstallReport, SelectionFilter};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use crate::CliError;
use crate::spinner::StateSpinner;

use super::{Context, find_row};

fn filter(names: Vec<String>) -> SelectionFilter {
    if names.is_empty() {
        SelectionFilter::All
    } else {
        SelectionFilter::only(names)
    }
}

/// Download and register cores and systems of the installed snapshot.
pub(crate) fn run_install(ctx: &Context, catalog: &str, names: Vec<String>) -> Result<(), CliError> {
    ctx.with_db(|conn| {
        let row = find_row(conn, catalog)?;
        let spinner = StateSpinner::new(ctx.quiet);
        let mut updater = ctx.updater(conn, &spinner, catalog)?;

        let report = super::runtime()?.block_on(updater.install(&row, &filter(names)))?;
        spinner.clear();

        print_report(&report);
        Ok(())
    })
}

/// Apply the pending update of a catalog, or the named part of it.
pub(crate) fn run_update(ctx: &Context, catalog: &str, names: Vec<String>) -> Result<(), CliError> {
    ctx.with_db(|conn| {
        let row = find_row(conn, catalog)?;
        if !row.update_pending {
            log::info!("{} has no pending update.", row.name);
            log::info!("Run 'fpga-catalog check {}' to look for one.", row.unique_name);
            return Ok(());
        }

        let spinner = StateSpinner::new(ctx.quiet);
        let mut updater = ctx.updater(conn, &spinner, catalog)?;
        let report = super::runtime()?.block_on(updater.apply_update(&row, &filter(names)))?;
        spinner.clear();

        print_report(&report);
        let after = find_row(conn, catalog)?;
        if after.update_pending {
            log::info!(
                "{}",
                "Some entries of the update are still pending.".if_supports_color(Stdout, |t| t.yellow()),
            );
        } else {
            log::info!(
                "{} is now at version {}.",
                after.name,
                after.version.as_deref().unwrap_or("-"),
            );
        }
        Ok(())
    })
}

fn print_report(report: &InstallReport) {
    if report.is_empty() {
        log::info!(
            "{}",
            "Nothing to install.".if_supports_color(Stdout, |t| t.dimmed()),
        );
        return;
    }
    for (name, db) in &report.systems {
        match db {
            Some(path) => log::info!(
                "{} system {} -> {}",
                "Installed".if_supports_color(Stdout, |t| t.green()),
                name.if_supports_color(Stdout, |t| t.bold()),
                path.display(),
            ),
            None => log::info!(
                "{} system {}",
                "Registered".if_supports_color(Stdout, |t| t.green()),
                name.if_supports_color(Stdout, |t| t.bold()),
            ),
        }
    }
    for (name, rbf) in &report.cores {
        log::info!(
            "{} core {} -> {}",
            "Installed".if_supports_color(Stdout, |t| t.green()),
            name.if_supports_color(Stdout, |t| t.bold()),
            rbf.display(),
        );
    }
}
