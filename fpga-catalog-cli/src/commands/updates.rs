use fpga_catalog_core::{CatalogRow, NormalizedCatalog, diff};
use fpga_catalog_db::CatalogFilter;
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use crate::CliError;

use super::{Context, find_row};

/// Show what the pending update of each catalog would install.
pub(crate) fn run_updates(ctx: &Context, catalog: Option<String>) -> Result<(), CliError> {
    ctx.with_db(|conn| {
        let rows = match catalog {
            Some(name) => vec![find_row(conn, &name)?],
            None => fpga_catalog_db::list_catalogs(conn, &CatalogFilter::pending())
                .map_err(|e| CliError::database(format!("Failed to list catalogs: {}", e)))?,
        };

        let mut any = false;
        for row in &rows {
            let current = row.current().map_err(|e| snapshot_error(row, e))?;
            let Some(latest) = row.latest().map_err(|e| snapshot_error(row, e))? else {
                continue;
            };
            any = true;
            print_pending(row, &current, &diff(&current, Some(&latest)));
        }

        if !any {
            log::info!(
                "{}",
                "No pending updates.".if_supports_color(Stdout, |t| t.dimmed()),
            );
            log::info!("Run 'fpga-catalog check' to look for new versions.");
        }
        Ok(())
    })
}

fn snapshot_error(row: &CatalogRow, e: impl std::fmt::Display) -> CliError {
    CliError::database(format!("Corrupt snapshot for {}: {}", row.unique_name, e))
}

fn print_pending(row: &CatalogRow, current: &NormalizedCatalog, pending: &NormalizedCatalog) {
    log::info!(
        "{} {} -> {}",
        row.name.if_supports_color(Stdout, |t| t.bold()),
        row.version.as_deref().unwrap_or("-"),
        pending
            .catalog_version()
            .if_supports_color(Stdout, |t| t.green()),
    );

    let version = |v: Option<&String>| v.map_or("-", String::as_str).to_string();
    if let Some(systems) = &pending.systems {
        for (name, system) in systems.iter() {
            let was = version(current.system(name).and_then(|s| s.version.as_ref()));
            log::info!(
                "  system {:<20} {} -> {}",
                name,
                was,
                version(system.version.as_ref()),
            );
        }
    }
    if let Some(cores) = &pending.cores {
        for (name, core) in cores.iter() {
            let was = version(current.core(name).and_then(|c| c.version.as_ref()));
            log::info!(
                "  core   {:<20} {} -> {}",
                name,
                was,
                version(core.version.as_ref()),
            );
        }
    }
    if let Some(releases) = &pending.releases {
        for name in releases.keys() {
            log::info!("  release {}", name);
        }
    }
    crate::log_blank();
}
