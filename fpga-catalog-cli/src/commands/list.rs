use fpga_catalog_db::CatalogFilter;
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use crate::CliError;

use super::Context;

/// List installed catalogs with their registered cores and systems.
pub(crate) fn run_list(ctx: &Context, detailed: bool) -> Result<(), CliError> {
    ctx.with_db(|conn| {
        let rows = fpga_catalog_db::list_catalogs(conn, &CatalogFilter::default())
            .map_err(|e| CliError::database(format!("Failed to list catalogs: {}", e)))?;

        if rows.is_empty() {
            log::info!("No catalogs installed.");
            log::info!("Run 'fpga-catalog add <url>' to add one.");
            return Ok(());
        }

        let systems = fpga_catalog_db::list_systems(conn)
            .map_err(|e| CliError::database(format!("Failed to list systems: {}", e)))?;

        for row in &rows {
            let cores = fpga_catalog_db::cores_for_catalog(conn, row.id)
                .map_err(|e| CliError::database(format!("Failed to list cores: {}", e)))?;
            let catalog_systems: Vec<_> = systems.iter().filter(|s| s.catalog_id == row.id).collect();

            let pending = if row.update_pending {
                " (update available)"
            } else {
                ""
            };
            log::info!(
                "{} {} {}{}",
                row.name.if_supports_color(Stdout, |t| t.bold()),
                format!("[{}]", row.unique_name).if_supports_color(Stdout, |t| t.cyan()),
                row.version.as_deref().unwrap_or("-"),
                pending.if_supports_color(Stdout, |t| t.yellow()),
            );
            log::info!(
                "  {}",
                row.url.if_supports_color(Stdout, |t| t.dimmed())
            );
            log::info!(
                "  priority {}, updated {}, {} cores, {} systems",
                row.priority,
                row.last_update_at,
                cores.len(),
                catalog_systems.len(),
            );

            if detailed {
                for system in &catalog_systems {
                    log::info!("    system {:<20} {}", system.unique_name, system.name);
                }
                for core in &cores {
                    let path = core.rbf_path.as_deref().unwrap_or("not downloaded");
                    log::info!(
                        "    core   {:<20} {}",
                        core.unique_name,
                        path.if_supports_color(Stdout, |t| t.dimmed()),
                    );
                }
            }
            crate::log_blank();
        }
        Ok(())
    })
}
