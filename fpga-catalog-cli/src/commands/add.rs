use fpga_catalog_remote::Outcome;
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use crate::CliError;
use crate::spinner::StateSpinner;

use super::{Context, log_cancelled};

/// Fetch a catalog and record it as installed.
pub(crate) fn run_add(ctx: &Context, url: &str, priority: i64) -> Result<(), CliError> {
    ctx.with_db(|conn| {
        let spinner = StateSpinner::new(ctx.quiet);
        let mut updater = ctx.updater(conn, &spinner, url)?;

        let row = match super::runtime()?.block_on(updater.add_catalog(url, priority))? {
            Outcome::Completed(row) => row,
            Outcome::Cancelled => {
                log_cancelled();
                return Ok(());
            }
        };
        spinner.clear();

        log::info!(
            "{} {} ({})",
            "Added".if_supports_color(Stdout, |t| t.green()),
            row.name.if_supports_color(Stdout, |t| t.bold()),
            row.unique_name.if_supports_color(Stdout, |t| t.cyan()),
        );
        if let Some(version) = &row.version {
            log::info!("  Version:  {}", version);
        }
        log::info!("  Priority: {}", row.priority);
        crate::log_blank();
        log::info!(
            "Run 'fpga-catalog install {}' to download its cores.",
            row.unique_name
        );
        Ok(())
    })
}
