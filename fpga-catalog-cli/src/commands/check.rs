use fpga_catalog_remote::Outcome;
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use crate::CliError;
use crate::spinner::StateSpinner;

use super::{Context, find_row, log_cancelled};

/// Check one catalog, or all of them, for a newer version.
pub(crate) fn run_check(ctx: &Context, catalog: Option<String>) -> Result<(), CliError> {
    ctx.with_db(|conn| {
        let spinner = StateSpinner::new(ctx.quiet);
        let rt = super::runtime()?;

        let updated = match catalog {
            Some(name) => {
                let row = find_row(conn, &name)?;
                let mut updater = ctx.updater(conn, &spinner, &name)?;
                rt.block_on(updater.check(&row))?
                    .map(|newer| if newer { vec![name] } else { Vec::new() })
            }
            None => {
                let mut updater = ctx.updater(conn, &spinner, "catalogs")?;
                rt.block_on(updater.check_all())?
            }
        };
        spinner.clear();

        let updated = match updated {
            Outcome::Completed(names) => names,
            Outcome::Cancelled => {
                log_cancelled();
                return Ok(());
            }
        };

        if updated.is_empty() {
            log::info!(
                "{}",
                "All catalogs are up to date.".if_supports_color(Stdout, |t| t.dimmed()),
            );
            return Ok(());
        }
        for name in &updated {
            log::info!(
                "{} {}",
                "Update available:".if_supports_color(Stdout, |t| t.yellow()),
                name.if_supports_color(Stdout, |t| t.bold()),
            );
        }
        crate::log_blank();
        log::info!("Run 'fpga-catalog updates' to see what changed.");
        Ok(())
    })
}
