use std::path::PathBuf;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use crate::CliError;
use crate::spinner::StateSpinner;

use super::{Context, find_row};

/// Download the newest signed platform release of a catalog and write its
/// signature next to it.
pub(crate) fn run_upgrade(
    ctx: &Context,
    catalog: &str,
    name: &str,
    running_version: &str,
) -> Result<(), CliError> {
    if ctx.settings.public_key.value.is_none() {
        log::warn!(
            "No public key configured; set {} to verify platform releases.",
            fpga_catalog_core::settings::ENV_PUBLIC_KEY,
        );
    }

    ctx.with_db(|conn| {
        let row = find_row(conn, catalog)?;
        let spinner = StateSpinner::new(ctx.quiet);
        let mut updater = ctx.updater(conn, &spinner, name)?;

        let upgrade =
            super::runtime()?.block_on(updater.upgrade_platform(&row, name, running_version))?;
        spinner.clear();

        let mut sig_path = upgrade.path.clone().into_os_string();
        sig_path.push(".sig");
        let sig_path = PathBuf::from(sig_path);
        std::fs::write(&sig_path, &upgrade.signature)?;

        log::info!(
            "{} {} {}",
            "Downloaded".if_supports_color(Stdout, |t| t.green()),
            name.if_supports_color(Stdout, |t| t.bold()),
            upgrade.version.as_deref().unwrap_or("-"),
        );
        log::info!("  Binary:    {}", upgrade.path.display());
        log::info!("  Signature: {}", sig_path.display());
        Ok(())
    })
}
