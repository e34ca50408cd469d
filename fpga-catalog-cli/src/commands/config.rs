use std::fmt::Display;

use fpga_catalog_core::settings::{SettingSource, settings_path};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use super::Context;

fn mask_value(s: &str) -> String {
    if s.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{}****", s.chars().take(8).collect::<String>())
    }
}

fn show(name: &str, value: impl Display, source: SettingSource) {
    log::info!(
        "  {} {} {}",
        format!("{}:", name).if_supports_color(Stdout, |t| t.cyan()),
        value,
        format!("({})", source).if_supports_color(Stdout, |t| t.dimmed()),
    );
}

/// Show resolved settings and where each one came from.
pub(crate) fn run_config_show(ctx: &Context) {
    let path = settings_path();
    let settings = &ctx.settings;

    log::info!(
        "{}",
        "fpga-catalog Configuration".if_supports_color(Stdout, |t| t.bold()),
    );
    crate::log_blank();
    if path.exists() {
        log::info!(
            "  Config file: {} {}",
            path.display().if_supports_color(Stdout, |t| t.cyan()),
            "(exists)".if_supports_color(Stdout, |t| t.green()),
        );
    } else {
        log::info!(
            "  Config file: {} {}",
            path.display().if_supports_color(Stdout, |t| t.cyan()),
            "(not found)".if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
    crate::log_blank();

    show(
        "database",
        settings.database.value.display(),
        settings.database.source,
    );
    show("root", settings.root.value.display(), settings.root.source);
    match &settings.public_key.value {
        Some(key) => show("public_key", mask_value(key), settings.public_key.source),
        None => log::info!(
            "  {} {}",
            "public_key:".if_supports_color(Stdout, |t| t.cyan()),
            "not set".if_supports_color(Stdout, |t| t.yellow()),
        ),
    }
    show(
        "timeout_secs",
        settings.timeout.value.as_secs(),
        settings.timeout.source,
    );
}

/// Print the config file path.
pub(crate) fn run_config_path() {
    println!("{}", settings_path().display());
}
