//! Information display handlers

use crate::cli::output::print_config;
use crate::AppConfig;

pub fn handle_config_command(config: &AppConfig) {
    print_config(&config.masked());
}
