use shelfsight_core::Settings;

use crate::error::CliError;
use crate::output::render_json;

pub fn run(settings: &Settings, pretty: bool) -> Result<(), CliError> {
    render_json(&settings.status(), pretty)
}
