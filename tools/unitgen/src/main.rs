//! Writes the generated unit and currency databases as JSON.
//!
//! The runtime can build its registry directly from the compact
//! catalogue; this tool exists for hosts that consume the databases as
//! data (content-addressed build artefacts, web bundles).

use std::io::Write;
use std::process::ExitCode;

use numdown::units::catalog;

fn main() -> ExitCode {
    let target = std::env::args().nth(1).unwrap_or_else(|| "-".to_string());

    let units = catalog::unit_database();
    let currencies = catalog::currency_database();
    let payload = serde_json::json!({
        "units": units,
        "currencies": currencies,
    });
    let rendered = match serde_json::to_string_pretty(&payload) {
        Ok(rendered) => rendered,
        Err(err) => {
            eprintln!("unitgen: serialisation failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    let result = if target == "-" {
        std::io::stdout()
            .write_all(rendered.as_bytes())
            .and_then(|()| std::io::stdout().write_all(b"\n"))
    } else {
        std::fs::write(&target, rendered)
    };
    if let Err(err) = result {
        eprintln!("unitgen: cannot write {target}: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
