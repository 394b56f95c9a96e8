// Entrypoint for the CLI application.
// - Discovers the entry API before anything else; failing to find one ends
//   the program with a non-zero status.
// - Keeps `main` small: the command loop lives in `ui::main_menu`.

use anyhow::Context;
use entries_cli::api::HttpTransport;
use entries_cli::config::Settings;
use entries_cli::gateway::{resolve, GatewayClient};
use entries_cli::telemetry;
use entries_cli::ui::{main_menu, print_endpoints, print_surface, Session, TerminalConsole};

fn main() -> anyhow::Result<()> {
    telemetry::init();

    let settings = Settings::from_env()?;
    let gateway = GatewayClient::new(&settings)?;
    let discovery = resolve(&gateway, &settings).with_context(|| {
        format!(
            "Failed to resolve the entry API via {}",
            settings.control_plane_url
        )
    })?;

    let mut console = TerminalConsole::new();
    for surface in &discovery.surfaces {
        print_surface(&mut console, surface);
    }
    print_endpoints(&mut console, &discovery.endpoints);

    let transport = HttpTransport::new(settings.request_timeout)?;
    let session = Session {
        discovery: &discovery,
        transport: &transport,
        gateway: &gateway,
    };

    // Blocks until the user types `quit` or input runs out.
    main_menu(&mut console, &session)?;
    Ok(())
}
