// Library root
// -----------
// The binary (`main.rs`) resolves the entry API once and then hands control
// to the interactive command loop.
//
// Module responsibilities:
// - `config`: environment-driven settings (control-plane endpoint, stage,
//   timeouts, which API to use).
// - `gateway`: control-plane client, API discovery and the diagnostic
//   surface listing.
// - `api`: the `Entry` record, the two base URLs, request builders and the
//   HTTP transport.
// - `ui`: console abstraction, command loop and the per-command flows.
// - `error` / `telemetry`: error types and logging setup.
pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod telemetry;
pub mod ui;

#[cfg(test)]
mod test_support;
