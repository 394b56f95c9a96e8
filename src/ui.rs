// UI layer: the command loop and the five entry commands. Every command
// reads its inputs through a `Console`, builds one request with the `api`
// builders and prints whatever body comes back. Problems with a single
// command are printed and the loop carries on.

use crate::api::{self, Endpoints, EntryRequest, Transport};
use crate::error::CommandError;
use crate::gateway::{probe_surface, ApiSurface, ControlPlane, Discovery};
use anyhow::Result;
use dialoguer::Input;
use std::io::{self, BufRead, IsTerminal, StdinLock, Stdout, Write};
use std::path::PathBuf;

pub const COMMANDS: &str = "post, put, delete, find, list, check, quit";

/// Line-oriented input and output for the command loop.
pub trait Console {
    /// Show `prompt` and read one line. `None` once input is exhausted.
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
    fn say(&mut self, line: &str);
}

/// Console over any buffered reader and writer. Lines are decoded lossily,
/// so bytes that are not UTF-8 reach the command matcher as an unknown
/// command instead of ending the session.
pub struct LineConsole<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LineConsole<R, W> {
    pub fn new(input: R, output: W) -> Self {
        LineConsole { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> Console for LineConsole<R, W> {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.output, "{prompt}: ")?;
        self.output.flush()?;
        let mut buf = Vec::new();
        if self.input.read_until(b'\n', &mut buf)? == 0 {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&buf);
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn say(&mut self, line: &str) {
        if let Err(err) = writeln!(self.output, "{line}") {
            tracing::warn!(error = %err, "failed to write to console");
        }
    }
}

/// Console on the process's stdin/stdout. Uses `dialoguer` prompts when
/// attached to a terminal and a [`LineConsole`] otherwise, so input can be
/// piped in.
pub struct TerminalConsole {
    piped: Option<LineConsole<StdinLock<'static>, Stdout>>,
}

impl TerminalConsole {
    pub fn new() -> Self {
        let interactive = io::stdin().is_terminal() && io::stderr().is_terminal();
        TerminalConsole {
            piped: (!interactive).then(|| LineConsole::new(io::stdin().lock(), io::stdout())),
        }
    }
}

impl Default for TerminalConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for TerminalConsole {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        if let Some(piped) = &mut self.piped {
            return piped.read_line(prompt);
        }
        // `allow_empty` so blank list filters can be submitted.
        let line: String = Input::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?;
        Ok(Some(line))
    }

    fn say(&mut self, line: &str) {
        match &mut self.piped {
            Some(piped) => piped.say(line),
            None => println!("{line}"),
        }
    }
}

/// What the command loop works against once discovery is done.
pub struct Session<'a> {
    pub discovery: &'a Discovery,
    pub transport: &'a dyn Transport,
    pub gateway: &'a dyn ControlPlane,
}

/// Read commands until `quit` (or end of input).
pub fn main_menu(console: &mut dyn Console, session: &Session) -> Result<()> {
    loop {
        console.say(&format!("Available commands: {COMMANDS}"));
        let Some(line) = console.read_line("Enter command")? else {
            console.say("Exiting...");
            break;
        };

        let outcome = match line.trim() {
            "quit" => {
                console.say("Exiting...");
                break;
            }
            "" => {
                console.say("No command entered. Try again.");
                continue;
            }
            "post" => handle_post(console, session),
            "put" => handle_put(console, session),
            "delete" => handle_delete(console, session),
            "find" => handle_find(console, session),
            "list" => handle_list(console, session),
            "check" => {
                handle_check(console, session);
                Ok(())
            }
            other => {
                tracing::debug!(command = other, "unknown command");
                console.say("Invalid command. Please try again.");
                continue;
            }
        };

        if let Err(err) = outcome {
            console.say(&format!("Error: {err}"));
        }
    }
    Ok(())
}

fn handle_post(console: &mut dyn Console, session: &Session) -> Result<(), CommandError> {
    let path = ask(console, "Enter the path to the file for POST")?;
    let body = read_file(&path)?;
    send(console, session, api::create(endpoints(session), body))
}

fn handle_put(console: &mut dyn Console, session: &Session) -> Result<(), CommandError> {
    let path = ask(console, "Enter the path to the file for PUT")?;
    let body = read_file(&path)?;
    let request = api::update(endpoints(session), body)?;
    send(console, session, request)
}

fn handle_delete(console: &mut dyn Console, session: &Session) -> Result<(), CommandError> {
    let date = ask(console, "Enter date")?;
    let application = ask(console, "Enter application")?;
    let request = api::delete(endpoints(session), &date, &application)?;
    send(console, session, request)
}

fn handle_find(console: &mut dyn Console, session: &Session) -> Result<(), CommandError> {
    let date = ask(console, "Enter date")?;
    let application = ask(console, "Enter application")?;
    let request = api::find(endpoints(session), &date, &application)?;
    send(console, session, request)
}

fn handle_list(console: &mut dyn Console, session: &Session) -> Result<(), CommandError> {
    let date = ask(console, "Enter date (or leave blank)")?;
    let application = ask(console, "Enter application (or leave blank)")?;
    send(
        console,
        session,
        api::list(endpoints(session), &date, &application),
    )
}

/// Re-probe the selected API and show what is bound where.
fn handle_check(console: &mut dyn Console, session: &Session) {
    let surface = probe_surface(session.gateway, &session.discovery.api);
    print_surface(console, &surface);
    print_endpoints(console, endpoints(session));
}

pub fn print_surface(console: &mut dyn Console, surface: &ApiSurface) {
    console.say(&format!("API ID: {}", surface.api.id));
    console.say(&format!("API Name: {}", surface.api.name));
    for resource in &surface.resources {
        console.say(&format!(
            "Resource ID: {}, Resource Path: {}",
            resource.id, resource.path
        ));
        for method in &resource.methods {
            console.say(&format!("  Method: {method}"));
        }
    }
}

pub fn print_endpoints(console: &mut dyn Console, endpoints: &Endpoints) {
    console.say(&format!("Base URL CRUD: {}", endpoints.crud()));
    console.say(&format!("Base URL List: {}", endpoints.list()));
}

fn endpoints<'a>(session: &'a Session) -> &'a Endpoints {
    &session.discovery.endpoints
}

/// End of input reads as an empty answer; validation decides what that means.
fn ask(console: &mut dyn Console, prompt: &str) -> Result<String, CommandError> {
    Ok(console.read_line(prompt)?.unwrap_or_default())
}

fn read_file(path: &str) -> Result<Vec<u8>, CommandError> {
    let path = PathBuf::from(path.trim());
    std::fs::read(&path).map_err(|source| CommandError::ReadFile { path, source })
}

fn send(
    console: &mut dyn Console,
    session: &Session,
    request: EntryRequest,
) -> Result<(), CommandError> {
    let reply = session
        .transport
        .send(&request)
        .map_err(CommandError::Request)?;
    console.say(&format!("Response: {}", reply.body));
    Ok(())
}
