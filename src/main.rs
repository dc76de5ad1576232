use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use simple_ssh::extension::{build_extension, list_extensions, register, Extension, EXTENSION_ID};
use simple_ssh::terminal::{init_logging, DataStore, TerminalHost};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

const HELP: &str = "\
Commands:
  show                 print the form
  set <field> <value>  stage a field (ip, port, username, command)
  password             stage the password (prompted, not echoed)
  submit               submit staged fields and run the command
  cancel               cancel the running command
  list                 list registered extensions
  help                 show this text
  exit, quit           save the form and quit";

/// `<field> <value>`, where the value is the rest of the line.
fn parse_set(rest: &str) -> Option<(&str, &str)> {
    let rest = rest.trim();
    let (key, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    (!key.is_empty()).then(|| (key, value.trim()))
}

fn handle_line(
    line: &str,
    extension: &dyn Extension,
    host: &TerminalHost,
    staged: &mut HashMap<String, String>,
) -> anyhow::Result<()> {
    let line = line.trim();
    let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));

    match command {
        "" => {}
        "help" => println!("{}", HELP),
        "show" => host.show_form(&extension.get_ui()),
        "set" => match parse_set(rest) {
            Some((key, value)) => {
                staged.insert(key.to_string(), value.to_string());
            }
            None => println!("Usage: set <field> <value>"),
        },
        "password" => {
            let password = rpassword::prompt_password("Password: ")?;
            staged.insert("password".to_string(), password);
        }
        "submit" => {
            // the popup already told the user what was wrong
            if extension.submit_data(staged).is_ok() {
                staged.clear();
            }
        }
        "cancel" => extension.cancel()?,
        "list" => {
            for (id, title, description) in list_extensions() {
                println!("{} {} - {}", title.bright_green(), id.dimmed(), description);
            }
        }
        other => println!("Unknown command '{}', type 'help'", other),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    register()?;

    let host = Arc::new(TerminalHost::new());
    let extension = build_extension(EXTENSION_ID, host.clone())?;

    let store = DataStore::new(DataStore::default_path());
    match store.load() {
        Ok(Some(data)) => {
            if let Err(err) = extension.restore_data(data) {
                warn!(error = %err, "ignoring stored form data");
            }
        }
        Ok(None) => {}
        Err(err) => warn!(error = %err, "could not read stored form data"),
    }

    host.show_form(&extension.get_ui());
    println!("{}", "Type 'help' for available commands or 'exit' to quit\n".bright_blue());

    let mut rl = DefaultEditor::new()?;
    let mut staged = HashMap::new();

    loop {
        match rl.readline(&format!("{} ", "ssh>".bright_yellow())) {
            Ok(line) => {
                if matches!(line.trim(), "exit" | "quit") {
                    break;
                }
                let _ = rl.add_history_entry(line.as_str());
                if let Err(err) = handle_line(&line, extension.as_ref(), &host, &mut staged) {
                    eprintln!("{}: {}", "Error".bright_red(), err);
                }
            }
            Err(ReadlineError::Interrupted) => {
                extension.cancel()?;
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {}", err);
                break;
            }
        }
    }

    extension.stop()?;
    store.save(&extension.stored_data()?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set() {
        assert_eq!(parse_set(" port 2222"), Some(("port", "2222")));
        assert_eq!(
            parse_set("command echo 'Hello, World!'"),
            Some(("command", "echo 'Hello, World!'"))
        );
        assert_eq!(parse_set("username"), Some(("username", "")));
        assert_eq!(parse_set("   "), None);
    }
}
