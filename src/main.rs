use std::sync::Arc;

use accessor_context::{
    with_context, Dongle, DongleAccessor, DongleService, MockableAccessorContext, Widget,
    WidgetAccessor, WidgetService,
};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

/// Runs the example services against the default context, or against a
/// context with canned accessors swapped in.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Substitute canned accessors for the store ones
    #[arg(long)]
    canned: bool,
    /// Tracing filter, e.g. `debug` (defaults to RUST_LOG, then `warn`)
    #[arg(long)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Fetch and standardize a widget
    Widget,
    /// Fetch and customize a dongle
    Dongle {
        #[arg(long, default_value_t = 1)]
        id: u64,
    },
}

struct CannedWidgetAccessor;
impl WidgetAccessor for CannedWidgetAccessor {
    fn get_widget(&self) -> Option<Widget> {
        Some(Widget { id: 42, standardized: true })
    }
}

struct CannedDongleAccessor;
impl DongleAccessor for CannedDongleAccessor {
    fn get_by_id(&self, id: u64) -> Option<Dongle> {
        Some(Dongle { id, name: "canned".to_string(), customized: false })
    }
}

fn run(command: Command) -> serde_json::Result<Value> {
    let out = match command {
        Command::Widget => WidgetService::new().get_standardized_widget().map(serde_json::to_value),
        Command::Dongle { id } => DongleService::new().get_customized_dongle(id).map(serde_json::to_value),
    };
    out.unwrap_or(Ok(Value::Null))
}

fn main() {
    let args = Args::parse();

    let filter = match args.log_level.as_deref() {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let out = if args.canned {
        let context = MockableAccessorContext::new();
        context.set_widget(Arc::new(CannedWidgetAccessor));
        context.set_dongle(Arc::new(CannedDongleAccessor));
        match with_context(Arc::new(context), || run(args.command)) {
            Ok(v) => v,
            Err(e) => {
                eprintln!("Context error: {e}");
                std::process::exit(1);
            }
        }
    } else {
        run(args.command)
    };
    let out = match out {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Failed to serialize result: {e}");
            std::process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&out) {
        Ok(s) => println!("{s}"),
        Err(e) => {
            eprintln!("Failed to render output: {e}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn run_serializes_canned_results() {
        let context = MockableAccessorContext::new();
        context.set_widget(Arc::new(CannedWidgetAccessor));
        context.set_dongle(Arc::new(CannedDongleAccessor));
        let context = Arc::new(context);

        let widget = with_context(context.clone(), || run(Command::Widget)).unwrap().unwrap();
        assert_eq!(widget, json!({"id": 42, "standardized": true}));

        let dongle = with_context(context, || run(Command::Dongle { id: 3 })).unwrap().unwrap();
        assert_eq!(dongle, json!({"id": 3, "name": "canned", "customized": true}));
    }
}
