use std::error::Error;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::{info, warn};
use murmur::adapter::{DataTransferMode, EchoAdapter};
use murmur::core::config;
use murmur::core::session::{self, HistoryMeta};
use murmur::core::state::AiChat;
use murmur::ui::ChatHost;
use murmur::ui::dom::Document;
use murmur::ui::event::parse_command_line;
use murmur::ui::markdown::{RenderExtensions, SyntectHighlighter};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use tokio::io::{AsyncBufReadExt, BufReader};

const MOUNT_POINT: &str = "murmur-chat";

#[derive(Parser)]
#[command(name = "murmur", about = "Line-driven demo host for the murmur chat widget")]
struct Args {
    /// Data transfer mode: stream or batch
    #[arg(short, long, value_parser = parse_mode)]
    mode: Option<DataTransferMode>,

    /// Theme id
    #[arg(short, long)]
    theme: Option<String>,

    /// Conversation file to seed from and save to on exit
    #[arg(long)]
    history: Option<PathBuf>,

    /// Config file (defaults to ~/.murmur/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Delay between echoed stream chunks
    #[arg(long, default_value_t = 40)]
    chunk_delay_ms: u64,

    /// Print the full widget markup after every change
    #[arg(long)]
    html: bool,
}

fn parse_mode(value: &str) -> Result<DataTransferMode, String> {
    DataTransferMode::parse(value).ok_or_else(|| format!("unknown mode '{value}'"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize file logger - writes to murmur.log in current directory
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    if let Ok(log_file) = File::create("murmur.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    let widget_config = match &args.config {
        Some(path) => config::load_config_from(path)?,
        None => config::load_config().unwrap_or_else(|e| {
            warn!("Falling back to default config: {}", e);
            config::WidgetConfig::default()
        }),
    };
    let options = config::resolve(&widget_config, args.mode, args.theme.as_deref());
    info!("Murmur starting up with options: {:?}", options);

    let adapter = Arc::new(EchoAdapter::new(Duration::from_millis(args.chunk_delay_ms)));
    let extensions = RenderExtensions {
        highlighter: Some(Arc::new(SyntectHighlighter)),
        ..Default::default()
    };

    let mut history_meta: Option<HistoryMeta> = None;
    let mut seed = Vec::new();
    if let Some(path) = args.history.as_deref().filter(|p| p.exists()) {
        let file = session::load_history::<String>(path)?;
        history_meta = Some(file.meta);
        seed = file.items;
    }

    let mut chat = AiChat::<String>::with_history(adapter, options, extensions, seed)?;
    chat.on_error(|err| eprintln!("! {err}"));
    chat.on_message_rendered(|uid| log::debug!("Rendered message {}", uid));

    let mut host = ChatHost::new(chat, Document::with_mount_point(MOUNT_POINT), MOUNT_POINT)?;
    println!("Type a message and press Enter. /starter N, /cancel, /quit.");
    print_update(&host, args.html);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while !host.is_halted() {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim() == "/quit" {
                    break;
                }
                for event in parse_command_line(&line) {
                    host.handle_event(&event)?;
                }
                if args.html {
                    print_update(&host, true);
                }
            }
            action = host.next_action() => {
                let before = host.chat().segments().len();
                host.dispatch(action)?;
                if host.chat().segments().len() > before || args.html {
                    print_update(&host, args.html);
                }
            }
        }
    }

    if let Some(err) = host.halted_by() {
        eprintln!("Stopped: {err}");
    }
    if let Some(path) = &args.history {
        session::save_chat(host.chat(), path, history_meta.as_ref())?;
    }
    host.shutdown()?;
    info!("Murmur shut down");
    Ok(())
}

fn print_update(host: &ChatHost<String>, html: bool) {
    if html {
        if let Some(root) = host.document().get_element_by_id(MOUNT_POINT) {
            println!("{}", root.to_html());
        }
        return;
    }
    if let Some(segment) = host.chat().segments().last() {
        println!("{}: {}", segment.ai_item().props().persona.name, segment.ai_item().text());
    } else if host.chat().starters_visible() {
        for (i, starter) in host.chat().options().conversation_starters.iter().enumerate() {
            println!("  [{}] {}", i + 1, starter.display_label());
        }
    }
}
