use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tokio::signal;

use noisetorch_pulse::{Card, Client, ClientConfig, Module, Server, Sink};

#[derive(Parser)]
#[command(name = "ntpulse")]
#[command(version = env!("APP_VERSION"))]
#[command(about = "Inspect and drive a PulseAudio server over its native protocol")]
struct Cli {
    /// Server socket (default: $XDG_RUNTIME_DIR/pulse/native)
    #[arg(long, global = true)]
    socket: Option<PathBuf>,
    /// Cookie file (default: ~/.config/pulse/cookie)
    #[arg(long, global = true)]
    cookie: Option<PathBuf>,
    /// Per-request deadline in milliseconds; 0 waits forever
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
    /// Print records as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show server information
    Info,
    /// List sinks
    Sinks,
    /// List sources
    Sources,
    /// List cards and their profiles
    Cards,
    /// List loaded modules
    Modules,
    /// Load a module and print its index
    Load {
        name: String,
        /// Module argument string, passed through verbatim
        #[arg(default_value = "")]
        args: String,
    },
    /// Unload a module by index
    Unload { index: u32 },
    SetDefaultSink { name: String },
    SetDefaultSource { name: String },
    SetCardProfile { card: u32, profile: String },
    /// Show or set the default sink volume (1.0 = 100%)
    Volume { value: Option<f32> },
    /// Show or change the default sink mute state
    Mute { action: Option<MuteAction> },
    /// Print a line whenever something on the server changes
    Watch,
}

#[derive(Clone, Copy, ValueEnum)]
enum MuteAction {
    On,
    Off,
    Toggle,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    env_logger::init();

    let cli = Cli::parse();

    // 加载配置
    let mut config = ClientConfig::new().unwrap_or_default();
    if let Some(socket) = cli.socket {
        config = config.with_socket_path(socket);
    }
    if let Some(cookie) = cli.cookie {
        config = config.with_cookie_path(cookie);
    }
    if let Some(ms) = cli.timeout_ms {
        config = config.with_request_timeout((ms > 0).then(|| Duration::from_millis(ms)));
    }

    let client = Client::connect(config)
        .await
        .context("Failed to connect to PulseAudio")?;
    let json = cli.json;

    match cli.command {
        Commands::Info => {
            let server = client.server_info().await?;
            if json {
                print_json(&server)?;
            } else {
                print_server(&server);
            }
        }
        Commands::Sinks => {
            let sinks = client.sinks().await?;
            if json {
                print_json(&sinks)?;
            } else {
                sinks.iter().for_each(print_device);
            }
        }
        Commands::Sources => {
            let sources = client.sources().await?;
            if json {
                print_json(&sources)?;
            } else {
                sources.iter().for_each(print_device);
            }
        }
        Commands::Cards => {
            let cards = client.cards().await?;
            if json {
                print_json(&cards)?;
            } else {
                cards.iter().for_each(print_card);
            }
        }
        Commands::Modules => {
            let modules = client.modules().await?;
            if json {
                print_json(&modules)?;
            } else {
                modules.iter().for_each(print_module);
            }
        }
        Commands::Load { name, args } => {
            let index = client
                .load_module(&name, &args)
                .await
                .with_context(|| format!("Failed to load {}", name))?;
            println!("{}", index);
        }
        Commands::Unload { index } => client.unload_module(index).await?,
        Commands::SetDefaultSink { name } => client.set_default_sink(&name).await?,
        Commands::SetDefaultSource { name } => client.set_default_source(&name).await?,
        Commands::SetCardProfile { card, profile } => {
            client.set_card_profile(card, &profile).await?
        }
        Commands::Volume { value: Some(v) } => client.set_volume(v).await?,
        Commands::Volume { value: None } => println!("{:.2}", client.volume().await?),
        Commands::Mute { action } => {
            let muted = match action {
                None => client.mute().await?,
                Some(MuteAction::On) => {
                    client.set_mute(true).await?;
                    true
                }
                Some(MuteAction::Off) => {
                    client.set_mute(false).await?;
                    false
                }
                Some(MuteAction::Toggle) => client.toggle_mute().await?,
            };
            println!("{}", if muted { "muted" } else { "unmuted" });
        }
        Commands::Watch => {
            let mut updates = client.subscribe().await?;
            loop {
                tokio::select! {
                    changed = updates.changed() => {
                        if !changed {
                            anyhow::bail!("PulseAudio connection lost");
                        }
                        println!("changed");
                    }
                    _ = signal::ctrl_c() => break,
                }
            }
        }
    }

    client.close();
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_server(server: &Server) {
    println!("Server:          {} {}", server.package_name, server.package_version);
    match server.version() {
        Some(v) => println!("Flavor:          {} {}", server.flavor(), v),
        None => println!("Flavor:          {}", server.flavor()),
    }
    println!("User@host:       {}@{}", server.user, server.hostname);
    println!(
        "Sample spec:     format {} {}ch {}Hz",
        server.sample_spec.format, server.sample_spec.channels, server.sample_spec.rate
    );
    println!("Default sink:    {}", server.default_sink);
    println!("Default source:  {}", server.default_source);
}

fn print_device(device: &Sink) {
    println!("#{} {}", device.index, device.name);
    println!("    {}", device.description);
    println!(
        "    driver {}, {}ch {}Hz, muted {}, dynamic latency {}",
        device.driver,
        device.sample_spec.channels,
        device.sample_spec.rate,
        device.muted,
        device.flags.has_dynamic_latency()
    );
    if !device.active_port.is_empty() {
        println!("    active port {}", device.active_port);
    }
}

fn print_card(card: &Card) {
    println!("#{} {}", card.index, card.name);
    for (i, profile) in card.profiles.iter().enumerate() {
        let marker = if card.active_profile == Some(i) { "*" } else { " " };
        println!("  {} {} ({})", marker, profile.name, profile.description);
    }
}

fn print_module(module: &Module) {
    println!("#{} {} {}", module.index, module.name, module.argument);
}
