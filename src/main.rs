//! CLI entry point for caiged.

mod cli;

use std::sync::Arc;

use caiged::app::{Collaborators, Orchestrator};
use caiged::build_info::cli_version_text;
use caiged::config::load_settings;
use caiged::credentials::CredentialStore;
use caiged::error::CaigedResult;
use caiged::opencode::OpencodeCli;
use caiged::readiness::HttpProbe;
use caiged::render::Renderer;
use caiged::runtime::CliRuntime;
use caiged::session::HostContext;
use caiged::tmux::{Multiplexer, TmuxCli};
use clap::{CommandFactory, Parser};
use tracing::debug;

use cli::{Args, Command, ContainersCommand};

#[tokio::main]
async fn main() {
    caiged::logging::init();
    let args = Args::parse();

    if args.version {
        println!("{}", cli_version_text());
        return;
    }
    let Some(command) = args.command else {
        let _ = Args::command().print_help();
        println!();
        return;
    };

    let mut settings = match load_settings(args.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            Renderer::new(!args.no_color).error(&e.to_string());
            std::process::exit(1);
        }
    };
    if args.no_color {
        settings.display.color = false;
    }
    let renderer = Renderer::new(settings.display.color);

    let orchestrator = match build_orchestrator(settings, renderer).await {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            renderer.error(&e.to_string());
            std::process::exit(1);
        }
    };

    if let Err(e) = dispatch(&orchestrator, command).await {
        renderer.error(&e.to_string());
        std::process::exit(1);
    }
}

async fn build_orchestrator(
    settings: caiged::config::Settings,
    renderer: Renderer,
) -> CaigedResult<Orchestrator> {
    let runtime = CliRuntime::detect().await?;
    let mux = TmuxCli::discover().await;
    debug!(engine = runtime.engine().command, tmux = mux.is_some(), "collaborators ready");

    let collaborators = Collaborators {
        runtime: Arc::new(runtime),
        mux: mux.map(|mux| Arc::new(mux) as Arc<dyn Multiplexer>),
        agent: Arc::new(OpencodeCli),
        probe: Arc::new(HttpProbe::new(settings.readiness.request_timeout())),
    };
    Ok(Orchestrator::new(
        collaborators,
        CredentialStore::at_default_path()?,
        settings,
        HostContext::capture(),
        renderer,
    ))
}

async fn dispatch(orchestrator: &Orchestrator, command: Command) -> CaigedResult<()> {
    match command {
        Command::Run {
            workdir,
            session,
            attach,
            command,
        } => {
            orchestrator
                .run(&workdir, &session.to_options(), &attach.to_mode(command))
                .await?;
        }
        Command::Attach { target, session } => {
            orchestrator.attach(&target, &session.to_options()).await?;
        }
        Command::Connect { project } => {
            orchestrator.connect(&project).await?;
        }
        Command::Port { project } => {
            orchestrator.port(&project).await?;
        }
        Command::Build { workdir, session } => {
            orchestrator.build(&workdir, &session.to_options()).await?;
        }
        Command::Restart {
            workdir,
            session,
            attach,
        } => {
            orchestrator
                .restart(&workdir, &session.to_options(), &attach.to_mode(Vec::new()))
                .await?;
        }
        Command::ResetSession { workdir, session } => {
            orchestrator
                .reset_session(&workdir, &session.to_options())
                .await?;
        }
        Command::Containers(containers) => match containers {
            ContainersCommand::List => {
                orchestrator.list().await?;
            }
            ContainersCommand::Stop { name, remove } => {
                orchestrator.stop(&name, remove).await?;
            }
            ContainersCommand::StopAll => {
                orchestrator.stop_all().await?;
            }
            ContainersCommand::Shell { name } => {
                orchestrator.shell(&name).await?;
            }
        },
    }
    Ok(())
}
