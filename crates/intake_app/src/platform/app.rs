use std::time::Duration;

use anyhow::{bail, Context};
use intake_core::{
    update, AppState, Destination, Msg, NoticeLevel, PollerState, SessionConfig, Submission,
    UploadChannel,
};
use intake_logging::{intake_debug, intake_info};

use super::cli::{Cli, Command, FormArgs};
use super::effects::{EffectRunner, SessionControl};
use super::logging;
use super::render::{self, ConsoleCursor};

const TICK: Duration = Duration::from_millis(75);

pub fn run_app(cli: Cli) -> anyhow::Result<()> {
    logging::initialize(cli.log.into(), cli.log_level());
    intake_info!("intake {} starting", env!("CARGO_PKG_VERSION"));

    let needs_project = cli.command.needs_session();
    if needs_project && cli.project.as_deref().map_or(true, |p| p.trim().is_empty()) {
        bail!("A project id is required (--project or INTAKE_PROJECT)");
    }
    let actions = command_messages(&cli.command)?;
    let runner =
        EffectRunner::new(cli.service_settings()).context("Failed to set up the service client")?;

    let mut session = Session::new(cli.session_config(), cli.command, actions, runner);
    session.run()
}

/// Messages a command feeds into the session once it is ready.
fn command_messages(command: &Command) -> anyhow::Result<Vec<Msg>> {
    let msgs = match command {
        Command::Templates | Command::Watch => Vec::new(),
        Command::UploadFile { path, form } => submit(
            UploadChannel::LocalFile { path: path.clone() },
            form,
        ),
        Command::UploadUrl { url, form } => submit(UploadChannel::Url { url: url.clone() }, form),
        Command::Edit {
            filename,
            text,
            from_file,
            form,
        } => {
            let contents = match (text, from_file) {
                (Some(text), _) => text.clone(),
                (None, Some(path)) => std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, None) => String::new(),
            };
            submit(
                UploadChannel::Editor {
                    filename: filename.clone(),
                    contents,
                },
                form,
            )
        }
        Command::UseSource {
            source,
            filename,
            form,
        } => submit(
            UploadChannel::ExistingSource {
                source_id: source.clone(),
                filename: filename.clone(),
            },
            form,
        ),
        Command::SelectSource { source } => vec![Msg::ProjectSourceSelected {
            source_id: source.clone(),
        }],
        Command::Delete { filename } => vec![Msg::DeleteInputClicked {
            filename: filename.clone(),
        }],
        Command::Create { name } => vec![Msg::CreateProjectClicked { name: name.clone() }],
        Command::Abort => vec![Msg::AbortClicked],
        Command::DeleteProject => vec![Msg::DeleteProjectClicked],
        Command::Restart => vec![Msg::RestartClicked],
    };
    Ok(msgs)
}

fn submit(channel: UploadChannel, form: &FormArgs) -> Vec<Msg> {
    let surface = channel.surface();
    let mut submission = Submission::new(channel, form.template.clone());
    if let Some(converter) = &form.converter {
        submission = submission.with_converter(converter.clone());
    }
    for (id, value) in &form.params {
        submission = submission.with_field(id.clone(), value.clone());
    }
    vec![
        Msg::TemplateSelected {
            surface,
            template_id: form.template.clone(),
        },
        Msg::SubmitRequested(submission),
    ]
}

enum Exit {
    Settled,
    Navigated(Destination),
    LoadFailed,
}

/// Drives one session: applies engine completions through `update` on this
/// thread, hands effects to the runner and decides when the command is done.
struct Session {
    state: AppState,
    config: SessionConfig,
    runner: EffectRunner,
    command: Command,
    actions: Vec<Msg>,
    actions_sent: bool,
    loading: bool,
    transform_settled: bool,
    cursor: ConsoleCursor,
    errors: usize,
    exit: Option<Exit>,
}

impl Session {
    fn new(config: SessionConfig, command: Command, actions: Vec<Msg>, runner: EffectRunner) -> Self {
        Self {
            state: AppState::with_config(config.clone()),
            config,
            runner,
            command,
            actions,
            actions_sent: false,
            loading: false,
            transform_settled: false,
            cursor: ConsoleCursor::default(),
            errors: 0,
            exit: None,
        }
    }

    fn run(&mut self) -> anyhow::Result<()> {
        if self.command.needs_session() {
            self.reload();
        }
        loop {
            self.advance();
            if let Some(exit) = self.exit.take() {
                return self.finish(exit);
            }
            let msg = self
                .runner
                .next_msg(TICK)
                .context("Lost contact with the service engine")?
                .unwrap_or(Msg::Tick);
            self.dispatch_msg(msg);
        }
    }

    fn reload(&mut self) {
        intake_info!("Loading project session");
        self.state = AppState::with_config(self.config.clone());
        self.cursor.reset();
        self.loading = true;
        self.transform_settled = false;
        self.runner.load_session();
    }

    fn dispatch_msg(&mut self, msg: Msg) {
        match &msg {
            Msg::SessionLoaded(_) => self.loading = false,
            Msg::SessionLoadFailed(_) => {
                self.loading = false;
                self.exit = Some(Exit::LoadFailed);
            }
            Msg::TransformLoaded(_) | Msg::TransformFailed(_) => self.transform_settled = true,
            _ => {}
        }

        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        if state.consume_dirty() {
            let view = state.view();
            for line in render::render_updates(&view, &mut self.cursor) {
                println!("{line}");
            }
        }
        self.errors = self.errors.max(
            state
                .notices()
                .iter()
                .filter(|notice| notice.level == NoticeLevel::Error)
                .count(),
        );
        self.state = state;

        for control in self.runner.enqueue(effects) {
            match control {
                SessionControl::Reload => self.reload(),
                SessionControl::Navigate(destination) => {
                    self.exit = Some(Exit::Navigated(destination));
                }
            }
        }
    }

    fn advance(&mut self) {
        if self.loading || self.exit.is_some() {
            return;
        }
        let needs_form = self.command.surface().is_some();
        if !self.actions_sent {
            if needs_form && !self.transform_settled {
                return;
            }
            self.actions_sent = true;
            for msg in std::mem::take(&mut self.actions) {
                intake_debug!("Command message {:?}", msg);
                self.dispatch_msg(msg);
            }
            if self.loading || self.exit.is_some() {
                return;
            }
        }

        let following = matches!(self.command, Command::Watch)
            && self.state.poller() == PollerState::Polling;
        if self.state.pending_requests() == 0 && !following {
            self.exit = Some(Exit::Settled);
        }
    }

    fn finish(&mut self, exit: Exit) -> anyhow::Result<()> {
        let view = self.state.view();
        match exit {
            Exit::Navigated(Destination::Project(project)) => {
                println!("Project {project} is ready");
            }
            Exit::Navigated(Destination::Index) => println!("Done"),
            Exit::LoadFailed => bail!("Unable to load the project session"),
            Exit::Settled => {
                if matches!(self.command, Command::Templates) {
                    for line in render::render_templates(self.state.registry()) {
                        println!("{line}");
                    }
                } else {
                    for line in render::render_summary(&view) {
                        println!("{line}");
                    }
                }
            }
        }
        if self.errors > 0 {
            bail!("{} error(s) reported", self.errors);
        }
        Ok(())
    }
}
