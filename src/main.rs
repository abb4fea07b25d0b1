use clap::{Arg, ArgAction, ArgMatches, Command};
use jarvissh::{
    command_router::{AnswerMode, CommandRouter},
    commit::CommitAssistant,
    config::{ConfigStore, DEFAULT_MODEL},
    custom_commands::CommandCorpus,
    executor::{Executor, SystemProcessRunner},
    http_client::{HttpClient, ReqwestHttpClient},
    local_provider::LocalProvider,
    provider_selector::{self, Service},
};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("jarvis")
        .about("Terminal assistant: finds the right shell command or answers your question")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(Arg::new("input")
            .help("The question or command request")
            .num_args(1..)
            .trailing_var_arg(true)
            .allow_hyphen_values(true))
        .arg(Arg::new("model")
            .long("model")
            .help(format!("Set the model to use (default: {})", DEFAULT_MODEL))
            .value_name("MODEL")
            .num_args(1))
        .arg(Arg::new("service")
            .long("service")
            .help("Set the model service: local or hosted")
            .value_name("SERVICE")
            .num_args(1))
        .arg(Arg::new("api-key")
            .long("api-key")
            .help("Set the API key for the hosted service")
            .value_name("API_KEY")
            .num_args(1))
        .arg(Arg::new("commands")
            .long("commands")
            .help("Edit your custom commands in $EDITOR")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("commit")
            .long("commit")
            .help("Generate a commit message for the staged changes")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("config")
            .long("config")
            .help("Show configuration information")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("no-stream")
            .long("no-stream")
            .help("Print the answer in one piece instead of streaming it")
            .action(ArgAction::SetTrue))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = match cli().try_get_matches() {
        Ok(matches) => matches,
        Err(err) => {
            let code = if err.use_stderr() { ExitCode::FAILURE } else { ExitCode::SUCCESS };
            let _ = err.print();
            return code;
        }
    };

    match run(matches).await {
        Ok(code) => code,
        Err(err) => {
            error!("{:#}", err);
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(matches: ArgMatches) -> anyhow::Result<ExitCode> {
    let store = ConfigStore::default_location()?;
    let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());

    // Handle configuration commands
    if let Some(model) = matches.get_one::<String>("model") {
        let service = Service::from_config(&store.read()?)?;
        if service == Service::Local
            && !LocalProvider::new(store.clone(), http.clone()).model_exists(model).await
        {
            eprintln!("Model \"{}\" does not exist.", model);
            return Ok(ExitCode::FAILURE);
        }
        store.set_model(model)?;
        println!("Model set to {}", model);
        return Ok(ExitCode::SUCCESS);
    }

    if let Some(name) = matches.get_one::<String>("service") {
        let service: Service = name.parse()?;
        store.set_service(service.as_str())?;
        println!("Service set to {}", service);
        return Ok(ExitCode::SUCCESS);
    }

    if let Some(api_key) = matches.get_one::<String>("api-key") {
        store.set_api_key(api_key)?;
        println!("API key saved successfully");
        return Ok(ExitCode::SUCCESS);
    }

    if matches.get_flag("config") {
        store.show_config_info()?;
        return Ok(ExitCode::SUCCESS);
    }

    if matches.get_flag("commands") {
        CommandCorpus::in_store(&store).open_in_editor(&SystemProcessRunner)?;
        return Ok(ExitCode::SUCCESS);
    }

    let provider = provider_selector::select_configured(&store, http)?;

    if matches.get_flag("commit") {
        let runner = SystemProcessRunner;
        CommitAssistant::new(provider.as_ref(), &runner).run().await?;
        return Ok(ExitCode::SUCCESS);
    }

    // Handle normal input
    let input = matches
        .get_many::<String>("input")
        .unwrap_or_default()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");

    if input.trim().is_empty() {
        eprintln!("Please provide a question after \"jarvis\"");
        return Ok(ExitCode::FAILURE);
    }

    info!("Processing input: {:?}", input);

    let answer_mode = if matches.get_flag("no-stream") {
        AnswerMode::Whole
    } else {
        AnswerMode::Streaming
    };
    let router = CommandRouter::new(provider, CommandCorpus::in_store(&store), Executor::new())
        .with_answer_mode(answer_mode);
    router.process_input(&input).await?;

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        cli().debug_assert();
    }

    #[test]
    fn test_input_words_are_collected() {
        let matches = cli()
            .try_get_matches_from(["jarvis", "list", "hidden", "files"])
            .unwrap();
        let words: Vec<&String> = matches.get_many::<String>("input").unwrap().collect();

        assert_eq!(words, ["list", "hidden", "files"]);
    }

    #[test]
    fn test_hyphenated_words_stay_in_input() {
        let matches = cli()
            .try_get_matches_from(["jarvis", "what", "does", "ls", "-la", "do"])
            .unwrap();
        let words: Vec<&String> = matches.get_many::<String>("input").unwrap().collect();

        assert_eq!(words, ["what", "does", "ls", "-la", "do"]);

        let matches = cli()
            .try_get_matches_from(["jarvis", "how", "do", "I", "use", "grep", "--color"])
            .unwrap();
        let words: Vec<&String> = matches.get_many::<String>("input").unwrap().collect();

        assert_eq!(words.last().map(|w| w.as_str()), Some("--color"));
        assert_eq!(words.len(), 6);
    }

    #[test]
    fn test_flags_before_input_are_still_parsed() {
        let matches = cli()
            .try_get_matches_from(["jarvis", "--no-stream", "explain", "tar", "-xzf"])
            .unwrap();
        let words: Vec<&String> = matches.get_many::<String>("input").unwrap().collect();

        assert!(matches.get_flag("no-stream"));
        assert_eq!(words, ["explain", "tar", "-xzf"]);
    }

    #[test]
    fn test_flag_without_value_is_rejected() {
        let err = cli().try_get_matches_from(["jarvis", "--model"]).unwrap_err();

        assert!(err.use_stderr());
    }

    #[test]
    fn test_help_is_not_an_error_exit() {
        let err = cli().try_get_matches_from(["jarvis", "--help"]).unwrap_err();

        assert!(!err.use_stderr());
    }
}
