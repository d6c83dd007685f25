use clap::{Parser, Subcommand};
use dotenv::dotenv;
use prompt_probe::api::client::{ApiClient, PromptApi, resolve_model_name};
use prompt_probe::config::Config;
use prompt_probe::core::summary::summarize;
use prompt_probe::error::ProbeError;
use prompt_probe::orchestrator::{DEFAULT_MODEL_ID, DEFAULT_PROBE_TEXT, Orchestrator};
use prompt_probe::report;
use prompt_probe::store::{FileStore, PromptHistory, SavedPrompt};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "prompt-probe", about = "Client and smoke tester for the prompt optimization API")]
struct Cli {
    /// API base URL, e.g. http://localhost:5000/api
    #[arg(long, global = true, env = "PROMPT_API_BASE_URL")]
    base_url: Option<String>,

    /// File holding the saved prompt history
    #[arg(long, global = true, env = "PROMPT_HISTORY_PATH")]
    history: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every integration check and print a summary
    Test {
        #[arg(long, default_value = DEFAULT_PROBE_TEXT)]
        input: String,
        #[arg(long, default_value = DEFAULT_MODEL_ID)]
        model: String,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the models the backend supports
    Models,
    /// Show example tasks for a model
    Examples {
        #[arg(long, default_value = DEFAULT_MODEL_ID)]
        model: String,
    },
    /// Optimize a task description for a model
    Optimize {
        #[arg(long, default_value = DEFAULT_MODEL_ID)]
        model: String,
        #[arg(long)]
        no_save: bool,
        text: String,
    },
    /// Show or prune saved prompts
    History {
        #[arg(long)]
        delete: Option<String>,
    },
    /// Show backend usage statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(url) = &cli.base_url {
        config.set_base_url(url);
    }
    if let Some(path) = cli.history {
        config.history_path = path;
    }

    let store = Arc::new(FileStore::new(config.history_path.clone()));
    let history = PromptHistory::new(store, config.history_limit);
    let client = ApiClient::new(config, history)?;
    log::info!("Using API at {}", client.base_url());

    match cli.command {
        Command::Test { input, model, json } => {
            let orchestrator = Orchestrator::new(client);
            let results = orchestrator.run_all_tests(&input, &model).await;
            let summary = summarize(&results);

            if json {
                println!("{}", report::render_json(&results, &summary)?);
            } else {
                print!("{}", report::render_results(&results, &summary));
            }

            if !summary.all_passed() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Models => {
            print!("{}", report::render_models(&client.get_models().await?));
        }
        Command::Examples { model } => {
            print!("{}", report::render_examples(&model, &client.get_examples(&model).await?));
        }
        Command::Optimize { model, no_save, text } => {
            let response = match client.optimize_prompt(&text, &model).await {
                Err(ProbeError::InvalidInput(message)) => {
                    eprintln!("❌ {message}");
                    return Ok(ExitCode::FAILURE);
                }
                other => other?,
            };
            if !response.success {
                eprintln!("❌ {}", response.error.as_deref().unwrap_or("Prompt optimization failed"));
                return Ok(ExitCode::FAILURE);
            }
            print!("{}", report::render_optimization(&response));

            if !no_save {
                let model = model.trim();
                let model_name = resolve_model_name(&client, &response, model).await;
                let optimized = response.optimized_prompt.clone().unwrap_or_default();
                let record = SavedPrompt::new(model, model_name, text.trim(), optimized);
                client.save_prompt(&record)?;
                log::info!("Saved to history as {}", record.id);
            }
        }
        Command::History { delete } => match delete {
            Some(id) => {
                if !client.delete_saved_prompt(&id)? {
                    eprintln!("❌ No saved prompt with id {id}");
                    return Ok(ExitCode::FAILURE);
                }
                println!("Deleted {id}");
            }
            None => print!("{}", report::render_history(&client.get_saved_prompts()?)),
        },
        Command::Stats => {
            print!("{}", report::render_stats(&client.get_stats().await?));
        }
    }

    Ok(ExitCode::SUCCESS)
}
