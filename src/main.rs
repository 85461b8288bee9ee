//! PlanView command-line client.
//!
//! Usage: `planview <command> [args]`. Run without arguments for help.
//! Logging goes to stderr; set `RUST_LOG=debug` for request traces.

use std::process::ExitCode;

use planview_lib::api::{DashboardLoader, LoadState, PlanApiError, PlanClient};
use planview_lib::state::load_config;
use planview_lib::types::{LoginCredentials, SignupRequest};

const USAGE: &str = "\
Usage: planview <command> [args]

Commands:
  signup <username> <email> <password>   Create an account
  login <username> <password>            Sign in and store tokens
  logout                                 Forget stored tokens
  status                                 Show whether a session is stored
  dashboard                              Profile, plans, recommendations, feedback
  feedback <rating 1-5> <comments...>    Submit feedback
  plans                                  List plans
  compare <plan-id>...                   Compare plans side by side
  eligible <plan-id>                     Check eligibility for a plan";

/// Exit code when the user has to (re)authenticate.
const EXIT_LOGIN_REQUIRED: u8 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        println!("{}", USAGE);
        return ExitCode::SUCCESS;
    };

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let client = match PlanClient::from_config(&config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&client, command, rest).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.needs_login() => {
            eprintln!("{} Run `planview login <username> <password>`.", e);
            ExitCode::from(EXIT_LOGIN_REQUIRED)
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(client: &PlanClient, command: &str, args: &[String]) -> Result<(), PlanApiError> {
    match (command, args) {
        ("signup", [username, email, password]) => {
            client
                .signup(&SignupRequest {
                    username: username.clone(),
                    email: email.clone(),
                    password: password.clone(),
                    ..Default::default()
                })
                .await?;
            println!("Account created. Sign in with `planview login`.");
        }
        ("login", [username, password]) => {
            client
                .login(&LoginCredentials {
                    username: username.clone(),
                    password: password.clone(),
                })
                .await?;
            println!("Signed in as {}.", username);
        }
        ("logout", []) => {
            client.logout();
            println!("Signed out.");
        }
        ("status", []) => {
            if client.is_authenticated() {
                println!("Signed in.");
            } else {
                println!("Not signed in.");
            }
        }
        ("dashboard", []) => {
            let mut loader = DashboardLoader::new();
            loader.load(client).await;
            match loader.into_state() {
                LoadState::Success(snapshot) => print_json(&snapshot)?,
                LoadState::Failed(e) => return Err(e),
                LoadState::Idle | LoadState::Loading => {}
            }
        }
        ("feedback", [rating, comments @ ..]) if !comments.is_empty() => {
            let rating: u8 = rating
                .parse()
                .map_err(|_| PlanApiError::InvalidInput(format!("Not a rating: {}", rating)))?;
            client.submit_feedback(rating, &comments.join(" ")).await?;
            println!("Thanks for the feedback.");
        }
        ("plans", []) => print_json(&client.list_plans().await?)?,
        ("compare", ids) if !ids.is_empty() => {
            let ids = ids
                .iter()
                .map(|id| parse_plan_id(id))
                .collect::<Result<Vec<_>, _>>()?;
            print_json(&client.compare_plans(&ids).await?)?;
        }
        ("eligible", [id]) => print_json(&client.check_eligibility(parse_plan_id(id)?).await?)?,
        _ => {
            eprintln!("{}", USAGE);
            return Err(PlanApiError::InvalidInput(format!(
                "Unknown command or arguments: {}",
                command
            )));
        }
    }
    Ok(())
}

fn parse_plan_id(raw: &str) -> Result<i64, PlanApiError> {
    raw.parse()
        .map_err(|_| PlanApiError::InvalidInput(format!("Not a plan id: {}", raw)))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), PlanApiError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
