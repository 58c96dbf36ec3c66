use std::path::PathBuf;
use std::process::ExitCode;

use shoti_bot::app::App;
use shoti_bot::config::Config;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = match Config::discover(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("shoti-bot: {e}");
            return ExitCode::FAILURE;
        }
    };

    let app = match App::init(config).await {
        Ok(app) => app,
        Err(e) => {
            eprintln!("shoti-bot: {e}");
            return ExitCode::FAILURE;
        }
    };

    app.run().await;
    ExitCode::SUCCESS
}
