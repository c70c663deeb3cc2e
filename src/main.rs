use anyhow::Result;
use neutralchat::app::App;
use neutralchat::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    config.validate()?;

    let mut app = App::new(config)?;
    app.run().await
}
