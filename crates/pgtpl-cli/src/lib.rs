mod cli;
mod expand;
mod input;
mod query;
mod render;
mod reshape;

pub async fn run(args: Vec<String>) -> anyhow::Result<()> {
    let cmd = cli::parse_args(&args)?;
    match cmd {
        cli::Command::Help(topic) => {
            cli::print_help(topic);
            Ok(())
        }
        cli::Command::Render(args) => render::run(args),
        cli::Command::Expand(args) => expand::run(args),
        cli::Command::Reshape(args) => reshape::run(args),
        cli::Command::Query(args) => query::run(args).await,
    }
}
