use crate::cli::RenderArgs;
use crate::input::{parse_params, read_sql};
use pgtpl::{DebugRenderer, PgQuoter, RenderConfig};

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    let sql = read_sql(args.sql)?;
    let params = parse_params(args.params.as_deref())?;

    let config = if args.plain {
        RenderConfig::plain()
    } else {
        RenderConfig::default()
    };
    let rendered = DebugRenderer::new(PgQuoter)
        .with_config(config)
        .render(&sql, &params, args.error.as_deref())?;

    println!("{rendered}");
    Ok(())
}
