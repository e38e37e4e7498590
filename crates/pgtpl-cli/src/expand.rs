use crate::cli::ExpandArgs;
use crate::input::{parse_params, read_sql};

pub fn run(args: ExpandArgs) -> anyhow::Result<()> {
    let sql = read_sql(args.sql)?;
    let params = parse_params(Some(&args.params))?;

    let (sql, params) = pgtpl::expand(&sql, &params)?;

    println!("{sql}");
    println!("{}", serde_json::to_string_pretty(&params.to_json())?);
    Ok(())
}
