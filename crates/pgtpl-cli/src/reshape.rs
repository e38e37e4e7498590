use crate::cli::ReshapeArgs;
use crate::input::read_rows;

pub fn run(args: ReshapeArgs) -> anyhow::Result<()> {
    // Validate the format before reading stdin.
    let spec = pgtpl::FormatSpec::parse(&args.format)?;
    let rows = read_rows(args.rows.as_deref())?;

    let reshaped = pgtpl::reshape_with(&rows, &spec, args.keep_keys)?;

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::Value::Object(reshaped))?
    );
    Ok(())
}
