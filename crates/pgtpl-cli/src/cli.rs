use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpTopic {
    Root,
    Render,
    Expand,
    Reshape,
    Query,
}

#[derive(Debug, Clone)]
pub enum Command {
    Help(HelpTopic),
    Render(RenderArgs),
    Expand(ExpandArgs),
    Reshape(ReshapeArgs),
    Query(QueryArgs),
}

#[derive(Debug, Clone, Default)]
pub struct RenderArgs {
    /// Template text; read from stdin when absent.
    pub sql: Option<String>,
    /// Parameters as JSON (array for `?`, object for `:name`).
    pub params: Option<String>,
    /// Driver error message to highlight.
    pub error: Option<String>,
    pub plain: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ExpandArgs {
    pub sql: Option<String>,
    pub params: String,
}

#[derive(Debug, Clone, Default)]
pub struct ReshapeArgs {
    pub format: String,
    pub keep_keys: bool,
    /// JSON file holding an array of row objects; stdin when absent or `-`.
    pub rows: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct QueryArgs {
    pub sql: Option<String>,
    pub params: Option<String>,
    pub format: Option<String>,
    pub keep_keys: bool,
    pub database: Option<String>,
}

pub fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    let mut it = args.iter().skip(1);
    let Some(first) = it.next() else {
        return Ok(Command::Help(HelpTopic::Root));
    };

    match first.as_str() {
        "-h" | "--help" => Ok(Command::Help(HelpTopic::Root)),
        "render" => parse_render(it.map(|s| s.as_str())),
        "expand" => parse_expand(it.map(|s| s.as_str())),
        "reshape" => parse_reshape(it.map(|s| s.as_str())),
        "query" => parse_query(it.map(|s| s.as_str())),
        _ => anyhow::bail!("unknown command: {first}"),
    }
}

/// Read the value of `flag` from `token` (`--flag=value`) or the next argument.
///
/// Returns `None` when `token` is not `flag`.
fn flag_value<'a>(
    flag: &str,
    token: &'a str,
    it: &mut impl Iterator<Item = &'a str>,
) -> anyhow::Result<Option<String>> {
    if token == flag {
        let Some(v) = it.next() else {
            anyhow::bail!("{flag} requires a value");
        };
        return Ok(Some(v.to_string()));
    }
    match token.strip_prefix(flag).and_then(|rest| rest.strip_prefix('=')) {
        Some(v) => Ok(Some(v.to_string())),
        None => Ok(None),
    }
}

fn set_sql(sql: &mut Option<String>, token: &str) -> anyhow::Result<()> {
    if token.starts_with("--") {
        anyhow::bail!("unknown option: {token}");
    }
    if sql.is_some() {
        anyhow::bail!("unexpected argument: {token}");
    }
    *sql = Some(token.to_string());
    Ok(())
}

fn parse_render<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut args = RenderArgs::default();

    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Render)),
            "--plain" => args.plain = true,
            _ => {
                if let Some(v) = flag_value("--params", token, &mut it)? {
                    args.params = Some(v);
                } else if let Some(v) = flag_value("--error", token, &mut it)? {
                    args.error = Some(v);
                } else {
                    set_sql(&mut args.sql, token)?;
                }
            }
        }
    }

    Ok(Command::Render(args))
}

fn parse_expand<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut sql = None;
    let mut params = None;

    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Expand)),
            _ => {
                if let Some(v) = flag_value("--params", token, &mut it)? {
                    params = Some(v);
                } else {
                    set_sql(&mut sql, token)?;
                }
            }
        }
    }

    let Some(params) = params else {
        anyhow::bail!("expand requires --params");
    };
    Ok(Command::Expand(ExpandArgs { sql, params }))
}

fn parse_reshape<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut format = None;
    let mut keep_keys = false;
    let mut rows = None;

    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Reshape)),
            "--keep-keys" => keep_keys = true,
            _ => {
                if let Some(v) = flag_value("--format", token, &mut it)? {
                    format = Some(v);
                } else if let Some(v) = flag_value("--rows", token, &mut it)? {
                    rows = (v != "-").then(|| PathBuf::from(v));
                } else if token.starts_with('-') {
                    anyhow::bail!("unknown option: {token}");
                } else {
                    anyhow::bail!("unexpected argument: {token}");
                }
            }
        }
    }

    let Some(format) = format else {
        anyhow::bail!("reshape requires --format");
    };
    Ok(Command::Reshape(ReshapeArgs {
        format,
        keep_keys,
        rows,
    }))
}

fn parse_query<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut args = QueryArgs::default();

    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Query)),
            "--keep-keys" => args.keep_keys = true,
            _ => {
                if let Some(v) = flag_value("--params", token, &mut it)? {
                    args.params = Some(v);
                } else if let Some(v) = flag_value("--format", token, &mut it)? {
                    args.format = Some(v);
                } else if let Some(v) = flag_value("--database", token, &mut it)? {
                    args.database = Some(v);
                } else {
                    set_sql(&mut args.sql, token)?;
                }
            }
        }
    }

    Ok(Command::Query(args))
}

pub fn print_help(topic: HelpTopic) {
    match topic {
        HelpTopic::Root => {
            println!(
                "\
pgtpl - render, expand, reshape and run parameterized SQL templates

USAGE:
  pgtpl <COMMAND> [OPTIONS]

COMMANDS:
  render        Print a template with its values substituted
  expand        Expand list parameters into IN (...) placeholders
  reshape       Fold JSON rows into a nested structure
  query         Run a template against Postgres

Run `pgtpl <command> --help` for more."
            );
        }
        HelpTopic::Render => {
            println!(
                "\
USAGE:
  pgtpl render [SQL] [OPTIONS]

SQL is read from stdin when omitted.

OPTIONS:
  --params <JSON>       Values: array for `?`, object for `:name`
  --error <MSG>         Driver error to highlight (`... at character N`)
  --plain               Terminal-friendly markers instead of HTML
  -h, --help            Print help"
            );
        }
        HelpTopic::Expand => {
            println!(
                "\
USAGE:
  pgtpl expand [SQL] --params <JSON>

Prints the rewritten SQL followed by the rewritten parameters as JSON.

OPTIONS:
  --params <JSON>       Values: array for `?`, object for `:name`
  -h, --help            Print help"
            );
        }
        HelpTopic::Reshape => {
            println!(
                "\
USAGE:
  pgtpl reshape --format <SPEC> [OPTIONS]

FORMAT:
  id=>value             {{id: value}}
  id=>a;b               {{id: {{a, b}}}}
  id=>*                 {{id: {{every other column}}}}
  id[]=>*               {{id: [row, ...]}}
  id[type][]=>value     {{id: {{type: [value, ...]}}}}

OPTIONS:
  --format <SPEC>       Grouping format
  --keep-keys           Keep key columns in `*` leaves
  --rows <FILE|->       JSON array of row objects (default: stdin)
  -h, --help            Print help"
            );
        }
        HelpTopic::Query => {
            println!(
                "\
USAGE:
  pgtpl query [SQL] [OPTIONS]

SQL is read from stdin when omitted. Rows are printed as JSON.

OPTIONS:
  --params <JSON>       Values: array for `?`, object for `:name`
  --format <SPEC>       Group rows (see `pgtpl reshape --help`)
  --keep-keys           Keep key columns in `*` leaves
  --database <URL>      Connection string (default: DATABASE_URL, .env honoured)
  -h, --help            Print help"
            );
        }
    }
}
