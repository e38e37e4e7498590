use crate::cli::QueryArgs;
use crate::input::{parse_params, read_sql};
use pgtpl::{RenderConfig, template};
use tokio_postgres::NoTls;

async fn connect_db(database_url: &str) -> anyhow::Result<tokio_postgres::Client> {
    let (client, connection) = tokio_postgres::connect(database_url, NoTls).await?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            eprintln!("postgres connection error: {e}");
        }
    });
    Ok(client)
}

pub async fn run(args: QueryArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = match args.database {
        Some(url) => url,
        None => std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("provide --database or set DATABASE_URL"))?,
    };

    let sql = read_sql(args.sql)?;
    let params = parse_params(args.params.as_deref())?;
    let query = template(sql)
        .params(params)
        .render_config(RenderConfig::plain());

    // Reject a bad format before connecting.
    if let Some(format) = &args.format {
        pgtpl::FormatSpec::parse(format)?;
    }

    let client = connect_db(&database_url).await?;

    let output = match &args.format {
        Some(format) => {
            let grouped = query.fetch_grouped(&client, format, args.keep_keys).await?;
            serde_json::Value::Object(grouped)
        }
        None => {
            let rows = query.fetch_all(&client).await?;
            serde_json::to_value(&rows)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
