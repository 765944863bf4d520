use anyhow::{bail, Context, Result};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = std::env::args().collect::<Vec<_>>();
    match args.len() {
        0 | 1 => bail!("Missing <database path> and <command>"),
        2 => bail!("Missing <command>"),
        3 => {}
        _ => bail!("Usage: btreescan <database path> <command>"),
    }

    let db = btreescan::StoredDb::open(&args[1])
        .with_context(|| format!("Unable to open database {}", args[1]))?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    btreescan::run_command(&db, &args[2], &mut out)
}
