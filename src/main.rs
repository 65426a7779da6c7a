//! `reconcile-cli` — a one-shot demo binary around the reconciliation
//! engine.
//!
//! This binary is the "north-bound caller" stub the spec treats as an
//! external collaborator (§1): it reads `(email, phone)` off argv,
//! enforces the one precondition that is genuinely the caller's job (at
//! least one field present — everything else, like email format or
//! phone charset, is the validator's job and out of scope here), and
//! prints the consolidated payload as JSON. A real deployment would
//! replace this with an HTTP handler; the engine underneath is identical.
//!
//! Usage:
//!   reconcile-cli --email doc@hv.edu --phone 555-0100
//!   reconcile-cli --email marty@hv.edu
//!   reconcile-cli --phone 555-0100

use anyhow::{Context, Result};
use reconcile_core::store::postgres::PgStore;
use reconcile_core::{config::Config, ReconcileInput, Reconciler};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reconcile_core=info".into()),
        )
        .init();

    let (email, phone) = parse_args(std::env::args().skip(1))?;

    let rt = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    rt.block_on(run(email.as_deref(), phone.as_deref()))
}

async fn run(email: Option<&str>, phone: Option<&str>) -> Result<()> {
    let config = Config::from_env().context("loading configuration")?;
    tracing::info!(
        pool_max_size = config.pool_max_size,
        retry_attempts = config.retry_attempts,
        "configuration loaded"
    );

    let store = PgStore::connect(&config)
        .await
        .context("connecting to the store")?;
    let reconciler = Reconciler::new(store, config.retry_attempts);

    let input = ReconcileInput::new(email, phone);
    let result = reconciler
        .reconcile(input)
        .await
        .context("reconciliation failed")?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Parses `--email <addr>` / `--phone <number>` flags from argv. Returns
/// an error if neither is supplied — the one precondition this binary
/// enforces on the caller's behalf before handing off to the engine.
fn parse_args(args: impl Iterator<Item = String>) -> Result<(Option<String>, Option<String>)> {
    let mut email = None;
    let mut phone = None;
    let mut args = args.peekable();

    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--email" => {
                email = Some(args.next().context("--email requires a value")?);
            }
            "--phone" => {
                phone = Some(args.next().context("--phone requires a value")?);
            }
            other => anyhow::bail!("unrecognized argument: {other}"),
        }
    }

    if email.is_none() && phone.is_none() {
        anyhow::bail!("at least one of --email/--phone is required");
    }

    Ok((email, phone))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> impl Iterator<Item = String> + '_ {
        v.iter().map(|s| s.to_string())
    }

    #[test]
    fn parses_both_flags() {
        let (email, phone) = parse_args(args(&["--email", "a@b.com", "--phone", "100"])).unwrap();
        assert_eq!(email.as_deref(), Some("a@b.com"));
        assert_eq!(phone.as_deref(), Some("100"));
    }

    #[test]
    fn parses_email_only() {
        let (email, phone) = parse_args(args(&["--email", "a@b.com"])).unwrap();
        assert_eq!(email.as_deref(), Some("a@b.com"));
        assert!(phone.is_none());
    }

    #[test]
    fn rejects_no_flags() {
        assert!(parse_args(args(&[])).is_err());
    }

    #[test]
    fn rejects_unknown_flag() {
        assert!(parse_args(args(&["--bogus", "x"])).is_err());
    }
}
