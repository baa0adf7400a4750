use anyhow::{bail, Context, Result};
use log::info;
use rusqlite::Connection;

/// Schema scripts in order; entry `i` takes the database to version `i + 1`.
const MIGRATIONS: &[&str] = &[include_str!("schemas/schema_v1.sql")];

fn latest_version() -> i32 {
    MIGRATIONS.len() as i32
}

fn user_version(conn: &Connection) -> Result<i32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read user_version pragma")
}

pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let found = user_version(conn)?;
    let target = latest_version();

    if found > target {
        bail!("storage schema v{found} is newer than this build understands (v{target})");
    }
    if found == target {
        return Ok(());
    }

    let tx = conn
        .transaction()
        .context("failed to begin storage migration")?;

    let applied = usize::try_from(found).unwrap_or(0);
    for (index, script) in MIGRATIONS.iter().enumerate().skip(applied) {
        let version = index + 1;
        tx.execute_batch(script)
            .with_context(|| format!("storage migration to v{version} failed"))?;
        info!("Storage schema upgraded to v{version}");
    }

    tx.pragma_update(None, "user_version", target)
        .context("failed to record storage schema version")?;
    tx.commit().context("failed to commit storage migration")?;
    Ok(())
}
