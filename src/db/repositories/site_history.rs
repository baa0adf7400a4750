use std::collections::BTreeMap;

use anyhow::Result;

use crate::{
    db::{read_value, write_value, Database},
    models::SiteHistory,
};

pub const SITE_HISTORY_KEY: &str = "siteHistory";

type SiteHistoryMap = BTreeMap<String, SiteHistory>;

impl Database {
    pub async fn site_history(&self, host: &str) -> Result<SiteHistory> {
        let mut map = self
            .get_value::<SiteHistoryMap>(SITE_HISTORY_KEY)
            .await?
            .unwrap_or_default();
        Ok(map.remove(host).unwrap_or_default())
    }

    /// Append a visit for `host` and return the history as it was before
    /// this visit.
    pub async fn record_site_visit(&self, host: &str, at_ms: i64) -> Result<SiteHistory> {
        let host = host.to_string();
        self.execute(move |conn| {
            let mut map: SiteHistoryMap = read_value(conn, SITE_HISTORY_KEY)?.unwrap_or_default();
            let entry = map.entry(host).or_default();
            let previous = entry.clone();
            entry.visit_timestamps.push(at_ms);
            write_value(conn, SITE_HISTORY_KEY, &map)?;
            Ok(previous)
        })
        .await
    }
}
