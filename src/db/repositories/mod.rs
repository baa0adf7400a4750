pub mod pause_logs;
pub mod site_history;
