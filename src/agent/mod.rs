//! Per-page gatekeeper.
//!
//! One [`InterceptionAgent::on_page_load`] call per page load: cover the page,
//! check the settings snapshot against the host, and either reveal the page
//! or run a breathing pause and record how it ended.

mod interceptor;
mod overlay;
mod page;
mod site_match;
mod view;

pub use interceptor::{AgentOutcome, InterceptionAgent, PROCEED_REASON};
pub use overlay::{run_overlay, OverlayExit};
pub use page::{PageEvent, PageHost, UserChoice};
pub use site_match::{matches_any, normalize_host, should_intercept, PageLocation};
pub use view::{format_time_ago, OverlayView, VisitStats};
