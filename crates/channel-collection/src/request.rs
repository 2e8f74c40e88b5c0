//! URL resolution for `/{alias-or-id}/subpath` requests (§4.J).

use crate::channel::{Request, Response};
use crate::error::Error;
use crate::table::ContextTable;
use crate::upstream::{ChangeKind, UpstreamRuntime};

#[derive(Debug, Clone)]
pub struct RequestHeaders {
    pub wait: bool,
    pub via_handle: bool,
    pub allow_tombstone: bool,
    pub allow_inactive: bool,
}

impl Default for RequestHeaders {
    fn default() -> Self {
        Self {
            wait: true,
            via_handle: false,
            allow_tombstone: false,
            allow_inactive: false,
        }
    }
}

pub struct RequestRouter;

impl RequestRouter {
    #[tracing::instrument(skip(table, runtime, headers), fields(%url))]
    pub async fn resolve(
        table: &mut ContextTable,
        runtime: &dyn UpstreamRuntime,
        url: &str,
        mut headers: RequestHeaders,
    ) -> Result<Response, Error> {
        let path = url.split('?').next().unwrap_or("");
        let trimmed = path.trim_start_matches('/');
        let mut parts = trimmed.splitn(2, '/');
        let id_part = parts.next().unwrap_or("");
        let sub_path = parts.next().unwrap_or("");

        if !sub_path.is_empty() {
            headers.allow_tombstone = true;
        }

        if let Some(pending) = table.pending_aliases.get(id_part).cloned() {
            pending.wait().await;
        }

        let internal_id = table
            .aliases
            .get(id_part)
            .cloned()
            .unwrap_or_else(|| id_part.to_string());

        if !table.get_bound_or_remoted(&internal_id, headers.wait).await {
            return Err(Error::NotFound(url.to_string()));
        }

        runtime.node_updated(&format!("/{trimmed}"), ChangeKind::Loaded, now())?;

        let ctx = table
            .get_mut(&internal_id)
            .expect("existence confirmed by get_bound_or_remoted");
        let channel = ctx.realize().await?;
        channel.request(Request {
            url: sub_path.to_string(),
            headers,
        })
    }
}

fn now() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}
