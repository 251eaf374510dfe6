pub mod admin;
pub mod blocked;
pub mod health;
pub mod users;
pub mod webhooks;

use mirrorgate_common::Role;

use crate::auth::Session;
use crate::error::Result;
use crate::store::{MirrorOp, MirrorWrite};
use crate::AppState;

/// The caller's role as recorded in the mirror.
fn caller_role(state: &AppState, session: &Session) -> Result<Option<Role>> {
    Ok(state.store.get_user(&session.user_id)?.map(|user| user.role))
}

/// Follow a confirmed provider mutation with the matching mirror write.
fn commit_mirror(state: &AppState, user_id: &str, op: MirrorOp) -> Result<()> {
    match state.store.apply_or_defer(user_id, op)? {
        MirrorWrite::Applied(true) => {}
        MirrorWrite::Applied(false) => {
            tracing::debug!("No mirror record for {}, provider updated only", user_id);
        }
        MirrorWrite::Deferred(entry) => {
            tracing::info!(user_id = %user_id, outbox_id = %entry, "Mirror write queued for reconciliation");
        }
    }
    Ok(())
}
