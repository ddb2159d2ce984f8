pub mod browse;
pub mod compose;
pub mod config;
pub mod react;

use crate::context::AppContext;
use color_eyre::Result;
use media_compose_core::ComposerSession;

fn open_session(ctx: &AppContext, offline: bool) -> Result<ComposerSession> {
    ctx.session(offline)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to start session: {:#}", e))
}
