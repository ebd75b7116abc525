use crate::db::error::DbError;
use crate::error::AuthError;
use crate::models::chunk::ChunkCoord;
use crate::state::pool::SlotId;
use crate::state::registry::Registry;
use bytes::Bytes;
use orbis_core::protocol::reply;
use orbis_core::{Command, CommandKind, Frame, parse_command};
use thiserror::Error;

mod join;
mod loadchunk;
mod login;
mod relay;
mod shoot;
mod signup;

pub type CommandResult = Result<(), CommandError>;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Handles one inbound frame from `slot`. Every reply and broadcast it causes
/// is queued before this returns.
pub async fn process_frame(registry: &mut Registry, slot: SlotId, frame: impl Into<Bytes>) {
    let frame = frame.into();
    match Frame::classify(&frame) {
        Ok(Frame::Broadcast(_)) => relay::relay(registry, slot, frame.clone()),
        Ok(Frame::Command(body)) => dispatch(registry, slot, body).await,
        Err(e) => tracing::debug!(%slot, error = %e, "ignoring malformed command"),
    }

    if registry.config.is_shutdown_sentinel(&frame) {
        tracing::warn!(%slot, "shutdown requested by client");
        registry.request_shutdown();
    }
}

async fn dispatch(registry: &mut Registry, slot: SlotId, body: &str) {
    let cmd = match parse_command(body) {
        Ok(Some(cmd)) => cmd,
        Ok(None) => {
            tracing::trace!(%slot, body, "ignoring unknown command");
            return;
        }
        Err(e) => {
            tracing::debug!(%slot, error = %e, "ignoring malformed command");
            return;
        }
    };

    let kind = cmd.kind();
    let result = match cmd {
        Command::Join { name } => join::join(registry, slot, name),
        Command::Shoot(req) => shoot::shoot(registry, slot, req),
        Command::LoadChunk { cx, cy } => loadchunk::loadchunk(registry, slot, ChunkCoord::new(cx, cy)).await,
        Command::Login(creds) => login::login(registry, slot, creds).await,
        Command::Signup(creds) => signup::signup(registry, slot, creds).await,
    };

    if let Err(e) = result {
        tracing::error!(%slot, command = kind.keyword(), error = %e, "command failed");
        if let Some(token) = failure_token(kind) {
            registry.send_to(slot, token);
        }
    }
}

fn failure_token(kind: CommandKind) -> Option<&'static str> {
    match kind {
        CommandKind::Login => Some(reply::LOGIN_FAILED),
        CommandKind::Signup => Some(reply::SIGNUP_FAILED),
        CommandKind::LoadChunk => Some(reply::CHUNK_FAILED),
        CommandKind::Join | CommandKind::Shoot => None,
    }
}
