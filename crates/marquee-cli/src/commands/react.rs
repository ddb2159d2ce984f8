use super::open_session;
use crate::context::AppContext;
use crate::output::Output;
use clap::ValueEnum;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use media_compose_core::{OptimisticMutationManager, ReactionOutcome};
use media_compose_models::{ReactionState, VoteChoice};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VoteArg {
    Agree,
    Disagree,
}

impl From<VoteArg> for VoteChoice {
    fn from(arg: VoteArg) -> Self {
        match arg {
            VoteArg::Agree => VoteChoice::Agree,
            VoteArg::Disagree => VoteChoice::Disagree,
        }
    }
}

/// Agree count, disagree count, and the caller's current vote.
pub type VoteCounts = (u32, u32, Option<VoteArg>);

pub async fn run_vote(
    ctx: &AppContext,
    offline: bool,
    target_id: &str,
    choice: VoteArg,
    (agree, disagree, mine): VoteCounts,
    output: &Output,
) -> Result<()> {
    let session = open_session(ctx, offline)?;
    let reactions = session.reactions();
    reactions.seed(
        target_id,
        ReactionState::Vote {
            agree,
            disagree,
            mine: mine.map(VoteChoice::from),
        },
    );

    let outcome = reactions.vote(target_id, choice.into()).await?;
    report(reactions, target_id, outcome, output)
}

pub async fn run_like(
    ctx: &AppContext,
    offline: bool,
    target_id: &str,
    count: u32,
    liked: bool,
    output: &Output,
) -> Result<()> {
    let session = open_session(ctx, offline)?;
    let reactions = session.reactions();
    reactions.seed(target_id, ReactionState::Like { count, liked });

    let outcome = reactions.toggle_like(target_id).await?;
    report(reactions, target_id, outcome, output)
}

fn report(
    reactions: &OptimisticMutationManager,
    target_id: &str,
    outcome: ReactionOutcome,
    output: &Output,
) -> Result<()> {
    let displayed = reactions.displayed(target_id);
    match outcome {
        ReactionOutcome::Confirmed(state) => {
            output.data(&json!({ "target_id": target_id, "status": "confirmed", "state": state }));
            output.success(format!("{}: {}", target_id, describe(&state)));
            Ok(())
        }
        ReactionOutcome::RolledBack { restored, error } => {
            output.data(&json!({
                "target_id": target_id,
                "status": "rolled_back",
                "state": restored,
                "error": error.to_string(),
            }));
            output.warn(format!("{}: reverted to {}", target_id, describe(&restored)));
            Err(eyre!(error))
        }
        ReactionOutcome::Ignored => {
            output.data(&json!({ "target_id": target_id, "status": "ignored", "state": displayed }));
            output.warn(format!("{}: another change is still pending", target_id));
            Ok(())
        }
    }
}

fn describe(state: &ReactionState) -> String {
    match state {
        ReactionState::Vote { agree, disagree, mine } => {
            let mine = match mine {
                Some(VoteChoice::Agree) => "you agree",
                Some(VoteChoice::Disagree) => "you disagree",
                None => "no vote from you",
            };
            format!("{} agree, {} disagree ({})", agree, disagree, mine)
        }
        ReactionState::Like { count, liked } => {
            format!("{} like{}{}", count, if *count == 1 { "" } else { "s" }, if *liked { ", including yours" } else { "" })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        let vote = ReactionState::Vote { agree: 4, disagree: 1, mine: Some(VoteChoice::Agree) };
        assert_eq!(describe(&vote), "4 agree, 1 disagree (you agree)");

        let like = ReactionState::Like { count: 1, liked: true };
        assert_eq!(describe(&like), "1 like, including yours");
    }
}
