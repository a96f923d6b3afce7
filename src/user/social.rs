//! Follow graph mutations.
//!
//! An edge A -> B is stored twice: A in `B.followers` and B in `A.following`.
//! These helpers mutate both loaded documents; the caller persists them together.

use mongodb::bson::oid::ObjectId;
use serde::Serialize;

use crate::user::model::{Notification, User};
use crate::utils::error::CustomError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowOutcome {
    pub follower_added: bool,
    pub following_added: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnfollowOutcome {
    pub follower_removed: bool,
    pub following_removed: bool,
}

fn stored_id(user: &User) -> Result<ObjectId, CustomError> {
    user.id
        .ok_or_else(|| CustomError::InternalServerError("User ID missing".to_string()))
}

/// `actor` starts following `target`. The target is notified only when the
/// actor was not already among its followers.
pub fn follow(target: &mut User, actor: &mut User) -> Result<FollowOutcome, CustomError> {
    let target_id = stored_id(target)?;
    let actor_id = stored_id(actor)?;

    if target_id == actor_id {
        return Err(CustomError::BadRequestError(
            "You cannot follow yourself".to_string(),
        ));
    }

    let follower_added = target.followers.insert(actor_id);
    if follower_added {
        target.notify(Notification::follow(&actor.name, &actor_id));
    }

    let following_added = actor.following.insert(target_id);

    Ok(FollowOutcome {
        follower_added,
        following_added,
    })
}

pub fn unfollow(target: &mut User, actor: &mut User) -> Result<UnfollowOutcome, CustomError> {
    let target_id = stored_id(target)?;
    let actor_id = stored_id(actor)?;

    Ok(UnfollowOutcome {
        follower_removed: target.followers.remove(&actor_id),
        following_removed: actor.following.remove(&target_id),
    })
}
