//! Expansion of a root message into its full thread.

use std::collections::HashSet;

use thiserror::Error;
use tracing::debug;

use crate::api::{ApiError, ModerationApi};
use crate::types::{CredentialTier, MessageRef};

#[derive(Debug, Error)]
#[error("failed to resolve thread {channel_id}/{root_ts}: {source}")]
pub struct LookupError {
    pub channel_id: String,
    pub root_ts: String,
    #[source]
    pub source: ApiError,
}

/// Lists the root and all replies of the thread rooted at `root`, in the
/// order the platform returns them (oldest first).
pub async fn resolve_thread(
    api: &dyn ModerationApi,
    root: &MessageRef,
    tier: CredentialTier,
) -> Result<Vec<MessageRef>, LookupError> {
    let messages = api
        .list_thread_replies(&root.channel_id, &root.ts, tier)
        .await
        .map_err(|source| LookupError {
            channel_id: root.channel_id.clone(),
            root_ts: root.ts.clone(),
            source,
        })?;
    debug!(
        channel = %root.channel_id,
        root_ts = %root.ts,
        resolved = messages.len(),
        "resolved thread"
    );
    if messages.is_empty() {
        return Ok(vec![root.clone()]);
    }
    Ok(messages)
}

/// Deletion order for a resolved thread: newest reply first, root last.
///
/// Replies repeated across pages are dropped. The root is appended even when
/// the platform omitted it.
pub fn deletion_order(root: &MessageRef, resolved: Vec<MessageRef>) -> Vec<MessageRef> {
    let root_entry = resolved
        .iter()
        .find(|message| message.ts == root.ts)
        .cloned()
        .unwrap_or_else(|| root.clone());

    let mut seen = HashSet::new();
    let mut ordered = resolved
        .into_iter()
        .rev()
        .filter(|message| message.ts != root.ts)
        .filter(|message| seen.insert(message.ts.clone()))
        .collect::<Vec<_>>();
    ordered.push(root_entry);
    ordered
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use proptest::prelude::*;

    use super::{deletion_order, resolve_thread};
    use crate::test_support::ScriptedModerationApi;
    use crate::types::{CredentialTier, MessageRef};

    fn message(ts: &str) -> MessageRef {
        MessageRef::new("C1", ts).with_author("U1")
    }

    fn timestamps(messages: &[MessageRef]) -> Vec<&str> {
        messages.iter().map(|message| message.ts.as_str()).collect()
    }

    #[test]
    fn unit_deletion_order_reverses_replies_and_keeps_root_last() {
        let root = message("1.000000");
        let resolved = vec![
            root.clone(),
            message("2.000000"),
            message("3.000000"),
            message("4.000000"),
        ];
        let ordered = deletion_order(&root, resolved);
        assert_eq!(
            timestamps(&ordered),
            vec!["4.000000", "3.000000", "2.000000", "1.000000"]
        );
    }

    #[test]
    fn regression_deletion_order_appends_missing_root_and_drops_duplicates() {
        let root = message("1.000000");
        let resolved = vec![message("2.000000"), message("3.000000"), message("2.000000")];
        let ordered = deletion_order(&root, resolved);
        assert_eq!(timestamps(&ordered), vec!["2.000000", "3.000000", "1.000000"]);
    }

    #[test]
    fn unit_deletion_order_of_bare_root_is_the_root() {
        let root = message("1.000000");
        let ordered = deletion_order(&root, vec![root.clone()]);
        assert_eq!(ordered, vec![root]);
    }

    #[tokio::test]
    async fn functional_resolve_thread_returns_collaborator_order() {
        let root = message("1.000000");
        let api = ScriptedModerationApi::new()
            .with_thread(&root, vec![root.clone(), message("2.000000")]);
        let resolved = resolve_thread(&api, &root, CredentialTier::Standard)
            .await
            .expect("resolved");
        assert_eq!(timestamps(&resolved), vec!["1.000000", "2.000000"]);
    }

    #[tokio::test]
    async fn functional_resolve_thread_treats_empty_listing_as_bare_root() {
        let root = message("1.000000");
        let api = ScriptedModerationApi::new().with_thread(&root, Vec::new());
        let resolved = resolve_thread(&api, &root, CredentialTier::Standard)
            .await
            .expect("resolved");
        assert_eq!(resolved, vec![root]);
    }

    #[tokio::test]
    async fn regression_resolve_thread_surfaces_lookup_error() {
        let root = message("1.000000");
        let api = ScriptedModerationApi::new().with_failing_thread(&root, "thread_not_found");
        let error = resolve_thread(&api, &root, CredentialTier::Standard)
            .await
            .expect_err("lookup should fail");
        assert_eq!(error.root_ts, "1.000000");
        assert!(error.to_string().contains("thread_not_found"));
    }

    fn reply_timestamps() -> impl Strategy<Value = Vec<String>> {
        prop::collection::btree_set(2_u32..500, 0..40).prop_map(|set: BTreeSet<u32>| {
            set.into_iter()
                .map(|seconds| format!("{seconds}.000000"))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn property_deletion_order_puts_root_last_and_reverses_replies(
            replies in reply_timestamps(),
            root_copies in 0_usize..3,
            root_position in 0_usize..64,
        ) {
            let root = message("1.000000");
            let mut resolved = replies.iter().map(|ts| message(ts)).collect::<Vec<_>>();
            for _ in 0..root_copies {
                let index = root_position.min(resolved.len());
                resolved.insert(index, root.clone());
            }

            let ordered = deletion_order(&root, resolved);

            prop_assert_eq!(ordered.len(), replies.len() + 1);
            prop_assert_eq!(ordered.last().map(|m| m.ts.as_str()), Some("1.000000"));
            prop_assert_eq!(
                ordered.iter().filter(|m| m.ts == root.ts).count(),
                1
            );
            let ordered_ts = timestamps(&ordered);
            let expected = replies.iter().rev().map(String::as_str).collect::<Vec<_>>();
            prop_assert_eq!(&ordered_ts[..replies.len()], expected.as_slice());
        }

        #[test]
        fn property_deletion_order_keeps_one_entry_per_repeated_reply(
            replies in reply_timestamps(),
            repeats in prop::collection::vec(any::<prop::sample::Index>(), 0..10),
        ) {
            let root = message("1.000000");
            let mut resolved = vec![root.clone()];
            resolved.extend(replies.iter().map(|ts| message(ts)));
            if !replies.is_empty() {
                for index in &repeats {
                    resolved.push(message(index.get::<String>(&replies)));
                }
            }

            let ordered = deletion_order(&root, resolved);
            let unique = timestamps(&ordered).into_iter().collect::<BTreeSet<_>>();

            prop_assert_eq!(unique.len(), ordered.len());
            prop_assert_eq!(ordered.len(), replies.len() + 1);
            prop_assert_eq!(ordered.last().map(|m| m.ts.as_str()), Some("1.000000"));
        }
    }
}
