//! `actions/all/...` and `actions/file/...`: the paginated action history.

use chronostate_core::{newest_first, ActionRecord, ActionsPayload, Name};
use chronostate_store::ActionLog;

use crate::error::Result;
use crate::server::ServerContext;

/// Every action (or every action on `file`), newest first.
///
/// Equal timestamps are ordered by log position, later first, so an
/// unchanged log always lists identically.
pub async fn list_actions(log: &dyn ActionLog, file: Option<&str>) -> Result<Vec<ActionRecord>> {
    let mut actions = log.scan_actions(file).await?;
    newest_first(&mut actions);
    Ok(actions)
}

pub(crate) async fn execute(
    ctx: &ServerContext,
    name: &Name,
    file: Option<&str>,
    segment: u64,
) -> Result<()> {
    let actions = list_actions(ctx.stores.actions.as_ref(), file).await?;
    tracing::debug!(name = %name, ?file, total = actions.len(), segment, "serving actions");
    ctx.publish_segment::<_, ActionsPayload>(name, &actions, segment)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronostate_core::Fingerprint;
    use chronostate_store::{MemoryStore, NewAction};
    use proptest::prelude::*;

    fn device() -> Name {
        Name::parse("/alice").unwrap()
    }

    #[tokio::test]
    async fn test_filter_keeps_order() {
        let store = MemoryStore::new();
        for (i, file) in ["a", "b", "a", "c", "a"].iter().enumerate() {
            store
                .append_action(
                    NewAction::update(device(), *file, Fingerprint::of(&[i as u8])).at(i as i64),
                )
                .await
                .unwrap();
        }

        let only_a = list_actions(&store, Some("a")).await.unwrap();
        assert_eq!(only_a.len(), 3);
        assert!(only_a.iter().all(|a| a.filename == "a"));
        assert_eq!(
            only_a.iter().map(|a| a.version).collect::<Vec<_>>(),
            vec![2, 1, 0]
        );

        assert!(list_actions(&store, Some("missing")).await.unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn prop_listing_is_decreasing_and_deterministic(
            timestamps in proptest::collection::vec(0i64..20, 0..60)
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let store = MemoryStore::new();
                for (i, ts) in timestamps.iter().enumerate() {
                    store
                        .append_action(
                            NewAction::update(device(), format!("f{}", i % 4), Fingerprint::of(&[i as u8]))
                                .at(*ts),
                        )
                        .await
                        .unwrap();
                }

                let first = list_actions(&store, None).await.unwrap();
                let second = list_actions(&store, None).await.unwrap();
                prop_assert_eq!(&first, &second);
                prop_assert_eq!(first.len(), timestamps.len());
                for pair in first.windows(2) {
                    prop_assert!(pair[0].timestamp >= pair[1].timestamp);
                    if pair[0].timestamp == pair[1].timestamp {
                        prop_assert!(pair[0].log_position > pair[1].log_position);
                    }
                }
                Ok(())
            })?;
        }

        #[test]
        fn prop_newest_first_orders_any_records(
            mut records in proptest::collection::vec(chronostate_testkit::generators::action_record(), 0..40)
        ) {
            let mut expected: Vec<_> = records.iter().map(|a| (a.timestamp, a.log_position)).collect();
            expected.sort_by(|a, b| b.cmp(a));

            chronostate_core::newest_first(&mut records);
            let got: Vec<_> = records.iter().map(|a| (a.timestamp, a.log_position)).collect();
            prop_assert_eq!(got, expected);
        }
    }
}
