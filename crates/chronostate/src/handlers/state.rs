//! `state/<nonce>`: the sync-tree snapshot.

use chronostate_core::{Name, StatePayload, SyncNodeView};
use chronostate_store::SyncStateSource;

use crate::error::Result;
use crate::server::ServerContext;

/// Point-in-time view of every known device, ordered by device name.
pub async fn snapshot(sync: &dyn SyncStateSource) -> Result<Vec<SyncNodeView>> {
    let mut nodes = sync.sync_nodes().await?;
    nodes.sort_by(|a, b| a.device.cmp(&b.device));
    Ok(nodes)
}

pub(crate) async fn execute(ctx: &ServerContext, name: &Name) -> Result<()> {
    let nodes = snapshot(ctx.stores.sync.as_ref()).await?;
    tracing::debug!(name = %name, nodes = nodes.len(), "serving state snapshot");
    ctx.publish(name, &StatePayload { nodes }, None).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronostate_core::Fingerprint;
    use chronostate_store::{ActionLog, MemoryStore, NewAction};

    #[tokio::test]
    async fn test_snapshot_tracks_highest_seq() {
        let store = MemoryStore::new();
        let bob = Name::parse("/bob").unwrap();
        let alice = Name::parse("/alice").unwrap();

        for i in 0..3 {
            store
                .append_action(NewAction::update(bob.clone(), "b", Fingerprint::of(&[i])))
                .await
                .unwrap();
        }
        store
            .append_action(NewAction::update(alice.clone(), "a", Fingerprint::of(b"a")))
            .await
            .unwrap();
        store
            .set_forwarding_hint(&bob, Some(Name::parse("/hub").unwrap()))
            .await
            .unwrap();

        let nodes = snapshot(&store).await.unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].device, alice);
        assert_eq!(nodes[0].seq_no, Some(0));
        assert_eq!(nodes[1].device, bob);
        assert_eq!(nodes[1].seq_no, Some(2));
        assert_eq!(nodes[1].forwarding_hint, Some(Name::parse("/hub").unwrap()));
    }
}
