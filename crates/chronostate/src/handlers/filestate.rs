//! `filestate/all/<nonce>/<segment>`: the tracked-file index.

use chronostate_core::{FileStateRecord, FilesPayload, Name};
use chronostate_store::FileStateIndex;

use crate::error::Result;
use crate::server::ServerContext;

/// Every tracked file, ordered by filename.
pub async fn list_files(index: &dyn FileStateIndex) -> Result<Vec<FileStateRecord>> {
    let mut files = index.list_files().await?;
    files.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(files)
}

pub(crate) async fn execute(ctx: &ServerContext, name: &Name, segment: u64) -> Result<()> {
    let files = list_files(ctx.stores.files.as_ref()).await?;
    tracing::debug!(name = %name, total = files.len(), segment, "serving file state");
    ctx.publish_segment::<_, FilesPayload>(name, &files, segment)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronostate_core::Fingerprint;
    use chronostate_store::{ActionLog, FileStateIndex, MemoryStore, NewAction};

    #[tokio::test]
    async fn test_one_record_per_file() {
        let store = MemoryStore::new();
        let device = Name::parse("/alice").unwrap();
        for (i, file) in ["b.txt", "a.txt", "b.txt"].iter().enumerate() {
            store
                .append_action(NewAction::update(device.clone(), *file, Fingerprint::of(&[i as u8])))
                .await
                .unwrap();
        }
        store
            .append_action(NewAction::update(device.clone(), "c.txt", Fingerprint::of(b"c")))
            .await
            .unwrap();
        store
            .append_action(NewAction::delete(device, "c.txt"))
            .await
            .unwrap();

        let files = list_files(&store).await.unwrap();
        let names: Vec<_> = files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert_eq!(files[1].version, 1);
        assert_eq!(files[1].fingerprint, Fingerprint::of(&[2]));
    }

    proptest::proptest! {
        #[test]
        fn prop_last_upsert_wins_in_name_order(
            records in proptest::collection::vec(chronostate_testkit::generators::file_state_record(), 0..30)
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let files = rt.block_on(async {
                let store = MemoryStore::new();
                for record in &records {
                    store.upsert_file(record).await.unwrap();
                }
                list_files(&store).await.unwrap()
            });

            let mut expected = std::collections::BTreeMap::new();
            for record in &records {
                expected.insert(record.filename.clone(), record.clone());
            }
            proptest::prop_assert_eq!(files, expected.into_values().collect::<Vec<_>>());
        }
    }
}
