use deepfreeze_storage::{MemoryBackend, StorageClass};

pub const BUCKET: &str = "deepfreeze";

/// Seed a repository layout under `base_path` the way a snapshot repository
/// writes it: a few metadata blobs plus index data, all in `class`.
#[allow(dead_code)]
pub fn seeded_repository(
    store: &MemoryBackend,
    base_path: &str,
    class: StorageClass,
) -> Vec<String> {
    let keys: Vec<String> = [
        "index-0",
        "index.latest",
        "meta-abc.dat",
        "snap-abc.dat",
        "indices/xyz/0/__1",
        "indices/xyz/0/__2",
    ]
    .iter()
    .map(|name| format!("{base_path}/{name}"))
    .collect();

    for (i, key) in keys.iter().enumerate() {
        store.insert_object(BUCKET, key, 1024 * (i as u64 + 1), class.clone());
    }
    keys
}
