use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Duration;
use keyward_auth::{CredentialStore, Guardian, Identity, IdentityDraft, PasswordHash, RoleName, TokenConfig, TokenIssuer, revoke_all};
use keyward_infra::store::InMemoryCredentialStore;

const SECRET: &str = "benchmark-secret-0123456789abcdef";

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn setup(rt: &tokio::runtime::Runtime) -> (TokenConfig, Arc<InMemoryCredentialStore>, Identity) {
    let config = TokenConfig::new(SECRET, Duration::minutes(60)).unwrap();
    let store = Arc::new(InMemoryCredentialStore::new());
    let identity = rt.block_on(async {
        store.insert_role("Viewer", None).await.unwrap();
        let draft = IdentityDraft::new("bench@example.com", "Bench", PasswordHash::new("unused"))
            .with_roles(BTreeSet::from([RoleName::from("Viewer")]));
        let created = store.create(draft).await.unwrap();
        store.find_by_id(created.id).await.unwrap().unwrap()
    });
    (config, store, identity)
}

/// Token issuance: claim assembly plus HS256 signing.
fn bench_issue(c: &mut Criterion) {
    let rt = runtime();
    let (config, _store, identity) = setup(&rt);
    let issuer = TokenIssuer::new(&config);

    c.bench_function("issue_token", |b| {
        b.iter(|| black_box(issuer.issue_default(black_box(&identity)).unwrap()));
    });
}

/// Full guardian pass: decode, verify, lookup, version and activity checks.
fn bench_validate(c: &mut Criterion) {
    let rt = runtime();
    let (config, store, identity) = setup(&rt);
    let token = TokenIssuer::new(&config).issue_default(&identity).unwrap().token;
    let guardian = Guardian::new(&config, store);

    c.bench_function("validate_token", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(guardian.validate(black_box(&token)).await.unwrap()) });
    });
}

/// Revocation under contention: N concurrent version advances.
fn bench_revoke_contention(c: &mut Criterion) {
    let rt = runtime();
    let (_config, store, identity) = setup(&rt);
    let store: Arc<dyn CredentialStore> = store;
    let id = identity.id;

    let mut group = c.benchmark_group("revoke_all_concurrent");
    for tasks in [1usize, 8, 64] {
        group.throughput(Throughput::Elements(tasks as u64));
        group.bench_with_input(BenchmarkId::from_parameter(tasks), &tasks, |b, &tasks| {
            b.to_async(&rt).iter(|| {
                let store = store.clone();
                async move {
                    let handles: Vec<_> = (0..tasks)
                        .map(|_| {
                            let store = store.clone();
                            tokio::spawn(async move { revoke_all(store.as_ref(), id).await.unwrap() })
                        })
                        .collect();
                    for handle in handles {
                        black_box(handle.await.unwrap());
                    }
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_issue, bench_validate, bench_revoke_contention);
criterion_main!(benches);
