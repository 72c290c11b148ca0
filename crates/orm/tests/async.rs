//! Asynchronous variants on tokio's blocking pool.

#![allow(missing_docs)]

mod common;

use common::{Author, author, fixture, post};
use futures::future::try_join_all;
use tessera_orm::{Error, Predicates, Record, Refinement, submit};

#[tokio::test(flavor = "multi_thread")]
async fn save_then_find() {
    let fx = fixture();
    let ann = Record::new(author("Ann", 41));
    ann.lock().posts.push(Record::new(post("Hello")));

    fx.session.save_async(ann.clone()).await.unwrap();
    assert!(ann.key() > 0);

    let found = fx
        .session
        .find_all_async::<Author>(Predicates::new().value("name", "Ann"), Refinement::new())
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].lock().posts.len(), 1);

    let one = fx
        .session
        .find_one_async::<Author>(Predicates::new().value("age", 41), Refinement::new())
        .await
        .unwrap();
    assert_eq!(one.map(|a| a.key()), Some(ann.key()));
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_saves() {
    let fx = fixture();
    let records: Vec<Record<Author>> =
        (0..6).map(|i| Record::new(author(&format!("author-{i}"), i))).collect();

    try_join_all(records.iter().map(|r| fx.session.save_async(r.clone()))).await.unwrap();

    let everyone = fx.session.all_async::<Author>().await.unwrap();
    assert_eq!(everyone.len(), 6);
}

#[tokio::test]
async fn errors_pass_through() {
    let fx = fixture();

    let err = fx.session.destroy_async(Record::new(author("Ann", 41))).await.unwrap_err();
    assert!(matches!(err, Error::NotPersisted { .. }));

    let err = fx.session.refresh_async(Record::<Author>::default()).await.unwrap_err();
    assert!(matches!(err, Error::NotPersisted { .. }));
}

#[tokio::test]
async fn destroy_after_save() {
    let fx = fixture();
    let ann = Record::new(author("Ann", 41));
    fx.session.save_async(ann.clone()).await.unwrap();

    fx.session.destroy_async(ann.clone()).await.unwrap();
    assert_eq!(fx.count("authors"), 0);
}

#[tokio::test]
async fn submit_runs_closures() {
    let value = submit(|| Ok(6 * 7)).await.unwrap();
    assert_eq!(value, 42);
}
