//! Query translation: modifiers, association subqueries and refinements.

#![allow(missing_docs)]

mod common;

use chrono::{NaiveDate, TimeZone, Utc};
use common::{Author, Message, Post, Profile, Tag, assert_sql_contains};
use tessera_orm::{Direction, Entity, Error, Predicates, Record, Refinement, translate};

fn sql<E: Entity>(predicates: &Predicates, refinement: &Refinement) -> String {
    translate::<E>("main", predicates, refinement).unwrap().expect("statement")
}

fn persisted<E: Entity>(key: i64) -> Record<E> {
    let record = Record::<E>::default();
    record.lock().set_key(key);
    record
}

#[test]
fn empty_predicates_match_nothing() {
    let statement = translate::<Author>("main", &Predicates::new(), &Refinement::new()).unwrap();
    assert!(statement.is_none());
}

#[test]
fn fragments_joined_in_order() {
    let predicates = Predicates::new().value("name starts_with", "A").value("age >=", 30);
    assert_sql_contains(
        &sql::<Author>(&predicates, &Refinement::new()),
        &[
            "SELECT * FROM main.authors WHERE",
            "main.authors.name LIKE 'A%'",
            "AND main.authors.age >= 30",
        ],
    );
}

#[test]
fn pattern_modifiers() {
    let contains = sql::<Author>(&Predicates::new().value("name contains", "nn"), &Refinement::new());
    assert_sql_contains(&contains, &["name LIKE '%nn%'"]);

    let ends = sql::<Author>(&Predicates::new().value("name ENDS_WITH", "n"), &Refinement::new());
    assert_sql_contains(&ends, &["name LIKE '%n'"]);
}

#[test]
fn comparisons() {
    let predicates = Predicates::new().value("rating <=", 4.5).value("title", "Hello");
    assert_sql_contains(
        &sql::<Post>(&predicates, &Refinement::new()),
        &["main.posts.rating <= 4.5", "AND main.posts.title = 'Hello'"],
    );
}

#[test]
fn fields_of_another_entity_are_unknown() {
    let predicates = Predicates::new().value("age <", 60).value("rating >", 2.5);
    let err = translate::<Author>("main", &predicates, &Refinement::new()).unwrap_err();
    assert!(matches!(err, Error::UnknownField { ref field, .. } if field == "rating"));
}

#[test]
fn between_two_values() {
    let predicates = Predicates::new().list("age between", [30, 40]);
    assert_sql_contains(
        &sql::<Author>(&predicates, &Refinement::new()),
        &["main.authors.age BETWEEN 30 AND 40"],
    );
}

#[test]
fn between_temporal_values() {
    let first = NaiveDate::from_ymd_opt(2024, 1, 1).expect("date");
    let last = NaiveDate::from_ymd_opt(2024, 1, 31).expect("date");
    let predicates = Predicates::new().list("sent_on between", [first, last]);
    assert_sql_contains(
        &sql::<Message>(&predicates, &Refinement::new()),
        &["main.messages.sent_on BETWEEN '2024-01-01' AND '2024-01-31'"],
    );

    let since = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
    let predicates = Predicates::new().value("sent_at >=", since);
    assert_sql_contains(
        &sql::<Message>(&predicates, &Refinement::new()),
        &["main.messages.sent_at >= '2024-01-01 08:00:00"],
    );
}

#[test]
fn between_needs_exactly_two_values() {
    let predicates = Predicates::new().list("age between", [30, 40, 50]);
    let err = translate::<Author>("main", &predicates, &Refinement::new()).unwrap_err();
    assert!(matches!(err, Error::InvalidModifier { ref modifier, .. } if modifier == "between"));
}

#[test]
fn between_needs_ordered_column() {
    let predicates = Predicates::new().list("active between", [false, true]);
    let err = translate::<Author>("main", &predicates, &Refinement::new()).unwrap_err();
    assert!(matches!(err, Error::InvalidModifier { ref field, .. } if field == "active"));
}

#[test]
fn in_list() {
    let predicates = Predicates::new().list("name in", ["Ann", "Bob"]);
    assert_sql_contains(
        &sql::<Author>(&predicates, &Refinement::new()),
        &["main.authors.name IN ('Ann', 'Bob')"],
    );
}

#[test]
fn empty_in_is_rejected() {
    let predicates = Predicates::new().list("age in", Vec::<i32>::new());
    let err = translate::<Author>("main", &predicates, &Refinement::new()).unwrap_err();
    assert!(matches!(err, Error::InvalidModifier { .. }));
}

#[test]
fn pattern_on_integer_is_rejected() {
    let predicates = Predicates::new().value("age contains", "4");
    let err = translate::<Author>("main", &predicates, &Refinement::new()).unwrap_err();
    assert!(matches!(err, Error::InvalidModifier { .. }));
}

#[test]
fn unknown_modifier_is_rejected() {
    let predicates = Predicates::new().value("age ~", 4);
    let err = translate::<Author>("main", &predicates, &Refinement::new()).unwrap_err();
    assert!(matches!(err, Error::InvalidModifier { ref modifier, .. } if modifier == "~"));
}

#[test]
fn unknown_field_is_rejected() {
    let predicates = Predicates::new().value("height", 180);
    let err = translate::<Author>("main", &predicates, &Refinement::new()).unwrap_err();
    assert!(
        matches!(err, Error::UnknownField { entity: "Author", ref field } if field == "height")
    );
}

#[test]
fn null_equality() {
    let predicates = Predicates::new().value("bio", Option::<String>::None);
    assert_sql_contains(
        &sql::<Profile>(&predicates, &Refinement::new()),
        &["main.profiles.bio IS NULL"],
    );
}

#[test]
fn literals_are_escaped() {
    let predicates = Predicates::new().value("name", "O'Brien");
    assert_sql_contains(
        &sql::<Author>(&predicates, &Refinement::new()),
        &["main.authors.name = 'O''Brien'"],
    );
}

#[test]
fn has_many_subquery() {
    let predicates = Predicates::new().related("post", &persisted::<Post>(5));
    assert_sql_contains(
        &sql::<Author>(&predicates, &Refinement::new()),
        &["main.authors.id IN (SELECT author_id FROM main.posts WHERE main.posts.id = 5)"],
    );
}

#[test]
fn has_one_subquery() {
    let predicates = Predicates::new().related("profile", &persisted::<Profile>(3));
    assert_sql_contains(
        &sql::<Author>(&predicates, &Refinement::new()),
        &["main.authors.id IN (SELECT author_id FROM main.profiles WHERE main.profiles.id = 3)"],
    );
}

#[test]
fn belongs_to_subquery() {
    let predicates = Predicates::new().related("author", &persisted::<Author>(2));
    assert_sql_contains(
        &sql::<Post>(&predicates, &Refinement::new()),
        &["main.posts.id IN (SELECT id FROM main.posts WHERE main.posts.author_id = 2)"],
    );
}

#[test]
fn many_to_many_subquery() {
    let predicates = Predicates::new().related("tag", &persisted::<Tag>(4));
    assert_sql_contains(
        &sql::<Post>(&predicates, &Refinement::new()),
        &["main.posts.id IN (SELECT post_id FROM main.post_tags WHERE main.post_tags.tag_id = 4)"],
    );

    let predicates = Predicates::new().related("post", &persisted::<Post>(4));
    assert_sql_contains(
        &sql::<Tag>(&predicates, &Refinement::new()),
        &["main.tags.id IN (SELECT tag_id FROM main.post_tags WHERE main.post_tags.post_id = 4)"],
    );
}

#[test]
fn no_association_for_type() {
    let predicates = Predicates::new().related("author", &persisted::<Author>(1));
    let err = translate::<Tag>("main", &predicates, &Refinement::new()).unwrap_err();
    assert!(matches!(err, Error::NoAssociation { entity: "Tag", target: "Author" }));
}

#[test]
fn ambiguous_association() {
    let predicates = Predicates::new().related("author", &persisted::<Author>(1));
    let err = translate::<Message>("main", &predicates, &Refinement::new()).unwrap_err();
    assert!(matches!(err, Error::AmbiguousAssociation { count: 2, .. }));
}

#[test]
fn unsaved_related_entity() {
    let predicates = Predicates::new().related("post", &Record::<Post>::default());
    let err = translate::<Author>("main", &predicates, &Refinement::new()).unwrap_err();
    assert!(matches!(err, Error::NotPersisted { entity: "Post" }));
}

#[test]
fn refinements_in_fixed_order() {
    let refinement = Refinement::new()
        .distinct("name")
        .group_by("active")
        .order_by("age", Direction::Descending)
        .order_by("name", Direction::Ascending)
        .limit(5);
    let predicates = Predicates::new().value("active", true);

    assert_sql_contains(
        &sql::<Author>(&predicates, &refinement),
        &[
            "SELECT DISTINCT name FROM main.authors",
            "WHERE main.authors.active = TRUE",
            "GROUP BY active",
            "ORDER BY age DESC, name ASC",
            "LIMIT 5",
        ],
    );
}

#[test]
fn order_direction_tokens() {
    let predicates = Predicates::new().value("active", true);
    for (token, rendered) in [("asc", "ORDER BY age ASC"), ("desc", "ORDER BY age DESC")] {
        let refinement = Refinement::new().order_by_token("age", token).unwrap();
        assert_sql_contains(&sql::<Author>(&predicates, &refinement), &[rendered]);
    }

    let err = Refinement::new().order_by_token("age", "sideways").unwrap_err();
    assert!(matches!(err, Error::InvalidModifier { .. }));
}

#[test]
fn refinement_fields_are_checked() {
    let predicates = Predicates::new().value("active", true);
    let refinement = Refinement::new().order_by("posts", Direction::Ascending);
    let err = translate::<Author>("main", &predicates, &refinement).unwrap_err();
    assert!(matches!(err, Error::UnknownField { ref field, .. } if field == "posts"));
}

#[test]
fn database_qualifier() {
    let predicates = Predicates::new().value("label", "rust");
    let statement = translate::<Tag>("archive", &predicates, &Refinement::new()).unwrap().unwrap();
    assert_sql_contains(&statement, &["FROM archive.tags WHERE archive.tags.label = 'rust'"]);
}
