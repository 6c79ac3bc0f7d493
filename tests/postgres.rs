use nested_set::{NestedSetError, NestedSetRepository, NoHooks};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, Database, DatabaseConnection, DbBackend, Statement};

mod entity {
    pub mod node {
        use nested_set::NestedSetModelDerive as NestedSetModel;
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, DeriveEntityModel, NestedSetModel)]
        #[sea_orm(table_name = "nested_nodes")]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub id: i32,
            pub parent_id: Option<i32>,
            pub name: String,
            pub lft: i32,
            pub rght: i32,
            pub level: i32,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }
}

use entity::node;

fn new_node(parent: Option<i32>, name: &str) -> node::ActiveModel {
    node::ActiveModel {
        parent_id: Set(parent),
        name: Set(name.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn inserts_keep_the_index_consistent() -> Result<(), Box<dyn std::error::Error>> {
    let Some(db) = setup_database().await? else {
        return Ok(());
    };
    truncate_tables(&db).await?;

    let repo = NestedSetRepository::<node::Model>::new();

    let europe = repo.insert(&db, new_node(None, "Europe"), &NoHooks).await?;
    let asia = repo.insert(&db, new_node(None, "Asia"), &NoHooks).await?;
    let asia_id = asia.id;
    let france = repo.insert(&db, new_node(Some(europe.id), "France"), &NoHooks).await?;
    let paris = repo.insert(&db, new_node(Some(france.id), "Paris"), &NoHooks).await?;
    assert_eq!((paris.lft, paris.rght, paris.level), (5, 6, 3));

    repo.verify(&db).await?;

    let chain: Vec<String> = repo
        .ancestors(&db, &paris.id, true)
        .await?
        .into_iter()
        .map(|node| node.name)
        .collect();
    assert_eq!(chain, vec!["Europe", "France", "Paris"]);

    let below: Vec<String> = repo
        .descendants(&db, Some(&europe.id))
        .await?
        .into_iter()
        .map(|node| node.name)
        .collect();
    assert_eq!(below, vec!["France", "Paris"]);

    // move France under Asia
    let mut moved: node::ActiveModel = france.into();
    moved.parent_id = Set(Some(asia.id));
    repo.update(&db, moved, &NoHooks).await?;
    repo.verify(&db).await?;

    let tree = repo.tree(&db, None).await?;
    assert_eq!(tree[0].name, "Asia");
    assert_eq!(tree[0].children[0].children[0].name, "Paris");
    assert!(tree[1].children.is_empty());

    // Asia under Paris would close a parent cycle; the move is rolled back
    let mut looped: node::ActiveModel = asia.into();
    looped.parent_id = Set(Some(paris.id));
    let err = repo.update(&db, looped, &NoHooks).await.unwrap_err();
    assert!(matches!(err, NestedSetError::CyclicOrUnboundedHierarchy { .. }));
    let asia = node::Entity::find_by_id(asia_id).one(&db).await?.expect("asia exists");
    assert_eq!(asia.parent_id, None);
    repo.verify(&db).await?;

    let outcome = repo.rebuild(&db).await?;
    assert_eq!(outcome.written, 0);

    let missing = repo.descendants(&db, Some(&9999)).await;
    assert!(matches!(missing, Err(NestedSetError::NotFound { .. })));

    Ok(())
}

async fn setup_database() -> Result<Option<DatabaseConnection>, sea_orm::DbErr> {
    let Ok(url) = std::env::var("NESTED_SET_TEST_DATABASE_URL") else {
        return Ok(None);
    };
    Database::connect(url).await.map(Some)
}

async fn truncate_tables(db: &DatabaseConnection) -> Result<(), sea_orm::DbErr> {
    db.execute(Statement::from_string(
        DbBackend::Postgres,
        r#"
        CREATE TABLE IF NOT EXISTS nested_nodes (
            id SERIAL PRIMARY KEY,
            parent_id INTEGER REFERENCES nested_nodes(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            lft INTEGER NOT NULL DEFAULT 0,
            rght INTEGER NOT NULL DEFAULT 0,
            level INTEGER NOT NULL DEFAULT 0
        );
        "#,
    ))
    .await?;

    db.execute(Statement::from_string(
        DbBackend::Postgres,
        "CREATE INDEX IF NOT EXISTS nested_nodes_bounds ON nested_nodes (lft, rght);",
    ))
    .await?;

    db.execute(Statement::from_string(
        DbBackend::Postgres,
        "TRUNCATE TABLE nested_nodes RESTART IDENTITY CASCADE;",
    ))
    .await?;

    Ok(())
}
