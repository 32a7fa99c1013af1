use ndertimi::{
    config::AuthConfig,
    models::{
        account::{Identity, Role},
        project::Project,
    },
    secrets::hash_secret,
    services::{
        access::{AccessError, ProjectFilter, authorize_detail, visible_projects},
        accounts::{CredentialStore, RegisterError},
        projects::{ProjectError, ProjectRepository, SaveProjectParameters, save_project},
    },
    storage::{Database, json::JsonFileStorage},
};
use tempfile::TempDir;

const MASTER: &str = "site-office-master";

fn open_store() -> (TempDir, Database<JsonFileStorage>) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(JsonFileStorage::new(dir.path().join("store.json"))).unwrap();
    (dir, db)
}

fn auth() -> AuthConfig {
    AuthConfig {
        master_secret_hash: Some(hash_secret(MASTER).unwrap()),
        ..AuthConfig::default()
    }
}

fn client() -> Identity {
    Identity {
        id: String::from("c1"),
        identifier: String::from("investor@example.com"),
        role: Role::Client,
    }
}

fn names(projects: Vec<&Project>) -> Vec<&str> {
    projects.into_iter().map(|p| p.name.as_str()).collect()
}

fn create_tower(repository: &ProjectRepository<'_, JsonFileStorage>) -> Project {
    save_project(
        repository,
        SaveProjectParameters {
            name: String::from("Tower A"),
            location: String::from("Tirana"),
            client_access_code: String::from("ABC1"),
            ..SaveProjectParameters::default()
        },
    )
    .unwrap()
}

#[test]
fn create_project_then_gate_client_access_by_code() {
    let (_dir, db) = open_store();
    let repository = ProjectRepository::new(&db);
    let admin = Identity::admin();

    let tower = create_tower(&repository);

    let all = repository.list_all().unwrap();
    let admin_active = visible_projects(&all, &admin, &ProjectFilter::default());
    assert_eq!(names(admin_active), vec!["Tower A"]);

    let stored = repository.get_by_id(&tower.id).unwrap();
    assert!(authorize_detail(&client(), &stored, Some("ABC1")).is_ok());
    assert_eq!(
        authorize_detail(&client(), &stored, Some("XYZ9")),
        Err(AccessError::InvalidAccessCode)
    );
}

#[test]
fn archive_hides_project_until_restored() {
    let (_dir, db) = open_store();
    let repository = ProjectRepository::new(&db);
    let admin = Identity::admin();
    let archived_view = ProjectFilter {
        show_archived: true,
        ..ProjectFilter::default()
    };

    let tower = create_tower(&repository);
    repository.archive(&tower.id).unwrap();

    let all = repository.list_all().unwrap();
    assert!(visible_projects(&all, &admin, &ProjectFilter::default()).is_empty());
    assert!(visible_projects(&all, &client(), &ProjectFilter::default()).is_empty());
    assert!(visible_projects(&all, &client(), &archived_view).is_empty());
    assert_eq!(names(visible_projects(&all, &admin, &archived_view)), vec!["Tower A"]);

    repository.restore(&tower.id).unwrap();

    let all = repository.list_all().unwrap();
    assert_eq!(
        names(visible_projects(&all, &admin, &ProjectFilter::default())),
        vec!["Tower A"]
    );
    assert!(visible_projects(&all, &admin, &archived_view).is_empty());
    assert_eq!(repository.get_by_id(&tower.id).unwrap(), tower);
}

#[test]
fn register_then_authenticate_client_and_master() {
    let (_dir, db) = open_store();
    let auth = auth();
    let credentials = CredentialStore::new(&db, &auth);

    credentials.register("a@b.com", "s3cret").unwrap();

    let client = credentials.authenticate("a@b.com", "s3cret").unwrap();
    assert_eq!(client.role, Role::Client);

    let admin = credentials.authenticate("anyone@anywhere", MASTER).unwrap();
    assert_eq!(admin.role, Role::Admin);
}

#[test]
fn duplicate_registration_leaves_accounts_unchanged() {
    let (_dir, db) = open_store();
    let auth = auth();
    let credentials = CredentialStore::new(&db, &auth);
    credentials.register("a@b.com", "s3cret").unwrap();
    let before = db.snapshot().unwrap().accounts;

    assert!(matches!(
        credentials.register("a@b.com", "another1"),
        Err(RegisterError::Conflict(_))
    ));
    assert_eq!(db.snapshot().unwrap().accounts, before);
}

#[test]
fn delete_is_final_from_either_state() {
    let (_dir, db) = open_store();
    let repository = ProjectRepository::new(&db);

    let active = create_tower(&repository);
    let archived = create_tower(&repository);
    repository.archive(&archived.id).unwrap();

    repository.delete(&active.id).unwrap();
    repository.delete(&archived.id).unwrap();

    assert!(matches!(repository.get_by_id(&active.id), Err(ProjectError::NotFound(_))));
    assert!(matches!(repository.get_by_id(&archived.id), Err(ProjectError::NotFound(_))));
}

#[test]
fn data_survives_close_and_reopen() {
    let (dir, db) = open_store();
    let tower = create_tower(&ProjectRepository::new(&db));
    db.close();

    let db = Database::open(JsonFileStorage::new(dir.path().join("store.json"))).unwrap();
    assert_eq!(ProjectRepository::new(&db).get_by_id(&tower.id).unwrap(), tower);
}

#[test]
fn legacy_export_is_migrated_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    std::fs::write(
        &path,
        r#"{
            "projects": [{
                "id": "1717171717171",
                "name": "Villa Blu",
                "location": "Durrës",
                "description": "",
                "thumbnailUrl": "",
                "clientAccessCode": "VB22",
                "status": "Finishing",
                "isArchived": true,
                "updates": []
            }],
            "users": [{"id": "1", "emailOrPhone": "a@b.com", "role": "client", "password": "s3cret"}]
        }"#,
    )
    .unwrap();

    let db = Database::open(JsonFileStorage::new(path)).unwrap();
    let auth = auth();

    let villa = ProjectRepository::new(&db).get_by_id("1717171717171").unwrap();
    assert!(villa.is_archived);
    assert!(CredentialStore::new(&db, &auth).authenticate("a@b.com", "s3cret").is_ok());
    assert_eq!(db.snapshot().unwrap().version, 2);
}
