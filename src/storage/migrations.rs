use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::{secrets::hash_secret, storage::StorageError};

type MigrationFn = fn(Value) -> Result<Value, StorageError>;

fn get_migrations() -> Vec<MigrationFn> {
    vec![migrate_v1_to_v2]
}

/// Returns 1 if version field is missing (the unversioned legacy export)
pub fn detect_version(value: &Value) -> Result<u32, StorageError> {
    match value.get("version") {
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| StorageError::InvalidVersion(v.to_string())),
        None => Ok(1),
    }
}

/// Migrations are applied sequentially: v1→v2→v3→...→target
pub fn apply_migrations(
    mut data: Value,
    from_version: u32,
    to_version: u32,
) -> Result<Value, StorageError> {
    if from_version == to_version {
        return Ok(data);
    }

    if from_version > to_version {
        return Err(StorageError::FutureVersion(from_version));
    }

    let migrations = get_migrations();

    for version in from_version..to_version {
        let migration_idx = version.checked_sub(1).map(|idx| idx as usize); // v1→v2 is at index 0

        let Some(migration) = migration_idx.and_then(|idx| migrations.get(idx)) else {
            return Err(StorageError::UnsupportedVersion(version));
        };

        data = migration(data)?;
        info!(from = version, to = version + 1, "Applied store migration");
    }

    Ok(data)
}

fn rename_key(obj: &mut Map<String, Value>, from: &str, to: &str) {
    if let Some(v) = obj.remove(from) {
        obj.insert(to.to_string(), v);
    }
}

fn take_array(obj: &mut Map<String, Value>, key: &str) -> Vec<Value> {
    match obj.remove(key) {
        Some(Value::Array(items)) => items,
        _ => vec![],
    }
}

/// v1 is the legacy export: projects as a camelCase array, users with
/// plaintext passwords and vendor-named media types.
fn migrate_v1_to_v2(value: Value) -> Result<Value, StorageError> {
    let failed = |reason: &str| StorageError::MigrationFailed {
        version: 1,
        reason: reason.to_string(),
    };

    let Value::Object(mut root) = value else {
        return Err(failed("store root is not an object"));
    };

    let mut projects = Map::new();
    for project in take_array(&mut root, "projects") {
        let Value::Object(mut project) = project else {
            return Err(failed("project record is not an object"));
        };
        rename_key(&mut project, "thumbnailUrl", "thumbnail");
        rename_key(&mut project, "clientAccessCode", "client_access_code");
        rename_key(&mut project, "isArchived", "is_archived");
        if !project.contains_key("is_archived") {
            project.insert("is_archived".to_string(), Value::Bool(false));
        }

        let updates = take_array(&mut project, "updates")
            .into_iter()
            .map(migrate_v1_update)
            .collect();
        project.insert("updates".to_string(), Value::Array(updates));

        let id = match project.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => return Err(failed("project record has no id")),
        };
        project.insert("id".to_string(), Value::String(id.clone()));
        projects.insert(id, Value::Object(project));
    }

    let mut accounts = Vec::new();
    for user in take_array(&mut root, "users") {
        let Value::Object(mut user) = user else {
            return Err(failed("user record is not an object"));
        };
        let is_client = user.get("role").and_then(Value::as_str).unwrap_or("client") == "client";
        let password = user.remove("password");
        let (Some(Value::String(password)), true) = (password, is_client) else {
            warn!(
                id = ?user.get("id"),
                "Dropping legacy user without a client password"
            );
            continue;
        };

        let secret_hash = hash_secret(&password).map_err(|e| failed(&e.to_string()))?;
        rename_key(&mut user, "emailOrPhone", "identifier");
        user.insert("secret_hash".to_string(), Value::String(secret_hash));
        user.insert("role".to_string(), Value::from("client"));
        accounts.push(Value::Object(user));
    }

    root.insert("version".to_string(), Value::from(2));
    root.insert("projects".to_string(), Value::Object(projects));
    root.insert("accounts".to_string(), Value::Array(accounts));

    Ok(Value::Object(root))
}

fn migrate_v1_update(update: Value) -> Value {
    let Value::Object(mut update) = update else {
        return update;
    };

    // An unparsable week number was stored as null by the legacy form
    let week = update.remove("weekNumber").and_then(|w| w.as_u64()).unwrap_or(0);
    update.insert("week_number".to_string(), Value::from(week));

    if let Some(Value::Array(media)) = update.get_mut("media") {
        for item in media.iter_mut().filter_map(Value::as_object_mut) {
            let kind = match item.get("type").and_then(Value::as_str) {
                Some("3d-polycam") => "3d-model-embed",
                Some("360-floorfy") => "panorama-embed",
                _ => continue,
            };
            item.insert("type".to_string(), Value::from(kind));
        }
    }

    Value::Object(update)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{
            project::{MediaKind, Status},
            store::Store,
        },
        secrets::verify_secret,
    };

    const LEGACY_EXPORT: &str = r#"{
        "projects": [
            {
                "id": "1717171717171",
                "name": "Tower A",
                "location": "Tirana",
                "description": "Residential tower",
                "thumbnailUrl": "https://picsum.photos/800/600",
                "clientAccessCode": "ABC1",
                "status": "Foundation",
                "updates": [
                    {
                        "id": "u1",
                        "weekNumber": 2,
                        "date": "2024-05-10",
                        "description": "Excavation done",
                        "media": [
                            {"id": "m1", "type": "3d-polycam", "url": "https://poly.cam/x", "title": "Scan"},
                            {"id": "m2", "type": "360-floorfy", "url": "https://floorfy.com/y", "title": "Tour"},
                            {"id": "m3", "type": "image", "url": "data:image/png;base64,AA==", "title": "Pit"}
                        ]
                    }
                ]
            }
        ],
        "users": [
            {"id": "1", "emailOrPhone": "a@b.com", "role": "client", "password": "s3cret"},
            {"id": "admin", "emailOrPhone": "admin", "role": "admin"}
        ]
    }"#;

    #[test]
    fn test_detect_version_with_version_field() {
        let json = serde_json::json!({"version": 2, "projects": {}, "accounts": []});
        assert_eq!(detect_version(&json).unwrap(), 2);
    }

    #[test]
    fn test_detect_version_without_version_field() {
        let json = serde_json::json!({"projects": [], "users": []});
        assert_eq!(detect_version(&json).unwrap(), 1);
    }

    #[test]
    fn test_detect_version_malformed() {
        let json = serde_json::json!({"version": "two"});
        assert!(matches!(
            detect_version(&json),
            Err(StorageError::InvalidVersion(_))
        ));
    }

    #[test]
    fn test_apply_migrations_same_version() {
        let data = serde_json::json!({"version": 2});
        let result = apply_migrations(data.clone(), 2, 2).unwrap();
        assert_eq!(result, data);
    }

    #[test]
    fn test_apply_migrations_future_version() {
        let data = serde_json::json!({"version": 5});
        let result = apply_migrations(data, 5, 2);
        assert!(matches!(result, Err(StorageError::FutureVersion(5))));
    }

    #[test]
    fn test_apply_migrations_unsupported_version() {
        let data = serde_json::json!({"version": 0});
        let result = apply_migrations(data, 0, 2);
        assert!(matches!(result, Err(StorageError::UnsupportedVersion(0))));
    }

    #[test]
    fn test_migrate_legacy_export() {
        let legacy: Value = serde_json::from_str(LEGACY_EXPORT).unwrap();
        let migrated = apply_migrations(legacy, 1, 2).unwrap();
        let store: Store = serde_json::from_value(migrated).unwrap();

        let project = &store.projects["1717171717171"];
        assert_eq!(project.client_access_code, "ABC1");
        assert_eq!(project.status, Status::Foundation);
        assert!(!project.is_archived);
        assert_eq!(project.updates[0].week_number, 2);

        let kinds: Vec<_> = project.updates[0].media.iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![
                MediaKind::ModelEmbed,
                MediaKind::PanoramaEmbed,
                MediaKind::Image
            ]
        );

        assert_eq!(store.accounts.len(), 1, "admin record must not be carried over");
        let account = &store.accounts[0];
        assert_eq!(account.identifier, "a@b.com");
        assert!(verify_secret("s3cret", &account.secret_hash).unwrap());
    }

    #[test]
    fn test_migrate_rejects_project_without_id() {
        let legacy = serde_json::json!({"projects": [{"name": "No id"}], "users": []});
        assert!(matches!(
            apply_migrations(legacy, 1, 2),
            Err(StorageError::MigrationFailed { version: 1, .. })
        ));
    }
}
