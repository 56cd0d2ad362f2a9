use std::sync::Arc;

use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tracing::warn;

use super::queries::{is_movie_type, PHOTO_VERSION_LOOKUP, VIDEO_VERSION_LOOKUP};
use super::session::PhotosSession;
use super::{AssetVersion, ByteStream, RemotePhoto, ServiceError, VersionSource, VersionsMap};

/// A CDN download URL opened through the session that listed it.
pub(crate) struct HttpSource {
    session: Arc<dyn PhotosSession>,
    url: String,
}

#[async_trait::async_trait]
impl VersionSource for HttpSource {
    async fn open(&self) -> Result<ByteStream, ServiceError> {
        self.session.stream(&self.url).await
    }
}

/// Decode the filename from the `filenameEnc` field.
/// Returns `None` when the field is absent or undecodable.
pub(crate) fn decode_filename(master_fields: &Value) -> Option<String> {
    let enc = &master_fields["filenameEnc"];
    let value = enc["value"].as_str()?;
    match enc["type"].as_str().unwrap_or("STRING") {
        "STRING" => Some(value.to_string()),
        "ENCRYPTED_BYTES" => {
            let decoded = base64::engine::general_purpose::STANDARD
                .decode(value)
                .ok()?;
            String::from_utf8(decoded).ok()
        }
        other => {
            warn!("Unsupported filenameEnc type: {}", other);
            None
        }
    }
}

fn added_date(asset_fields: &Value) -> Option<DateTime<Utc>> {
    asset_fields["addedDate"]["value"]
        .as_f64()
        .and_then(|ms| Utc.timestamp_millis_opt(ms as i64).single())
}

/// Collect the size variants present in a master/asset record pair.
/// The asset record wins when both carry the same resource field.
fn versions(
    master_fields: &Value,
    asset_fields: &Value,
    session: &Arc<dyn PhotosSession>,
) -> VersionsMap {
    let is_movie = master_fields["itemType"]["value"]
        .as_str()
        .is_some_and(is_movie_type);
    let lookup = if is_movie {
        VIDEO_VERSION_LOOKUP
    } else {
        PHOTO_VERSION_LOOKUP
    };

    let mut versions = VersionsMap::new();
    for (size, prefix) in lookup {
        let res_field = format!("{prefix}Res");
        let res_entry = if !asset_fields[&res_field]["value"].is_null() {
            &asset_fields[&res_field]["value"]
        } else if !master_fields[&res_field]["value"].is_null() {
            &master_fields[&res_field]["value"]
        } else {
            continue;
        };

        let Some(url) = res_entry["downloadURL"].as_str() else {
            warn!("Missing expected field: {res_field}.downloadURL");
            continue;
        };
        let source: Arc<dyn VersionSource> = Arc::new(HttpSource {
            session: Arc::clone(session),
            url: url.to_string(),
        });
        versions.insert(*size, AssetVersion::new(res_entry["size"].as_u64(), source));
    }
    versions
}

/// Build a [`RemotePhoto`] from a `CPLMaster` record and its `CPLAsset`.
pub(crate) fn photo_from_records(
    master: &Value,
    asset: &Value,
    session: &Arc<dyn PhotosSession>,
) -> Option<RemotePhoto> {
    let master_fields = &master["fields"];
    let asset_fields = &asset["fields"];
    let Some(filename) = decode_filename(master_fields) else {
        warn!(
            "Photo {} has no filename, skipping",
            master["recordName"].as_str().unwrap_or("?")
        );
        return None;
    };
    let photo = RemotePhoto::new(filename, versions(master_fields, asset_fields, session));
    Some(match added_date(asset_fields) {
        Some(added) => photo.with_added_date(added),
        None => photo,
    })
}
