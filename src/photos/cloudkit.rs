use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::asset::photo_from_records;
use super::queries::{
    album_filter, encode_params, list_query, ALBUM_FOLDERS_TYPE, ALBUM_LIST_TYPE,
    ALL_PHOTOS_LIST_TYPE, PROJECT_ROOT_FOLDER, ROOT_FOLDER,
};
use super::session::PhotosSession;
use super::{PhotoAlbum, PhotosService, RemotePhoto, ServiceError};

const DEFAULT_PAGE_SIZE: usize = 100;

/// Response from `/records/query`.
#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub records: Vec<Record>,
}

/// A CloudKit record. Fields stay dynamic JSON because the schema varies by
/// record type.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    #[serde(default)]
    pub record_name: String,
    #[serde(default)]
    pub record_type: String,
    #[serde(default)]
    pub fields: Value,
}

/// A user album as listed by `CPLAlbumByPositionLive`.
#[derive(Debug, Clone)]
struct Folder {
    name: String,
    id: String,
}

/// Photo library backed by a CloudKit-style records query API.
pub struct CloudKitService {
    session: Arc<dyn PhotosSession>,
    service_endpoint: String,
    params: BTreeMap<String, String>,
    zone_id: Value,
    page_size: usize,
}

impl std::fmt::Debug for CloudKitService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudKitService")
            .field("service_endpoint", &self.service_endpoint)
            .field("zone_id", &self.zone_id)
            .finish_non_exhaustive()
    }
}

impl CloudKitService {
    pub fn new(
        session: Arc<dyn PhotosSession>,
        service_endpoint: String,
        params: BTreeMap<String, String>,
    ) -> Self {
        Self {
            session,
            service_endpoint: service_endpoint.trim_end_matches('/').to_string(),
            params,
            zone_id: json!({"zoneName": "PrimarySync"}),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    #[cfg(test)]
    fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    fn query_url(&self) -> String {
        if self.params.is_empty() {
            format!("{}/records/query", self.service_endpoint)
        } else {
            format!(
                "{}/records/query?{}",
                self.service_endpoint,
                encode_params(&self.params)
            )
        }
    }

    async fn query(&self, body: &Value) -> Result<Vec<Record>, ServiceError> {
        let response = self
            .session
            .post(
                &self.query_url(),
                &body.to_string(),
                &[("Content-type", "text/plain")],
            )
            .await?;
        let query: QueryResponse = serde_json::from_value(response)?;
        Ok(query.records)
    }

    async fn fetch_folders(&self) -> Result<Vec<Folder>, ServiceError> {
        let body = json!({
            "query": {"recordType": ALBUM_FOLDERS_TYPE},
            "zoneID": &self.zone_id,
        });
        let mut folders = Vec::new();
        for record in self.query(&body).await? {
            let id = record.record_name;
            if id == ROOT_FOLDER || id == PROJECT_ROOT_FOLDER {
                continue;
            }
            if record.fields["isDeleted"]["value"].as_bool().unwrap_or(false) {
                continue;
            }
            let name = record.fields["albumNameEnc"]["value"]
                .as_str()
                .and_then(|enc| base64::engine::general_purpose::STANDARD.decode(enc).ok())
                .and_then(|bytes| String::from_utf8(bytes).ok())
                .unwrap_or_else(|| id.clone());
            folders.push(Folder { name, id });
        }
        Ok(folders)
    }

    /// Page through a listing until a page yields no master records.
    async fn list_photos(
        &self,
        name: &str,
        list_type: &str,
        query_filter: Option<Value>,
    ) -> Result<PhotoAlbum, ServiceError> {
        let mut photos: Vec<RemotePhoto> = Vec::new();
        let mut offset: u64 = 0;

        loop {
            let body = list_query(
                list_type,
                offset,
                self.page_size,
                query_filter.as_ref(),
                &self.zone_id,
            );
            let records = self.query(&body).await?;
            debug!(
                "Album '{}': got {} records at offset {}",
                name,
                records.len(),
                offset
            );

            let mut asset_records: HashMap<String, Value> = HashMap::new();
            let mut master_records: Vec<Value> = Vec::new();
            for rec in records {
                let raw = json!({"recordName": rec.record_name, "fields": rec.fields});
                match rec.record_type.as_str() {
                    "CPLAsset" => {
                        if let Some(master_id) =
                            raw["fields"]["masterRef"]["value"]["recordName"].as_str()
                        {
                            asset_records.insert(master_id.to_string(), raw.clone());
                        }
                    }
                    "CPLMaster" => master_records.push(raw),
                    _ => {}
                }
            }

            if master_records.is_empty() {
                break;
            }

            for master in master_records {
                offset += 1;
                let record_name = master["recordName"].as_str().unwrap_or("");
                let Some(asset) = asset_records.remove(record_name) else {
                    continue;
                };
                if let Some(photo) = photo_from_records(&master, &asset, &self.session) {
                    photos.push(photo);
                }
            }
        }

        Ok(PhotoAlbum::new(name, photos))
    }
}

#[async_trait::async_trait]
impl PhotosService for CloudKitService {
    async fn album_names(&self) -> Result<Vec<String>, ServiceError> {
        Ok(self
            .fetch_folders()
            .await?
            .into_iter()
            .map(|f| f.name)
            .collect())
    }

    async fn album(&self, name: &str) -> Result<Option<PhotoAlbum>, ServiceError> {
        let folders = self.fetch_folders().await?;
        let Some(folder) = folders.into_iter().find(|f| f.name == name) else {
            return Ok(None);
        };
        let album = self
            .list_photos(&folder.name, ALBUM_LIST_TYPE, Some(album_filter(&folder.id)))
            .await?;
        Ok(Some(album))
    }

    async fn all(&self) -> Result<PhotoAlbum, ServiceError> {
        self.list_photos("", ALL_PHOTOS_LIST_TYPE, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photos::ByteStream;
    use crate::types::VersionSize;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned responses in order and records each posted body.
    #[derive(Default)]
    struct ScriptedSession {
        responses: Mutex<VecDeque<Result<Value, ServiceError>>>,
        bodies: Mutex<Vec<Value>>,
        urls: Mutex<Vec<String>>,
    }

    impl ScriptedSession {
        fn new(responses: Vec<Result<Value, ServiceError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                ..Default::default()
            })
        }
    }

    #[async_trait::async_trait]
    impl PhotosSession for ScriptedSession {
        async fn post(
            &self,
            url: &str,
            body: &str,
            _headers: &[(&str, &str)],
        ) -> Result<Value, ServiceError> {
            self.urls.lock().unwrap().push(url.to_string());
            self.bodies
                .lock()
                .unwrap()
                .push(serde_json::from_str(body).unwrap());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(json!({"records": []})))
        }

        async fn stream(&self, _url: &str) -> Result<ByteStream, ServiceError> {
            Err(ServiceError::Connection("not scripted".into()))
        }
    }

    fn pair(id: &str, filename: &str) -> Vec<Value> {
        vec![
            json!({"recordName": id, "recordType": "CPLMaster", "fields": {
                "filenameEnc": {"value": filename, "type": "STRING"},
                "itemType": {"value": "public.jpeg"},
                "resOriginalRes": {"value": {"size": 10, "downloadURL": format!("https://cdn/{id}")}},
            }}),
            json!({"recordName": format!("A-{id}"), "recordType": "CPLAsset", "fields": {
                "masterRef": {"value": {"recordName": id}},
            }}),
        ]
    }

    fn page(pairs: &[(&str, &str)]) -> Result<Value, ServiceError> {
        let records: Vec<Value> = pairs.iter().flat_map(|(id, f)| pair(id, f)).collect();
        Ok(json!({ "records": records }))
    }

    fn service(session: Arc<ScriptedSession>) -> CloudKitService {
        let mut params = BTreeMap::new();
        params.insert("remapEnums".to_string(), "true".to_string());
        CloudKitService::new(session, "https://ck.example/db/".to_string(), params)
            .with_page_size(2)
    }

    #[tokio::test]
    async fn test_all_pages_until_empty() {
        let session = ScriptedSession::new(vec![
            page(&[("M1", "IMG_1.JPG"), ("M2", "IMG_2.JPG")]),
            page(&[("M3", "IMG_3.JPG")]),
            page(&[]),
        ]);
        let album = service(session.clone()).all().await.unwrap();
        let names: Vec<&str> = album.photos().iter().map(|p| p.filename()).collect();
        assert_eq!(names, vec!["IMG_1.JPG", "IMG_2.JPG", "IMG_3.JPG"]);
        assert_eq!(album.photos()[0].versions()[&VersionSize::Original].size, Some(10));

        let bodies = session.bodies.lock().unwrap();
        assert_eq!(bodies.len(), 3);
        assert_eq!(bodies[1]["query"]["filterBy"][0]["fieldValue"]["value"], 2);
        assert_eq!(bodies[2]["query"]["filterBy"][0]["fieldValue"]["value"], 3);
        let urls = session.urls.lock().unwrap();
        assert_eq!(urls[0], "https://ck.example/db/records/query?remapEnums=true");
    }

    #[tokio::test]
    async fn test_album_names_skip_containers_and_deleted() {
        let enc = base64::engine::general_purpose::STANDARD.encode("Family");
        let session = ScriptedSession::new(vec![Ok(json!({"records": [
            {"recordName": ROOT_FOLDER, "recordType": "CPLAlbum", "fields": {}},
            {"recordName": "F1", "recordType": "CPLAlbum", "fields": {
                "albumNameEnc": {"value": enc}
            }},
            {"recordName": "F2", "recordType": "CPLAlbum", "fields": {
                "isDeleted": {"value": true}
            }},
            {"recordName": "F3", "recordType": "CPLAlbum", "fields": {}},
        ]}))]);
        let names = service(session).album_names().await.unwrap();
        assert_eq!(names, vec!["Family".to_string(), "F3".to_string()]);
    }

    #[tokio::test]
    async fn test_album_lists_with_parent_filter() {
        let enc = base64::engine::general_purpose::STANDARD.encode("Trips");
        let session = ScriptedSession::new(vec![
            Ok(json!({"records": [
                {"recordName": "F9", "recordType": "CPLAlbum", "fields": {
                    "albumNameEnc": {"value": enc}
                }},
            ]})),
            page(&[("M1", "beach.jpg")]),
        ]);
        let album = service(session.clone()).album("Trips").await.unwrap().unwrap();
        assert_eq!(album.name(), "Trips");
        assert_eq!(album.len(), 1);
        let bodies = session.bodies.lock().unwrap();
        assert_eq!(bodies[1]["query"]["recordType"], ALBUM_LIST_TYPE);
        assert_eq!(bodies[1]["query"]["filterBy"][2]["fieldValue"]["value"], "F9");
    }

    #[tokio::test]
    async fn test_unknown_album_is_none() {
        let session = ScriptedSession::new(vec![Ok(json!({"records": []}))]);
        assert!(service(session).album("Nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_listing_error_propagates() {
        let session = ScriptedSession::new(vec![Err(ServiceError::api("unavailable", "503"))]);
        let err = service(session).all().await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_master_without_asset_skipped() {
        let session = ScriptedSession::new(vec![Ok(json!({"records": [
            pair("M1", "a.jpg")[0].clone(),
        ]}))]);
        let album = service(session).all().await.unwrap();
        assert!(album.is_empty());
    }
}
