use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::types::VersionSize;

/// Record type listing every photo in the library, oldest first.
pub(crate) const ALL_PHOTOS_LIST_TYPE: &str = "CPLAssetAndMasterByAssetDateWithoutHiddenOrDeleted";
/// Record type listing the photos of one user album.
pub(crate) const ALBUM_LIST_TYPE: &str = "CPLContainerRelationLiveByAssetDate";
/// Record type listing user albums.
pub(crate) const ALBUM_FOLDERS_TYPE: &str = "CPLAlbumByPositionLive";

// Container records that are not real albums.
pub(crate) const ROOT_FOLDER: &str = "----Root-Folder----";
pub(crate) const PROJECT_ROOT_FOLDER: &str = "----Project-Root-Folder----";

/// CloudKit fields requested in every listing: everything needed for the
/// filename, the three size variants, and the added date.
pub(crate) const DESIRED_KEYS: &[&str] = &[
    "recordName",
    "recordType",
    "masterRef",
    "itemType",
    "filenameEnc",
    "addedDate",
    "resOriginalRes",
    "resOriginalFileType",
    "resJPEGMedRes",
    "resJPEGMedFileType",
    "resJPEGThumbRes",
    "resJPEGThumbFileType",
    "resVidMedRes",
    "resVidMedFileType",
    "resVidSmallRes",
    "resVidSmallFileType",
    "isDeleted",
];

/// Maps sizes to CloudKit field prefixes for photos; prefix + "Res" is the
/// resource field (e.g. "resOriginalRes").
pub(crate) const PHOTO_VERSION_LOOKUP: &[(VersionSize, &str)] = &[
    (VersionSize::Original, "resOriginal"),
    (VersionSize::Medium, "resJPEGMed"),
    (VersionSize::Thumb, "resJPEGThumb"),
];

pub(crate) const VIDEO_VERSION_LOOKUP: &[(VersionSize, &str)] = &[
    (VersionSize::Original, "resOriginal"),
    (VersionSize::Medium, "resVidMed"),
    (VersionSize::Thumb, "resVidSmall"),
];

pub(crate) fn is_movie_type(item_type: &str) -> bool {
    matches!(item_type, "com.apple.quicktime-movie" | "public.mpeg-4")
}

pub(crate) fn encode_params(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// One page of a record listing, starting at `offset`.
pub(crate) fn list_query(
    list_type: &str,
    offset: u64,
    page_size: usize,
    query_filter: Option<&Value>,
    zone_id: &Value,
) -> Value {
    let mut filter_by = vec![
        json!({
            "fieldName": "startRank",
            "fieldValue": {"type": "INT64", "value": offset},
            "comparator": "EQUALS",
        }),
        json!({
            "fieldName": "direction",
            "fieldValue": {"type": "STRING", "value": "ASCENDING"},
            "comparator": "EQUALS",
        }),
    ];
    if let Some(arr) = query_filter.and_then(Value::as_array) {
        filter_by.extend(arr.iter().cloned());
    }

    json!({
        "query": {
            "filterBy": filter_by,
            "recordType": list_type,
        },
        // Each photo is a CPLMaster + CPLAsset pair.
        "resultsLimit": page_size * 2,
        "desiredKeys": DESIRED_KEYS,
        "zoneID": zone_id,
    })
}

pub(crate) fn album_filter(folder_id: &str) -> Value {
    json!([{
        "fieldName": "parentId",
        "comparator": "EQUALS",
        "fieldValue": {"type": "STRING", "value": folder_id},
    }])
}
